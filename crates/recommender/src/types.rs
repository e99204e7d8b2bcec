use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type Embedding = Vec<f32>;

/// arXiv id of a catalogued paper, e.g. `2510.05069v1`.
pub type ItemId = String;

#[derive(Debug, Clone, PartialEq)]
pub struct WeightedVector {
    pub vector: Embedding,
    pub weight: f64,
}

impl WeightedVector {
    pub fn new(vector: Embedding, weight: f64) -> Self {
        Self { vector, weight }
    }
}

/// One nearest-neighbour hit, in the order the index returned it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredMatch {
    pub id: ItemId,
    pub score: f32,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}
