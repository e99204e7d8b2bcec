mod error;
mod ports;
mod scorer;
mod types;
mod vector_math;

pub use error::RecommendError;
pub use ports::{EmbeddingModel, VectorIndex};
pub use scorer::{HybridRequest, HybridScorer, HIGHLIGHTS_WEIGHT, KEYWORDS_WEIGHT, SEEN_ITEMS_WEIGHT};
pub use types::{Embedding, ItemId, ScoredMatch, WeightedVector};
pub use vector_math::{dot, mean, normalize_weights, weighted_average};
