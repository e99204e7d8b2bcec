use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;

use crate::{Embedding, ItemId, ScoredMatch};

/// Read side of an external vector index.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Stored vectors of `ids`. Ids unknown to the index are absent from the map.
    async fn fetch(&self, ids: &[ItemId]) -> Result<HashMap<ItemId, Embedding>>;

    /// Nearest neighbours of `vector`, most similar first.
    async fn query(&self, vector: &[f32], top_k: usize, include_metadata: bool) -> Result<Vec<ScoredMatch>>;
}

/// Maps text to a fixed-length vector. Deterministic for a fixed model version.
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Embedding>;
}
