use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    mean, weighted_average, EmbeddingModel, Embedding, ItemId, RecommendError, ScoredMatch, VectorIndex,
    WeightedVector,
};

/// Relative influence of each signal on the combined query vector.
pub const SEEN_ITEMS_WEIGHT: f64 = 2.0;
pub const KEYWORDS_WEIGHT: f64 = 1.5;
pub const HIGHLIGHTS_WEIGHT: f64 = 2.5;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HybridRequest {
    #[serde(default)]
    pub seen_ids: Vec<ItemId>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub highlights: Vec<String>,
    pub top_k: usize,
}

impl HybridRequest {
    pub fn new(top_k: usize) -> Self {
        Self { top_k, ..Default::default() }
    }

    pub fn with_seen_ids(mut self, seen_ids: impl IntoIterator<Item = impl Into<ItemId>>) -> Self {
        self.seen_ids = seen_ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_keywords(mut self, keywords: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_highlights(mut self, highlights: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.highlights = highlights.into_iter().map(Into::into).collect();
        self
    }
}

/// Blends reading history, keywords and highlighted passages into one vector
/// and asks the index for its nearest neighbours.
///
/// Holds no per-request state, so a single scorer can serve concurrent requests.
pub struct HybridScorer<I, M> {
    index: Arc<I>,
    model: Arc<M>,
}

impl<I, M> Clone for HybridScorer<I, M> {
    fn clone(&self) -> Self {
        Self {
            index: self.index.clone(),
            model: self.model.clone(),
        }
    }
}

impl<I: VectorIndex, M: EmbeddingModel> HybridScorer<I, M> {
    pub fn new(index: Arc<I>, model: Arc<M>) -> Self {
        Self { index, model }
    }

    /// Hybrid recommendation over every signal present in `request`.
    ///
    /// Seen items that the index does not know are ignored. They are still
    /// excluded from the results.
    pub async fn recommend(&self, request: &HybridRequest) -> Result<Vec<ScoredMatch>, RecommendError> {
        ensure_top_k(request.top_k)?;

        let seen_ids = dedup_preserving_order(&request.seen_ids);
        if seen_ids.is_empty() && request.keywords.is_empty() && request.highlights.is_empty() {
            return Err(RecommendError::invalid_input(
                "at least one of seen_ids, keywords or highlights is required",
            ));
        }

        let mut signals = Vec::with_capacity(3);

        if !seen_ids.is_empty() {
            match self.seen_items_vector(&seen_ids).await? {
                Some(vector) => signals.push(WeightedVector::new(vector, SEEN_ITEMS_WEIGHT)),
                None => tracing::debug!(
                    "[HybridScorer::recommend] None of the {} seen items are indexed, dropping the signal",
                    seen_ids.len()
                ),
            }
        }

        if !request.keywords.is_empty() {
            let vector = self.embed(&request.keywords.join(", ")).await?;
            signals.push(WeightedVector::new(vector, KEYWORDS_WEIGHT));
        }

        if !request.highlights.is_empty() {
            let vector = self.embed(&request.highlights.join(" ")).await?;
            signals.push(WeightedVector::new(vector, HIGHLIGHTS_WEIGHT));
        }

        if signals.is_empty() {
            return Err(RecommendError::invalid_input("no signal produced a usable vector"));
        }

        let query_vector = weighted_average(&signals)?;
        let exclude: HashSet<ItemId> = seen_ids.into_iter().collect();
        self.search(&query_vector, request.top_k, &exclude).await
    }

    /// Items similar to `item_id`, never including `item_id` itself.
    pub async fn recommend_by_item(&self, item_id: &str, top_k: usize) -> Result<Vec<ScoredMatch>, RecommendError> {
        ensure_top_k(top_k)?;

        let item_id = item_id.to_string();
        let mut vectors = self
            .index
            .fetch(std::slice::from_ref(&item_id))
            .await
            .map_err(RecommendError::UpstreamUnavailable)?;

        let vector = vectors
            .remove(&item_id)
            .ok_or_else(|| RecommendError::NotFound(item_id.clone()))?;

        let exclude = HashSet::from([item_id]);
        self.search(&vector, top_k, &exclude).await
    }

    pub async fn recommend_by_keywords(&self, keywords: &[String], top_k: usize) -> Result<Vec<ScoredMatch>, RecommendError> {
        self.recommend(&HybridRequest::new(top_k).with_keywords(keywords.iter().cloned()))
            .await
    }

    pub async fn recommend_by_highlights(&self, highlights: &[String], top_k: usize) -> Result<Vec<ScoredMatch>, RecommendError> {
        self.recommend(&HybridRequest::new(top_k).with_highlights(highlights.iter().cloned()))
            .await
    }

    pub async fn recommend_by_history(&self, seen_ids: &[ItemId], top_k: usize) -> Result<Vec<ScoredMatch>, RecommendError> {
        self.recommend(&HybridRequest::new(top_k).with_seen_ids(seen_ids.iter().cloned()))
            .await
    }

    async fn seen_items_vector(&self, seen_ids: &[ItemId]) -> Result<Option<Embedding>, RecommendError> {
        let fetched = self
            .index
            .fetch(seen_ids)
            .await
            .map_err(RecommendError::UpstreamUnavailable)?;

        let vectors: Vec<Embedding> = seen_ids
            .iter()
            .filter_map(|id| fetched.get(id).cloned())
            .collect();

        if vectors.len() < seen_ids.len() {
            tracing::debug!(
                "[HybridScorer::seen_items_vector] {} of {} seen items have no stored vector",
                seen_ids.len() - vectors.len(),
                seen_ids.len()
            );
        }
        if vectors.is_empty() {
            return Ok(None);
        }
        mean(&vectors).map(Some)
    }

    async fn embed(&self, text: &str) -> Result<Embedding, RecommendError> {
        self.model
            .embed(text)
            .await
            .map_err(RecommendError::UpstreamUnavailable)
    }

    /// One over-fetching query, then drops excluded ids and truncates to `top_k`.
    async fn search(
        &self,
        vector: &[f32],
        top_k: usize,
        exclude: &HashSet<ItemId>,
    ) -> Result<Vec<ScoredMatch>, RecommendError> {
        let fetch_k = top_k.saturating_add(exclude.len());
        let matches = self
            .index
            .query(vector, fetch_k, true)
            .await
            .map_err(RecommendError::UpstreamUnavailable)?;

        let results: Vec<ScoredMatch> = matches
            .into_iter()
            .filter(|m| !exclude.contains(&m.id))
            .take(top_k)
            .collect();

        if results.len() < top_k {
            tracing::debug!(
                "[HybridScorer::search] Returning {} of {} requested matches after excluding {} ids",
                results.len(),
                top_k,
                exclude.len()
            );
        }

        Ok(results)
    }
}

fn ensure_top_k(top_k: usize) -> Result<(), RecommendError> {
    if top_k == 0 {
        return Err(RecommendError::invalid_input("top_k must be at least 1"));
    }
    Ok(())
}

fn dedup_preserving_order(ids: &[ItemId]) -> Vec<ItemId> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}
