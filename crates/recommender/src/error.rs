use crate::ItemId;

#[derive(Debug, thiserror::Error)]
pub enum RecommendError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("item {0} is not in the vector index")]
    NotFound(ItemId),

    #[error("upstream unavailable: {0:#}")]
    UpstreamUnavailable(anyhow::Error),
}

impl RecommendError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}
