use std::sync::Arc;

use anyhow::Result;
use paperhub_clients::{EmbederClient, PineconeClient, PostgresClient};
use paperhub_common::ModuleClient;
use paperhub_recommender::HybridScorer;
use sqlx::PgPool;

pub type PaperRecommender = HybridScorer<PineconeClient, EmbederClient>;

#[derive(Clone)]
pub struct GlobalState {
    pub db: PostgresClient,
    /// `None` when the vector index or embedding endpoint is not configured.
    pub recommender: Option<Arc<PaperRecommender>>,
}

impl GlobalState {
    pub async fn new() -> Result<Self> {
        let db = PostgresClient::setup_connection().await?;
        let recommender = Self::setup_recommender().await;
        Ok(Self { db, recommender })
    }

    async fn setup_recommender() -> Option<Arc<PaperRecommender>> {
        let index = match PineconeClient::setup_connection().await {
            Ok(index) => index,
            Err(e) => {
                tracing::warn!("[GlobalState::setup_recommender] Recommendations disabled: {:#}", e);
                return None;
            }
        };
        let model = match EmbederClient::setup_connection().await {
            Ok(model) => model,
            Err(e) => {
                tracing::warn!("[GlobalState::setup_recommender] Recommendations disabled: {:#}", e);
                return None;
            }
        };

        Some(Arc::new(HybridScorer::new(Arc::new(index), Arc::new(model))))
    }

    pub fn pool(&self) -> &'static PgPool {
        **self.db.get_client()
    }
}
