use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use paperhub_common::{define_module_client, optional_env_var, required_env_var, ModuleClient};
use paperhub_recommender::{Embedding, EmbeddingModel};

use async_openai::{
    config::OpenAIConfig,
    types::CreateEmbeddingRequestArgs,
    Client
};

use crate::{EMBEDDING_MODEL, UPSTREAM_TIMEOUT_SECS};

/// OpenAI-compatible `/embeddings` endpoint and the model it serves.
pub struct EmbeddingEndpoint {
    pub client: Client<OpenAIConfig>,
    pub model: String,
}

impl EmbeddingEndpoint {
    /// Requests are sent once. Rate limits and server errors go straight back to the caller.
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Result<Self> {
        let embeder_config = OpenAIConfig::new()
            .with_api_base(base_url)
            .with_api_key(api_key);

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(UPSTREAM_TIMEOUT_SECS))
            .build()?;

        let no_retry = ExponentialBackoffBuilder::new()
            .with_max_elapsed_time(Some(Duration::ZERO))
            .build();

        Ok(Self {
            client: Client::build(http_client, embeder_config, no_retry),
            model: model.to_string(),
        })
    }
}

define_module_client! {
    (struct EmbederClient, "embeder")
    client_type: EmbeddingEndpoint,
    env: ["EMBEDDING_BASE_URL", "EMBEDDING_API_KEY"],
    setup: async {
        let base_url = required_env_var("EMBEDDING_BASE_URL")?;
        let api_key = required_env_var("EMBEDDING_API_KEY")?;
        let model = optional_env_var("EMBEDDING_MODEL", EMBEDDING_MODEL);

        EmbeddingEndpoint::new(&base_url, &api_key, &model)
    }
}

impl EmbederClient {
    pub fn model(&self) -> &str {
        &self.get_client().model
    }

    pub async fn embed(&self, text: Vec<String>) -> Result<Vec<Embedding>> {
        tracing::debug!("[EmbederClient::embed] Embedding {} texts", text.len());
        if text.is_empty() {
            return Ok(vec![]);
        }

        let expected = text.len();
        let request = CreateEmbeddingRequestArgs::default()
            .model(self.model())
            .input(text)
            .build()?;

        let response = self.get_client().client.embeddings().create(request).await?;
        let mut data = response.data;
        data.sort_by_key(|item| item.index);
        let embeddings = data
            .into_iter()
            .map(|item| item.embedding)
            .collect::<Vec<_>>();

        if embeddings.len() != expected {
            return Err(anyhow!(
                "[EmbederClient::embed] Expected {} embeddings, got {}",
                expected,
                embeddings.len()
            ));
        }

        tracing::debug!("[EmbederClient::embed] Embedding response: {}", embeddings.len());
        Ok(embeddings)
    }
}

#[async_trait]
impl EmbeddingModel for EmbederClient {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        EmbederClient::embed(self, vec![text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| anyhow!("[EmbederClient::embed] Empty embedding response"))
    }
}
