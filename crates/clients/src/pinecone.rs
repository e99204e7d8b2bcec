use std::collections::HashMap;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use paperhub_common::{define_module_client, optional_env_var, required_env_var, ModuleClient};
use paperhub_recommender::{Embedding, ItemId, ScoredMatch, VectorIndex};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::{PINECONE_API_VERSION, UPSTREAM_TIMEOUT_SECS};

/// Connection details of one Pinecone index (data plane).
pub struct PineconeIndex {
    pub http: reqwest::Client,
    pub host: String,
    pub api_key: String,
    pub namespace: String,
}

impl PineconeIndex {
    pub fn new(http: reqwest::Client, host: &str, api_key: &str, namespace: &str) -> Self {
        Self {
            http,
            host: normalize_host(host),
            api_key: api_key.to_string(),
            namespace: namespace.to_string(),
        }
    }
}

define_module_client! {
    (struct PineconeClient, "pinecone")
    client_type: PineconeIndex,
    env: ["PINECONE_API_KEY", "PINECONE_INDEX_HOST"],
    setup: async {
        let api_key = required_env_var("PINECONE_API_KEY")?;
        let host = required_env_var("PINECONE_INDEX_HOST")?;
        let namespace = optional_env_var("PINECONE_NAMESPACE", "");

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(UPSTREAM_TIMEOUT_SECS))
            .build()?;

        Ok::<_, anyhow::Error>(PineconeIndex::new(http, &host, &api_key, &namespace))
    }
}

/// One vector to write into the index.
#[derive(Debug, Clone, Serialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Embedding,
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct FetchResponse {
    #[serde(default)]
    vectors: HashMap<String, FetchedVector>,
}

#[derive(Debug, Deserialize)]
struct FetchedVector {
    #[serde(default)]
    values: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<RawMatch>,
}

#[derive(Debug, Deserialize)]
struct RawMatch {
    id: String,
    #[serde(default)]
    score: Option<f32>,
    #[serde(default)]
    metadata: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct UpsertResponse {
    #[serde(default, rename = "upsertedCount")]
    upserted_count: usize,
}

impl PineconeClient {
    pub async fn fetch_vectors(&self, ids: &[ItemId]) -> Result<HashMap<ItemId, Embedding>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let index = self.get_client();
        let mut params: Vec<(&str, &str)> = ids.iter().map(|id| ("ids", id.as_str())).collect();
        if !index.namespace.is_empty() {
            params.push(("namespace", index.namespace.as_str()));
        }

        let request = index
            .http
            .get(format!("{}/vectors/fetch", index.host))
            .query(&params);
        let body = self.send("fetch", request).await?;

        let vectors = parse_fetch_response(body)?;
        tracing::debug!("[PineconeClient::fetch_vectors] Fetched {} of {} vectors", vectors.len(), ids.len());
        Ok(vectors)
    }

    pub async fn query_vectors(&self, vector: &[f32], top_k: usize, include_metadata: bool) -> Result<Vec<ScoredMatch>> {
        let index = self.get_client();
        let payload = json!({
            "vector": vector,
            "topK": top_k,
            "includeMetadata": include_metadata,
            "includeValues": false,
            "namespace": index.namespace,
        });

        let request = index
            .http
            .post(format!("{}/query", index.host))
            .json(&payload);
        let body = self.send("query", request).await?;

        parse_query_response(body)
    }

    /// Writes `records` and returns the count reported by the index.
    pub async fn upsert(&self, records: Vec<VectorRecord>) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let index = self.get_client();
        let payload = json!({
            "vectors": records,
            "namespace": index.namespace,
        });

        let request = index
            .http
            .post(format!("{}/vectors/upsert", index.host))
            .json(&payload);
        let body = self.send("upsert", request).await?;

        let response: UpsertResponse = serde_json::from_value(body)?;
        tracing::info!("[PineconeClient::upsert] Upserted {} vectors", response.upserted_count);
        Ok(response.upserted_count)
    }

    async fn send(&self, operation: &str, request: reqwest::RequestBuilder) -> Result<Value> {
        let index = self.get_client();
        let response = request
            .header("Api-Key", &index.api_key)
            .header("X-Pinecone-API-Version", PINECONE_API_VERSION)
            .send()
            .await
            .map_err(|e| anyhow!("[PineconeClient::{}] Request failed: {}", operation, e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("[PineconeClient::{}] Index returned {}: {}", operation, status, text));
        }

        let body = response.json::<Value>().await?;
        Ok(body)
    }
}

#[async_trait]
impl VectorIndex for PineconeClient {
    async fn fetch(&self, ids: &[ItemId]) -> Result<HashMap<ItemId, Embedding>> {
        self.fetch_vectors(ids).await
    }

    async fn query(&self, vector: &[f32], top_k: usize, include_metadata: bool) -> Result<Vec<ScoredMatch>> {
        self.query_vectors(vector, top_k, include_metadata).await
    }
}

fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

fn parse_fetch_response(body: Value) -> Result<HashMap<ItemId, Embedding>> {
    let response: FetchResponse = serde_json::from_value(body)?;
    Ok(response
        .vectors
        .into_iter()
        .filter(|(_, v)| !v.values.is_empty())
        .map(|(id, v)| (id, v.values))
        .collect())
}

fn parse_query_response(body: Value) -> Result<Vec<ScoredMatch>> {
    let response: QueryResponse = serde_json::from_value(body)?;
    Ok(response
        .matches
        .into_iter()
        .map(|m| ScoredMatch {
            id: m.id,
            score: m.score.unwrap_or(0.0),
            metadata: m.metadata.unwrap_or_default(),
        })
        .collect())
}
