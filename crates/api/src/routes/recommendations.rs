use std::sync::Arc;

use anyhow::anyhow;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use paperhub_catalog::MAX_PAGE_SIZE;
use paperhub_recommender::{HybridRequest, ItemId, ScoredMatch};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::response::{AppError, AppSuccess};
use crate::{GlobalState, PaperRecommender};

pub fn recommendation_routes() -> Router<GlobalState> {
    Router::new()
        .route("/api/recommendations", post(recommend_hybrid))
        .route("/api/recommendations/paper/{arxiv_id}", get(recommend_by_paper))
        .route("/api/recommendations/keywords", post(recommend_by_keywords))
        .route("/api/recommendations/highlights", post(recommend_by_highlights))
        .route("/api/recommendations/history", post(recommend_by_history))
}

/// Upper bound on `seen_ids` per request. Each id is sent to the vector index.
pub const MAX_SEEN_IDS: usize = 200;

pub const DEFAULT_HYBRID_TOP_K: usize = 10;
pub const DEFAULT_SIMILAR_TOP_K: usize = 5;

fn recommender(state: &GlobalState) -> Result<Arc<PaperRecommender>, AppError> {
    state.recommender.clone().ok_or_else(|| {
        AppError::new(StatusCode::SERVICE_UNAVAILABLE, anyhow!("Recommendations are not configured"))
    })
}

/// `top_k` or its default, bounded to `1..=MAX_PAGE_SIZE`.
pub fn top_k_or(top_k: Option<usize>, default: usize) -> Result<usize, AppError> {
    let top_k = top_k.unwrap_or(default);
    if !(1..=MAX_PAGE_SIZE as usize).contains(&top_k) {
        return Err(AppError::bad_request(format!("top_k must be between 1 and {}", MAX_PAGE_SIZE)));
    }
    Ok(top_k)
}

fn check_seen_ids(seen_ids: &[ItemId]) -> Result<(), AppError> {
    if seen_ids.len() > MAX_SEEN_IDS {
        return Err(AppError::bad_request(format!("seen_ids must not contain more than {} ids", MAX_SEEN_IDS)));
    }
    Ok(())
}

fn recommendations_response(results: Vec<ScoredMatch>) -> AppSuccess {
    AppSuccess::new(StatusCode::OK, "Recommendations fetched successfully", json!({
        "count": results.len(),
        "recommendations": results,
    }))
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct HybridBody {
    #[serde(default)]
    pub seen_ids: Vec<ItemId>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub highlights: Vec<String>,
    pub top_k: Option<usize>,
}

impl HybridBody {
    pub fn into_request(self) -> Result<HybridRequest, AppError> {
        check_seen_ids(&self.seen_ids)?;
        Ok(HybridRequest {
            top_k: top_k_or(self.top_k, DEFAULT_HYBRID_TOP_K)?,
            seen_ids: self.seen_ids,
            keywords: self.keywords,
            highlights: self.highlights,
        })
    }
}

async fn recommend_hybrid(
    State(state): State<GlobalState>,
    Json(body): Json<HybridBody>,
) -> Result<AppSuccess, AppError> {
    let request = body.into_request()?;

    let results = recommender(&state)?
        .recommend(&request)
        .await
        .map_err(AppError::recommend)?;
    Ok(recommendations_response(results))
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TopKQuery {
    pub top_k: Option<usize>,
}

impl TopKQuery {
    pub fn top_k(&self) -> Result<usize, AppError> {
        top_k_or(self.top_k, DEFAULT_SIMILAR_TOP_K)
    }
}

async fn recommend_by_paper(
    State(state): State<GlobalState>,
    Path(arxiv_id): Path<String>,
    Query(query): Query<TopKQuery>,
) -> Result<AppSuccess, AppError> {
    let top_k = query.top_k()?;

    let results = recommender(&state)?
        .recommend_by_item(&arxiv_id, top_k)
        .await
        .map_err(AppError::recommend)?;
    Ok(recommendations_response(results))
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct KeywordsBody {
    #[serde(default)]
    pub keywords: Vec<String>,
    pub top_k: Option<usize>,
}

impl KeywordsBody {
    pub fn top_k(&self) -> Result<usize, AppError> {
        top_k_or(self.top_k, DEFAULT_SIMILAR_TOP_K)
    }
}

async fn recommend_by_keywords(
    State(state): State<GlobalState>,
    Json(body): Json<KeywordsBody>,
) -> Result<AppSuccess, AppError> {
    let top_k = body.top_k()?;

    let results = recommender(&state)?
        .recommend_by_keywords(&body.keywords, top_k)
        .await
        .map_err(AppError::recommend)?;
    Ok(recommendations_response(results))
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct HighlightsBody {
    #[serde(default)]
    pub highlights: Vec<String>,
    pub top_k: Option<usize>,
}

impl HighlightsBody {
    pub fn top_k(&self) -> Result<usize, AppError> {
        top_k_or(self.top_k, DEFAULT_SIMILAR_TOP_K)
    }
}

async fn recommend_by_highlights(
    State(state): State<GlobalState>,
    Json(body): Json<HighlightsBody>,
) -> Result<AppSuccess, AppError> {
    let top_k = body.top_k()?;

    let results = recommender(&state)?
        .recommend_by_highlights(&body.highlights, top_k)
        .await
        .map_err(AppError::recommend)?;
    Ok(recommendations_response(results))
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct HistoryBody {
    #[serde(default)]
    pub seen_ids: Vec<ItemId>,
    pub top_k: Option<usize>,
}

impl HistoryBody {
    pub fn top_k(&self) -> Result<usize, AppError> {
        check_seen_ids(&self.seen_ids)?;
        top_k_or(self.top_k, DEFAULT_HYBRID_TOP_K)
    }
}

async fn recommend_by_history(
    State(state): State<GlobalState>,
    Json(body): Json<HistoryBody>,
) -> Result<AppSuccess, AppError> {
    let top_k = body.top_k()?;

    let results = recommender(&state)?
        .recommend_by_history(&body.seen_ids, top_k)
        .await
        .map_err(AppError::recommend)?;
    Ok(recommendations_response(results))
}
