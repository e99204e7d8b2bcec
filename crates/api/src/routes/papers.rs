use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use paperhub_catalog::{Paper, PaperDraft, PaperListQuery, PaperSort, MAX_PAGE_SIZE};
use paperhub_database::{OrderDirection, SqlxCrud, SqlxFilterQuery};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::response::{AppError, AppSuccess};
use crate::GlobalState;

pub fn paper_routes() -> Router<GlobalState> {
    Router::new()
        .route("/api/papers", get(list_papers).post(create_paper))
        .route("/api/papers/search", get(search_papers))
        .route("/api/papers/stats", get(paper_stats))
        .route("/api/papers/arxiv/{arxiv_id}", get(get_paper_by_arxiv_id))
        .route(
            "/api/papers/{id}",
            get(get_paper).put(update_paper).delete(delete_paper),
        )
}

fn validate_page(skip: Option<i64>, limit: Option<i64>) -> Result<(i64, i64), AppError> {
    let skip = skip.unwrap_or(0);
    let limit = limit.unwrap_or(10);

    if skip < 0 {
        return Err(AppError::bad_request("skip must be greater than or equal to 0"));
    }
    if !(1..=MAX_PAGE_SIZE).contains(&limit) {
        return Err(AppError::bad_request(format!("limit must be between 1 and {}", MAX_PAGE_SIZE)));
    }
    Ok((skip, limit))
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ListPapersParams {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    pub category: Option<String>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
}

impl ListPapersParams {
    pub fn validate(self) -> Result<PaperListQuery, AppError> {
        let (skip, limit) = validate_page(self.skip, self.limit)?;

        let sort_by = match self.sort_by.as_deref() {
            Some(sort_by) => sort_by.parse::<PaperSort>().map_err(AppError::bad_request)?,
            None => PaperSort::default(),
        };
        let order = match self.order.as_deref() {
            Some(order) => order.parse::<OrderDirection>().map_err(AppError::bad_request)?,
            None => OrderDirection::Desc,
        };
        let category = self.category.filter(|c| !c.trim().is_empty());

        Ok(PaperListQuery { skip, limit, category, sort_by, order })
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SearchPapersParams {
    pub q: Option<String>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl SearchPapersParams {
    /// Returns the search text with the page bounds.
    pub fn validate(self) -> Result<(String, i64, i64), AppError> {
        let q = self.q.unwrap_or_default();
        if q.is_empty() {
            return Err(AppError::bad_request("q must not be empty"));
        }
        let (skip, limit) = validate_page(self.skip, self.limit)?;
        Ok((q, skip, limit))
    }
}

async fn list_papers(
    State(state): State<GlobalState>,
    Query(params): Query<ListPapersParams>,
) -> Result<AppSuccess, AppError> {
    let query = params.validate()?;
    let page = Paper::list(&query, state.pool()).await.map_err(AppError::database)?;

    Ok(AppSuccess::new(StatusCode::OK, "Papers fetched successfully", json!({
        "total": page.total,
        "skip": query.skip,
        "limit": query.limit,
        "papers": page.papers,
    })))
}

async fn search_papers(
    State(state): State<GlobalState>,
    Query(params): Query<SearchPapersParams>,
) -> Result<AppSuccess, AppError> {
    let (q, skip, limit) = params.validate()?;
    let page = Paper::search(&q, skip, limit, state.pool()).await.map_err(AppError::database)?;

    Ok(AppSuccess::new(StatusCode::OK, "Papers searched successfully", json!({
        "query": q,
        "total": page.total,
        "papers": page.papers,
    })))
}

async fn paper_stats(
    State(state): State<GlobalState>,
) -> Result<AppSuccess, AppError> {
    let stats = Paper::stats(state.pool()).await.map_err(AppError::database)?;
    Ok(AppSuccess::new(StatusCode::OK, "Paper stats fetched successfully", json!(stats)))
}

async fn get_paper(
    State(state): State<GlobalState>,
    Path(id): Path<i64>,
) -> Result<AppSuccess, AppError> {
    let paper = Paper::find_by_id(id, state.pool()).await
        .map_err(AppError::database)?
        .ok_or_else(|| AppError::not_found("Paper not found"))?;

    Ok(AppSuccess::new(StatusCode::OK, "Paper fetched successfully", json!(paper)))
}

async fn get_paper_by_arxiv_id(
    State(state): State<GlobalState>,
    Path(arxiv_id): Path<String>,
) -> Result<AppSuccess, AppError> {
    let paper = Paper::find_by_arxiv_id(&arxiv_id, state.pool()).await
        .map_err(AppError::database)?
        .ok_or_else(|| AppError::not_found("Paper not found"))?;

    Ok(AppSuccess::new(StatusCode::OK, "Paper fetched successfully", json!(paper)))
}

async fn create_paper(
    State(state): State<GlobalState>,
    Json(payload): Json<PaperDraft>,
) -> Result<AppSuccess, AppError> {
    payload.validate()?;
    let paper = payload.into_paper();

    if Paper::find_by_arxiv_id(&paper.arxiv_id, state.pool()).await.map_err(AppError::database)?.is_some() {
        return Err(AppError::conflict(format!("Paper {} already exists", paper.arxiv_id)));
    }

    let created = paper.create(state.pool()).await.map_err(AppError::database)?;
    tracing::info!("[create_paper] Created paper {} ({})", created.id, created.arxiv_id);

    Ok(AppSuccess::new(StatusCode::CREATED, "Paper created successfully", json!(created)))
}

async fn update_paper(
    State(state): State<GlobalState>,
    Path(id): Path<i64>,
    Json(payload): Json<PaperDraft>,
) -> Result<AppSuccess, AppError> {
    payload.validate()?;

    let mut paper = Paper::find_by_id(id, state.pool()).await
        .map_err(AppError::database)?
        .ok_or_else(|| AppError::not_found("Paper not found"))?;

    if payload.arxiv_id.trim() != paper.arxiv_id {
        let taken = Paper::find_by_arxiv_id(payload.arxiv_id.trim(), state.pool()).await
            .map_err(AppError::database)?;
        if taken.is_some() {
            return Err(AppError::conflict(format!("Paper {} already exists", payload.arxiv_id.trim())));
        }
    }

    payload.apply_to(&mut paper);
    let updated = paper.update(state.pool()).await.map_err(AppError::database)?;

    Ok(AppSuccess::new(StatusCode::OK, "Paper updated successfully", json!(updated)))
}

async fn delete_paper(
    State(state): State<GlobalState>,
    Path(id): Path<i64>,
) -> Result<AppSuccess, AppError> {
    let paper = Paper::find_by_id(id, state.pool()).await
        .map_err(AppError::database)?
        .ok_or_else(|| AppError::not_found("Paper not found"))?;

    let arxiv_id = paper.arxiv_id.clone();
    paper.delete(state.pool()).await.map_err(AppError::database)?;
    tracing::info!("[delete_paper] Deleted paper {} ({})", id, arxiv_id);

    Ok(AppSuccess::new(StatusCode::OK, "Paper deleted successfully", json!({ "id": id })))
}
