use axum::{http::StatusCode, routing::get, Router};
use serde_json::json;

use crate::{response::AppSuccess, GlobalState};

pub fn misc_routes() -> Router<GlobalState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
}

async fn root() -> AppSuccess {
    AppSuccess::new(StatusCode::OK, "PaperHub API", json!({
        "name": "paperhub",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health() -> AppSuccess {
    AppSuccess::new(StatusCode::OK, "OK", json!({ "status": "healthy" }))
}
