use std::time::Duration;

use anyhow::Result;
use axum::Router;
use paperhub_common::EnvVars;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use paperhub_api::{
    cors_layer, misc_routes, paper_routes, recommendation_routes, setup_tracing, ApiServerEnv, GlobalState,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    setup_tracing();

    let env = ApiServerEnv::load()?;
    let cors = cors_layer(&env)?;
    let trace = TraceLayer::new_for_http();

    let global_state = GlobalState::new().await?;
    if global_state.recommender.is_none() {
        tracing::warn!("Recommendation routes will answer 503 until the vector index is configured");
    }

    let app = Router::new()
        .merge(misc_routes())
        .merge(paper_routes())
        .merge(recommendation_routes())
        .layer(TimeoutLayer::new(Duration::from_secs(60)))
        .layer(cors)
        .layer(trace)
        .with_state(global_state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", env.port)).await?;

    tracing::info!("LISTENING ON {}", env.port);
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
