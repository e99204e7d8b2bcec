mod env;
mod global_state;
mod response;
mod routes;
mod utils;

pub use routes::{misc_routes, paper_routes, recommendation_routes};
pub use routes::{ListPapersParams, SearchPapersParams};
pub use routes::{
    top_k_or, HighlightsBody, HistoryBody, HybridBody, KeywordsBody, TopKQuery, DEFAULT_HYBRID_TOP_K,
    DEFAULT_SIMILAR_TOP_K, MAX_SEEN_IDS,
};

pub use env::ApiServerEnv;
pub use global_state::{GlobalState, PaperRecommender};
pub use response::{AppError, AppSuccess, GenericResponse};
pub use utils::{cors_layer, setup_tracing};
