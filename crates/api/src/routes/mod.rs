mod misc;
mod papers;
mod recommendations;

pub use misc::misc_routes;
pub use papers::{paper_routes, ListPapersParams, SearchPapersParams};
pub use recommendations::{
    recommendation_routes, top_k_or, HighlightsBody, HistoryBody, HybridBody, KeywordsBody, TopKQuery,
    DEFAULT_HYBRID_TOP_K, DEFAULT_SIMILAR_TOP_K, MAX_SEEN_IDS,
};
