mod paper;
mod query;

pub use paper::{Paper, PaperDraft};
pub use query::{
    escape_like_pattern, CategoryCount, PaperListQuery, PaperPage, PaperSort, PaperStats,
    UpsertOutcome, MAX_PAGE_SIZE,
};
