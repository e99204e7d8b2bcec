pub const EMBEDDING_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

pub const PINECONE_API_VERSION: &str = "2024-07";
pub const UPSTREAM_TIMEOUT_SECS: u64 = 30;
