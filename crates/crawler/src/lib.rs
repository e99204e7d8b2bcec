mod arxiv;
mod crawler;
mod env;
mod ingest;
mod pdf;

pub use arxiv::{arxiv_id_from_entry_id, build_search_query, parse_feed, ArxivClient, ArxivSort, CrawledPaper, ARXIV_API_URL};
pub use crawler::{ArxivCrawler, CrawlRequest, METADATA_FILE_NAME};
pub use env::CrawlerEnv;
pub use ingest::{
    crawl_keywords, crawl_to_db, import_metadata, index_papers, migrate_papers, persist_papers,
    vector_metadata, IngestReport, MigrationReport,
};
pub use pdf::{download_pdf, extract_text, PDF_MAX_PAGES};
