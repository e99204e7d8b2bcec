use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};

use crate::{download_pdf, extract_text, ArxivClient, ArxivSort, CrawledPaper};

pub const METADATA_FILE_NAME: &str = "papers_metadata.json";

#[derive(Debug, Clone, PartialEq)]
pub struct CrawlRequest {
    pub query: String,
    pub max_results: usize,
    pub category: Option<String>,
    pub download_pdf: bool,
    pub sort: ArxivSort,
}

impl CrawlRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            max_results: 50,
            category: None,
            download_pdf: false,
            sort: ArxivSort::default(),
        }
    }
}

/// Searches arXiv, optionally fetches PDFs, and keeps the metadata file under `save_dir`.
pub struct ArxivCrawler {
    arxiv: ArxivClient,
    http: reqwest::Client,
    save_dir: PathBuf,
}

impl ArxivCrawler {
    pub fn new(save_dir: impl Into<PathBuf>) -> Result<Self> {
        Self::with_client(ArxivClient::new()?, save_dir)
    }

    pub fn with_client(arxiv: ArxivClient, save_dir: impl Into<PathBuf>) -> Result<Self> {
        let save_dir = save_dir.into();
        std::fs::create_dir_all(&save_dir)
            .with_context(|| format!("failed to create {}", save_dir.display()))?;

        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self { arxiv, http, save_dir })
    }

    pub fn save_dir(&self) -> &Path {
        &self.save_dir
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.save_dir.join(METADATA_FILE_NAME)
    }

    pub async fn crawl_and_save(&self, request: &CrawlRequest) -> Result<Vec<CrawledPaper>> {
        let mut papers = self
            .arxiv
            .search(&request.query, request.max_results, request.category.as_deref(), request.sort)
            .await?;

        if papers.is_empty() {
            tracing::info!("[ArxivCrawler::crawl_and_save] No papers found for '{}'", request.query);
            return Ok(papers);
        }

        if request.download_pdf {
            for paper in papers.iter_mut() {
                self.attach_pdf(paper).await;
            }
        }

        self.save_metadata(&papers)?;
        Ok(papers)
    }

    /// Downloads the PDF and fills `pdf_path` and `text`. `text` falls back to the abstract.
    pub async fn attach_pdf(&self, paper: &mut CrawledPaper) {
        let pdf_path = match &paper.pdf_url {
            Some(url) => download_pdf(&self.http, url, &self.save_dir, &paper.id).await,
            None => None,
        };

        let text = match &pdf_path {
            Some(path) => extract_text(path).await,
            None => None,
        };

        paper.pdf_path = pdf_path.map(|p| p.display().to_string());
        paper.text = Some(text.unwrap_or_else(|| paper.abstract_text.clone()));
    }

    pub fn save_metadata(&self, papers: &[CrawledPaper]) -> Result<PathBuf> {
        let path = self.metadata_path();
        let json = serde_json::to_string_pretty(papers)?;
        std::fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;

        tracing::info!("[ArxivCrawler::save_metadata] Wrote {} papers to {}", papers.len(), path.display());
        Ok(path)
    }

    pub fn load_metadata(path: &Path) -> Result<Vec<CrawledPaper>> {
        let raw = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        let papers = serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(papers)
    }
}
