use std::fmt;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Result};
use paperhub_catalog::{Paper, UpsertOutcome};
use paperhub_clients::{EmbederClient, PineconeClient, VectorRecord};
use paperhub_database::{prepare_table, OrderDirection, QueryCriteria, SqlxCrud, SqlxFilterQuery};
use serde_json::{json, Map, Value};
use sqlx::PgPool;

use crate::{ArxivCrawler, CrawlRequest, CrawledPaper};

const MIGRATION_BATCH_SIZE: i64 = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub saved: usize,
    pub updated: usize,
    pub skipped: usize,
}

impl fmt::Display for IngestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Saved: {}, Updated: {}, Skipped: {}", self.saved, self.updated, self.skipped)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub copied: usize,
    pub skipped: usize,
}

/// Inserts new papers and refreshes existing ones, matched by arXiv id.
/// A paper that cannot be stored is counted as skipped.
pub async fn persist_papers(pool: &PgPool, papers: &[CrawledPaper]) -> Result<IngestReport> {
    let mut report = IngestReport::default();

    for crawled in papers {
        let paper = match crawled.to_paper() {
            Ok(paper) => paper,
            Err(e) => {
                tracing::warn!("[persist_papers] Skipping {}: {:#}", crawled.id, e);
                report.skipped += 1;
                continue;
            }
        };

        match paper.upsert_by_arxiv_id(pool).await {
            Ok((_, UpsertOutcome::Inserted)) => report.saved += 1,
            Ok((_, UpsertOutcome::Updated)) => report.updated += 1,
            Err(e) => {
                tracing::error!("[persist_papers] Failed to store {}: {:?}", crawled.id, e);
                report.skipped += 1;
            }
        }
    }

    tracing::info!("[persist_papers] {}", report);
    Ok(report)
}

pub async fn crawl_to_db(crawler: &ArxivCrawler, pool: &PgPool, request: &CrawlRequest) -> Result<IngestReport> {
    let papers = crawler.crawl_and_save(request).await?;
    if papers.is_empty() {
        return Ok(IngestReport::default());
    }
    persist_papers(pool, &papers).await
}

/// One crawl per keyword, without PDFs, pausing between keywords.
/// A failing keyword is logged and the rest still run. Returns the number of new papers.
pub async fn crawl_keywords(
    crawler: &ArxivCrawler,
    pool: &PgPool,
    keywords: &[String],
    max_results_per_keyword: usize,
    pause: Duration,
) -> usize {
    let mut total_saved = 0;

    for (i, keyword) in keywords.iter().enumerate() {
        tracing::info!("[crawl_keywords] Keyword {}/{}: {}", i + 1, keywords.len(), keyword);

        let request = CrawlRequest {
            max_results: max_results_per_keyword,
            download_pdf: false,
            ..CrawlRequest::new(keyword.clone())
        };
        match crawl_to_db(crawler, pool, &request).await {
            Ok(report) => total_saved += report.saved,
            Err(e) => tracing::error!("[crawl_keywords] Failed to process keyword '{}': {:#}", keyword, e),
        }

        if i + 1 < keywords.len() && !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
    }

    tracing::info!("[crawl_keywords] Total papers saved: {}", total_saved);
    total_saved
}

/// Insert-only import of a metadata file. Known arXiv ids and unparseable dates are skipped.
pub async fn import_metadata(pool: &PgPool, path: &Path) -> Result<IngestReport> {
    if !path.exists() {
        bail!("metadata file {} does not exist", path.display());
    }
    let papers = ArxivCrawler::load_metadata(path)?;
    let mut report = IngestReport::default();

    for crawled in &papers {
        let paper = match crawled.to_paper() {
            Ok(paper) => paper,
            Err(e) => {
                tracing::warn!("[import_metadata] Skipping {}: {:#}", crawled.id, e);
                report.skipped += 1;
                continue;
            }
        };

        match paper.insert_if_absent(pool).await? {
            Some(_) => report.saved += 1,
            None => report.skipped += 1,
        }
    }

    tracing::info!("[import_metadata] {} from {}", report, path.display());
    Ok(report)
}

pub fn vector_metadata(paper: &Paper) -> Map<String, Value> {
    let mut metadata = Map::new();
    metadata.insert("title".to_string(), json!(paper.title));
    metadata.insert("arxiv_id".to_string(), json!(paper.arxiv_id));
    metadata.insert("primary_category".to_string(), json!(paper.primary_category.clone().unwrap_or_default()));
    metadata
}

/// Embeds every stored paper and writes it to the vector index, keyed by arXiv id.
pub async fn index_papers(
    pool: &PgPool,
    embeder: &EmbederClient,
    pinecone: &PineconeClient,
    batch_size: usize,
) -> Result<usize> {
    if batch_size == 0 {
        bail!("batch size must be at least 1");
    }

    let mut offset = 0i64;
    let mut indexed = 0usize;

    loop {
        let criteria = QueryCriteria::new()
            .order_by("id", OrderDirection::Asc)
            .offset(offset)
            .limit(batch_size as i64);
        let papers = Paper::find_by_criteria(criteria, pool).await?;
        if papers.is_empty() {
            break;
        }
        offset += papers.len() as i64;

        let texts = papers.iter().map(Paper::embedding_text).collect::<Vec<_>>();
        let embeddings = embeder.embed(texts).await?;

        let records = papers
            .iter()
            .zip(embeddings)
            .map(|(paper, values)| VectorRecord {
                id: paper.arxiv_id.clone(),
                values,
                metadata: vector_metadata(paper),
            })
            .collect::<Vec<_>>();

        indexed += pinecone.upsert(records).await?;
        tracing::info!("[index_papers] Indexed {} papers so far", indexed);
    }

    Ok(indexed)
}

/// Copies papers from `source` into `target`, skipping arXiv ids the target already has.
/// Each batch of 100 rows is committed separately.
pub async fn migrate_papers(source: &PgPool, target: &PgPool) -> Result<MigrationReport> {
    prepare_table::<Paper>(target, false, true).await?;

    let mut report = MigrationReport::default();
    let mut offset = 0i64;

    loop {
        let criteria = QueryCriteria::new()
            .order_by("id", OrderDirection::Asc)
            .offset(offset)
            .limit(MIGRATION_BATCH_SIZE);
        let batch = Paper::find_by_criteria(criteria, source).await?;
        if batch.is_empty() {
            break;
        }
        offset += batch.len() as i64;

        let mut tx = target.begin().await?;
        for paper in batch {
            let exists = QueryCriteria::new().add_valued_filter("arxiv_id", "=", paper.arxiv_id.clone());
            if Paper::find_one_by_criteria(exists, &mut *tx).await?.is_some() {
                report.skipped += 1;
                continue;
            }
            paper.create(&mut *tx).await?;
            report.copied += 1;
        }
        tx.commit().await?;

        tracing::info!("[migrate_papers] Copied {} papers, skipped {}", report.copied, report.skipped);
    }

    Ok(report)
}
