use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use feed_rs::model::Entry;
use feed_rs::parser;
use paperhub_catalog::Paper;
use reqwest::Url;
use serde::{Deserialize, Serialize};

pub const ARXIV_API_URL: &str = "http://export.arxiv.org/api/query";
const ARXIV_TIMEOUT_SECS: u64 = 60;
const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArxivSort {
    #[default]
    Relevance,
    Submitted,
    Updated,
}

impl ArxivSort {
    pub fn api_value(&self) -> &'static str {
        match self {
            ArxivSort::Relevance => "relevance",
            ArxivSort::Submitted => "submittedDate",
            ArxivSort::Updated => "lastUpdatedDate",
        }
    }
}

impl FromStr for ArxivSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "relevance" => Ok(ArxivSort::Relevance),
            "submitted" => Ok(ArxivSort::Submitted),
            "updated" => Ok(ArxivSort::Updated),
            other => Err(format!("unknown sort '{}', expected relevance, submitted or updated", other)),
        }
    }
}

/// One search hit, in the shape written to `papers_metadata.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawledPaper {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(rename = "abstract", default)]
    pub abstract_text: String,
    #[serde(default)]
    pub published: String,
    #[serde(default)]
    pub updated: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub pdf_url: Option<String>,
    #[serde(default)]
    pub primary_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl CrawledPaper {
    /// Catalogue record for this hit. Fails when the published date is missing or malformed;
    /// a bad updated date falls back to the published one.
    pub fn to_paper(&self) -> Result<Paper> {
        let published_date = NaiveDate::parse_from_str(&self.published, DATE_FORMAT)
            .with_context(|| format!("paper {} has an invalid published date '{}'", self.id, self.published))?;
        let updated_date = NaiveDate::parse_from_str(&self.updated, DATE_FORMAT).unwrap_or(published_date);

        Ok(Paper {
            id: 0,
            paper_id: None,
            arxiv_id: self.id.clone(),
            title: self.title.clone(),
            authors: self.authors.clone(),
            abstract_text: self.abstract_text.clone(),
            published_date,
            updated_date: Some(updated_date),
            categories: self.categories.clone(),
            primary_category: self.primary_category.clone(),
            pdf_url: self.pdf_url.clone(),
            pdf_path: self.pdf_path.clone(),
            citation_cnt: None,
        })
    }
}

/// `cat:{category} AND {query}` when a category filter is given.
pub fn build_search_query(query: &str, category: Option<&str>) -> String {
    match category.map(str::trim).filter(|c| !c.is_empty()) {
        Some(category) => format!("cat:{} AND {}", category, query),
        None => query.to_string(),
    }
}

pub fn arxiv_id_from_entry_id(entry_id: &str) -> String {
    entry_id
        .trim()
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn pdf_link(entry: &Entry) -> Option<String> {
    let link = entry.links.iter().find(|link| {
        link.media_type.as_deref() == Some("application/pdf") || link.title.as_deref() == Some("pdf")
    });

    match link {
        Some(link) => Some(link.href.clone()),
        None if entry.id.contains("/abs/") => Some(entry.id.replacen("/abs/", "/pdf/", 1)),
        None => None,
    }
}

fn entry_to_paper(entry: &Entry) -> CrawledPaper {
    let published = entry
        .published
        .or(entry.updated)
        .map(|dt| dt.date_naive().format(DATE_FORMAT).to_string())
        .unwrap_or_default();
    let updated = entry
        .updated
        .map(|dt| dt.date_naive().format(DATE_FORMAT).to_string())
        .unwrap_or_else(|| published.clone());
    let categories: Vec<String> = entry.categories.iter().map(|c| c.term.clone()).collect();

    CrawledPaper {
        id: arxiv_id_from_entry_id(&entry.id),
        title: entry.title.as_ref().map(|t| collapse_whitespace(&t.content)).unwrap_or_default(),
        authors: entry.authors.iter().map(|a| a.name.trim().to_string()).collect(),
        abstract_text: entry.summary.as_ref().map(|s| s.content.trim().to_string()).unwrap_or_default(),
        published,
        updated,
        primary_category: categories.first().cloned(),
        categories,
        pdf_url: pdf_link(entry),
        pdf_path: None,
        text: None,
    }
}

/// Parses an arXiv Atom response body.
pub fn parse_feed(body: &[u8]) -> Result<Vec<CrawledPaper>> {
    let feed = parser::parse(body).map_err(|e| anyhow!("failed to parse arXiv Atom feed: {}", e))?;
    Ok(feed.entries.iter().map(entry_to_paper).collect())
}

#[derive(Clone)]
pub struct ArxivClient {
    http: reqwest::Client,
    base_url: String,
}

impl ArxivClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(ARXIV_API_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(ARXIV_TIMEOUT_SECS))
            .user_agent(concat!("paperhub-crawler/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, base_url: base_url.to_string() })
    }

    pub fn search_url(&self, search_query: &str, max_results: usize, sort: ArxivSort) -> Result<Url> {
        let url = Url::parse_with_params(
            &self.base_url,
            &[
                ("search_query", search_query.to_string()),
                ("start", "0".to_string()),
                ("max_results", max_results.to_string()),
                ("sortBy", sort.api_value().to_string()),
                ("sortOrder", "descending".to_string()),
            ],
        )?;
        Ok(url)
    }

    pub async fn search(
        &self,
        query: &str,
        max_results: usize,
        category: Option<&str>,
        sort: ArxivSort,
    ) -> Result<Vec<CrawledPaper>> {
        let search_query = build_search_query(query, category);
        let url = self.search_url(&search_query, max_results, sort)?;
        tracing::info!("[ArxivClient::search] Searching arXiv for '{}' (max {})", search_query, max_results);

        let body = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        let papers = parse_feed(&body)?;
        tracing::info!("[ArxivClient::search] Found {} papers", papers.len());
        Ok(papers)
    }
}
