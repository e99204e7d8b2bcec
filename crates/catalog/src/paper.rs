use anyhow::{bail, Result};
use chrono::NaiveDate;
use paperhub_database::SqlxObject;
use serde::{Deserialize, Serialize};

/// One catalogued arXiv paper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, SqlxObject)]
#[table_name = "paper_info"]
pub struct Paper {
    #[serde(default)]
    pub id: i64,

    #[serde(default)]
    pub paper_id: Option<i64>,

    #[unique]
    pub arxiv_id: String,

    pub title: String,
    pub authors: Vec<String>,

    #[serde(rename = "abstract")]
    pub abstract_text: String,

    pub published_date: NaiveDate,
    #[serde(default)]
    pub updated_date: Option<NaiveDate>,

    pub categories: Vec<String>,

    #[indexed]
    #[serde(default)]
    pub primary_category: Option<String>,

    #[serde(default)]
    pub pdf_url: Option<String>,
    #[serde(default)]
    pub pdf_path: Option<String>,
    #[serde(default)]
    pub citation_cnt: Option<i64>,
}

impl Paper {
    /// Text handed to the embedding model when the paper is indexed.
    pub fn embedding_text(&self) -> String {
        format!("{}\n\n{}", self.title.trim(), self.abstract_text.trim())
    }

    /// Copies freshly crawled fields over a stored record, keeping what the crawl cannot know.
    pub fn merge_crawled(&mut self, crawled: Paper) {
        self.title = crawled.title;
        self.authors = crawled.authors;
        self.abstract_text = crawled.abstract_text;
        self.published_date = crawled.published_date;
        self.updated_date = crawled.updated_date;
        self.categories = crawled.categories;
        self.primary_category = crawled.primary_category;
        self.pdf_url = crawled.pdf_url;
        if crawled.pdf_path.is_some() {
            self.pdf_path = crawled.pdf_path;
        }
        if crawled.citation_cnt.is_some() {
            self.citation_cnt = crawled.citation_cnt;
        }
        if crawled.paper_id.is_some() {
            self.paper_id = crawled.paper_id;
        }
    }
}

/// Client-supplied paper fields, used to create or replace a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperDraft {
    #[serde(default)]
    pub paper_id: Option<i64>,
    pub arxiv_id: String,
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(rename = "abstract", default)]
    pub abstract_text: String,
    pub published_date: NaiveDate,
    #[serde(default)]
    pub updated_date: Option<NaiveDate>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub primary_category: Option<String>,
    #[serde(default)]
    pub pdf_url: Option<String>,
    #[serde(default)]
    pub pdf_path: Option<String>,
    #[serde(default)]
    pub citation_cnt: Option<i64>,
}

impl PaperDraft {
    pub fn validate(&self) -> Result<()> {
        if self.arxiv_id.trim().is_empty() {
            bail!("arxiv_id must not be empty");
        }
        if self.title.trim().is_empty() {
            bail!("title must not be empty");
        }
        if matches!(self.citation_cnt, Some(c) if c < 0) {
            bail!("citation_cnt must not be negative");
        }
        Ok(())
    }

    /// A new record; the id is assigned by the database on insert.
    pub fn into_paper(self) -> Paper {
        let primary_category = self
            .primary_category
            .or_else(|| self.categories.first().cloned());

        Paper {
            id: 0,
            paper_id: self.paper_id,
            arxiv_id: self.arxiv_id.trim().to_string(),
            title: self.title,
            authors: self.authors,
            abstract_text: self.abstract_text,
            published_date: self.published_date,
            updated_date: self.updated_date,
            categories: self.categories,
            primary_category,
            pdf_url: self.pdf_url,
            pdf_path: self.pdf_path,
            citation_cnt: self.citation_cnt,
        }
    }

    /// Replaces every mutable field of `paper`, keeping its id.
    pub fn apply_to(self, paper: &mut Paper) {
        let id = paper.id;
        *paper = self.into_paper();
        paper.id = id;
    }
}
