use std::str::FromStr;

use chrono::NaiveDate;
use paperhub_database::{OrderDirection, QueryCriteria, SqlxCrud, SqlxFilterQuery, SqlxSchema};
use serde::{Deserialize, Serialize};
use sqlx::{Error as SqlxError, PgPool};

use crate::Paper;

pub const MAX_PAGE_SIZE: i64 = 100;
const TOP_CATEGORIES: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaperSort {
    #[default]
    PublishedDate,
    CitationCnt,
    Title,
}

impl PaperSort {
    pub fn column(&self) -> &'static str {
        match self {
            PaperSort::PublishedDate => "published_date",
            PaperSort::CitationCnt => "citation_cnt",
            PaperSort::Title => "title",
        }
    }
}

impl FromStr for PaperSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "published_date" => Ok(PaperSort::PublishedDate),
            "citation_cnt" => Ok(PaperSort::CitationCnt),
            "title" => Ok(PaperSort::Title),
            other => Err(format!(
                "unknown sort_by '{}', expected published_date, citation_cnt or title",
                other
            )),
        }
    }
}

/// A validated listing request.
#[derive(Debug, Clone, PartialEq)]
pub struct PaperListQuery {
    pub skip: i64,
    pub limit: i64,
    pub category: Option<String>,
    pub sort_by: PaperSort,
    pub order: OrderDirection,
}

impl Default for PaperListQuery {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: 10,
            category: None,
            sort_by: PaperSort::default(),
            order: OrderDirection::Desc,
        }
    }
}

impl PaperListQuery {
    fn filter(&self) -> QueryCriteria {
        let criteria = QueryCriteria::new();
        match &self.category {
            Some(category) => criteria.add_valued_filter("primary_category", "=", category.clone()),
            None => criteria,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaperPage {
    pub total: i64,
    pub papers: Vec<Paper>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperStats {
    pub total_papers: i64,
    pub categories: Vec<CategoryCount>,
    pub latest_published: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Escapes `%`, `_` and `\` so user input matches literally inside a LIKE pattern.
pub fn escape_like_pattern(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl Paper {
    pub async fn list(query: &PaperListQuery, pool: &PgPool) -> Result<PaperPage, SqlxError> {
        let total = Self::count_by_criteria(query.filter(), pool).await?;

        let criteria = query
            .filter()
            .order_by(query.sort_by.column(), query.order)
            .order_by("id", query.order)
            .offset(query.skip)
            .limit(query.limit);
        let papers = Self::find_by_criteria(criteria, pool).await?;

        Ok(PaperPage { total, papers })
    }

    /// Case-insensitive substring match on title or abstract, newest first.
    pub async fn search(q: &str, skip: i64, limit: i64, pool: &PgPool) -> Result<PaperPage, SqlxError> {
        let pattern = format!("%{}%", escape_like_pattern(q));
        let filter = || {
            QueryCriteria::new().add_any_of_filter(&["title", "abstract_text"], "ILIKE", pattern.clone())
        };

        let total = Self::count_by_criteria(filter(), pool).await?;
        let criteria = filter()
            .order_by("published_date", OrderDirection::Desc)
            .order_by("id", OrderDirection::Desc)
            .offset(skip)
            .limit(limit);
        let papers = Self::find_by_criteria(criteria, pool).await?;

        Ok(PaperPage { total, papers })
    }

    pub async fn stats(pool: &PgPool) -> Result<PaperStats, SqlxError> {
        let total_papers = Self::count_by_criteria(QueryCriteria::new(), pool).await?;

        let categories_sql = format!(
            "SELECT \"primary_category\", COUNT(*) AS cnt FROM \"{}\" \
             WHERE \"primary_category\" IS NOT NULL \
             GROUP BY \"primary_category\" ORDER BY cnt DESC, \"primary_category\" ASC LIMIT $1",
            Self::TABLE_NAME
        );
        let categories = sqlx::query_as::<_, (String, i64)>(&categories_sql)
            .bind(TOP_CATEGORIES)
            .fetch_all(pool)
            .await?
            .into_iter()
            .map(|(category, count)| CategoryCount { category, count })
            .collect();

        let latest_sql = format!("SELECT MAX(\"published_date\") FROM \"{}\"", Self::TABLE_NAME);
        let latest_published = sqlx::query_scalar::<_, Option<NaiveDate>>(&latest_sql)
            .fetch_one(pool)
            .await?;

        Ok(PaperStats { total_papers, categories, latest_published })
    }

    pub async fn find_by_arxiv_id(arxiv_id: &str, pool: &PgPool) -> Result<Option<Paper>, SqlxError> {
        let criteria = QueryCriteria::new().add_valued_filter("arxiv_id", "=", arxiv_id.to_string());
        Self::find_one_by_criteria(criteria, pool).await
    }

    /// Inserts a new paper or refreshes the stored one with the same arXiv id.
    pub async fn upsert_by_arxiv_id(self, pool: &PgPool) -> Result<(Paper, UpsertOutcome), SqlxError> {
        match Self::find_by_arxiv_id(&self.arxiv_id, pool).await? {
            Some(mut existing) => {
                existing.merge_crawled(self);
                let updated = existing.update(pool).await?;
                Ok((updated, UpsertOutcome::Updated))
            }
            None => {
                let created = self.create(pool).await?;
                Ok((created, UpsertOutcome::Inserted))
            }
        }
    }

    /// Inserts the paper unless its arXiv id is already stored.
    pub async fn insert_if_absent(self, pool: &PgPool) -> Result<Option<Paper>, SqlxError> {
        if Self::find_by_arxiv_id(&self.arxiv_id, pool).await?.is_some() {
            return Ok(None);
        }
        self.create(pool).await.map(Some)
    }
}
