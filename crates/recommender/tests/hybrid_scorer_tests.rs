use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Map;

use paperhub_recommender::{
    dot, Embedding, EmbeddingModel, HybridRequest, HybridScorer, ItemId, RecommendError, ScoredMatch,
    VectorIndex, HIGHLIGHTS_WEIGHT, KEYWORDS_WEIGHT, SEEN_ITEMS_WEIGHT,
};

#[derive(Default)]
struct FakeIndex {
    stored: HashMap<ItemId, Embedding>,
    /// Returned by `query` (truncated to the requested size).
    ranking: Vec<ItemId>,
    fail: bool,
    fetch_calls: AtomicUsize,
    query_calls: AtomicUsize,
    last_query: Mutex<Option<(Embedding, usize)>>,
}

impl FakeIndex {
    fn with_vectors(vectors: &[(&str, Embedding)]) -> Self {
        Self {
            stored: vectors.iter().map(|(id, v)| (id.to_string(), v.clone())).collect(),
            ..Default::default()
        }
    }

    fn ranking(mut self, ids: &[&str]) -> Self {
        self.ranking = ids.iter().map(|id| id.to_string()).collect();
        self
    }

    fn last_query(&self) -> (Embedding, usize) {
        self.last_query.lock().unwrap().clone().expect("query was not called")
    }

    fn calls(&self) -> (usize, usize) {
        (self.fetch_calls.load(Ordering::SeqCst), self.query_calls.load(Ordering::SeqCst))
    }
}

#[async_trait]
impl VectorIndex for FakeIndex {
    async fn fetch(&self, ids: &[ItemId]) -> Result<HashMap<ItemId, Embedding>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(anyhow!("index is down"));
        }
        Ok(ids
            .iter()
            .filter_map(|id| self.stored.get(id).map(|v| (id.clone(), v.clone())))
            .collect())
    }

    async fn query(&self, vector: &[f32], top_k: usize, _include_metadata: bool) -> Result<Vec<ScoredMatch>> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(anyhow!("index is down"));
        }
        *self.last_query.lock().unwrap() = Some((vector.to_vec(), top_k));

        Ok(self
            .ranking
            .iter()
            .take(top_k)
            .enumerate()
            .map(|(rank, id)| ScoredMatch {
                id: id.clone(),
                score: 1.0 - rank as f32 * 0.01,
                metadata: Map::new(),
            })
            .collect())
    }
}

#[derive(Default)]
struct FakeModel {
    texts: HashMap<String, Embedding>,
    embed_calls: AtomicUsize,
    seen_texts: Mutex<Vec<String>>,
}

impl FakeModel {
    fn with_texts(texts: &[(&str, Embedding)]) -> Self {
        Self {
            texts: texts.iter().map(|(t, v)| (t.to_string(), v.clone())).collect(),
            ..Default::default()
        }
    }

    fn calls(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingModel for FakeModel {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        self.seen_texts.lock().unwrap().push(text.to_string());
        self.texts
            .get(text)
            .cloned()
            .ok_or_else(|| anyhow!("no embedding for {:?}", text))
    }
}

fn build_scorer(index: FakeIndex, model: FakeModel) -> (HybridScorer<FakeIndex, FakeModel>, Arc<FakeIndex>, Arc<FakeModel>) {
    let index = Arc::new(index);
    let model = Arc::new(model);
    (HybridScorer::new(index.clone(), model.clone()), index, model)
}

fn ids(matches: &[ScoredMatch]) -> Vec<&str> {
    matches.iter().map(|m| m.id.as_str()).collect()
}

#[tokio::test]
async fn test_all_sources_empty_is_rejected_without_calls() {
    let (scorer, index, model) = build_scorer(FakeIndex::default(), FakeModel::default());

    let err = scorer.recommend(&HybridRequest::new(10)).await.unwrap_err();
    assert!(matches!(err, RecommendError::InvalidInput(_)));
    assert_eq!(index.calls(), (0, 0));
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_zero_top_k_is_rejected_without_calls() {
    let (scorer, index, model) = build_scorer(FakeIndex::default(), FakeModel::default());

    let request = HybridRequest::new(0).with_keywords(["transformers"]);
    let err = scorer.recommend(&request).await.unwrap_err();
    assert!(matches!(err, RecommendError::InvalidInput(_)));

    let err = scorer.recommend_by_item("A", 0).await.unwrap_err();
    assert!(matches!(err, RecommendError::InvalidInput(_)));

    assert_eq!(index.calls(), (0, 0));
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_highlights_only_equals_single_source_query() -> Result<()> {
    let h = vec![0.6, 0.8, 0.0];
    let index = FakeIndex::default().ranking(&["X", "Y", "Z"]);
    let model = FakeModel::with_texts(&[("graph neural networks attention", h.clone())]);
    let (scorer, index, model) = build_scorer(index, model);

    let highlights = vec!["graph neural networks".to_string(), "attention".to_string()];
    let results = scorer.recommend_by_highlights(&highlights, 2).await?;

    assert_eq!(ids(&results), vec!["X", "Y"]);
    assert_eq!(index.last_query(), (h, 2));
    assert_eq!(index.calls(), (0, 1));
    assert_eq!(model.calls(), 1);
    assert_eq!(
        *model.seen_texts.lock().unwrap(),
        vec!["graph neural networks attention".to_string()]
    );
    Ok(())
}

#[tokio::test]
async fn test_keywords_are_joined_with_commas() -> Result<()> {
    let k = vec![1.0, 0.0];
    let index = FakeIndex::default().ranking(&["P"]);
    let model = FakeModel::with_texts(&[("diffusion, video", k.clone())]);
    let (scorer, index, _model) = build_scorer(index, model);

    let results = scorer
        .recommend_by_keywords(&["diffusion".to_string(), "video".to_string()], 3)
        .await?;

    assert_eq!(ids(&results), vec!["P"]);
    assert_eq!(index.last_query(), (k, 3));
    Ok(())
}

#[tokio::test]
async fn test_missing_seen_ids_are_skipped() -> Result<()> {
    let a = vec![0.5, -0.25, 1.0];
    let index = FakeIndex::with_vectors(&[("A", a.clone())]).ranking(&["A", "B", "C", "D"]);
    let (scorer, index, model) = build_scorer(index, FakeModel::default());

    let seen = vec!["A".to_string(), "B".to_string()];
    let results = scorer.recommend_by_history(&seen, 2).await?;

    let (query_vector, fetch_k) = index.last_query();
    assert_eq!(query_vector, a);
    assert_eq!(fetch_k, 4);
    assert_eq!(ids(&results), vec!["C", "D"]);
    assert_eq!(index.calls(), (1, 1));
    assert_eq!(model.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn test_seen_items_are_averaged() -> Result<()> {
    let index = FakeIndex::with_vectors(&[("A", vec![1.0, 0.0]), ("B", vec![0.0, 1.0])]).ranking(&["C"]);
    let (scorer, index, _model) = build_scorer(index, FakeModel::default());

    scorer
        .recommend_by_history(&["A".to_string(), "B".to_string()], 1)
        .await?;

    assert_eq!(index.last_query().0, vec![0.5, 0.5]);
    Ok(())
}

#[tokio::test]
async fn test_every_signal_dropped_is_invalid_input() {
    let index = FakeIndex::default().ranking(&["A"]);
    let (scorer, index, _model) = build_scorer(index, FakeModel::default());

    let err = scorer
        .recommend_by_history(&["missing".to_string()], 5)
        .await
        .unwrap_err();

    assert!(matches!(err, RecommendError::InvalidInput(_)));
    assert_eq!(index.calls(), (1, 0));
}

#[tokio::test]
async fn test_over_fetch_and_seen_filtering() -> Result<()> {
    let index = FakeIndex::with_vectors(&[("S1", vec![1.0, 0.0]), ("S2", vec![0.0, 1.0])])
        .ranking(&["S1", "R1", "S2", "R2", "R3", "R4", "R5", "R6", "R7"]);
    let model = FakeModel::with_texts(&[("rust", vec![1.0, 1.0])]);
    let (scorer, index, model) = build_scorer(index, model);

    let request = HybridRequest::new(5)
        .with_seen_ids(["S1", "S2"])
        .with_keywords(["rust"]);
    let results = scorer.recommend(&request).await?;

    assert_eq!(index.last_query().1, 7);
    assert!(results.len() <= 5);
    assert_eq!(ids(&results), vec!["R1", "R2", "R3", "R4", "R5"]);
    assert!(results.iter().all(|m| m.id != "S1" && m.id != "S2"));
    assert_eq!(index.calls(), (1, 1));
    assert_eq!(model.calls(), 1);
    Ok(())
}

#[tokio::test]
async fn test_huge_top_k_saturates_fetch_size() -> Result<()> {
    let index = FakeIndex::with_vectors(&[("S1", vec![1.0, 0.0])]).ranking(&["S1", "R1", "R2"]);
    let (scorer, index, _model) = build_scorer(index, FakeModel::default());

    let results = scorer
        .recommend(&HybridRequest::new(usize::MAX).with_seen_ids(["S1"]))
        .await?;

    assert_eq!(index.last_query().1, usize::MAX);
    assert_eq!(ids(&results), vec!["R1", "R2"]);
    Ok(())
}

#[tokio::test]
async fn test_duplicate_seen_ids_count_once() -> Result<()> {
    let index = FakeIndex::with_vectors(&[("S1", vec![1.0])]).ranking(&["S1", "R1"]);
    let (scorer, index, _model) = build_scorer(index, FakeModel::default());

    scorer
        .recommend_by_history(&["S1".to_string(), "S1".to_string()], 3)
        .await?;

    assert_eq!(index.last_query().1, 4);
    Ok(())
}

#[tokio::test]
async fn test_repeated_calls_are_idempotent() -> Result<()> {
    let index = FakeIndex::with_vectors(&[("A", vec![0.2, 0.4, 0.4])]).ranking(&["A", "B", "C", "D"]);
    let model = FakeModel::with_texts(&[("llm", vec![0.0, 1.0, 0.0]), ("agents plan", vec![1.0, 0.0, 0.0])]);
    let (scorer, _index, _model) = build_scorer(index, model);

    let request = HybridRequest::new(3)
        .with_seen_ids(["A"])
        .with_keywords(["llm"])
        .with_highlights(["agents", "plan"]);

    let first = scorer.recommend(&request).await?;
    let second = scorer.recommend(&request).await?;
    assert_eq!(first, second);
    assert_eq!(ids(&first), vec!["B", "C", "D"]);
    Ok(())
}

#[tokio::test]
async fn test_highlights_dominate_keywords() -> Result<()> {
    let e_seen = vec![1.0, 0.0, 0.0];
    let e_keywords = vec![0.0, 1.0, 0.0];
    let e_highlights = vec![0.0, 0.0, 1.0];

    let index = FakeIndex::with_vectors(&[("A", e_seen.clone())]).ranking(&["B"]);
    let model = FakeModel::with_texts(&[("kw", e_keywords.clone()), ("hl", e_highlights.clone())]);
    let (scorer, index, _model) = build_scorer(index, model);

    let request = HybridRequest::new(1)
        .with_seen_ids(["A"])
        .with_keywords(["kw"])
        .with_highlights(["hl"]);
    scorer.recommend(&request).await?;

    let q = index.last_query().0;
    let toward_highlights = dot(&q, &e_highlights);
    let toward_keywords = dot(&q, &e_keywords);
    let toward_seen = dot(&q, &e_seen);
    assert!(toward_highlights > toward_seen);
    assert!(toward_seen > toward_keywords);
    assert!((toward_highlights + toward_seen + toward_keywords - 1.0).abs() < 1e-6);

    let total = SEEN_ITEMS_WEIGHT + KEYWORDS_WEIGHT + HIGHLIGHTS_WEIGHT;
    assert!((toward_highlights - HIGHLIGHTS_WEIGHT / total).abs() < 1e-6);
    assert!((toward_keywords - KEYWORDS_WEIGHT / total).abs() < 1e-6);
    Ok(())
}

#[tokio::test]
async fn test_recommend_by_item_excludes_itself() -> Result<()> {
    let index = FakeIndex::with_vectors(&[("A", vec![0.3, 0.7])]).ranking(&["A", "B", "C", "D"]);
    let (scorer, index, _model) = build_scorer(index, FakeModel::default());

    let results = scorer.recommend_by_item("A", 2).await?;

    assert_eq!(ids(&results), vec!["B", "C"]);
    assert_eq!(index.last_query(), (vec![0.3, 0.7], 3));
    Ok(())
}

#[tokio::test]
async fn test_recommend_by_item_not_found() {
    let (scorer, index, _model) = build_scorer(FakeIndex::default(), FakeModel::default());

    let err = scorer.recommend_by_item("2510.05069v1", 5).await.unwrap_err();
    match err {
        RecommendError::NotFound(id) => assert_eq!(id, "2510.05069v1"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(index.calls(), (1, 0));
}

#[tokio::test]
async fn test_dimension_mismatch_is_invalid_input() {
    let index = FakeIndex::with_vectors(&[("A", vec![1.0, 0.0, 0.0])]).ranking(&["B"]);
    let model = FakeModel::with_texts(&[("short", vec![1.0, 0.0])]);
    let (scorer, index, _model) = build_scorer(index, model);

    let request = HybridRequest::new(1).with_seen_ids(["A"]).with_keywords(["short"]);
    let err = scorer.recommend(&request).await.unwrap_err();

    assert!(matches!(err, RecommendError::InvalidInput(_)));
    assert_eq!(index.calls(), (1, 0));
}

#[tokio::test]
async fn test_upstream_failures_are_not_retried() {
    let index = FakeIndex { fail: true, ..Default::default() };
    let (scorer, index, _model) = build_scorer(index, FakeModel::default());

    let err = scorer
        .recommend_by_history(&["A".to_string()], 3)
        .await
        .unwrap_err();
    assert!(matches!(err, RecommendError::UpstreamUnavailable(_)));
    assert_eq!(index.calls(), (1, 0));

    let (scorer, _index, model) = build_scorer(FakeIndex::default(), FakeModel::default());
    let err = scorer
        .recommend_by_keywords(&["unknown".to_string()], 3)
        .await
        .unwrap_err();
    assert!(matches!(err, RecommendError::UpstreamUnavailable(_)));
    assert_eq!(model.calls(), 1);
}
