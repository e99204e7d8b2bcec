use anyhow::anyhow;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use paperhub_api::{AppError, AppSuccess, ListPapersParams, SearchPapersParams};
use paperhub_catalog::PaperSort;
use paperhub_database::OrderDirection;
use paperhub_recommender::RecommendError;
use serde_json::{json, Value};

fn list_params(limit: Option<i64>, skip: Option<i64>) -> ListPapersParams {
    ListPapersParams { limit, skip, ..Default::default() }
}

#[test]
fn test_list_defaults() {
    let query = ListPapersParams::default().validate().unwrap();
    assert_eq!(query.skip, 0);
    assert_eq!(query.limit, 10);
    assert_eq!(query.category, None);
    assert_eq!(query.sort_by, PaperSort::PublishedDate);
    assert_eq!(query.order, OrderDirection::Desc);
}

#[test]
fn test_list_limit_bounds() {
    for limit in [0, -5, 101] {
        let err = list_params(Some(limit), None).validate().unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST, "limit {}", limit);
    }
    assert_eq!(list_params(Some(1), None).validate().unwrap().limit, 1);
    assert_eq!(list_params(Some(100), None).validate().unwrap().limit, 100);

    let err = list_params(None, Some(-1)).validate().unwrap_err();
    assert_eq!(err.0, StatusCode::BAD_REQUEST);
}

#[test]
fn test_list_sort_and_order() {
    let query = ListPapersParams {
        sort_by: Some("citation_cnt".to_string()),
        order: Some("asc".to_string()),
        category: Some("cs.LG".to_string()),
        ..Default::default()
    }
    .validate()
    .unwrap();
    assert_eq!(query.sort_by, PaperSort::CitationCnt);
    assert_eq!(query.order, OrderDirection::Asc);
    assert_eq!(query.category.as_deref(), Some("cs.LG"));

    let bad_sort = ListPapersParams { sort_by: Some("authors".to_string()), ..Default::default() };
    assert_eq!(bad_sort.validate().unwrap_err().0, StatusCode::BAD_REQUEST);

    let bad_order = ListPapersParams { order: Some("up".to_string()), ..Default::default() };
    assert_eq!(bad_order.validate().unwrap_err().0, StatusCode::BAD_REQUEST);
}

#[test]
fn test_search_requires_query() {
    assert_eq!(SearchPapersParams::default().validate().unwrap_err().0, StatusCode::BAD_REQUEST);

    let empty = SearchPapersParams { q: Some(String::new()), ..Default::default() };
    assert_eq!(empty.validate().unwrap_err().0, StatusCode::BAD_REQUEST);

    let blank = SearchPapersParams { q: Some("   ".to_string()), ..Default::default() };
    assert_eq!(blank.validate().unwrap(), ("   ".to_string(), 0, 10));

    let too_many = SearchPapersParams { q: Some("graph".to_string()), limit: Some(500), ..Default::default() };
    assert_eq!(too_many.validate().unwrap_err().0, StatusCode::BAD_REQUEST);

    let ok = SearchPapersParams { q: Some("graph".to_string()), skip: Some(20), limit: None };
    assert_eq!(ok.validate().unwrap(), ("graph".to_string(), 20, 10));
}

#[test]
fn test_recommend_error_status_mapping() {
    let cases = [
        (RecommendError::InvalidInput("top_k must be at least 1".into()), StatusCode::BAD_REQUEST),
        (RecommendError::NotFound("2510.05069v1".into()), StatusCode::NOT_FOUND),
        (RecommendError::UpstreamUnavailable(anyhow!("index is down")), StatusCode::BAD_GATEWAY),
    ];

    for (err, status) in cases {
        assert_eq!(AppError::recommend(err).0, status);
    }
}

#[test]
fn test_database_errors_are_internal() {
    assert_eq!(AppError::database(sqlx::Error::RowNotFound).0, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(AppError::database(sqlx::Error::PoolTimedOut).0, StatusCode::INTERNAL_SERVER_ERROR);
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_error_envelope() {
    let response = AppError::not_found("Paper not found").into_response();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_json(response).await,
        json!({ "status": 404, "message": "Paper not found", "data": {} })
    );
}

#[tokio::test]
async fn test_success_envelope() {
    let response = AppSuccess::new(StatusCode::CREATED, "Paper created successfully", json!({ "id": 1 }))
        .into_response();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(
        body_json(response).await,
        json!({ "status": 201, "message": "Paper created successfully", "data": { "id": 1 } })
    );
}
