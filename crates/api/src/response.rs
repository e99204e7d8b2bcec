use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use paperhub_recommender::RecommendError;
use serde::{Deserialize, Serialize};
use serde_json::json;

pub type AppSuccess = GenericResponse;

/// `{status, message, data}` envelope shared by every JSON response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenericResponse {
    pub status: u16,
    pub message: String,
    pub data: serde_json::Value,
}

impl GenericResponse {
    pub fn new(status: StatusCode, message: &str, data: serde_json::Value) -> Self {
        Self {
            status: status.as_u16(),
            message: message.to_string(),
            data,
        }
    }
}

impl IntoResponse for GenericResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::OK);
        (status, Json::from(self)).into_response()
    }
}

#[derive(Debug)]
pub struct AppError(pub StatusCode, pub anyhow::Error);

impl AppError {
    pub fn new(status: StatusCode, err: anyhow::Error) -> Self {
        Self(status, err)
    }

    pub fn bad_request(message: impl std::fmt::Display) -> Self {
        Self(StatusCode::BAD_REQUEST, anyhow::anyhow!("{}", message))
    }

    pub fn not_found(message: impl std::fmt::Display) -> Self {
        Self(StatusCode::NOT_FOUND, anyhow::anyhow!("{}", message))
    }

    pub fn conflict(message: impl std::fmt::Display) -> Self {
        Self(StatusCode::CONFLICT, anyhow::anyhow!("{}", message))
    }

    /// Database failures. Unique violations surface as 409.
    pub fn database(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return Self(StatusCode::CONFLICT, err.into());
            }
        }
        Self(StatusCode::INTERNAL_SERVER_ERROR, err.into())
    }

    pub fn recommend(err: RecommendError) -> Self {
        let status = match &err {
            RecommendError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            RecommendError::NotFound(_) => StatusCode::NOT_FOUND,
            RecommendError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
        };
        Self(status, err.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!("CODE: {}, MESSAGE: {:#}", self.0.as_u16(), self.1);
        GenericResponse::new(self.0, &format!("{:#}", self.1), json!({})).into_response()
    }
}

// Lets handlers use `?` on anything convertible into `anyhow::Error`; such errors are client errors.
impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(StatusCode::BAD_REQUEST, err.into())
    }
}
