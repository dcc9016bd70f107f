use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    /// A pipeline precondition was not met (e.g. no bounding region set).
    #[error("Invalid pipeline state: {0}")]
    State(String),

    /// Malformed caller input: dates, property type codes, stored values.
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("POI provider error: {0}")]
    PoiProvider(String),

    /// No comparable transactions matched the query.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Model fitting failed: {0}")]
    Model(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Failures of an external collaborator (store or geospatial provider).
    /// The whole prediction call may be retried by the caller.
    pub fn is_data_source(&self) -> bool {
        matches!(self, AppError::Database(_) | AppError::PoiProvider(_))
    }
}

// Convert AppError into HTTP responses
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::State(ref e) => {
                tracing::error!("Pipeline state error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal pipeline error")
            }
            AppError::Parse(ref e) => (StatusCode::BAD_REQUEST, e.as_str()),
            AppError::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal database error")
            }
            AppError::PoiProvider(ref e) => {
                tracing::error!("POI provider error: {}", e);
                (StatusCode::BAD_GATEWAY, "Geospatial provider error")
            }
            AppError::InsufficientData(ref e) => {
                tracing::info!("Insufficient data: {}", e);
                (StatusCode::NOT_FOUND, e.as_str())
            }
            AppError::Model(ref e) => {
                tracing::warn!("Model fitting failed: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.as_str())
            }
            AppError::InvalidRequest(ref e) => (StatusCode::BAD_REQUEST, e.as_str()),
            AppError::Internal(ref e) => {
                tracing::error!("Internal error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = Json(json!({
            "error": status.canonical_reason().unwrap_or("Unknown error"),
            "message": error_message,
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_source_classification() {
        assert!(AppError::PoiProvider("down".to_string()).is_data_source());
        assert!(AppError::Database(sqlx::Error::PoolTimedOut).is_data_source());
        assert!(!AppError::InsufficientData("none".to_string()).is_data_source());
        assert!(!AppError::State("region".to_string()).is_data_source());
    }

    #[test]
    fn test_status_codes() {
        let resp = AppError::Parse("bad date".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = AppError::InsufficientData("empty".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = AppError::PoiProvider("timeout".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }
}
