use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Body message returned when a client exceeds its request quota
pub const TOO_MANY_REQUESTS_MESSAGE: &str = "Too many requests";

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    /// Admission denied by the rate limiter
    #[error("Too many requests")]
    TooManyRequests,

    /// The shared store connection could not be established
    #[error("Connection unavailable: {0}")]
    ConnectionUnavailable(String),

    /// Malformed TTL, cache key or request input
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The fallback picker or the recommendation source failed
    #[error("Upstream failure: {0}")]
    UpstreamFailure(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether a retry of the same operation could plausibly succeed
    pub fn is_transient(&self) -> bool {
        !matches!(
            self,
            AppError::NotFound(_)
                | AppError::InvalidArgument(_)
                | AppError::Serialization(_)
                | AppError::TooManyRequests
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::TooManyRequests => (
                StatusCode::TOO_MANY_REQUESTS,
                TOO_MANY_REQUESTS_MESSAGE.to_string(),
            ),
            AppError::ConnectionUnavailable(_) => {
                tracing::error!(error = %self, "Shared store connection unavailable");
                (StatusCode::SERVICE_UNAVAILABLE, self.to_string())
            }
            AppError::InvalidArgument(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::UpstreamFailure(_) | AppError::HttpClient(_) => {
                tracing::warn!(error = %self, "Upstream dependency failed");
                (StatusCode::BAD_GATEWAY, self.to_string())
            }
            AppError::Database(_)
            | AppError::Cache(_)
            | AppError::Serialization(_)
            | AppError::Internal(_) => {
                tracing::error!(error = %self, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    async fn response_body(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_too_many_requests_has_fixed_body() {
        let response = AppError::TooManyRequests.into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response_body(response).await,
            json!({ "error": "Too many requests" })
        );
    }

    #[tokio::test]
    async fn test_connection_unavailable_is_server_error() {
        let response = AppError::ConnectionUnavailable("refused".to_string()).into_response();
        assert!(response.status().is_server_error());
    }

    #[tokio::test]
    async fn test_invalid_argument_returns_400_with_message() {
        let response = AppError::InvalidArgument("ttl must be positive".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response_body(response).await,
            json!({ "error": "ttl must be positive" })
        );
    }

    #[tokio::test]
    async fn test_upstream_failure_returns_bad_gateway() {
        let response = AppError::UpstreamFailure("jikan down".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_transient_classification() {
        assert!(AppError::UpstreamFailure("timeout".to_string()).is_transient());
        assert!(AppError::ConnectionUnavailable("refused".to_string()).is_transient());
        assert!(!AppError::NotFound("profile".to_string()).is_transient());
        assert!(!AppError::InvalidArgument("ttl".to_string()).is_transient());
    }
}
