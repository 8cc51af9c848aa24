//! API error type and response mapping.
//!
//! Every failure reaches the client as `{"success": false, "message": ...}`
//! with the status carrying the code. A fixed set of recognized lower-level
//! faults (duplicate key, malformed identifier, bad or expired token) is
//! rewritten to 400 with a specific message; anything else unexpected
//! collapses to a generic 500 and the detail is only logged.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::auth::sessions::SessionStoreError;
use crate::auth::tokens::TokenError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    /// A collaborator (mail, image store) failed; surfaced verbatim.
    #[error("{0}")]
    Dependency(String),
    #[error("database error")]
    Database(#[from] sqlx::Error),
    #[error("session store error")]
    Cache(#[from] SessionStoreError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::InvalidOrExpired => {
                ApiError::Unauthorized("Token is invalid or expired".to_string())
            }
            TokenError::Signing(e) => ApiError::Internal(format!("token signing failed: {e}")),
        }
    }
}

impl From<uuid::Error> for ApiError {
    fn from(_: uuid::Error) -> Self {
        ApiError::Validation("Invalid identifier".to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Dependency(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Database(err) => database_response(&err),
            ApiError::Cache(err) => {
                tracing::error!(error = %err, "session store failure");
                internal()
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal failure");
                internal()
            }
        };

        let body = Json(json!({
            "success": false,
            "message": message,
        }));

        (status, body).into_response()
    }
}

fn database_response(err: &sqlx::Error) -> (StatusCode, String) {
    if let sqlx::Error::Database(db) = err {
        if db.is_unique_violation() {
            return (
                StatusCode::BAD_REQUEST,
                "Duplicate value entered for a unique field".to_string(),
            );
        }
    }
    tracing::error!(error = %err, "database failure");
    internal()
}

fn internal() -> (StatusCode, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn validation_maps_to_400_with_message() {
        let (status, body) = body_json(ApiError::Validation("Email already exists".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Email already exists");
    }

    #[tokio::test]
    async fn unauthorized_maps_to_401() {
        let (status, body) = body_json(ApiError::Unauthorized("Please log in".into())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn internal_hides_detail() {
        let (status, body) = body_json(ApiError::Internal("secret detail".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Internal server error");
    }

    #[tokio::test]
    async fn malformed_identifier_maps_to_400() {
        let err: ApiError = "not-a-uuid".parse::<uuid::Uuid>().unwrap_err().into();
        let (status, _) = body_json(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
