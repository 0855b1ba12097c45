use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;

pub type ApiResult<T> = Result<T, ApiError>;

/// Errors surfaced to clients. Anything that doesn't fit the first four
/// variants is an internal fault: logged in full, returned as a generic 500.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{message}")]
    Validation { field: &'static str, message: String },

    #[error("Invalid credentials")]
    AuthenticationFailed,

    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'static str>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, field, message) = match self {
            ApiError::Validation { field, message } => {
                (StatusCode::BAD_REQUEST, Some(field), message)
            }
            ApiError::AuthenticationFailed => (
                StatusCode::UNAUTHORIZED,
                None,
                "Invalid credentials".to_string(),
            ),
            ApiError::Unauthenticated(msg) => (StatusCode::UNAUTHORIZED, None, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, None, msg),
            ApiError::Internal(err) => {
                tracing::error!(error = %err, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    None,
                    "An internal error occurred".to_string(),
                )
            }
        };

        (
            status,
            Json(ErrorBody {
                error: message,
                field,
            }),
        )
            .into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Internal(anyhow::Error::new(err).context("database error"))
    }
}

/// Serialized body for 2xx responses that only carry a message.
pub fn message_body(message: &str) -> Json<serde_json::Value> {
    Json(json!({ "message": message }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_maps_to_400_with_field() {
        let err = ApiError::validation("title", "Title must not be empty");
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn authentication_failed_has_fixed_message() {
        assert_eq!(
            ApiError::AuthenticationFailed.to_string(),
            "Invalid credentials"
        );
        let resp = ApiError::AuthenticationFailed.into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn not_found_maps_to_404() {
        let resp = ApiError::NotFound("Task not found".into()).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn internal_error_hides_detail() {
        let resp = ApiError::Internal(anyhow::anyhow!("connection refused")).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
