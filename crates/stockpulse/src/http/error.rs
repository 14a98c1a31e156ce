//! HTTP-edge error type.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::render;
use crate::config::Environment;
use crate::StockpulseError;

/// Message shown for every internal failure.
pub const GENERIC_ERROR: &str = "Something went wrong!";

/// Errors a handler can return.
///
/// `NotFound` and `BadRequest` come from the JSON API and render as
/// `{"error": "..."}`. `Internal` renders the generic error page; the
/// underlying error is only shown in development.
#[derive(Debug)]
pub enum AppError {
    Internal {
        source: StockpulseError,
        environment: Environment,
    },
    NotFound(String),
    BadRequest(String),
}

impl AppError {
    /// Wraps an internal failure and logs it.
    pub fn internal(source: impl Into<StockpulseError>, environment: Environment) -> Self {
        let source = source.into();
        tracing::error!(error = %source, "request failed");
        Self::Internal {
            source,
            environment,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            Self::Internal {
                source,
                environment,
            } => {
                let detail = if environment.is_production() {
                    String::new()
                } else {
                    format!("<pre>{}</pre>", render::escape(&source.to_string()))
                };
                let body = format!("<h1>{GENERIC_ERROR}</h1>\n{detail}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    render::page("Error", &body),
                )
                    .into_response()
            }
            Self::NotFound(message) => (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({ "error": message })),
            )
                .into_response(),
            Self::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": message })),
            )
                .into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use stockpulse_session::SessionError;

    use super::*;

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_internal_in_development_shows_detail() {
        let err = AppError::internal(SessionError::StoreExhausted(7), Environment::Development);
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_text(response).await;
        assert!(body.contains(GENERIC_ERROR));
        assert!(body.contains("7 live sessions"));
    }

    #[tokio::test]
    async fn test_internal_in_production_hides_detail() {
        let err = AppError::internal(SessionError::StoreExhausted(7), Environment::Production);
        let body = body_text(err.into_response()).await;
        assert!(body.contains(GENERIC_ERROR));
        assert!(!body.contains("live sessions"));
    }

    #[tokio::test]
    async fn test_not_found_renders_json() {
        let response = AppError::NotFound("item 3 not found".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_text(response).await, r#"{"error":"item 3 not found"}"#);
    }

    #[tokio::test]
    async fn test_bad_request_renders_json() {
        let response = AppError::BadRequest("nope".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
