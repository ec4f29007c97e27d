use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failures a prediction request can report to the client. Everything else
/// (WHOIS, schema drift) is absorbed before it reaches a handler.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Model not loaded")]
    ModelUnavailable,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::ModelUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!("Rejecting request: {}", self);
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub fn validation_error(msg: &str) -> AppError {
    AppError::InvalidInput(msg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn maps_variants_to_status_codes() {
        assert_eq!(validation_error("URL cannot be empty").status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::ModelUnavailable.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn invalid_input_message_is_passed_through() {
        assert_eq!(validation_error("Invalid URL format").to_string(), "Invalid URL format");
    }

    #[tokio::test]
    async fn body_carries_only_the_message() {
        let response = AppError::ModelUnavailable.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body, json!({ "error": "Model not loaded" }));
    }
}
