//! Mapping of gateway failures onto JSON HTTP responses.

use crate::gateway::GatewayError;
use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Body returned for every failed request.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error kind.
    pub error: &'static str,
    /// Human-readable description.
    pub message: String,
    /// HTTP status code, repeated for clients that only see the body.
    pub status: u16,
}

/// Handler error wrapping a [`GatewayError`].
pub struct AppError(pub GatewayError);

impl AppError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            GatewayError::Unauthorized => StatusCode::UNAUTHORIZED,
            GatewayError::Validation(_) | GatewayError::InvalidPdf(_) => StatusCode::BAD_REQUEST,
            GatewayError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::CollectionNotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::Embedding(_)
            | GatewayError::DimensionMismatch { .. }
            | GatewayError::VectorStore(_) => StatusCode::BAD_GATEWAY,
            GatewayError::PdfConverter(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    // Collaborator errors can carry upstream bodies; callers only get a summary.
    fn message(&self) -> String {
        match &self.0 {
            GatewayError::Embedding(_) | GatewayError::DimensionMismatch { .. } => {
                "Embedding provider failed to produce a valid embedding".to_string()
            }
            GatewayError::VectorStore(_) => "Vector store request failed".to_string(),
            GatewayError::PdfConverter(_) => "PDF converter failed".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            error: self.0.kind(),
            message: self.message(),
            status: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<GatewayError> for AppError {
    fn from(inner: GatewayError) -> Self {
        Self(inner)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self(GatewayError::Validation(rejection.body_text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qdrant::QdrantError;
    use axum::body::to_bytes;

    async fn render(error: GatewayError) -> (StatusCode, serde_json::Value) {
        let response = AppError(error).into_response();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        (status, serde_json::from_slice(&body).expect("json body"))
    }

    #[tokio::test]
    async fn validation_errors_are_bad_requests() {
        let (status, body) = render(GatewayError::Validation("text must not be empty".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_failed");
        assert_eq!(body["message"], "text must not be empty");
        assert_eq!(body["status"], 400);
    }

    #[tokio::test]
    async fn upstream_details_are_not_exposed() {
        let (status, body) = render(GatewayError::VectorStore(QdrantError::UnexpectedStatus {
            status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            body: "panicked at src/collection.rs:42".into(),
        }))
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "vector_store_unavailable");
        assert!(!body["message"].as_str().unwrap_or_default().contains("panicked"));
    }

    #[tokio::test]
    async fn oversized_uploads_name_the_limit() {
        let (status, body) = render(GatewayError::PayloadTooLarge { limit: 2048 }).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["error"], "payload_too_large");
        assert_eq!(body["message"], "Upload exceeds the limit of 2048 bytes");
    }

    #[tokio::test]
    async fn timeouts_map_to_gateway_timeout() {
        let (status, body) = render(GatewayError::Timeout {
            collaborator: "vector store",
            seconds: 30,
        })
        .await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body["error"], "upstream_timeout");
    }
}
