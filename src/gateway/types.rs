//! Validated inputs, outcomes, and the error taxonomy of the gateway.

use crate::{embedding::EmbeddingClientError, pdf::PdfError, qdrant::QdrantError};
use serde::Serialize;
use std::num::NonZeroUsize;
use thiserror::Error;

const MAX_COLLECTION_NAME_LEN: usize = 255;

/// Errors produced by gateway operations.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Caller credential was missing or did not match the configured API key.
    #[error("Invalid or missing API key")]
    Unauthorized,
    /// Request failed field-level validation.
    #[error("{0}")]
    Validation(String),
    /// Uploaded document is not a well-formed PDF.
    #[error("Invalid PDF document: {0}")]
    InvalidPdf(String),
    /// Request body exceeded the configured upload limit.
    #[error("Upload exceeds the limit of {limit} bytes")]
    PayloadTooLarge {
        /// Configured limit in bytes.
        limit: usize,
    },
    /// Addressed collection does not exist.
    #[error("Collection '{0}' does not exist")]
    CollectionNotFound(String),
    /// Embedding provider failed.
    #[error("Embedding provider failed: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Embedding provider returned vectors of the wrong length.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension configured for the deployment.
        expected: usize,
        /// Dimension produced by the provider.
        actual: usize,
    },
    /// Vector store request failed.
    #[error("Vector store request failed: {0}")]
    VectorStore(QdrantError),
    /// PDF converter failed for reasons unrelated to the input.
    #[error("PDF converter failed: {0}")]
    PdfConverter(String),
    /// A collaborator did not answer within the configured timeout.
    #[error("{collaborator} did not respond within {seconds}s")]
    Timeout {
        /// Name of the collaborator that timed out.
        collaborator: &'static str,
        /// Timeout that elapsed.
        seconds: u64,
    },
}

impl GatewayError {
    /// Machine-readable error kind surfaced to callers.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::Validation(_) => "validation_failed",
            Self::InvalidPdf(_) => "invalid_pdf",
            Self::PayloadTooLarge { .. } => "payload_too_large",
            Self::CollectionNotFound(_) => "not_found",
            Self::Embedding(_) | Self::DimensionMismatch { .. } => "embedding_unavailable",
            Self::VectorStore(_) => "vector_store_unavailable",
            Self::PdfConverter(_) => "pdf_converter_unavailable",
            Self::Timeout { .. } => "upstream_timeout",
        }
    }

    /// Whether the failure originates from the caller's request rather than a collaborator.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized
                | Self::Validation(_)
                | Self::InvalidPdf(_)
                | Self::PayloadTooLarge { .. }
                | Self::CollectionNotFound(_)
        )
    }
}

impl From<QdrantError> for GatewayError {
    fn from(error: QdrantError) -> Self {
        match error {
            QdrantError::CollectionNotFound(name) => Self::CollectionNotFound(name),
            other => Self::VectorStore(other),
        }
    }
}

impl From<PdfError> for GatewayError {
    fn from(error: PdfError) -> Self {
        match error {
            PdfError::InvalidInput(message) => Self::InvalidPdf(message),
            PdfError::Unavailable(message) => Self::PdfConverter(message),
        }
    }
}

/// Name of a vector store collection, validated to be safe as a URL path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionName(String);

impl CollectionName {
    /// Validate a caller-supplied collection name.
    pub fn parse(raw: &str) -> Result<Self, GatewayError> {
        let name = raw.trim();
        if name.is_empty() {
            return Err(GatewayError::Validation(
                "collection must not be empty".to_string(),
            ));
        }
        if name.len() > MAX_COLLECTION_NAME_LEN {
            return Err(GatewayError::Validation(format!(
                "collection must be at most {MAX_COLLECTION_NAME_LEN} bytes"
            )));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            || name.starts_with('.')
        {
            return Err(GatewayError::Validation(
                "collection may only contain ASCII letters, digits, '-', '_' and '.'".to_string(),
            ));
        }
        Ok(Self(name.to_string()))
    }

    /// Borrow the collection name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CollectionName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validated input for a single-text embedding.
#[derive(Debug, Clone)]
pub struct EmbedInput {
    /// Collection the caller associated with the request; echoed back, never created.
    pub collection: CollectionName,
    /// Non-empty text to embed.
    pub text: String,
}

/// Validated input for a batch import.
#[derive(Debug, Clone)]
pub struct ImportInput {
    /// Target collection, created when absent.
    pub collection: CollectionName,
    /// Non-empty list of non-empty texts, in caller order.
    pub texts: Vec<String>,
}

/// Validated input for a similarity search.
#[derive(Debug, Clone)]
pub struct SearchInput {
    /// Collection to search; must exist.
    pub collection: CollectionName,
    /// Non-empty query text.
    pub query: String,
    /// Maximum number of hits to return.
    pub top_k: NonZeroUsize,
}

/// Result of embedding a single text.
#[derive(Debug, Clone)]
pub struct EmbedOutcome {
    /// Collection echoed from the request.
    pub collection: String,
    /// Text that was embedded.
    pub text: String,
    /// Embedding vector.
    pub embedding: Vec<f32>,
}

/// Result of a batch import.
#[derive(Debug, Clone)]
pub struct ImportOutcome {
    /// Collection the records were written to.
    pub collection: String,
    /// Identifiers generated for the stored records, in input order.
    pub ids: Vec<String>,
}

/// Result of a similarity search.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Query text echoed from the request.
    pub query: String,
    /// Collection that was searched.
    pub collection: String,
    /// Hits in non-increasing score order.
    pub hits: Vec<SearchHit>,
}

/// Single ranked search result.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    /// Identifier of the stored record.
    pub id: String,
    /// Stored text payload, if the record carries one.
    pub text: Option<String>,
    /// Similarity score reported by the vector store.
    pub score: f32,
    /// 1-based position in the result list.
    pub rank: usize,
}
