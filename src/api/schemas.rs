//! Request and response bodies of the HTTP surface.
//!
//! Request bodies are validated once, here, into the typed gateway inputs.

use crate::gateway::{
    CollectionName, EmbedInput, EmbedOutcome, GatewayError, ImportInput, ImportOutcome, SearchHit,
    SearchInput, SearchOutcome,
};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;

/// Number of hits returned when `top_k` is omitted.
pub const DEFAULT_TOP_K: i64 = 5;

fn default_top_k() -> i64 {
    DEFAULT_TOP_K
}

/// Request body for `POST /embed`.
#[derive(Debug, Deserialize)]
pub struct EmbedRequest {
    /// Collection associated with the text; echoed back.
    pub collection: String,
    /// Text to embed.
    pub text: String,
}

impl EmbedRequest {
    /// Validate the body into a gateway input.
    pub fn validate(self) -> Result<EmbedInput, GatewayError> {
        Ok(EmbedInput {
            collection: CollectionName::parse(&self.collection)?,
            text: require_text("text", self.text)?,
        })
    }
}

/// Request body for `POST /import`.
#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    /// Target collection; created when absent.
    pub collection: String,
    /// Texts to embed and store, in order.
    pub texts: Vec<String>,
}

impl ImportRequest {
    /// Validate the body into a gateway input.
    pub fn validate(self) -> Result<ImportInput, GatewayError> {
        let collection = CollectionName::parse(&self.collection)?;
        if self.texts.is_empty() {
            return Err(GatewayError::Validation(
                "texts must contain at least one entry".to_string(),
            ));
        }
        if let Some(index) = self.texts.iter().position(|text| text.trim().is_empty()) {
            return Err(GatewayError::Validation(format!(
                "texts[{index}] must not be empty"
            )));
        }
        Ok(ImportInput {
            collection,
            texts: self.texts,
        })
    }
}

/// Request body for `POST /search`.
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    /// Collection to search.
    pub collection: String,
    /// Natural language query.
    pub query: String,
    /// Maximum number of hits (defaults to 5).
    #[serde(default = "default_top_k")]
    pub top_k: i64,
}

impl SearchRequest {
    /// Validate the body into a gateway input, bounding `top_k` by `max_top_k`.
    pub fn validate(self, max_top_k: usize) -> Result<SearchInput, GatewayError> {
        let collection = CollectionName::parse(&self.collection)?;
        let query = require_text("query", self.query)?;
        let top_k = usize::try_from(self.top_k)
            .ok()
            .and_then(NonZeroUsize::new)
            .ok_or_else(|| {
                GatewayError::Validation("top_k must be a positive integer".to_string())
            })?;
        if top_k.get() > max_top_k {
            return Err(GatewayError::Validation(format!(
                "top_k must not exceed {max_top_k}"
            )));
        }
        Ok(SearchInput {
            collection,
            query,
            top_k,
        })
    }
}

/// Request body for `DELETE /collection`.
#[derive(Debug, Deserialize)]
pub struct DeleteCollectionRequest {
    /// Collection to drop.
    pub collection: String,
}

impl DeleteCollectionRequest {
    /// Validate the collection name.
    pub fn validate(self) -> Result<CollectionName, GatewayError> {
        CollectionName::parse(&self.collection)
    }
}

fn require_text(field: &str, value: String) -> Result<String, GatewayError> {
    if value.trim().is_empty() {
        Err(GatewayError::Validation(format!("{field} must not be empty")))
    } else {
        Ok(value)
    }
}

/// Success response for `POST /embed`.
#[derive(Debug, Serialize)]
pub struct EmbedResponse {
    collection: String,
    text: String,
    dimension: usize,
    embedding: Vec<f32>,
}

impl From<EmbedOutcome> for EmbedResponse {
    fn from(outcome: EmbedOutcome) -> Self {
        Self {
            collection: outcome.collection,
            text: outcome.text,
            dimension: outcome.embedding.len(),
            embedding: outcome.embedding,
        }
    }
}

/// Success response for `POST /import`.
#[derive(Debug, Serialize)]
pub struct ImportResponse {
    status: &'static str,
    inserted: usize,
    ids: Vec<String>,
    collection: String,
}

impl From<ImportOutcome> for ImportResponse {
    fn from(outcome: ImportOutcome) -> Self {
        Self {
            status: "ok",
            inserted: outcome.ids.len(),
            ids: outcome.ids,
            collection: outcome.collection,
        }
    }
}

/// Success response for `POST /search`.
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    query: String,
    collection: String,
    results: Vec<SearchHit>,
}

impl From<SearchOutcome> for SearchResponse {
    fn from(outcome: SearchOutcome) -> Self {
        Self {
            query: outcome.query,
            collection: outcome.collection,
            results: outcome.hits,
        }
    }
}

/// Success response for `DELETE /collection`.
#[derive(Debug, Serialize)]
pub struct DeleteCollectionResponse {
    status: &'static str,
    collection: String,
}

impl DeleteCollectionResponse {
    /// Acknowledge the deletion of `collection`.
    pub fn deleted(collection: String) -> Self {
        Self {
            status: "deleted",
            collection,
        }
    }
}

/// Success response for `POST /parse-pdf`.
#[derive(Debug, Serialize)]
pub struct ParsePdfResponse {
    /// Client-supplied file name, when present.
    pub filename: Option<String>,
    /// Converted Markdown document.
    pub markdown: String,
}
