//! HTTP surface for Embedgate.
//!
//! Every route requires the static credential in the `x-api-key` header:
//!
//! - `POST /embed` – Embed one text and return the vector (nothing is stored).
//! - `POST /import` – Embed a batch of texts and upsert them into a collection, creating it when
//!   absent. Returns the generated ids.
//! - `POST /search` – Return up to `top_k` stored texts ranked by descending similarity.
//! - `DELETE /collection` – Drop a collection.
//! - `POST /parse-pdf` – Convert a multipart PDF upload (field `file`) into Markdown.
//! - `GET /metrics` – Request counters since startup.
//! - `GET /commands` – Machine-readable catalog of the endpoints above.
//!
//! Missing collections are reported as `404 not_found` by both search and delete.

mod auth;
mod error;
mod handlers;
pub mod schemas;

pub use auth::API_KEY_HEADER;
pub use error::{AppError, ErrorBody};

use crate::config::Config;
use crate::gateway::GatewayApi;
use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

/// Request-independent settings the HTTP layer needs.
#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// Credential expected in the `x-api-key` header.
    pub api_key: String,
    /// Largest `top_k` accepted by `/search`.
    pub search_max_top_k: usize,
    /// Body limit applied to `/parse-pdf` uploads.
    pub max_upload_bytes: usize,
}

impl ApiSettings {
    /// Extract the HTTP settings from the runtime configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            api_key: config.api_key.clone(),
            search_max_top_k: config.search_max_top_k,
            max_upload_bytes: config.max_upload_bytes,
        }
    }
}

/// Shared handler state.
pub struct AppState<S> {
    service: Arc<S>,
    settings: Arc<ApiSettings>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            settings: Arc::clone(&self.settings),
        }
    }
}

/// Build the HTTP router exposing the gateway.
pub fn create_router<S>(service: Arc<S>, settings: ApiSettings) -> Router
where
    S: GatewayApi + 'static,
{
    let settings = Arc::new(settings);
    let state = AppState {
        service,
        settings: Arc::clone(&settings),
    };

    Router::new()
        .route("/embed", post(handlers::embed::<S>))
        .route("/import", post(handlers::import::<S>))
        .route("/search", post(handlers::search::<S>))
        .route("/collection", delete(handlers::delete_collection::<S>))
        .route(
            "/parse-pdf",
            post(handlers::parse_pdf::<S>)
                .layer(DefaultBodyLimit::max(settings.max_upload_bytes)),
        )
        .route("/metrics", get(handlers::metrics::<S>))
        .route("/commands", get(get_commands))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&settings),
            auth::require_api_key,
        ))
        .with_state(state)
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery by tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "embed",
                method: "POST",
                path: "/embed",
                description: "Embed a single text and return the vector and its dimension. Nothing is stored.",
                request_example: Some(json!({ "collection": "docs", "text": "alpha beta" })),
            },
            CommandDescriptor {
                name: "import",
                method: "POST",
                path: "/import",
                description: "Embed texts and upsert them into a collection, creating it when absent. Returns { \"inserted\": number, \"ids\": [...] }.",
                request_example: Some(json!({
                    "collection": "docs",
                    "texts": ["alpha beta", "gamma delta"]
                })),
            },
            CommandDescriptor {
                name: "search",
                method: "POST",
                path: "/search",
                description: "Return up to top_k stored texts ranked by descending similarity. Unknown collections yield 404.",
                request_example: Some(json!({
                    "collection": "docs",
                    "query": "alpha beta",
                    "top_k": 5
                })),
            },
            CommandDescriptor {
                name: "delete_collection",
                method: "DELETE",
                path: "/collection",
                description: "Drop a collection and all of its records. Unknown collections yield 404.",
                request_example: Some(json!({ "collection": "docs" })),
            },
            CommandDescriptor {
                name: "parse_pdf",
                method: "POST",
                path: "/parse-pdf",
                description: "Convert a PDF uploaded as multipart field 'file' into Markdown.",
                request_example: None,
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return request counters since startup.",
                request_example: None,
            },
        ],
    })
}
