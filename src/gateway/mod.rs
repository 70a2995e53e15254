//! Request pipeline coordinating the embedding provider, vector store, and PDF converter.

mod service;
pub mod types;

pub use service::{GatewayApi, GatewayService};
pub use types::{
    CollectionName, EmbedInput, EmbedOutcome, GatewayError, ImportInput, ImportOutcome, SearchHit,
    SearchInput, SearchOutcome,
};
