#![deny(missing_docs)]

//! Core library for the Embedgate HTTP gateway.

/// HTTP routing, authentication, and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Request pipeline tying embeddings, storage, and PDF conversion together.
pub mod gateway;
/// Structured logging and tracing setup.
pub mod logging;
/// Request counters.
pub mod metrics;
/// PDF to Markdown conversion.
pub mod pdf;
/// Qdrant vector store integration.
pub mod qdrant;
