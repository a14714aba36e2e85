#![deny(missing_docs)]

//! Core library for the DocSense document assistant server.

/// HTTP routing and JSON handlers.
pub mod api;
/// Simplification and question answering.
pub mod assist;
/// Fixed-size chunking with sentence-boundary snapping.
pub mod chunking;
/// Environment-driven configuration management.
pub mod config;
/// Plain-text extraction from uploaded documents.
pub mod extraction;
/// Language-model gateway abstraction and the Ollama adapter.
pub mod gateway;
/// Structured logging and tracing setup.
pub mod logging;
/// Pipeline counters.
pub mod metrics;
/// Risk analysis over arbitrary text.
pub mod risk;
/// Map/reduce document summarization.
pub mod summarize;
/// Three-tier translation resolver.
pub mod translation;
/// Upload admission and temporary staging.
pub mod upload;
