#![deny(missing_docs)]

//! Core library for the Scammerize summarization service.

/// HTTP routing and REST handlers.
pub mod api;
/// Remote completion client abstraction and adapters.
pub mod completion;
/// Environment-driven configuration management.
pub mod config;
/// Format detection and per-format text extraction.
pub mod extraction;
/// Structured logging and tracing setup.
pub mod logging;
/// Summarization metrics helpers.
pub mod metrics;
/// Chunking and map-reduce summarization pipeline.
pub mod processing;
