#![deny(missing_docs)]

//! Core library for the docparse OCR-to-JSON server.

/// HTTP routing and REST handlers.
pub mod api;
/// Hosted model client and reply handling.
pub mod completion;
/// Environment-driven configuration management.
pub mod config;
/// Structured logging and tracing setup.
pub mod logging;
/// Parse activity counters.
pub mod metrics;
/// OCR engines and backend routing.
pub mod ocr;
/// Document parse pipeline utilities.
pub mod processing;
