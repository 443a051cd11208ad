#![deny(missing_docs)]

//! Core library for the Clausewise claim decision service.

/// HTTP routing and REST handlers.
pub mod api;
/// Single-flight caching primitives.
pub mod cache;
/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Document text extraction (PDF, DOCX, EML, plain text).
pub mod extraction;
/// Generative client used as entity-extraction fallback.
pub mod generative;
/// Clause embedding index and semantic retrieval.
pub mod index;
/// Supported languages and detection.
pub mod language;
/// Structured logging and tracing setup.
pub mod logging;
/// Claim-processing metrics helpers.
pub mod metrics;
/// Claim pipeline: normalization, segmentation, entities, decision rules.
pub mod processing;
/// Translation client abstraction and caching service.
pub mod translation;
