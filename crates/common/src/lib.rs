//! EnTrust Common Library
//!
//! Shared code for the EnTrust survey and reporting platform:
//! - Database models and repository patterns
//! - LLM provider abstraction with retry and circuit breaking
//! - Retrieval-augmented standards lookup
//! - Artifact storage with cloud fallback
//! - Error types and handling
//! - Configuration management
//! - Authentication utilities
//! - Metrics and observability

pub mod auth;
pub mod config;
pub mod db;
pub mod dimension;
pub mod embeddings;
pub mod errors;
pub mod llm;
pub mod metrics;
pub mod rag;
pub mod storage;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::{DbPool, Repository};
pub use dimension::Dimension;
pub use embeddings::Embedder;
pub use errors::{AppError, Result};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default risk threshold on the 1-10 survey scale
pub const DEFAULT_RISK_THRESHOLD: f64 = 5.0;

/// Default number of standards passages injected into a report prompt
pub const DEFAULT_RAG_TOP_K: usize = 5;
