//! EnTrust report assembly pipeline
//!
//! Turns a submitted survey into per-dimension assessment reports:
//! statistics aggregation, standards retrieval, LLM drafting with an
//! optional critique pass, markdown and PDF formatting, and artifact
//! storage with the stage state machine persisted along the way.

pub mod generator;
pub mod markdown;
pub mod pdf;
pub mod prompt;
pub mod stats;

pub use generator::{DimensionOutcome, ReportGenerator};
pub use stats::{aggregate, DimensionStats, QuestionStat};
