//! lexicheck Library
//!
//! Grammar, error-log and tone analysis over on-device model capabilities,
//! with a deterministic rule-based fallback.

pub mod analyzer;
pub mod config;

pub use analyzer::{AnalysisEngine, AnalysisResult, Priority, Suggestion, ToneReport};
pub use config::Config;
