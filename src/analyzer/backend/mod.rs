//! Model backend interfaces for on-device analysis.
//!
//! The host environment exposes a handful of model capabilities (proofreading,
//! writing, rewriting, summarizing, open-ended prompting). Each one is probed
//! for availability and, when usable, instantiated as a stateful session.
//!
//! # Design
//!
//! - `CapabilityProvider` is the probe + session factory the host supplies.
//! - `ModelSession` is one live session: a single analyze-style call plus
//!   an explicit destroy.
//! - `parse` holds the strict boundary that turns loosely-shaped responses
//!   into typed suggestions.
//!
//! Providers and sessions must be `Send + Sync` since sessions are shared
//! between the pool and the chunk workers.

pub mod parse;

pub use parse::{parse_suggestions, parse_tone, RawSuggestion, RawTone};

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// Model capability kinds a host may expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityKind {
    /// Grammar and spelling proofreading
    Proof,
    /// Free-text generation
    Write,
    /// Rewriting existing text
    Rewrite,
    /// Summarization
    Summarize,
    /// Open-ended prompting with structured output
    Prompt,
}

impl CapabilityKind {
    /// All kinds, in probe order.
    pub const ALL: [CapabilityKind; 5] = [
        CapabilityKind::Proof,
        CapabilityKind::Write,
        CapabilityKind::Rewrite,
        CapabilityKind::Summarize,
        CapabilityKind::Prompt,
    ];

    /// Stable index into per-kind tables.
    pub fn index(&self) -> usize {
        match self {
            CapabilityKind::Proof => 0,
            CapabilityKind::Write => 1,
            CapabilityKind::Rewrite => 2,
            CapabilityKind::Summarize => 3,
            CapabilityKind::Prompt => 4,
        }
    }
}

impl std::fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CapabilityKind::Proof => write!(f, "proof"),
            CapabilityKind::Write => write!(f, "write"),
            CapabilityKind::Rewrite => write!(f, "rewrite"),
            CapabilityKind::Summarize => write!(f, "summarize"),
            CapabilityKind::Prompt => write!(f, "prompt"),
        }
    }
}

/// Availability reported by the host for a capability kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    Unavailable,
    /// Supported, but the model must be downloaded before first use
    Downloadable,
    Downloading,
    Available,
}

impl std::fmt::Display for Availability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Availability::Unavailable => write!(f, "unavailable"),
            Availability::Downloadable => write!(f, "downloadable"),
            Availability::Downloading => write!(f, "downloading"),
            Availability::Available => write!(f, "available"),
        }
    }
}

/// Desired output tone for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Formal,
    #[default]
    Neutral,
    Casual,
}

/// Desired output format for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    PlainText,
    Markdown,
}

/// Desired output length for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputLength {
    Short,
    #[default]
    Medium,
    Long,
}

/// Options a session is created with.
///
/// Pooled sessions are only reused for requests carrying equal options.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionOptions {
    pub tone: Tone,
    pub format: OutputFormat,
    pub length: OutputLength,
    pub shared_context: Option<String>,
}

impl SessionOptions {
    /// Options with a shared context string and defaults elsewhere.
    pub fn with_context(context: impl Into<String>) -> Self {
        Self {
            shared_context: Some(context.into()),
            ..Default::default()
        }
    }
}

/// Probe and session factory supplied by the host.
pub trait CapabilityProvider: Send + Sync {
    /// Human-readable name for logging.
    fn name(&self) -> &'static str;

    /// Report the availability of a capability kind.
    fn availability(&self, kind: CapabilityKind) -> BackendResult<Availability>;

    /// Create a new session for a capability kind.
    ///
    /// Errors are returned to the caller unchanged; the pool never retries.
    fn create_session(
        &self,
        kind: CapabilityKind,
        options: &SessionOptions,
    ) -> BackendResult<Box<dyn ModelSession>>;
}

/// A live, stateful model session.
pub trait ModelSession: Send + Sync {
    /// Run the session's primary analyze-style call and return the raw response.
    fn analyze(&self, input: &str, context: &str) -> BackendResult<String>;

    /// Release the model resources held by this session.
    fn destroy(&self);
}

/// Provider for hosts without any on-device model.
///
/// Every kind probes as unavailable, so all analysis takes the fallback path.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableProvider;

impl CapabilityProvider for UnavailableProvider {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    fn availability(&self, _kind: CapabilityKind) -> BackendResult<Availability> {
        Ok(Availability::Unavailable)
    }

    fn create_session(
        &self,
        kind: CapabilityKind,
        _options: &SessionOptions,
    ) -> BackendResult<Box<dyn ModelSession>> {
        Err(BackendError::Unavailable(kind))
    }
}

/// Errors from model backends.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Capability '{0}' is not available")]
    Unavailable(CapabilityKind),

    #[error("Failed to create {kind} session: {reason}")]
    SessionCreation { kind: CapabilityKind, reason: String },

    #[error("Model call failed: {}", truncate_message(.0))]
    Call(String),

    #[error("Model call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Failed to parse response as JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Failed to extract JSON from response")]
    JsonExtraction { response: String },
}

/// Limit backend error messages to their first line, 200 characters.
fn truncate_message(message: &str) -> String {
    let first_line = message.lines().next().unwrap_or("").trim();
    if first_line.chars().count() <= 200 {
        first_line.to_string()
    } else {
        let cut: String = first_line.chars().take(200).collect();
        format!("{}...", cut)
    }
}
