//! Error taxonomy for analysis operations.
//!
//! None of these ever reach a caller of `AnalysisEngine::analyze`: every
//! variant is recovered inside the engine, either by skipping a chunk or by
//! routing the whole call to the rule-based fallback. They exist so the
//! decision is explicit and so logs carry a readable reason.
//!
//! # Error Categories
//!
//! - Capability availability (no backend, pool exhausted)
//! - Capability call failures
//! - Malformed responses
//! - Total chunk failure

use crate::analyzer::backend::{BackendError, CapabilityKind};
use std::fmt;

/// Characters of a bad response kept in `MalformedResponse`.
const PREVIEW_CHARS: usize = 100;

/// Per-chunk errors listed in an `AllChunksFailed` message.
const LISTED_ERRORS: usize = 5;

/// Why a model pass could not produce (all of) its result.
#[derive(Debug)]
pub enum AnalysisError {
    /// No usable backend for the requested capability.
    CapabilityUnavailable {
        /// Kind that was requested, if one was chosen
        kind: Option<CapabilityKind>,
    },

    /// No pooled session became free before the acquire timeout.
    PoolExhausted {
        kind: CapabilityKind,
        waited_ms: u64,
    },

    /// The backend returned an error for a chunk.
    CapabilityCallFailed {
        chunk_id: usize,
        reason: String,
    },

    /// The response for a chunk could not be parsed.
    MalformedResponse {
        chunk_id: usize,
        /// Truncated response for debugging
        response_preview: String,
    },

    /// Every chunk failed.
    AllChunksFailed {
        total_chunks: usize,
        errors: Vec<(usize, String)>,
    },
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::CapabilityUnavailable { kind: Some(kind) } => {
                write!(f, "Capability '{}' is not available on this device.", kind)
            }
            AnalysisError::CapabilityUnavailable { kind: None } => {
                write!(f, "No model capability is available on this device.")
            }
            AnalysisError::PoolExhausted { kind, waited_ms } => {
                write!(
                    f,
                    "No '{}' session became free within {} ms.",
                    kind, waited_ms
                )
            }
            AnalysisError::CapabilityCallFailed { chunk_id, reason } => {
                write!(f, "Chunk {} failed: {}", chunk_id, reason)
            }
            AnalysisError::MalformedResponse {
                chunk_id,
                response_preview,
            } => {
                write!(
                    f,
                    "Failed to parse response for chunk {}. Response preview: {}",
                    chunk_id, response_preview
                )
            }
            AnalysisError::AllChunksFailed {
                total_chunks,
                errors,
            } => {
                writeln!(f, "All {} chunks failed to analyze.", total_chunks)?;
                for (chunk_id, error) in errors.iter().take(LISTED_ERRORS) {
                    writeln!(f, "  - Chunk {}: {}", chunk_id, error)?;
                }
                if errors.len() > LISTED_ERRORS {
                    write!(f, "  ... and {} more errors", errors.len() - LISTED_ERRORS)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for AnalysisError {}

impl AnalysisError {
    /// Create from a BackendError with chunk context.
    pub fn from_backend_error(chunk_id: usize, error: &BackendError) -> Self {
        match error {
            BackendError::Unavailable(kind) => {
                AnalysisError::CapabilityUnavailable { kind: Some(*kind) }
            }
            BackendError::JsonParse(_) | BackendError::JsonExtraction { .. } => {
                let preview = match error {
                    BackendError::JsonExtraction { response } => {
                        response_preview(response, PREVIEW_CHARS)
                    }
                    other => other.to_string(),
                };
                AnalysisError::MalformedResponse {
                    chunk_id,
                    response_preview: preview,
                }
            }
            BackendError::SessionCreation { .. }
            | BackendError::Call(_)
            | BackendError::Timeout(_) => AnalysisError::CapabilityCallFailed {
                chunk_id,
                reason: error.to_string(),
            },
        }
    }

    /// Whether this error is confined to one chunk.
    pub fn is_chunk_local(&self) -> bool {
        matches!(
            self,
            AnalysisError::CapabilityCallFailed { .. } | AnalysisError::MalformedResponse { .. }
        )
    }

    /// Chunk the error belongs to, if any.
    pub fn chunk_id(&self) -> Option<usize> {
        match self {
            AnalysisError::CapabilityCallFailed { chunk_id, .. }
            | AnalysisError::MalformedResponse { chunk_id, .. } => Some(*chunk_id),
            _ => None,
        }
    }
}

/// One-line preview of a model response for logs.
///
/// Runs of whitespace (newlines included) collapse to a single space.
fn response_preview(response: &str, max_chars: usize) -> String {
    let flat = response.split_whitespace().collect::<Vec<_>>().join(" ");
    match flat.char_indices().nth(max_chars) {
        Some((byte, _)) => format!("{}...", &flat[..byte]),
        None => flat,
    }
}
