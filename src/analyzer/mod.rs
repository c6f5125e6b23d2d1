//! Text analysis pipeline backed by on-device model capabilities.
//!
//! This module checks free text, error logs and message tone using whatever
//! model capabilities the host exposes, and falls back to deterministic
//! rules whenever a model is missing, busy, slow or wrong.
//!
//! # Design Philosophy
//!
//! - **Never fail the caller**: every public analysis call resolves to a
//!   structurally valid result; errors are logged and recovered
//! - **Bounded resources**: live sessions are pooled and capped per kind,
//!   idle sessions are reaped
//! - **Uniform output**: model and fallback results go through the same
//!   normalization, tagged with their origin
//!
//! # Module Structure
//!
//! - [`backend`] - Capability provider traits and the response parse boundary
//! - [`registry`] - Memoized capability availability
//! - [`pool`] - Bounded session pool with leases
//! - [`chunk`] - Token estimation, chunking and merge
//! - [`worker`] - Parallel per-chunk dispatch
//! - [`fallback`] - Rule-based analyzer
//! - [`cache`] - LRU result cache
//! - [`queue`] - Priority admission queue
//! - [`service`] - The `AnalysisEngine` facade

pub mod backend;
pub mod cache;
pub mod chunk;
pub mod error;
pub mod fallback;
pub mod pool;
pub mod prompt;
pub mod queue;
pub mod registry;
pub mod result;
pub mod service;
pub mod tracker;
pub mod worker;

// Re-export main types
pub use backend::{
    Availability, BackendError, BackendResult, CapabilityKind, CapabilityProvider, ModelSession,
    OutputFormat, OutputLength, SessionOptions, Tone, UnavailableProvider,
};
pub use cache::{cache_key, CacheMode, ResultCache};
pub use chunk::{estimate_tokens, merge_chunk_results, Chunk, ChunkStats, TextChunker};
pub use error::AnalysisError;
pub use fallback::{FallbackAnalyzer, FallbackRule};
pub use pool::{spawn_reaper, PoolSettings, PoolStats, ReaperHandle, SessionLease, SessionPool};
pub use queue::{PendingCheck, Priority};
pub use registry::CapabilityRegistry;
pub use result::{
    normalize_suggestion, AnalysisResult, Category, Origin, Severity, Suggestion, ToneReport,
};
pub use service::AnalysisEngine;
pub use tracker::Stats;
