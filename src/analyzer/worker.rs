//! Parallel chunk dispatch using Rayon.
//!
//! Each chunk is analyzed on its own pooled session: acquire, call,
//! release, then parse and normalize. Completion order does not matter
//! because results are merged and sorted afterwards.
//!
//! # Design
//!
//! - `ParallelExecutor` runs chunks on a dedicated Rayon pool sized
//!   `min(chunk_count, pool cap)`
//! - A single chunk runs inline without building a thread pool
//! - `ChunkResult` carries either normalized suggestions (absolute offsets)
//!   or the `AnalysisError` for that chunk
//! - The session is released before the response is parsed so other
//!   chunks can reuse it

use chrono::Utc;
use rayon::prelude::*;
use std::time::Instant;

use super::backend::{parse_suggestions, CapabilityKind, SessionOptions};
use super::chunk::Chunk;
use super::error::AnalysisError;
use super::pool::SessionPool;
use super::prompt::{build_prompt, PromptKind};
use super::result::{normalize_suggestion, Suggestion};

/// Result of analyzing a single chunk.
#[derive(Debug)]
pub struct ChunkResult {
    pub chunk_id: usize,
    pub result: Result<Vec<Suggestion>, AnalysisError>,
}

impl ChunkResult {
    pub fn success(chunk_id: usize, suggestions: Vec<Suggestion>) -> Self {
        Self {
            chunk_id,
            result: Ok(suggestions),
        }
    }

    pub fn failure(chunk_id: usize, error: AnalysisError) -> Self {
        Self {
            chunk_id,
            result: Err(error),
        }
    }

    #[cfg(test)]
    fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Executor for per-chunk model calls.
pub struct ParallelExecutor<'a> {
    pool: &'a SessionPool,
    kind: CapabilityKind,
    options: SessionOptions,
    context: &'a str,
    /// Template to wrap each chunk in; `None` sends the chunk text as-is
    prompt: Option<PromptKind>,
}

impl<'a> ParallelExecutor<'a> {
    pub fn new(
        pool: &'a SessionPool,
        kind: CapabilityKind,
        options: SessionOptions,
        context: &'a str,
        prompt: Option<PromptKind>,
    ) -> Self {
        Self {
            pool,
            kind,
            options,
            context,
            prompt,
        }
    }

    /// Analyze every chunk, returning one result per chunk.
    pub fn execute(&self, chunks: &[Chunk]) -> Vec<ChunkResult> {
        match chunks {
            [] => Vec::new(),
            [single] => vec![self.analyze_chunk(single)],
            _ => self.execute_parallel(chunks),
        }
    }

    fn execute_parallel(&self, chunks: &[Chunk]) -> Vec<ChunkResult> {
        let worker_count = chunks.len().min(self.pool.settings().max_per_kind).max(1);

        let pool = match rayon::ThreadPoolBuilder::new()
            .num_threads(worker_count)
            .thread_name(|i| format!("lexicheck-chunk-{}", i))
            .build()
        {
            Ok(pool) => pool,
            Err(e) => {
                tracing::warn!("Failed to create thread pool: {}. Processing sequentially.", e);
                return chunks.iter().map(|c| self.analyze_chunk(c)).collect();
            }
        };

        pool.install(|| chunks.par_iter().map(|c| self.analyze_chunk(c)).collect())
    }

    /// Run one chunk through a pooled session.
    fn analyze_chunk(&self, chunk: &Chunk) -> ChunkResult {
        let started = Instant::now();
        let lease = match self.pool.acquire(self.kind, &self.options) {
            Ok(Some(lease)) => lease,
            Ok(None) => {
                return ChunkResult::failure(
                    chunk.index,
                    AnalysisError::PoolExhausted {
                        kind: self.kind,
                        waited_ms: started.elapsed().as_millis() as u64,
                    },
                )
            }
            Err(e) => {
                return ChunkResult::failure(
                    chunk.index,
                    AnalysisError::from_backend_error(chunk.index, &e),
                )
            }
        };

        let input = match self.prompt {
            Some(kind) => build_prompt(kind, &chunk.text, self.context),
            None => chunk.text.clone(),
        };
        let response = lease.analyze(&input, self.context);
        drop(lease);

        let parsed = response.and_then(|r| parse_suggestions(&r));
        match parsed {
            Ok(raws) => {
                let source: Vec<char> = chunk.text.chars().collect();
                let now = Utc::now();
                let suggestions = raws
                    .iter()
                    .filter_map(|raw| normalize_suggestion(raw, &source, chunk.start_offset, now))
                    .collect();
                ChunkResult::success(chunk.index, suggestions)
            }
            Err(e) => {
                ChunkResult::failure(chunk.index, AnalysisError::from_backend_error(chunk.index, &e))
            }
        }
    }
}
