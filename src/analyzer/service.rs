//! AnalysisEngine facade for orchestrating analysis operations.
//!
//! This module provides the main entry point for checking text. The engine
//! owns the capability registry, session pool, result cache and stats; one
//! engine is built per execution context and shared behind `Arc` when
//! several threads need it.
//!
//! # Workflow
//!
//! 1. Truncate input to the configured maximum
//! 2. Look up the result cache
//! 3. Pick a capability (or the rule-based fallback)
//! 4. Chunk the text and dispatch chunks in parallel
//! 5. Merge per-chunk suggestions
//! 6. Store the result in the cache
//!
//! Every failure along the way is recovered: `analyze` always returns a
//! structurally valid result, produced by the model or by the fallback.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::thread;
use std::time::Instant;

use crate::config::Config;

use super::backend::{parse_tone, Availability, CapabilityKind, CapabilityProvider, SessionOptions};
use super::cache::{cache_key, CacheMode, ResultCache};
use super::chunk::{merge_chunk_results, TextChunker};
use super::error::AnalysisError;
use super::fallback::FallbackAnalyzer;
use super::pool::{spawn_reaper, PoolSettings, ReaperHandle, SessionPool};
use super::prompt::{build_prompt, PromptKind};
use super::queue::{PendingCheck, Priority, RequestQueue};
use super::registry::CapabilityRegistry;
use super::result::{AnalysisResult, Origin, ToneReport};
use super::tracker::{Stats, StatsTracker};
use super::worker::ParallelExecutor;

/// Analysis surface of a single call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Grammar,
    ErrorLog,
}

impl Mode {
    fn cache_mode(&self) -> CacheMode {
        match self {
            Mode::Grammar => CacheMode::Grammar,
            Mode::ErrorLog => CacheMode::ErrorLog,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Mode::Grammar => "grammar",
            Mode::ErrorLog => "error-log",
        }
    }
}

struct QueuedCheck {
    text: String,
    context: String,
    reply: Sender<AnalysisResult>,
}

/// Text analysis engine.
pub struct AnalysisEngine {
    config: Config,
    registry: CapabilityRegistry,
    pool: Arc<SessionPool>,
    reaper: Mutex<Option<ReaperHandle>>,
    chunker: TextChunker,
    cache: Mutex<ResultCache>,
    stats: StatsTracker,
    text_fallback: FallbackAnalyzer,
    log_fallback: FallbackAnalyzer,
    queue: Arc<RequestQueue<QueuedCheck>>,
    drain_started: OnceLock<bool>,
}

impl AnalysisEngine {
    /// Build an engine over a capability provider.
    ///
    /// Capabilities are probed lazily on first use. A reaper thread is
    /// started when `pool.reaper_interval_secs` is non-zero.
    pub fn new(config: Config, provider: Arc<dyn CapabilityProvider>) -> Self {
        let pool = Arc::new(SessionPool::new(
            Arc::clone(&provider),
            PoolSettings::from(&config.pool),
        ));

        let reaper = config
            .pool
            .reaper_interval()
            .and_then(|interval| match spawn_reaper(&pool, interval) {
                Ok(handle) => Some(handle),
                Err(e) => {
                    tracing::warn!("Failed to start session reaper: {}", e);
                    None
                }
            });

        tracing::debug!(provider = provider.name(), "Analysis engine created");

        Self {
            registry: CapabilityRegistry::new(provider),
            pool,
            reaper: Mutex::new(reaper),
            chunker: TextChunker::new(config.engine.boundary_window),
            cache: Mutex::new(ResultCache::new(config.cache.capacity)),
            stats: StatsTracker::new(),
            text_fallback: FallbackAnalyzer::text(),
            log_fallback: FallbackAnalyzer::error_log(),
            queue: Arc::new(RequestQueue::new()),
            drain_started: OnceLock::new(),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    pub fn pool(&self) -> &SessionPool {
        &self.pool
    }

    /// Probe (or recall) the availability of every capability kind.
    pub fn capabilities(&self) -> Vec<(CapabilityKind, Availability)> {
        self.registry.snapshot()
    }

    /// Check free text for grammar, spelling and style issues.
    pub fn analyze(&self, text: &str, context: &str) -> AnalysisResult {
        self.run(Mode::Grammar, text, context)
    }

    /// Explain failures in an error message or log excerpt.
    pub fn analyze_error(&self, text: &str, context: &str) -> AnalysisResult {
        self.run(Mode::ErrorLog, text, context)
    }

    /// Assess the tone of a message in a single model call.
    ///
    /// Any failure, or a disabled surface, yields a neutral report.
    pub fn analyze_tone(&self, text: &str, context: &str) -> ToneReport {
        let started = Instant::now();
        let (window, _) = truncate_chars(text, self.config.engine.max_text_chars);

        let report = match self.tone_pass(window, context) {
            Ok(report) => report,
            Err(e) => {
                tracing::info!("Tone analysis using neutral default: {}", e);
                self.stats.record_fallback();
                ToneReport::neutral(Origin::Fallback)
            }
        };

        self.stats.record_check(report.issues.len(), started.elapsed());
        report
    }

    /// Admit a grammar check into the priority queue.
    ///
    /// Queued checks run one at a time on a background thread, highest
    /// priority first.
    pub fn queue_check(
        self: &Arc<Self>,
        text: impl Into<String>,
        context: impl Into<String>,
        priority: Priority,
    ) -> PendingCheck<AnalysisResult> {
        let (reply, rx) = mpsc::channel();
        let check = QueuedCheck {
            text: text.into(),
            context: context.into(),
            reply,
        };

        if !self.ensure_drain_thread() {
            // No background thread; serve the check inline
            let result = self.analyze(&check.text, &check.context);
            let _ = check.reply.send(result);
            return PendingCheck::new(rx);
        }

        if let Err(check) = self.queue.push(check, priority) {
            tracing::debug!("Queue closed; serving check inline");
            let result = self.analyze(&check.text, &check.context);
            let _ = check.reply.send(result);
        }
        PendingCheck::new(rx)
    }

    pub fn get_stats(&self) -> Stats {
        self.stats.snapshot()
    }

    pub fn clear_cache(&self) {
        self.cache_lock().clear();
        tracing::debug!("Result cache cleared");
    }

    /// Stop background work and destroy every pooled session.
    ///
    /// Checks still waiting in the queue resolve to `None`. Direct calls
    /// keep working afterwards and create fresh sessions on demand.
    pub fn shutdown(&self) {
        self.queue.close();
        let reaper = self
            .reaper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(reaper) = reaper {
            reaper.stop();
        }
        let destroyed = self.pool.destroy_all();
        tracing::info!(destroyed, "Analysis engine shut down");
    }

    fn run(&self, mode: Mode, text: &str, context: &str) -> AnalysisResult {
        let started = Instant::now();
        let (window, truncated) = truncate_chars(text, self.config.engine.max_text_chars);
        if truncated {
            tracing::debug!(
                max_chars = self.config.engine.max_text_chars,
                "Input truncated before analysis"
            );
        }

        let key = cache_key(mode.cache_mode(), context, window);
        if let Some(mut hit) = self.cache_lock().get(&key) {
            tracing::debug!(mode = mode.name(), "Cache hit");
            hit.truncated = truncated;
            self.stats.record_cache_hit(hit.issue_count());
            return hit;
        }

        let mut result = match self.model_pass(mode, window, context) {
            Ok(result) => {
                self.cache_lock().put(key, result.clone());
                result
            }
            Err(e) => {
                tracing::info!(mode = mode.name(), "Using rule-based analysis: {}", e);
                self.stats.record_fallback();
                self.fallback_for(mode).analyze(window)
            }
        };
        result.truncated = truncated;

        self.stats.record_check(result.issue_count(), started.elapsed());
        result
    }

    /// Run the model pipeline. Any error sends the whole call to fallback.
    fn model_pass(
        &self,
        mode: Mode,
        text: &str,
        context: &str,
    ) -> Result<AnalysisResult, AnalysisError> {
        if !self.surface_enabled(mode) {
            tracing::debug!(mode = mode.name(), "Model analysis disabled by feature flags");
            return Err(AnalysisError::CapabilityUnavailable { kind: None });
        }
        let (kind, prompt) = self
            .select_kind(mode)
            .ok_or(AnalysisError::CapabilityUnavailable { kind: None })?;

        let engine = &self.config.engine;
        let chunks = self
            .chunker
            .chunk(text, engine.token_limit, engine.overlap_tokens);
        let stats = TextChunker::chunk_stats(&chunks);
        tracing::debug!(
            %kind,
            chunks = stats.chunk_count,
            estimated_tokens = stats.estimated_tokens,
            "Dispatching chunks"
        );

        let executor = ParallelExecutor::new(
            &self.pool,
            kind,
            SessionOptions::default(),
            context,
            prompt,
        );
        let results = executor.execute(&chunks);

        let mut lists = Vec::with_capacity(results.len());
        let mut errors = Vec::new();
        for chunk_result in results {
            match chunk_result.result {
                Ok(suggestions) => lists.push(suggestions),
                Err(e) if e.is_chunk_local() => {
                    tracing::warn!("Skipping chunk {}: {}", chunk_result.chunk_id, e);
                    errors.push((chunk_result.chunk_id, e.to_string()));
                }
                Err(e) => return Err(e),
            }
        }

        if lists.is_empty() {
            return Err(AnalysisError::AllChunksFailed {
                total_chunks: chunks.len(),
                errors,
            });
        }

        let mut result = AnalysisResult::empty(Origin::Model, text.chars().count());
        result.suggestions = merge_chunk_results(lists);
        result.chunk_count = chunks.len();
        result.was_chunked = chunks.len() > 1;
        Ok(result)
    }

    fn tone_pass(&self, text: &str, context: &str) -> Result<ToneReport, AnalysisError> {
        if !self.config.tone_enabled() {
            return Err(AnalysisError::CapabilityUnavailable { kind: None });
        }
        let kind = CapabilityKind::Prompt;
        if !self.registry.is_ready(kind) {
            return Err(AnalysisError::CapabilityUnavailable { kind: Some(kind) });
        }

        let started = Instant::now();
        let lease = match self.pool.acquire(kind, &SessionOptions::default()) {
            Ok(Some(lease)) => lease,
            Ok(None) => {
                return Err(AnalysisError::PoolExhausted {
                    kind,
                    waited_ms: started.elapsed().as_millis() as u64,
                })
            }
            Err(e) => return Err(AnalysisError::from_backend_error(0, &e)),
        };

        let prompt = build_prompt(PromptKind::Tone, text, context);
        let response = lease.analyze(&prompt, context);
        drop(lease);

        let raw = response
            .and_then(|r| parse_tone(&r))
            .map_err(|e| AnalysisError::from_backend_error(0, &e))?;

        let label = raw.label.trim();
        Ok(ToneReport {
            score: if raw.score.is_finite() {
                raw.score.clamp(0.0, 100.0)
            } else {
                ToneReport::NEUTRAL_SCORE
            },
            label: if label.is_empty() {
                "neutral".to_string()
            } else {
                label.to_lowercase()
            },
            issues: raw.issues,
            suggestions: raw.suggestions,
            origin: Origin::Model,
        })
    }

    /// Rule-based result for `text`, bypassing the cache and the model.
    fn rule_based(&self, mode: Mode, text: &str) -> AnalysisResult {
        let started = Instant::now();
        let (window, truncated) = truncate_chars(text, self.config.engine.max_text_chars);
        let mut result = self.fallback_for(mode).analyze(window);
        result.truncated = truncated;
        self.stats.record_fallback();
        self.stats.record_check(result.issue_count(), started.elapsed());
        result
    }

    fn surface_enabled(&self, mode: Mode) -> bool {
        match mode {
            Mode::Grammar => self.config.grammar_enabled(),
            Mode::ErrorLog => self.config.error_analysis_enabled(),
        }
    }

    /// Capability and prompt template for a mode, if one is ready.
    fn select_kind(&self, mode: Mode) -> Option<(CapabilityKind, Option<PromptKind>)> {
        match mode {
            Mode::Grammar if self.registry.is_ready(CapabilityKind::Proof) => {
                Some((CapabilityKind::Proof, None))
            }
            Mode::Grammar if self.registry.is_ready(CapabilityKind::Prompt) => {
                Some((CapabilityKind::Prompt, Some(PromptKind::Grammar)))
            }
            Mode::ErrorLog if self.registry.is_ready(CapabilityKind::Prompt) => {
                Some((CapabilityKind::Prompt, Some(PromptKind::ErrorLog)))
            }
            _ => None,
        }
    }

    fn fallback_for(&self, mode: Mode) -> &FallbackAnalyzer {
        match mode {
            Mode::Grammar => &self.text_fallback,
            Mode::ErrorLog => &self.log_fallback,
        }
    }

    fn ensure_drain_thread(self: &Arc<Self>) -> bool {
        *self.drain_started.get_or_init(|| {
            let engine = Arc::downgrade(self);
            let queue = Arc::clone(&self.queue);
            let spawned = thread::Builder::new()
                .name("lexicheck-queue".to_string())
                .spawn(move || {
                    while let Some(check) = queue.pop() {
                        let Some(engine) = engine.upgrade() else {
                            break;
                        };
                        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                            engine.analyze(&check.text, &check.context)
                        }));
                        let result = outcome.unwrap_or_else(|_| {
                            tracing::warn!("Queued check panicked; serving rule-based result");
                            engine.rule_based(Mode::Grammar, &check.text)
                        });
                        let _ = check.reply.send(result);
                    }
                });
            match spawned {
                Ok(_) => true,
                Err(e) => {
                    tracing::warn!("Failed to start queue thread: {}", e);
                    false
                }
            }
        })
    }

    fn cache_lock(&self) -> MutexGuard<'_, ResultCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for AnalysisEngine {
    fn drop(&mut self) {
        self.queue.close();
    }
}

/// Cut `text` to at most `max` characters.
fn truncate_chars(text: &str, max: usize) -> (&str, bool) {
    match text.char_indices().nth(max) {
        Some((byte, _)) => (&text[..byte], true),
        None => (text, false),
    }
}
