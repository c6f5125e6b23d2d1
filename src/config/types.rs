//! Configuration type definitions and defaults

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub features: FeatureFlags,
}

/// Analysis pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Input is cut to this many characters before analysis
    #[serde(default = "default_max_text_chars")]
    pub max_text_chars: usize,
    /// Token budget of a single model call
    #[serde(default = "default_token_limit")]
    pub token_limit: usize,
    /// Tokens of leading context repeated from the previous chunk
    #[serde(default = "default_overlap_tokens")]
    pub overlap_tokens: usize,
    /// How far back (in characters) to look for a natural break
    #[serde(default = "default_boundary_window")]
    pub boundary_window: usize,
}

pub fn default_max_text_chars() -> usize {
    5000
}

pub fn default_token_limit() -> usize {
    900
}

pub fn default_overlap_tokens() -> usize {
    25
}

pub fn default_boundary_window() -> usize {
    100
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_text_chars: default_max_text_chars(),
            token_limit: default_token_limit(),
            overlap_tokens: default_overlap_tokens(),
            boundary_window: default_boundary_window(),
        }
    }
}

/// Session pool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Live sessions allowed per capability kind
    #[serde(default = "default_max_sessions_per_kind")]
    pub max_sessions_per_kind: usize,
    /// Idle sessions are destroyed after this many seconds
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    /// Longest an acquire waits for a free slot
    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,
    /// Upper bound between re-checks while waiting
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Background reaper period (0 disables the reaper thread)
    #[serde(default = "default_reaper_interval_secs")]
    pub reaper_interval_secs: u64,
}

pub fn default_max_sessions_per_kind() -> usize {
    3
}

pub fn default_idle_timeout_secs() -> u64 {
    45
}

pub fn default_acquire_timeout_ms() -> u64 {
    5000
}

pub fn default_poll_interval_ms() -> u64 {
    100
}

pub fn default_reaper_interval_secs() -> u64 {
    15
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_sessions_per_kind: default_max_sessions_per_kind(),
            idle_timeout_secs: default_idle_timeout_secs(),
            acquire_timeout_ms: default_acquire_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            reaper_interval_secs: default_reaper_interval_secs(),
        }
    }
}

impl PoolConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn reaper_interval(&self) -> Option<Duration> {
        (self.reaper_interval_secs > 0).then(|| Duration::from_secs(self.reaper_interval_secs))
    }
}

/// Result cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
}

pub fn default_cache_capacity() -> usize {
    100
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
        }
    }
}

/// Feature toggles owned by the host settings.
///
/// The engine only reads these. A disabled surface never touches the model
/// backend and is served by the rule-based analyzer instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureFlags {
    /// Master switch for model-backed analysis
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub grammar: bool,
    #[serde(default = "default_true")]
    pub error_analysis: bool,
    #[serde(default = "default_true")]
    pub tone: bool,
}

pub fn default_true() -> bool {
    true
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            enabled: true,
            grammar: true,
            error_analysis: true,
            tone: true,
        }
    }
}

impl Config {
    /// Validate configuration values.
    ///
    /// Returns `Ok(())` if all values are within acceptable bounds,
    /// or an error describing the first invalid value found.
    pub fn validate(&self) -> Result<(), String> {
        if self.engine.max_text_chars == 0 {
            return Err("engine.max_text_chars must be > 0".to_string());
        }
        if self.engine.token_limit == 0 {
            return Err("engine.token_limit must be > 0".to_string());
        }
        if self.engine.overlap_tokens >= self.engine.token_limit {
            return Err(format!(
                "engine.overlap_tokens {} must be below engine.token_limit {}",
                self.engine.overlap_tokens, self.engine.token_limit
            ));
        }
        if self.pool.max_sessions_per_kind == 0 {
            return Err("pool.max_sessions_per_kind must be > 0".to_string());
        }
        if !(30..=60).contains(&self.pool.idle_timeout_secs) {
            return Err(format!(
                "pool.idle_timeout_secs {} must be between 30 and 60",
                self.pool.idle_timeout_secs
            ));
        }
        if self.pool.poll_interval_ms == 0 {
            return Err("pool.poll_interval_ms must be > 0".to_string());
        }
        if self.cache.capacity == 0 {
            return Err("cache.capacity must be > 0".to_string());
        }
        Ok(())
    }
}
