//! Usage statistics for the analysis engine.
//!
//! Tracks how many checks ran, how many issues they found, how often the
//! cache answered, and how often the fallback had to step in.
//!
//! # Latency
//!
//! Average latency covers checks that did real work (model or fallback).
//! Cache hits are counted but excluded from the average.

use serde::Serialize;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Point-in-time usage statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub checks_performed: u64,
    pub issues_found: u64,
    pub cache_hits: u64,
    pub average_latency_ms: f64,
    pub fallbacks: u64,
}

impl Stats {
    /// Fraction of checks served from cache (0.0 - 1.0).
    pub fn cache_hit_rate(&self) -> f64 {
        if self.checks_performed == 0 {
            0.0
        } else {
            self.cache_hits as f64 / self.checks_performed as f64
        }
    }

    /// Format stats for display.
    pub fn format_summary(&self) -> String {
        let mut output = String::new();

        output.push_str("\nAnalysis Summary:\n");
        output.push_str(&format!("   Checks performed: {}\n", self.checks_performed));
        output.push_str(&format!("   Issues found: {}\n", self.issues_found));
        output.push_str(&format!(
            "   Average latency: {:.1} ms\n",
            self.average_latency_ms
        ));

        if self.cache_hits > 0 {
            output.push_str(&format!(
                "   Cache hits: {} ({:.0}%)\n",
                self.cache_hits,
                self.cache_hit_rate() * 100.0
            ));
        }
        if self.fallbacks > 0 {
            output.push_str(&format!("   Fallbacks: {}\n", self.fallbacks));
        }

        output
    }
}

#[derive(Debug, Default)]
struct Counters {
    checks_performed: u64,
    issues_found: u64,
    cache_hits: u64,
    fallbacks: u64,
    timed_checks: u64,
    total_latency: Duration,
}

/// Thread-safe stats accumulator.
///
/// Updates recover from a poisoned lock instead of failing, so recording
/// stats can never break an analysis call.
#[derive(Debug, Default)]
pub struct StatsTracker {
    counters: Mutex<Counters>,
}

impl StatsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a check that ran the pipeline (model or fallback).
    pub fn record_check(&self, issues: usize, latency: Duration) {
        self.update(|c| {
            c.checks_performed += 1;
            c.issues_found += issues as u64;
            c.timed_checks += 1;
            c.total_latency += latency;
        });
    }

    /// Record a check answered from cache.
    pub fn record_cache_hit(&self, issues: usize) {
        self.update(|c| {
            c.checks_performed += 1;
            c.issues_found += issues as u64;
            c.cache_hits += 1;
        });
    }

    /// Record that a call was served by the fallback analyzer.
    pub fn record_fallback(&self) {
        self.update(|c| c.fallbacks += 1);
    }

    pub fn snapshot(&self) -> Stats {
        let c = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        let average_latency_ms = if c.timed_checks > 0 {
            c.total_latency.as_secs_f64() * 1000.0 / c.timed_checks as f64
        } else {
            0.0
        };
        Stats {
            checks_performed: c.checks_performed,
            issues_found: c.issues_found,
            cache_hits: c.cache_hits,
            average_latency_ms,
            fallbacks: c.fallbacks,
        }
    }

    fn update(&self, f: impl FnOnce(&mut Counters)) {
        let mut counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut counters);
    }
}
