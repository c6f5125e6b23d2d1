//! Test helper utilities

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use lexicheck::analyzer::{
    Availability, BackendError, BackendResult, CapabilityKind, CapabilityProvider, ModelSession,
    SessionOptions,
};
use lexicheck::{AnalysisEngine, Config};

type Responder = dyn Fn(&str, &str) -> BackendResult<String> + Send + Sync;

/// Counters shared between a provider and the sessions it creates.
#[derive(Default)]
pub struct Counters {
    pub probes: AtomicUsize,
    pub create_attempts: AtomicUsize,
    pub created: AtomicUsize,
    pub destroyed: AtomicUsize,
    pub live: AtomicUsize,
    pub max_live: AtomicUsize,
    pub calls: AtomicUsize,
    pub inputs: Mutex<Vec<String>>,
}

/// Capability provider with scripted availability and responses.
pub struct ScriptedProvider {
    availability: HashMap<CapabilityKind, Availability>,
    probe_failures: Vec<CapabilityKind>,
    reject_create: bool,
    responder: Arc<Responder>,
    pub counters: Arc<Counters>,
}

impl ScriptedProvider {
    /// Provider with every kind unavailable and an empty-list responder.
    pub fn new() -> Self {
        Self {
            availability: HashMap::new(),
            probe_failures: Vec::new(),
            reject_create: false,
            responder: Arc::new(|_, _| Ok("[]".to_string())),
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn with_kind(mut self, kind: CapabilityKind, state: Availability) -> Self {
        self.availability.insert(kind, state);
        self
    }

    pub fn failing_probe(mut self, kind: CapabilityKind) -> Self {
        self.probe_failures.push(kind);
        self
    }

    pub fn rejecting_create(mut self) -> Self {
        self.reject_create = true;
        self
    }

    pub fn responding<F>(mut self, responder: F) -> Self
    where
        F: Fn(&str, &str) -> BackendResult<String> + Send + Sync + 'static,
    {
        self.responder = Arc::new(responder);
        self
    }

    pub fn calls(&self) -> usize {
        self.counters.calls.load(Ordering::SeqCst)
    }

    pub fn create_attempts(&self) -> usize {
        self.counters.create_attempts.load(Ordering::SeqCst)
    }

    pub fn created(&self) -> usize {
        self.counters.created.load(Ordering::SeqCst)
    }

    pub fn destroyed(&self) -> usize {
        self.counters.destroyed.load(Ordering::SeqCst)
    }

    pub fn max_live(&self) -> usize {
        self.counters.max_live.load(Ordering::SeqCst)
    }

    pub fn probes(&self) -> usize {
        self.counters.probes.load(Ordering::SeqCst)
    }

    pub fn inputs(&self) -> Vec<String> {
        self.counters.inputs.lock().unwrap().clone()
    }
}

impl CapabilityProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn availability(&self, kind: CapabilityKind) -> BackendResult<Availability> {
        self.counters.probes.fetch_add(1, Ordering::SeqCst);
        if self.probe_failures.contains(&kind) {
            return Err(BackendError::Call("probe crashed".to_string()));
        }
        Ok(self
            .availability
            .get(&kind)
            .copied()
            .unwrap_or(Availability::Unavailable))
    }

    fn create_session(
        &self,
        kind: CapabilityKind,
        _options: &SessionOptions,
    ) -> BackendResult<Box<dyn ModelSession>> {
        self.counters.create_attempts.fetch_add(1, Ordering::SeqCst);
        if self.reject_create {
            return Err(BackendError::SessionCreation {
                kind,
                reason: "factory rejected".to_string(),
            });
        }
        self.counters.created.fetch_add(1, Ordering::SeqCst);
        let live = self.counters.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.max_live.fetch_max(live, Ordering::SeqCst);
        Ok(Box::new(ScriptedSession {
            responder: Arc::clone(&self.responder),
            counters: Arc::clone(&self.counters),
        }))
    }
}

struct ScriptedSession {
    responder: Arc<Responder>,
    counters: Arc<Counters>,
}

impl ModelSession for ScriptedSession {
    fn analyze(&self, input: &str, context: &str) -> BackendResult<String> {
        self.counters.calls.fetch_add(1, Ordering::SeqCst);
        self.counters.inputs.lock().unwrap().push(input.to_string());
        (self.responder)(input, context)
    }

    fn destroy(&self) {
        self.counters.destroyed.fetch_add(1, Ordering::SeqCst);
        self.counters.live.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Config for tests: no reaper thread and a short acquire timeout.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.pool.reaper_interval_secs = 0;
    config.pool.acquire_timeout_ms = 200;
    config.pool.poll_interval_ms = 10;
    config
}

/// Build an engine over a shared scripted provider.
pub fn engine_with(config: Config, provider: &Arc<ScriptedProvider>) -> AnalysisEngine {
    let provider: Arc<dyn CapabilityProvider> = provider.clone();
    AnalysisEngine::new(config, provider)
}

/// JSON response with one spelling suggestion per "Teh" in `input`,
/// listed last to first so merge order is exercised.
pub fn teh_response(input: &str) -> String {
    let items: Vec<String> = input
        .rmatch_indices("Teh")
        .map(|(byte, _)| {
            let offset = input[..byte].chars().count();
            format!(
                r#"{{"type":"spelling","startIndex":{},"endIndex":{},"original":"Teh","replacement":"The"}}"#,
                offset,
                offset + 3
            )
        })
        .collect();
    format!("[{}]", items.join(","))
}
