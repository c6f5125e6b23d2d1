//! Bounded pool of live model sessions.
//!
//! Model sessions are expensive to create and the host caps how many may be
//! alive, so sessions are pooled per capability kind and handed out as
//! leases.
//!
//! # Design
//!
//! - At most `max_per_kind` live sessions per kind; sessions still being
//!   constructed count toward the cap
//! - A free session is reused only for requests with equal `SessionOptions`
//! - When the pool is full, `acquire` waits on a condition variable until a
//!   lease is returned or the acquire timeout passes (then `Ok(None)`)
//! - Dropping a `SessionLease` returns it, so cleanup happens on every path
//! - Sessions idle past the timeout are destroyed by a sweep that runs on
//!   each pool operation and, optionally, on a background reaper thread
//!
//! Session destructors are always called outside the pool lock.

use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::config::PoolConfig;

use super::backend::{BackendResult, CapabilityKind, CapabilityProvider, ModelSession, SessionOptions};

/// Runtime pool limits.
#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub max_per_kind: usize,
    pub idle_timeout: Duration,
    pub acquire_timeout: Duration,
    /// Upper bound between re-checks while waiting for a slot
    pub poll_interval: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self::from(&PoolConfig::default())
    }
}

impl From<&PoolConfig> for PoolSettings {
    fn from(config: &PoolConfig) -> Self {
        Self {
            max_per_kind: config.max_sessions_per_kind,
            idle_timeout: config.idle_timeout(),
            acquire_timeout: config.acquire_timeout(),
            poll_interval: config.poll_interval(),
        }
    }
}

/// Lifecycle state of a pooled session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    Available,
    InUse,
    Destroyed,
}

/// Point-in-time counts for one capability kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub live: usize,
    pub in_use: usize,
    pub available: usize,
    /// Sessions whose construction is in flight
    pub creating: usize,
}

struct SessionHandle {
    id: u64,
    options: SessionOptions,
    session: Arc<dyn ModelSession>,
    created_at: Instant,
    last_used: Instant,
    state: HandleState,
}

impl SessionHandle {
    fn is_idle_expired(&self, now: Instant, timeout: Duration) -> bool {
        self.state == HandleState::Available && now.duration_since(self.last_used) >= timeout
    }
}

#[derive(Default)]
struct PoolState {
    handles: HashMap<CapabilityKind, Vec<SessionHandle>>,
    creating: HashMap<CapabilityKind, usize>,
    next_id: u64,
}

impl PoolState {
    fn live_count(&self, kind: CapabilityKind) -> usize {
        let pooled = self.handles.get(&kind).map_or(0, |handles| {
            handles
                .iter()
                .filter(|h| h.state != HandleState::Destroyed)
                .count()
        });
        pooled + self.creating.get(&kind).copied().unwrap_or(0)
    }

    /// Claim a free session with matching options.
    fn take_reusable(
        &mut self,
        kind: CapabilityKind,
        options: &SessionOptions,
    ) -> Option<(u64, Arc<dyn ModelSession>)> {
        let handle = self
            .handles
            .get_mut(&kind)?
            .iter_mut()
            .find(|h| h.state == HandleState::Available && h.options == *options)?;
        handle.state = HandleState::InUse;
        handle.last_used = Instant::now();
        Some((handle.id, Arc::clone(&handle.session)))
    }

    /// Mark expired sessions destroyed, compact, and return them for teardown.
    fn collect_idle(
        &mut self,
        kind: CapabilityKind,
        timeout: Duration,
        now: Instant,
    ) -> Vec<Arc<dyn ModelSession>> {
        let Some(handles) = self.handles.get_mut(&kind) else {
            return Vec::new();
        };

        let mut expired = Vec::new();
        for handle in handles.iter_mut() {
            if handle.is_idle_expired(now, timeout) {
                handle.state = HandleState::Destroyed;
                tracing::debug!(
                    %kind,
                    id = handle.id,
                    age_ms = now.duration_since(handle.created_at).as_millis() as u64,
                    "Destroying idle session"
                );
                expired.push(Arc::clone(&handle.session));
            }
        }
        handles.retain(|h| h.state != HandleState::Destroyed);
        expired
    }
}

/// Per-kind pool of model sessions.
pub struct SessionPool {
    provider: Arc<dyn CapabilityProvider>,
    settings: PoolSettings,
    state: Mutex<PoolState>,
    released: Condvar,
}

impl SessionPool {
    pub fn new(provider: Arc<dyn CapabilityProvider>, settings: PoolSettings) -> Self {
        Self {
            provider,
            settings,
            state: Mutex::new(PoolState::default()),
            released: Condvar::new(),
        }
    }

    pub fn settings(&self) -> &PoolSettings {
        &self.settings
    }

    /// Lease a session for `kind` created with `options`.
    ///
    /// Reuses a free matching session, creates one if the kind is below its
    /// cap, or waits for a release. Returns `Ok(None)` if nothing frees up
    /// before the acquire timeout. Construction errors are returned as-is.
    pub fn acquire(
        &self,
        kind: CapabilityKind,
        options: &SessionOptions,
    ) -> BackendResult<Option<SessionLease<'_>>> {
        self.sweep_all();

        let started = Instant::now();
        let deadline = started + self.settings.acquire_timeout;
        let mut state = self.lock_state();

        loop {
            if let Some((id, session)) = state.take_reusable(kind, options) {
                tracing::debug!(%kind, id, "Reusing pooled session");
                return Ok(Some(SessionLease::new(self, kind, id, session)));
            }

            if state.live_count(kind) < self.settings.max_per_kind {
                *state.creating.entry(kind).or_default() += 1;
                drop(state);
                return self.create(kind, options).map(Some);
            }

            let now = Instant::now();
            if now >= deadline {
                tracing::debug!(
                    %kind,
                    waited_ms = started.elapsed().as_millis() as u64,
                    "Timed out waiting for a pooled session"
                );
                return Ok(None);
            }

            let wait = (deadline - now).min(self.settings.poll_interval);
            state = match self.released.wait_timeout(state, wait) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }

    /// Return a lease to the pool. Same as dropping it.
    pub fn release(&self, lease: SessionLease<'_>) {
        drop(lease);
    }

    /// Destroy free sessions of `kind` that have been idle past the timeout.
    ///
    /// Returns how many sessions were destroyed.
    pub fn idle_sweep(&self, kind: CapabilityKind) -> usize {
        let expired = self
            .lock_state()
            .collect_idle(kind, self.settings.idle_timeout, Instant::now());
        Self::teardown(expired)
    }

    /// Run `idle_sweep` for every kind.
    pub fn sweep_all(&self) -> usize {
        let now = Instant::now();
        let expired: Vec<_> = {
            let mut state = self.lock_state();
            CapabilityKind::ALL
                .iter()
                .flat_map(|kind| state.collect_idle(*kind, self.settings.idle_timeout, now))
                .collect()
        };
        Self::teardown(expired)
    }

    /// Destroy every session, including leased ones.
    ///
    /// Outstanding leases stay usable as far as the backend allows, but are
    /// not returned to the pool when dropped.
    pub fn destroy_all(&self) -> usize {
        let sessions: Vec<_> = {
            let mut state = self.lock_state();
            state
                .handles
                .drain()
                .flat_map(|(_, handles)| handles)
                .filter(|h| h.state != HandleState::Destroyed)
                .map(|h| h.session)
                .collect()
        };
        let destroyed = Self::teardown(sessions);
        if destroyed > 0 {
            tracing::debug!(destroyed, "Destroyed all pooled sessions");
        }
        self.released.notify_all();
        destroyed
    }

    /// Counts for one kind.
    pub fn stats(&self, kind: CapabilityKind) -> PoolStats {
        let state = self.lock_state();
        let handles = state.handles.get(&kind).map(Vec::as_slice).unwrap_or(&[]);
        let count = |wanted: HandleState| handles.iter().filter(|h| h.state == wanted).count();
        PoolStats {
            live: state.live_count(kind),
            in_use: count(HandleState::InUse),
            available: count(HandleState::Available),
            creating: state.creating.get(&kind).copied().unwrap_or(0),
        }
    }

    fn create(&self, kind: CapabilityKind, options: &SessionOptions) -> BackendResult<SessionLease<'_>> {
        let created = self.provider.create_session(kind, options);

        let mut state = self.lock_state();
        if let Some(pending) = state.creating.get_mut(&kind) {
            *pending = pending.saturating_sub(1);
        }

        match created {
            Ok(session) => {
                let session: Arc<dyn ModelSession> = Arc::from(session);
                state.next_id += 1;
                let id = state.next_id;
                let now = Instant::now();
                state.handles.entry(kind).or_default().push(SessionHandle {
                    id,
                    options: options.clone(),
                    session: Arc::clone(&session),
                    created_at: now,
                    last_used: now,
                    state: HandleState::InUse,
                });
                tracing::debug!(%kind, id, provider = self.provider.name(), "Created session");
                Ok(SessionLease::new(self, kind, id, session))
            }
            Err(e) => {
                drop(state);
                // The reserved slot is free again
                self.released.notify_one();
                tracing::debug!(%kind, "Session creation failed: {}", e);
                Err(e)
            }
        }
    }

    fn release_handle(&self, kind: CapabilityKind, id: u64) {
        let expired: Vec<_> = {
            let mut state = self.lock_state();
            if let Some(handle) = state
                .handles
                .get_mut(&kind)
                .and_then(|handles| handles.iter_mut().find(|h| h.id == id))
            {
                if handle.state == HandleState::InUse {
                    handle.state = HandleState::Available;
                    handle.last_used = Instant::now();
                }
            }

            let now = Instant::now();
            CapabilityKind::ALL
                .iter()
                .flat_map(|k| state.collect_idle(*k, self.settings.idle_timeout, now))
                .collect()
        };
        self.released.notify_all();
        Self::teardown(expired);
    }

    fn teardown(sessions: Vec<Arc<dyn ModelSession>>) -> usize {
        let count = sessions.len();
        for session in sessions {
            session.destroy();
        }
        count
    }

    fn lock_state(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for SessionPool {
    fn drop(&mut self) {
        self.destroy_all();
    }
}

/// A session checked out of the pool.
///
/// Returned to the pool when dropped.
pub struct SessionLease<'a> {
    pool: &'a SessionPool,
    kind: CapabilityKind,
    id: u64,
    session: Arc<dyn ModelSession>,
}

impl<'a> SessionLease<'a> {
    fn new(pool: &'a SessionPool, kind: CapabilityKind, id: u64, session: Arc<dyn ModelSession>) -> Self {
        Self {
            pool,
            kind,
            id,
            session,
        }
    }

    pub fn kind(&self) -> CapabilityKind {
        self.kind
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Run the session's primary analyze call.
    pub fn analyze(&self, input: &str, context: &str) -> BackendResult<String> {
        self.session.analyze(input, context)
    }
}

impl Drop for SessionLease<'_> {
    fn drop(&mut self) {
        self.pool.release_handle(self.kind, self.id);
    }
}

impl std::fmt::Debug for SessionLease<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionLease")
            .field("kind", &self.kind)
            .field("id", &self.id)
            .finish()
    }
}

/// Background thread that periodically sweeps idle sessions.
///
/// Holds only a weak reference to the pool; stops when the pool is dropped
/// or when this handle is stopped or dropped.
pub struct ReaperHandle {
    stop: Arc<(Mutex<bool>, Condvar)>,
    thread: Option<JoinHandle<()>>,
}

impl ReaperHandle {
    /// Signal the reaper and wait for it to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let (flag, signal) = &*self.stop;
        *flag.lock().unwrap_or_else(PoisonError::into_inner) = true;
        signal.notify_all();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for ReaperHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Start a reaper thread sweeping `pool` every `interval`.
pub fn spawn_reaper(pool: &Arc<SessionPool>, interval: Duration) -> std::io::Result<ReaperHandle> {
    let weak: Weak<SessionPool> = Arc::downgrade(pool);
    let stop = Arc::new((Mutex::new(false), Condvar::new()));
    let thread_stop = Arc::clone(&stop);

    let thread = thread::Builder::new()
        .name("session-reaper".to_string())
        .spawn(move || {
            let (flag, signal) = &*thread_stop;
            loop {
                {
                    let stopped = flag.lock().unwrap_or_else(PoisonError::into_inner);
                    let (stopped, _) = signal
                        .wait_timeout_while(stopped, interval, |stopped| !*stopped)
                        .unwrap_or_else(PoisonError::into_inner);
                    if *stopped {
                        return;
                    }
                }
                match weak.upgrade() {
                    Some(pool) => {
                        let destroyed = pool.sweep_all();
                        if destroyed > 0 {
                            tracing::debug!(destroyed, "Reaper destroyed idle sessions");
                        }
                    }
                    None => return,
                }
            }
        })?;

    Ok(ReaperHandle {
        stop,
        thread: Some(thread),
    })
}
