//! Priority admission queue for background checks.
//!
//! Requests drain strictly by priority, FIFO within a priority. The engine
//! runs a single drain thread over this queue, so queued checks never add
//! pressure to the session pool beyond one request at a time.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Request priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Normal,
    Low,
}

impl Priority {
    fn lane(&self) -> usize {
        match self {
            Priority::High => 0,
            Priority::Normal => 1,
            Priority::Low => 2,
        }
    }
}

struct QueueState<T> {
    lanes: [VecDeque<T>; 3],
    closed: bool,
}

/// Blocking multi-lane FIFO.
pub struct RequestQueue<T> {
    state: Mutex<QueueState<T>>,
    ready: Condvar,
}

impl<T> Default for RequestQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RequestQueue<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                lanes: [VecDeque::new(), VecDeque::new(), VecDeque::new()],
                closed: false,
            }),
            ready: Condvar::new(),
        }
    }

    /// Enqueue an item. Hands it back if the queue is closed.
    pub fn push(&self, item: T, priority: Priority) -> Result<(), T> {
        let mut state = self.lock();
        if state.closed {
            return Err(item);
        }
        state.lanes[priority.lane()].push_back(item);
        drop(state);
        self.ready.notify_one();
        Ok(())
    }

    /// Take the next item, blocking while the queue is empty.
    ///
    /// Returns `None` once the queue is closed.
    pub fn pop(&self) -> Option<T> {
        let mut state = self.lock();
        loop {
            if state.closed {
                return None;
            }
            if let Some(item) = state.lanes.iter_mut().find_map(VecDeque::pop_front) {
                return Some(item);
            }
            state = self
                .ready
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Take the next item without blocking.
    #[cfg(test)]
    fn try_pop(&self) -> Option<T> {
        let mut state = self.lock();
        if state.closed {
            return None;
        }
        state.lanes.iter_mut().find_map(VecDeque::pop_front)
    }

    /// Close the queue, dropping anything still waiting.
    pub fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        for lane in state.lanes.iter_mut() {
            lane.clear();
        }
        drop(state);
        self.ready.notify_all();
    }

    pub fn len(&self) -> usize {
        self.lock().lanes.iter().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, QueueState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle to a queued check.
///
/// Resolves to `None` only if the engine shut down before serving it.
#[derive(Debug)]
pub struct PendingCheck<R> {
    reply: Receiver<R>,
}

impl<R> PendingCheck<R> {
    pub(crate) fn new(reply: Receiver<R>) -> Self {
        Self { reply }
    }

    /// Block until the check completes.
    pub fn wait(self) -> Option<R> {
        self.reply.recv().ok()
    }

    /// Block for at most `timeout`. Gives the handle back on timeout.
    pub fn wait_timeout(self, timeout: Duration) -> Result<Option<R>, Self> {
        match self.reply.recv_timeout(timeout) {
            Ok(result) => Ok(Some(result)),
            Err(RecvTimeoutError::Disconnected) => Ok(None),
            Err(RecvTimeoutError::Timeout) => Err(self),
        }
    }
}
