//! Bounded LRU cache of analysis results.
//!
//! Keys are content hashes of (mode, context, text), so identical requests
//! are answered without touching the model. LRU order is kept in a
//! `VecDeque` (front = oldest, back = newest) next to the entry map.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use super::result::AnalysisResult;

/// Analysis surface a cached result belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheMode {
    Grammar,
    ErrorLog,
}

impl CacheMode {
    fn tag(&self) -> &'static str {
        match self {
            CacheMode::Grammar => "grammar",
            CacheMode::ErrorLog => "error-log",
        }
    }
}

/// Content hash identifying one analysis request.
pub type CacheKey = String;

/// Build the cache key for a request.
///
/// Fields are length-prefixed so no two distinct requests share a key.
pub fn cache_key(mode: CacheMode, context: &str, text: &str) -> CacheKey {
    let mut hasher = Sha256::new();
    for part in [mode.tag(), context, text] {
        hasher.update((part.len() as u64).to_le_bytes());
        hasher.update(part.as_bytes());
    }
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

struct CacheEntry {
    result: AnalysisResult,
    stored_at: DateTime<Utc>,
}

/// LRU cache of model-produced analysis results.
pub struct ResultCache {
    /// Cached entries (key -> entry)
    entries: HashMap<CacheKey, CacheEntry>,
    /// LRU order (front = oldest, back = newest)
    lru_order: VecDeque<CacheKey>,
    capacity: usize,
}

impl ResultCache {
    /// Create a cache holding at most `capacity` results (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            lru_order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Look up a result and mark it most recently used.
    ///
    /// The returned copy is flagged as cached, stamped with the time it was
    /// stored.
    pub fn get(&mut self, key: &str) -> Option<AnalysisResult> {
        let entry = self.entries.get(key)?;
        let mut result = entry.result.clone();
        result.cached = true;
        result.cached_at = Some(entry.stored_at);
        self.touch(key);
        Some(result)
    }

    /// Store a result, evicting the least recently used entry when full.
    pub fn put(&mut self, key: CacheKey, result: AnalysisResult) {
        let stored_at = Utc::now();
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.result = result;
            entry.stored_at = stored_at;
            self.touch(&key);
            return;
        }

        while self.entries.len() >= self.capacity {
            match self.lru_order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }

        self.entries.insert(key.clone(), CacheEntry { result, stored_at });
        self.lru_order.push_back(key);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.lru_order.clear();
    }

    /// Move a key to the back of the LRU queue (most recently used)
    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.lru_order.iter().position(|k| k == key) {
            if let Some(k) = self.lru_order.remove(pos) {
                self.lru_order.push_back(k);
            }
        }
    }
}
