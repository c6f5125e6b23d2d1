//! Capability availability registry.
//!
//! Each capability kind is probed at most once, on first query, and the
//! answer is kept for the registry's lifetime. A failed probe is recorded as
//! `Unavailable` for that kind only.

use std::sync::{Arc, OnceLock};

use super::backend::{Availability, CapabilityKind, CapabilityProvider};

/// Memoized availability for every capability kind.
pub struct CapabilityRegistry {
    provider: Arc<dyn CapabilityProvider>,
    states: [OnceLock<Availability>; 5],
}

impl CapabilityRegistry {
    /// Create a registry backed by a provider. Nothing is probed yet.
    pub fn new(provider: Arc<dyn CapabilityProvider>) -> Self {
        Self {
            provider,
            states: Default::default(),
        }
    }

    /// Availability of a kind, probing on first use.
    pub fn availability(&self, kind: CapabilityKind) -> Availability {
        *self.states[kind.index()].get_or_init(|| self.probe(kind))
    }

    /// Whether the kind exists at all (including when it still needs a download).
    pub fn is_available(&self, kind: CapabilityKind) -> bool {
        self.availability(kind) != Availability::Unavailable
    }

    /// Whether the kind can serve requests right now.
    pub fn is_ready(&self, kind: CapabilityKind) -> bool {
        self.availability(kind) == Availability::Available
    }

    /// Availability of every kind, probing any not yet seen.
    pub fn snapshot(&self) -> Vec<(CapabilityKind, Availability)> {
        CapabilityKind::ALL
            .iter()
            .map(|kind| (*kind, self.availability(*kind)))
            .collect()
    }

    fn probe(&self, kind: CapabilityKind) -> Availability {
        match self.provider.availability(kind) {
            Ok(state) => {
                tracing::debug!(
                    provider = self.provider.name(),
                    %kind,
                    %state,
                    "Probed capability"
                );
                state
            }
            Err(e) => {
                tracing::warn!(
                    provider = self.provider.name(),
                    %kind,
                    "Capability probe failed, treating as unavailable: {}",
                    e
                );
                Availability::Unavailable
            }
        }
    }
}

impl std::fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("provider", &self.provider.name())
            .field("states", &self.states)
            .finish()
    }
}
