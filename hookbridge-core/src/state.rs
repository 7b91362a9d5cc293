//! Subscription state
//!
//! A single `(identifier, generation)` pair behind one lock. Every read and
//! every transition works on the whole pair, so an identifier is never
//! observed next to a generation it does not belong to.

use parking_lot::RwLock;
use std::fmt;

/// Identifier reported while a subscribe call awaits its confirmation.
pub const PENDING_CONFIRMATION: &str = "pending confirmation";

/// Broker-assigned subscription identifier
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Identifier {
    /// No subscribe call issued yet
    #[default]
    Empty,
    /// Subscribe call issued, confirmation not yet received
    Pending,
    /// Confirmed subscription identifier (e.g. an SNS subscription ARN)
    Confirmed(String),
}

impl Identifier {
    pub fn as_str(&self) -> &str {
        match self {
            Identifier::Empty => "",
            Identifier::Pending => PENDING_CONFIRMATION,
            Identifier::Confirmed(value) => value,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self, Identifier::Confirmed(_))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Consistent view of the state at one instant
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Snapshot {
    pub identifier: Identifier,
    pub generation: u64,
}

impl Snapshot {
    pub fn is_ready(&self) -> bool {
        self.identifier.is_confirmed()
    }
}

/// Current subscription identifier and generation.
///
/// Shared by the confirmation handler, the manager and the publish worker.
#[derive(Debug, Default)]
pub struct SubscriptionState {
    inner: RwLock<Snapshot>,
}

impl SubscriptionState {
    /// Empty identifier at generation 0.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&self) -> Snapshot {
        self.inner.read().clone()
    }

    pub fn generation(&self) -> u64 {
        self.inner.read().generation
    }

    /// Advance to the next generation and mark it pending.
    ///
    /// Returns the new generation. Concurrent callers each get a distinct
    /// generation.
    pub fn begin_generation(&self) -> u64 {
        let mut inner = self.inner.write();
        inner.generation += 1;
        inner.identifier = Identifier::Pending;
        inner.generation
    }

    /// Mark `generation` pending.
    ///
    /// Generations never move backwards: a generation older than the
    /// current one is ignored and `false` is returned.
    pub fn store_pending(&self, generation: u64) -> bool {
        let mut inner = self.inner.write();
        if generation < inner.generation {
            return false;
        }
        inner.generation = generation;
        inner.identifier = Identifier::Pending;
        true
    }

    /// Record the confirmed identifier for `generation`.
    ///
    /// No-op returning `false` when `generation` is not the current
    /// generation, or when `identifier` is empty or the pending sentinel.
    pub fn store_confirmed(&self, identifier: &str, generation: u64) -> bool {
        if identifier.is_empty() || identifier == PENDING_CONFIRMATION {
            return false;
        }

        let mut inner = self.inner.write();
        if inner.generation != generation {
            return false;
        }
        inner.identifier = Identifier::Confirmed(identifier.to_string());
        true
    }

    pub fn is_ready(&self) -> bool {
        self.inner.read().is_ready()
    }

    /// Ready, and `generation` is still the current generation.
    pub fn is_ready_for(&self, generation: u64) -> bool {
        let inner = self.inner.read();
        inner.generation == generation && inner.is_ready()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_initial_state() {
        let state = SubscriptionState::new();
        let snapshot = state.load();
        assert_eq!(snapshot.identifier, Identifier::Empty);
        assert_eq!(snapshot.generation, 0);
        assert!(!state.is_ready());
    }

    #[test]
    fn test_begin_generation_marks_pending() {
        let state = SubscriptionState::new();
        assert_eq!(state.begin_generation(), 1);
        assert_eq!(state.load().identifier, Identifier::Pending);
        assert_eq!(state.load().identifier.as_str(), "pending confirmation");
        assert!(!state.is_ready());
        assert_eq!(state.begin_generation(), 2);
    }

    #[test]
    fn test_store_confirmed_current_generation() {
        let state = SubscriptionState::new();
        let generation = state.begin_generation();

        assert!(state.store_confirmed("arn-123", generation));
        assert!(state.is_ready());
        assert!(state.is_ready_for(generation));
        assert_eq!(
            state.load(),
            Snapshot {
                identifier: Identifier::Confirmed("arn-123".to_string()),
                generation,
            }
        );
    }

    #[test]
    fn test_store_confirmed_stale_generation_ignored() {
        let state = SubscriptionState::new();
        let old = state.begin_generation();
        let current = state.begin_generation();

        assert!(!state.store_confirmed("arn-old", old));
        assert!(!state.is_ready());
        assert_eq!(state.load().generation, current);
        assert_eq!(state.load().identifier, Identifier::Pending);
    }

    #[test]
    fn test_store_confirmed_rejects_sentinels() {
        let state = SubscriptionState::new();
        let generation = state.begin_generation();

        assert!(!state.store_confirmed("", generation));
        assert!(!state.store_confirmed(PENDING_CONFIRMATION, generation));
        assert!(!state.is_ready());
    }

    #[test]
    fn test_resubscribe_resets_readiness() {
        let state = SubscriptionState::new();
        let first = state.begin_generation();
        state.store_confirmed("arn-1", first);
        assert!(state.is_ready());

        let second = state.begin_generation();
        assert!(!state.is_ready());
        assert!(!state.is_ready_for(first));
        assert!(!state.is_ready_for(second));
    }

    #[test]
    fn test_store_pending_is_monotonic() {
        let state = SubscriptionState::new();
        assert!(state.store_pending(5));
        assert_eq!(state.generation(), 5);

        assert!(!state.store_pending(3));
        assert_eq!(state.generation(), 5);

        assert!(state.store_confirmed("arn-5", 5));
        assert!(state.store_pending(5));
        assert!(!state.is_ready());
    }

    #[test]
    fn test_concurrent_begin_generation_distinct() {
        let state = Arc::new(SubscriptionState::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let state = Arc::clone(&state);
                std::thread::spawn(move || {
                    (0..100)
                        .map(|_| state.begin_generation())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut all: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        all.sort_unstable();
        all.dedup();

        assert_eq!(all.len(), 800);
        assert_eq!(state.generation(), 800);
    }

    #[test]
    fn test_concurrent_confirmations_never_tear() {
        let state = Arc::new(SubscriptionState::new());
        let generation = state.begin_generation();

        let writers: Vec<_> = ["arn-a", "arn-b"]
            .into_iter()
            .map(|arn| {
                let state = Arc::clone(&state);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        state.store_confirmed(arn, generation);
                    }
                })
            })
            .collect();

        for _ in 0..1000 {
            let snapshot = state.load();
            assert_eq!(snapshot.generation, generation);
            assert!(matches!(
                snapshot.identifier.as_str(),
                "arn-a" | "arn-b" | PENDING_CONFIRMATION
            ));
        }

        for writer in writers {
            writer.join().unwrap();
        }

        let last = state.load();
        assert!(matches!(last.identifier.as_str(), "arn-a" | "arn-b"));
        assert_eq!(last.generation, generation);
    }
}
