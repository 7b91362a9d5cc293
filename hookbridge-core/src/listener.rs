//! Subscription lifecycle listeners

use std::sync::Arc;

/// Transition reported by the subscription manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateEvent {
    /// A subscribe call for `generation` is about to be issued
    Pending { generation: u64 },
    /// The broker rejected the subscribe call for `generation`
    SubscribeFailed { generation: u64 },
    /// `generation` is confirmed and publishing is live
    Ready { generation: u64, identifier: String },
    /// A confirmation for `generation` arrived after `current` began
    Stale { generation: u64, current: u64 },
    /// The publish worker for `generation` was stopped
    Retired { generation: u64 },
}

impl StateEvent {
    pub fn generation(&self) -> u64 {
        match self {
            StateEvent::Pending { generation }
            | StateEvent::SubscribeFailed { generation }
            | StateEvent::Ready { generation, .. }
            | StateEvent::Stale { generation, .. }
            | StateEvent::Retired { generation } => *generation,
        }
    }
}

/// Sink for lifecycle events
pub type StateListener = Arc<dyn Fn(&StateEvent) + Send + Sync>;

fn noop(_: &StateEvent) {}

/// Aggregate zero or more listeners into one, called in order.
///
/// With no listeners a no-op is returned, so call sites never check.
pub fn listeners(listeners: Vec<StateListener>) -> StateListener {
    match listeners.len() {
        0 => Arc::new(noop),
        1 => listeners.into_iter().next().unwrap_or_else(|| Arc::new(noop)),
        _ => Arc::new(move |event: &StateEvent| {
            for listener in &listeners {
                listener(event);
            }
        }),
    }
}

/// Listener that reports every event through `tracing`.
pub fn logging_listener() -> StateListener {
    Arc::new(|event: &StateEvent| match event {
        StateEvent::Pending { generation } => {
            tracing::info!(generation, "Subscription pending confirmation")
        }
        StateEvent::SubscribeFailed { generation } => {
            tracing::warn!(generation, "Subscribe call failed; call subscribe again to retry")
        }
        StateEvent::Ready {
            generation,
            identifier,
        } => tracing::info!(generation, identifier = %identifier, "Subscription ready"),
        StateEvent::Stale {
            generation,
            current,
        } => tracing::info!(generation, current, "Ignoring confirmation for superseded generation"),
        StateEvent::Retired { generation } => {
            tracing::debug!(generation, "Publish worker retired")
        }
    })
}
