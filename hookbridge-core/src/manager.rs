//! Subscription manager
//!
//! Owns the subscribe / confirm / publish lifecycle. Every `subscribe` call
//! opens a new generation: the state goes back to pending, the previous
//! publish worker is retired, and only a confirmation tagged with the new
//! generation can make the bridge ready again.

use crate::listener::{self, StateEvent, StateListener};
use crate::pipeline::{Enqueue, PipelineStats, PublishPipeline};
use crate::state::{PENDING_CONFIRMATION, Snapshot};
use crate::{BridgeConfig, BrokerClient, OutboundMessage, Result, SubscriptionState};
use hookbridge_pool::EncoderPool;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info, warn};

/// Result of a successful confirm call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// The generation was current; the bridge is now ready
    Confirmed { generation: u64, identifier: String },
    /// The broker accepted the token but a newer generation had begun
    Stale { generation: u64, current: u64 },
    /// The broker accepted the token after the manager shut down
    Closed { generation: u64 },
}

impl ConfirmOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, ConfirmOutcome::Confirmed { .. })
    }
}

/// Orchestrates subscription generations and the publish pipeline.
pub struct SubscriptionManager {
    config: BridgeConfig,
    broker: Arc<dyn BrokerClient>,
    state: Arc<SubscriptionState>,
    pipeline: PublishPipeline,
    listener: StateListener,
    encoders: EncoderPool,
    started: AtomicBool,
}

impl SubscriptionManager {
    /// Manager with an empty identifier at generation 0.
    pub fn new(config: BridgeConfig, broker: Arc<dyn BrokerClient>) -> Self {
        let capacity = config.queue_capacity;
        Self {
            config,
            broker,
            state: Arc::new(SubscriptionState::new()),
            pipeline: PublishPipeline::new(capacity),
            listener: listener::listeners(Vec::new()),
            encoders: EncoderPool::default(),
            started: AtomicBool::new(false),
        }
    }

    /// Replace the lifecycle listener. Compose several with
    /// [`listeners`](crate::listeners).
    pub fn with_listener(mut self, listener: StateListener) -> Self {
        self.listener = listener;
        self
    }

    /// Issue the first subscribe call. Later calls do nothing.
    pub async fn prepare_and_start(&self) {
        if self
            .started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Subscription manager already started");
            return;
        }

        info!(
            topic = %self.config.topic_arn,
            path = %self.config.webhook_path,
            "Starting subscription manager"
        );
        self.subscribe().await;
    }

    /// Start a new generation and ask the broker for a subscription.
    ///
    /// Failures are logged and reported to the listener; call again to retry.
    pub async fn subscribe(&self) {
        if self.pipeline.is_closed() {
            warn!("Subscribe called after shutdown; ignoring");
            return;
        }

        self.started.store(true, Ordering::Release);

        let generation = self.state.begin_generation();
        // Retired before returning, so nothing enqueued after this call
        // reaches the old worker.
        if let Some(retired) = self.pipeline.retire() {
            self.notify(StateEvent::Retired { generation: retired });
        }
        self.notify(StateEvent::Pending { generation });

        let callback_url = match self.config.callback_url(generation) {
            Ok(url) => url,
            Err(e) => {
                error!(generation, error = %e, "Cannot build callback URL");
                self.notify(StateEvent::SubscribeFailed { generation });
                return;
            }
        };

        debug!(generation, callback_url = %callback_url, "Issuing subscribe call");

        match self.broker.subscribe(&callback_url).await {
            Ok(identifier) if identifier.is_empty() || identifier == PENDING_CONFIRMATION => {
                debug!(generation, "Subscribe accepted; awaiting confirmation");
            }
            Ok(identifier) => {
                // Readiness still waits for the confirmation callback.
                info!(
                    generation,
                    identifier = %identifier,
                    "Broker returned a subscription identifier before confirmation"
                );
            }
            Err(e) => {
                error!(generation, error = %e, "Subscribe call failed");
                self.notify(StateEvent::SubscribeFailed { generation });
            }
        }
    }

    /// Confirm `token` with the broker on behalf of `generation`.
    ///
    /// The broker is always asked to confirm; the state only changes when
    /// `generation` is still current and the manager has not shut down.
    pub async fn confirm(&self, token: &str, generation: u64) -> Result<ConfirmOutcome> {
        let identifier = self.broker.confirm_subscription(token).await?;

        if self.pipeline.is_closed() {
            warn!(generation, "Confirmation arrived after shutdown; state unchanged");
            return Ok(ConfirmOutcome::Closed { generation });
        }

        if !self.state.store_confirmed(&identifier, generation) {
            let current = self.state.generation();
            self.notify(StateEvent::Stale {
                generation,
                current,
            });
            return Ok(ConfirmOutcome::Stale {
                generation,
                current,
            });
        }

        let activated = self.pipeline.activate(
            generation,
            Arc::clone(&self.broker),
            Arc::clone(&self.state),
        );
        if !activated && self.pipeline.is_closed() {
            // Shutdown landed between the store and the activation.
            self.state.store_pending(generation);
            warn!(generation, "Confirmation raced shutdown; state reset to pending");
            return Ok(ConfirmOutcome::Closed { generation });
        }

        self.notify(StateEvent::Ready {
            generation,
            identifier: identifier.clone(),
        });

        Ok(ConfirmOutcome::Confirmed {
            generation,
            identifier,
        })
    }

    /// Hand `message` to the current generation without blocking.
    ///
    /// Dropped when no generation is ready or the queue is full.
    pub fn publish_message(&self, message: impl Into<OutboundMessage>) {
        match self.pipeline.enqueue(message.into()) {
            Enqueue::Queued { .. } => {}
            Enqueue::NotReady => debug!("No ready subscription; message dropped"),
            Enqueue::QueueFull { generation } => {
                debug!(generation, "Publish queue full; message dropped")
            }
        }
    }

    /// Serialize `value` to JSON and publish it.
    pub fn publish_json<T: Serialize + ?Sized>(&self, value: &T) {
        match self.encoders.encode(value) {
            Ok(payload) => self.publish_message(payload),
            Err(e) => warn!(error = %e, "Failed to encode message; dropped"),
        }
    }

    /// Retire the active worker and stop accepting new generations.
    ///
    /// A confirmed identifier goes back to pending, so the bridge never
    /// reports ready without a running worker.
    pub fn shutdown(&self) {
        if let Some(generation) = self.pipeline.shutdown() {
            self.notify(StateEvent::Retired { generation });
        }
        let snapshot = self.state.load();
        if snapshot.is_ready() {
            self.state.store_pending(snapshot.generation);
        }
        info!("Subscription manager shut down");
    }

    pub fn load(&self) -> Snapshot {
        self.state.load()
    }

    pub fn is_ready(&self) -> bool {
        self.state.is_ready()
    }

    pub fn generation(&self) -> u64 {
        self.state.generation()
    }

    pub fn state(&self) -> &Arc<SubscriptionState> {
        &self.state
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn stats(&self) -> PipelineStats {
        self.pipeline.stats()
    }

    /// Generation of the running publish worker
    pub fn active_generation(&self) -> Option<u64> {
        self.pipeline.active_generation()
    }

    fn notify(&self, event: StateEvent) {
        (self.listener)(&event);
    }
}

impl std::fmt::Debug for SubscriptionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionManager")
            .field("state", &self.state.load())
            .field("active_generation", &self.pipeline.active_generation())
            .field("topic_arn", &self.config.topic_arn)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BridgeError, Identifier};
    use async_trait::async_trait;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct StubBroker {
        callbacks: Mutex<Vec<String>>,
        fail_subscribe: bool,
    }

    #[async_trait]
    impl BrokerClient for StubBroker {
        async fn subscribe(&self, callback_url: &str) -> Result<String> {
            self.callbacks.lock().push(callback_url.to_string());
            if self.fail_subscribe {
                return Err(BridgeError::Subscribe("denied".into()));
            }
            Ok(PENDING_CONFIRMATION.to_string())
        }

        async fn confirm_subscription(&self, token: &str) -> Result<String> {
            Ok(format!("arn-{}", token))
        }

        async fn publish(&self, _message: &OutboundMessage) -> Result<()> {
            Ok(())
        }
    }

    fn config() -> BridgeConfig {
        BridgeConfig::builder()
            .self_url("https://bridge.example.com")
            .topic_arn("arn:aws:sns:us-east-1:123456789012:events")
            .build()
    }

    fn recording_listener() -> (StateListener, Arc<Mutex<Vec<StateEvent>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let listener: StateListener = Arc::new(move |event: &StateEvent| {
            sink.lock().push(event.clone());
        });
        (listener, events)
    }

    #[tokio::test]
    async fn test_prepare_and_start_is_idempotent() {
        let broker = Arc::new(StubBroker::default());
        let manager = SubscriptionManager::new(config(), broker.clone());

        manager.prepare_and_start().await;
        manager.prepare_and_start().await;

        assert_eq!(manager.generation(), 1);
        assert_eq!(broker.callbacks.lock().len(), 1);
        assert_eq!(
            broker.callbacks.lock()[0],
            "https://bridge.example.com/api/v1/webhook/sns?generation=1"
        );
    }

    #[tokio::test]
    async fn test_subscribe_sets_pending() {
        let manager = SubscriptionManager::new(config(), Arc::new(StubBroker::default()));
        manager.subscribe().await;

        let snapshot = manager.load();
        assert_eq!(snapshot.identifier, Identifier::Pending);
        assert_eq!(snapshot.generation, 1);
        assert!(!manager.is_ready());
    }

    #[tokio::test]
    async fn test_subscribe_failure_advances_generation() {
        let broker = Arc::new(StubBroker {
            fail_subscribe: true,
            ..Default::default()
        });
        let (listener, events) = recording_listener();
        let manager = SubscriptionManager::new(config(), broker).with_listener(listener);

        manager.subscribe().await;
        manager.subscribe().await;

        assert_eq!(manager.generation(), 2);
        assert!(!manager.is_ready());
        assert!(
            events
                .lock()
                .contains(&StateEvent::SubscribeFailed { generation: 2 })
        );
    }

    #[tokio::test]
    async fn test_confirm_current_generation() {
        let (listener, events) = recording_listener();
        let manager = SubscriptionManager::new(config(), Arc::new(StubBroker::default()))
            .with_listener(listener);
        manager.subscribe().await;

        let outcome = manager.confirm("tok", 1).await.unwrap();
        assert_eq!(
            outcome,
            ConfirmOutcome::Confirmed {
                generation: 1,
                identifier: "arn-tok".to_string()
            }
        );
        assert!(manager.is_ready());
        assert_eq!(manager.active_generation(), Some(1));
        assert_eq!(
            events.lock().last(),
            Some(&StateEvent::Ready {
                generation: 1,
                identifier: "arn-tok".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_confirm_stale_generation() {
        let manager = SubscriptionManager::new(config(), Arc::new(StubBroker::default()));
        manager.subscribe().await;
        manager.subscribe().await;

        let outcome = manager.confirm("old", 1).await.unwrap();
        assert_eq!(
            outcome,
            ConfirmOutcome::Stale {
                generation: 1,
                current: 2
            }
        );
        assert!(!outcome.is_confirmed());
        assert!(!manager.is_ready());
        assert_eq!(manager.active_generation(), None);
    }

    #[tokio::test]
    async fn test_resubscribe_retires_worker() {
        let (listener, events) = recording_listener();
        let manager = SubscriptionManager::new(config(), Arc::new(StubBroker::default()))
            .with_listener(listener);
        manager.subscribe().await;
        manager.confirm("tok", 1).await.unwrap();

        manager.subscribe().await;

        assert_eq!(manager.active_generation(), None);
        assert!(
            events
                .lock()
                .contains(&StateEvent::Retired { generation: 1 })
        );
    }

    #[tokio::test]
    async fn test_publish_before_ready_is_dropped() {
        let manager = SubscriptionManager::new(config(), Arc::new(StubBroker::default()));
        manager.publish_message("early");
        manager.publish_json(&serde_json::json!({"event": "x"}));
        assert_eq!(manager.stats().dropped, 2);
    }

    #[tokio::test]
    async fn test_shutdown_stops_publishing() {
        let manager = SubscriptionManager::new(config(), Arc::new(StubBroker::default()));
        manager.subscribe().await;
        manager.confirm("tok", 1).await.unwrap();

        manager.shutdown();
        manager.publish_message("late");
        manager.subscribe().await;

        assert_eq!(manager.active_generation(), None);
        assert_eq!(manager.generation(), 1);
        assert_eq!(manager.stats().dropped, 1);
        assert!(!manager.is_ready());
    }

    #[tokio::test]
    async fn test_confirm_after_shutdown_stays_not_ready() {
        let (listener, events) = recording_listener();
        let broker = Arc::new(StubBroker::default());
        let manager = SubscriptionManager::new(config(), broker).with_listener(listener);
        manager.subscribe().await;
        manager.shutdown();

        let outcome = manager.confirm("late", 1).await.unwrap();

        assert_eq!(outcome, ConfirmOutcome::Closed { generation: 1 });
        assert!(!outcome.is_confirmed());
        assert!(!manager.is_ready());
        assert_eq!(manager.active_generation(), None);
        assert!(
            !events
                .lock()
                .iter()
                .any(|e| matches!(e, StateEvent::Ready { .. }))
        );
    }
}
