//! Publish pipeline
//!
//! One bounded queue and one worker task per confirmed generation. The
//! worker drains its queue in FIFO order and hands each message to the
//! broker. Retiring a worker is a one-way signal: the worker finishes the
//! publish call in flight, if any, and exits without touching the rest of
//! its queue, which is dropped with it.

use crate::{BrokerClient, OutboundMessage, SubscriptionState};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Outcome of a non-blocking enqueue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueue {
    /// Accepted by the worker of this generation
    Queued { generation: u64 },
    /// No confirmed generation; message dropped
    NotReady,
    /// Queue at capacity; message dropped
    QueueFull { generation: u64 },
}

/// Counters across all generations
#[derive(Debug, Default)]
struct Counters {
    queued: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

/// Point-in-time copy of the pipeline counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipelineStats {
    pub queued: u64,
    /// Publish calls that succeeded
    pub delivered: u64,
    /// Publish calls that failed; those messages are not retried
    pub failed: u64,
    /// Messages refused at enqueue time (not ready, queue full, shut down)
    pub dropped: u64,
}

struct ActiveWorker {
    generation: u64,
    sender: mpsc::Sender<OutboundMessage>,
    done: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Queue plus per-generation worker lifecycle
pub struct PublishPipeline {
    capacity: usize,
    active: Mutex<Option<ActiveWorker>>,
    closed: AtomicBool,
    counters: Arc<Counters>,
}

impl PublishPipeline {
    /// Pipeline whose per-generation queues hold `capacity` messages.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            active: Mutex::new(None),
            closed: AtomicBool::new(false),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Start the worker for `generation`.
    ///
    /// Only starts when `state` is ready for exactly that generation and no
    /// worker for the same or a newer generation is running. Any older
    /// worker is retired first. Returns whether a worker was started.
    pub fn activate(
        &self,
        generation: u64,
        broker: Arc<dyn BrokerClient>,
        state: Arc<SubscriptionState>,
    ) -> bool {
        let mut active = self.active.lock();

        if self.closed.load(Ordering::Acquire) {
            return false;
        }

        if let Some(current) = active.as_ref() {
            if current.generation >= generation {
                return false;
            }
        }

        // Checked under the pipeline lock: a subscribe that advances the
        // generation after this point retires the worker started below.
        if !state.is_ready_for(generation) {
            debug!(generation, "Not activating publish worker; generation not ready");
            return false;
        }

        if let Some(previous) = active.take() {
            Self::signal_retire(previous);
        }

        let (sender, receiver) = mpsc::channel(self.capacity);
        let (done, done_rx) = watch::channel(false);
        let counters = Arc::clone(&self.counters);

        let handle = tokio::spawn(run_worker(
            generation, receiver, done_rx, broker, state, counters,
        ));

        info!(generation, capacity = self.capacity, "Publish worker started");

        *active = Some(ActiveWorker {
            generation,
            sender,
            done,
            handle,
        });
        true
    }

    /// Signal the active worker to stop. Does not wait for it.
    ///
    /// Returns the retired generation, if a worker was active.
    pub fn retire(&self) -> Option<u64> {
        let previous = self.active.lock().take()?;
        let generation = previous.generation;
        Self::signal_retire(previous);
        Some(generation)
    }

    fn signal_retire(worker: ActiveWorker) {
        let ActiveWorker {
            generation,
            sender,
            done,
            handle,
        } = worker;

        let _ = done.send(true);
        drop(sender);
        // Detach; the worker exits on its own after the in-flight call.
        drop(handle);

        debug!(generation, "Publish worker signalled to retire");
    }

    /// Hand `message` to the active worker without blocking.
    pub fn enqueue(&self, message: OutboundMessage) -> Enqueue {
        let active = self.active.lock();

        let outcome = match active.as_ref() {
            None => Enqueue::NotReady,
            Some(worker) => match worker.sender.try_send(message) {
                Ok(()) => Enqueue::Queued {
                    generation: worker.generation,
                },
                Err(mpsc::error::TrySendError::Full(_)) => Enqueue::QueueFull {
                    generation: worker.generation,
                },
                Err(mpsc::error::TrySendError::Closed(_)) => Enqueue::NotReady,
            },
        };

        match outcome {
            Enqueue::Queued { .. } => self.counters.queued.fetch_add(1, Ordering::Relaxed),
            _ => self.counters.dropped.fetch_add(1, Ordering::Relaxed),
        };

        outcome
    }

    /// Generation of the running worker
    pub fn active_generation(&self) -> Option<u64> {
        self.active.lock().as_ref().map(|worker| worker.generation)
    }

    /// Retire the active worker and refuse any later activation.
    pub fn shutdown(&self) -> Option<u64> {
        self.closed.store(true, Ordering::Release);
        self.retire()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            queued: self.counters.queued.load(Ordering::Relaxed),
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
        }
    }
}

impl Drop for PublishPipeline {
    fn drop(&mut self) {
        if let Some(worker) = self.active.get_mut().take() {
            Self::signal_retire(worker);
        }
    }
}

async fn run_worker(
    generation: u64,
    mut queue: mpsc::Receiver<OutboundMessage>,
    mut done: watch::Receiver<bool>,
    broker: Arc<dyn BrokerClient>,
    state: Arc<SubscriptionState>,
    counters: Arc<Counters>,
) {
    loop {
        let message = tokio::select! {
            biased;
            _ = done.changed() => break,
            message = queue.recv() => match message {
                Some(message) => message,
                None => break,
            },
        };

        if *done.borrow() {
            break;
        }

        // A newer subscribe may have started without reaching the pipeline yet.
        if !state.is_ready_for(generation) {
            debug!(generation, "Generation superseded; publish worker exiting");
            break;
        }

        match broker.publish(&message).await {
            Ok(()) => {
                counters.delivered.fetch_add(1, Ordering::Relaxed);
                debug!(generation, bytes = message.len(), "Message published");
            }
            Err(e) => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                warn!(generation, error = %e, "Publish failed; message dropped");
            }
        }
    }

    queue.close();
    debug!(generation, "Publish worker stopped");
}
