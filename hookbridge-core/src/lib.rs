//! # hookbridge-core
//!
//! Subscription lifecycle for a webhook bridge to an external pub/sub
//! broker such as AWS SNS.
//!
//! The bridge subscribes a callback endpoint with the broker, waits for the
//! broker's asynchronous confirmation callback, confirms the token and then
//! relays outbound messages to the broker while the subscription is live.
//!
//! Every [`SubscriptionManager::subscribe`] call opens a new *generation*.
//! A confirmation only makes the bridge ready when it belongs to the current
//! generation, and only the current generation's publish worker runs.
//!
//! ## Example
//!
//! ```no_run
//! use hookbridge_core::*;
//! use std::sync::Arc;
//!
//! # async fn run(broker: Arc<dyn BrokerClient>) -> Result<()> {
//! let config = BridgeConfig::builder()
//!     .self_url("https://bridge.example.com")
//!     .topic_arn("arn:aws:sns:us-east-1:123456789012:events")
//!     .build();
//! config.validate()?;
//!
//! let listener = tokio::net::TcpListener::bind(config.socket_addr()?).await?;
//! let manager = Arc::new(
//!     SubscriptionManager::new(config, broker).with_listener(logging_listener()),
//! );
//! let validator = |_: &ConfirmationCallback| -> Result<bool> { Ok(true) };
//! let handler = Arc::new(ConfirmationHandler::new(manager.clone(), Arc::new(validator)));
//!
//! manager.prepare_and_start().await;
//! manager.publish_message("hello");
//!
//! server::serve(listener, handler, async {
//!     tokio::signal::ctrl_c().await.ok();
//! })
//! .await?;
//! manager.shutdown();
//! # Ok(())
//! # }
//! ```

pub mod broker;
pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod listener;
pub mod manager;
pub mod message;
pub mod pipeline;
pub mod server;
pub mod state;

pub use broker::{BrokerClient, Validator};
pub use config::{BridgeConfig, BridgeConfigBuilder};
pub use error::{BridgeError, ErrorResponse};
pub use handler::ConfirmationHandler;
pub use http::{HttpRequest, HttpResponse};
pub use listener::{StateEvent, StateListener, listeners, logging_listener};
pub use manager::{ConfirmOutcome, SubscriptionManager};
pub use message::{ConfirmationCallback, MessageType, OutboundMessage};
pub use pipeline::{Enqueue, PipelineStats, PublishPipeline};
pub use state::{Identifier, PENDING_CONFIRMATION, Snapshot, SubscriptionState};

/// Result type for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;
