// hookbridge - webhook bridge between an internal event producer and AWS SNS
//
// Subscribes a callback endpoint with the broker, completes the confirmation
// handshake over HTTP and relays published events once the subscription is
// live.

// Re-export core functionality
pub use hookbridge_core::*;

// Re-export member crates
pub use hookbridge_aws;
pub use hookbridge_log;
pub use hookbridge_pool;

mod app;

pub use app::{Bridge, config_from_env};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        Bridge, BridgeConfig, BridgeError, BrokerClient, ConfirmationCallback,
        ConfirmationHandler, OutboundMessage, Result, StateEvent, SubscriptionManager, Validator,
    };
    pub use hookbridge_aws::{AwsConfig, SnsBroker, SnsMessageValidator};
    pub use hookbridge_log::LogConfig;
}
