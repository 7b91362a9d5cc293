//! Capabilities consumed from the outside world

use crate::{ConfirmationCallback, OutboundMessage, Result};
use async_trait::async_trait;

/// Client for the external pub/sub broker.
#[async_trait]
pub trait BrokerClient: Send + Sync {
    /// Ask the broker to deliver callbacks to `callback_url`.
    ///
    /// Returns the subscription identifier, or the pending token when the
    /// endpoint still has to confirm.
    async fn subscribe(&self, callback_url: &str) -> Result<String>;

    /// Complete the handshake with the token from a confirmation callback.
    ///
    /// Returns the confirmed subscription identifier.
    async fn confirm_subscription(&self, token: &str) -> Result<String>;

    async fn publish(&self, message: &OutboundMessage) -> Result<()>;
}

/// Authenticity check for inbound confirmation callbacks.
#[async_trait]
pub trait Validator: Send + Sync {
    /// `Ok(true)` when the callback is authentic. Errors carry the reason
    /// reported back to the caller.
    async fn validate(&self, callback: &ConfirmationCallback) -> Result<bool>;
}

#[async_trait]
impl<F> Validator for F
where
    F: Fn(&ConfirmationCallback) -> Result<bool> + Send + Sync,
{
    async fn validate(&self, callback: &ConfirmationCallback) -> Result<bool> {
        self(callback)
    }
}
