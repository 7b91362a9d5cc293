//! Error types for the bridge

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while subscribing, confirming or publishing.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// The broker rejected or failed the subscribe call
    #[error("Subscribe failed: {0}")]
    Subscribe(String),

    /// The broker rejected or failed the confirm call
    #[error("Subscription confirmation failed: {0}")]
    Confirm(String),

    /// The broker rejected or failed a publish call
    #[error("Publish failed: {0}")]
    Publish(String),

    /// The confirmation callback did not pass authenticity checks
    #[error("{0}")]
    Validation(String),

    /// Callback type other than a subscription confirmation
    #[error("Unsupported message type: {0}")]
    UnsupportedMessageType(String),

    /// Callback body could not be parsed
    #[error("Malformed body: {0}")]
    MalformedBody(String),

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(String),
}

impl BridgeError {
    /// Default HTTP status for this error when it reaches the confirmation
    /// endpoint. The handler may override the validation and upstream codes
    /// from configuration.
    pub fn status_code(&self) -> u16 {
        match self {
            BridgeError::Validation(_)
            | BridgeError::UnsupportedMessageType(_)
            | BridgeError::MalformedBody(_) => 400,
            BridgeError::Confirm(_) | BridgeError::Subscribe(_) | BridgeError::Publish(_) => 502,
            BridgeError::Config(_) | BridgeError::Io(_) | BridgeError::Http(_) => 500,
        }
    }

    /// Whether the error originated at the broker.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            BridgeError::Subscribe(_) | BridgeError::Confirm(_) | BridgeError::Publish(_)
        )
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::MalformedBody(err.to_string())
    }
}

impl From<hyper::Error> for BridgeError {
    fn from(err: hyper::Error) -> Self {
        BridgeError::Http(err.to_string())
    }
}

/// JSON body written for every error response: `{"code": 400, "message": "..."}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}
