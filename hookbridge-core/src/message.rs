//! Inbound callback and outbound message types

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Callback type discriminator sent by the broker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageType {
    SubscriptionConfirmation,
    Notification,
    UnsubscribeConfirmation,
    Other(String),
}

impl MessageType {
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "SubscriptionConfirmation" => MessageType::SubscriptionConfirmation,
            "Notification" => MessageType::Notification,
            "UnsubscribeConfirmation" => MessageType::UnsubscribeConfirmation,
            other => MessageType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            MessageType::SubscriptionConfirmation => "SubscriptionConfirmation",
            MessageType::Notification => "Notification",
            MessageType::UnsubscribeConfirmation => "UnsubscribeConfirmation",
            MessageType::Other(other) => other,
        }
    }

    pub fn is_confirmation(&self) -> bool {
        matches!(self, MessageType::SubscriptionConfirmation)
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subscription confirmation callback envelope, as posted by SNS.
///
/// Only `Type` and `Token` are needed to confirm; the remaining fields are
/// carried for the validator.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConfirmationCallback {
    #[serde(rename = "Type")]
    pub message_type: String,

    #[serde(default)]
    pub message_id: String,

    #[serde(default)]
    pub token: String,

    #[serde(default)]
    pub topic_arn: String,

    #[serde(default)]
    pub message: String,

    #[serde(rename = "SubscribeURL", default)]
    pub subscribe_url: String,

    /// RFC 3339 timestamp
    #[serde(default)]
    pub timestamp: String,

    #[serde(default)]
    pub signature_version: String,

    /// Base64 signature bytes
    #[serde(default)]
    pub signature: String,

    #[serde(rename = "SigningCertURL", default)]
    pub signing_cert_url: String,
}

impl ConfirmationCallback {
    pub fn kind(&self) -> MessageType {
        MessageType::parse(&self.message_type)
    }
}

/// Payload handed to the broker by the publish worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub payload: Bytes,
    pub subject: Option<String>,
}

impl OutboundMessage {
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
            subject: None,
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Payload as text; invalid UTF-8 is replaced.
    pub fn payload_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

impl From<Bytes> for OutboundMessage {
    fn from(payload: Bytes) -> Self {
        Self::new(payload)
    }
}

impl From<Vec<u8>> for OutboundMessage {
    fn from(payload: Vec<u8>) -> Self {
        Self::new(payload)
    }
}

impl From<String> for OutboundMessage {
    fn from(payload: String) -> Self {
        Self::new(payload)
    }
}

impl From<&'static str> for OutboundMessage {
    fn from(payload: &'static str) -> Self {
        Self::new(payload)
    }
}
