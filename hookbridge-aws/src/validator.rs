//! Structural checks for SNS confirmation callbacks.
//!
//! The signing certificate is not fetched and the signature is not
//! verified cryptographically. The checks reject callbacks that cannot
//! have come from SNS: unknown signature versions, certificate URLs
//! outside `sns.<region>.amazonaws.com`, foreign topics and stale
//! timestamps.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use hookbridge_core::{BridgeError, ConfirmationCallback, Result, Validator};
use std::time::Duration;
use url::Url;

/// Default maximum age of a callback timestamp.
pub const DEFAULT_TOLERANCE: Duration = Duration::from_secs(60 * 60);

/// Validator for SNS subscription confirmation callbacks.
#[derive(Debug, Clone)]
pub struct SnsMessageValidator {
    topic_arn: Option<String>,
    tolerance: Duration,
}

impl Default for SnsMessageValidator {
    fn default() -> Self {
        Self {
            topic_arn: None,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl SnsMessageValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only accept callbacks for `topic_arn`.
    pub fn with_topic_arn(mut self, topic_arn: impl Into<String>) -> Self {
        self.topic_arn = Some(topic_arn.into());
        self
    }

    /// Maximum distance between the callback timestamp and now.
    pub fn with_tolerance(mut self, tolerance: Duration) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Run every check against the current time.
    pub fn check(&self, callback: &ConfirmationCallback) -> Result<()> {
        self.check_at(callback, Utc::now())
    }

    /// Run every check as if the current time were `now`.
    pub fn check_at(&self, callback: &ConfirmationCallback, now: DateTime<Utc>) -> Result<()> {
        check_signature_version(&callback.signature_version)?;
        check_signature(&callback.signature)?;
        check_sns_url("SigningCertURL", &callback.signing_cert_url)?;
        if !callback.subscribe_url.is_empty() {
            check_sns_url("SubscribeURL", &callback.subscribe_url)?;
        }

        if let Some(expected) = &self.topic_arn {
            if &callback.topic_arn != expected {
                return Err(invalid(format!(
                    "TopicArn {} does not match subscribed topic",
                    callback.topic_arn
                )));
            }
        }

        self.check_timestamp(&callback.timestamp, now)
    }

    fn check_timestamp(&self, timestamp: &str, now: DateTime<Utc>) -> Result<()> {
        if timestamp.is_empty() {
            return Err(invalid("missing Timestamp"));
        }

        let sent = DateTime::parse_from_rfc3339(timestamp)
            .map_err(|e| invalid(format!("invalid Timestamp: {}", e)))?
            .with_timezone(&Utc);

        let age = (now - sent).num_seconds().unsigned_abs();
        if age > self.tolerance.as_secs() {
            return Err(invalid(format!(
                "Timestamp outside tolerance: {} seconds (tolerance: {} seconds)",
                age,
                self.tolerance.as_secs()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Validator for SnsMessageValidator {
    async fn validate(&self, callback: &ConfirmationCallback) -> Result<bool> {
        self.check(callback)?;
        Ok(true)
    }
}

fn invalid(reason: impl Into<String>) -> BridgeError {
    BridgeError::Validation(reason.into())
}

fn check_signature_version(version: &str) -> Result<()> {
    match version {
        "1" | "2" => Ok(()),
        "" => Err(invalid("missing SignatureVersion")),
        other => Err(invalid(format!("unsupported SignatureVersion {}", other))),
    }
}

fn check_signature(signature: &str) -> Result<()> {
    if signature.is_empty() {
        return Err(invalid("missing Signature"));
    }
    match STANDARD.decode(signature) {
        Ok(bytes) if !bytes.is_empty() => Ok(()),
        Ok(_) => Err(invalid("empty Signature")),
        Err(e) => Err(invalid(format!("Signature is not base64: {}", e))),
    }
}

fn check_sns_url(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(invalid(format!("missing {}", field)));
    }

    let url = Url::parse(value).map_err(|e| invalid(format!("invalid {}: {}", field, e)))?;
    if url.scheme() != "https" {
        return Err(invalid(format!("{} must use https", field)));
    }

    let host = url.host_str().unwrap_or_default();
    if !is_sns_host(host) {
        return Err(invalid(format!("{} host {} is not an SNS endpoint", field, host)));
    }
    Ok(())
}

/// `sns.<region>.amazonaws.com` or `sns.<region>.amazonaws.com.cn`
fn is_sns_host(host: &str) -> bool {
    let region = host
        .strip_suffix(".amazonaws.com")
        .or_else(|| host.strip_suffix(".amazonaws.com.cn"))
        .and_then(|rest| rest.strip_prefix("sns."));

    match region {
        Some(region) => {
            !region.is_empty()
                && region
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        }
        None => false,
    }
}
