//! AWS error types.

use hookbridge_core::BridgeError;
use thiserror::Error;

/// Result type for AWS setup.
pub type Result<T> = std::result::Result<T, AwsError>;

/// Errors raised while building the SNS broker.
#[derive(Debug, Error)]
pub enum AwsError {
    /// Topic ARN is not an SNS topic ARN.
    #[error("Invalid topic ARN: {0}")]
    InvalidTopicArn(String),

    /// Region not specified and not derivable from the topic ARN.
    #[error("AWS region not specified")]
    RegionNotSpecified,
}

impl From<AwsError> for BridgeError {
    fn from(err: AwsError) -> Self {
        BridgeError::Config(err.to_string())
    }
}
