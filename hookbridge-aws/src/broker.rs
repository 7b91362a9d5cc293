//! SNS implementation of the broker client.

use crate::{AwsConfig, TopicArn};
use async_trait::async_trait;
use aws_sdk_sns::error::DisplayErrorContext;
use hookbridge_core::{BridgeError, BrokerClient, OutboundMessage, PENDING_CONFIRMATION};
use tracing::debug;
use url::Url;

/// Subscribes, confirms and publishes against one SNS topic.
#[derive(Debug, Clone)]
pub struct SnsBroker {
    client: aws_sdk_sns::Client,
    topic_arn: String,
}

impl SnsBroker {
    /// Wrap an existing SNS client.
    pub fn new(client: aws_sdk_sns::Client, topic_arn: impl Into<String>) -> Self {
        Self {
            client,
            topic_arn: topic_arn.into(),
        }
    }

    /// Build the SNS client from `config`.
    pub async fn from_config(
        config: &AwsConfig,
        topic_arn: impl Into<String>,
    ) -> crate::Result<Self> {
        let topic_arn = topic_arn.into();
        TopicArn::parse(&topic_arn)?;

        let sdk_config = config.build_sdk_config(&topic_arn).await?;
        debug!(
            topic = %topic_arn,
            region = ?sdk_config.region(),
            "SNS client configured"
        );

        Ok(Self::new(aws_sdk_sns::Client::new(&sdk_config), topic_arn))
    }

    pub fn topic_arn(&self) -> &str {
        &self.topic_arn
    }

    pub fn client(&self) -> &aws_sdk_sns::Client {
        &self.client
    }
}

/// SNS delivery protocol for a callback URL.
pub fn protocol_for(callback_url: &str) -> hookbridge_core::Result<&'static str> {
    let url = Url::parse(callback_url)
        .map_err(|e| BridgeError::Subscribe(format!("invalid callback URL: {}", e)))?;
    match url.scheme() {
        "http" => Ok("http"),
        "https" => Ok("https"),
        other => Err(BridgeError::Subscribe(format!(
            "unsupported callback scheme: {}",
            other
        ))),
    }
}

#[async_trait]
impl BrokerClient for SnsBroker {
    async fn subscribe(&self, callback_url: &str) -> hookbridge_core::Result<String> {
        let protocol = protocol_for(callback_url)?;

        let output = self
            .client
            .subscribe()
            .topic_arn(&self.topic_arn)
            .protocol(protocol)
            .endpoint(callback_url)
            .send()
            .await
            .map_err(|e| BridgeError::Subscribe(DisplayErrorContext(&e).to_string()))?;

        Ok(output
            .subscription_arn()
            .unwrap_or(PENDING_CONFIRMATION)
            .to_string())
    }

    async fn confirm_subscription(&self, token: &str) -> hookbridge_core::Result<String> {
        let output = self
            .client
            .confirm_subscription()
            .topic_arn(&self.topic_arn)
            .token(token)
            .send()
            .await
            .map_err(|e| BridgeError::Confirm(DisplayErrorContext(&e).to_string()))?;

        output
            .subscription_arn()
            .filter(|arn| !arn.is_empty())
            .map(str::to_string)
            .ok_or_else(|| BridgeError::Confirm("response carried no SubscriptionArn".to_string()))
    }

    async fn publish(&self, message: &OutboundMessage) -> hookbridge_core::Result<()> {
        let output = self
            .client
            .publish()
            .topic_arn(&self.topic_arn)
            .message(message.payload_str())
            .set_subject(message.subject.clone())
            .send()
            .await
            .map_err(|e| BridgeError::Publish(DisplayErrorContext(&e).to_string()))?;

        debug!(message_id = ?output.message_id(), "Published to SNS");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_for() {
        assert_eq!(protocol_for("https://bridge.example.com/hook").unwrap(), "https");
        assert_eq!(protocol_for("http://10.0.0.1:8080/hook").unwrap(), "http");
        assert!(matches!(
            protocol_for("ftp://example.com/hook"),
            Err(BridgeError::Subscribe(_))
        ));
        assert!(protocol_for("not a url").is_err());
    }

    #[tokio::test]
    async fn test_from_config_rejects_bad_arn() {
        let config = AwsConfig::builder().region("us-east-1").build();
        let result = SnsBroker::from_config(&config, "arn:aws:sqs:us-east-1:1:queue").await;
        assert!(matches!(result, Err(crate::AwsError::InvalidTopicArn(_))));
    }

    #[tokio::test]
    async fn test_from_config_with_localstack() {
        let config = AwsConfig::builder()
            .region("us-east-1")
            .explicit_credentials("test", "test")
            .localstack()
            .build();

        let broker = SnsBroker::from_config(&config, "arn:aws:sns:us-east-1:000000000000:events")
            .await
            .unwrap();
        assert_eq!(broker.topic_arn(), "arn:aws:sns:us-east-1:000000000000:events");
    }
}
