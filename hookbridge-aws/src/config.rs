//! AWS connection configuration.

use crate::{AwsError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Credentials source for AWS authentication.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialsSource {
    /// Use AWS profile from ~/.aws/credentials.
    Profile(String),
    /// Use explicit credentials.
    Explicit {
        access_key_id: String,
        secret_access_key: String,
        session_token: Option<String>,
    },
    /// Default AWS SDK credential chain (environment, profile, IAM role).
    #[default]
    Auto,
}

/// AWS connection settings for the SNS client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsConfig {
    /// AWS region. Derived from the topic ARN when unset.
    pub region: Option<String>,
    /// Credentials source.
    #[serde(default)]
    pub credentials: CredentialsSource,
    /// Custom endpoint URL (for LocalStack).
    pub endpoint_url: Option<String>,
}

impl AwsConfig {
    /// Create a builder.
    pub fn builder() -> AwsConfigBuilder {
        AwsConfigBuilder::new()
    }

    /// Load from `AWS_REGION` (or `AWS_DEFAULT_REGION`), `AWS_PROFILE` and
    /// `AWS_ENDPOINT_URL`.
    pub fn from_env() -> AwsConfigBuilder {
        Self::from_vars(std::env::vars())
    }

    /// Same as [`from_env`](Self::from_env) over an explicit set of variables.
    pub fn from_vars<I>(vars: I) -> AwsConfigBuilder
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: HashMap<String, String> = vars.into_iter().collect();
        let mut builder = AwsConfigBuilder::new();

        if let Some(region) = vars.get("AWS_REGION").or_else(|| vars.get("AWS_DEFAULT_REGION")) {
            builder = builder.region(region);
        }

        if let Some(profile) = vars.get("AWS_PROFILE") {
            builder = builder.profile(profile);
        }

        if let Some(endpoint) = vars.get("AWS_ENDPOINT_URL") {
            builder = builder.endpoint_url(endpoint);
        }

        builder
    }

    /// Region to connect to: the configured one, else the one in `topic_arn`.
    pub fn resolve_region(&self, topic_arn: &str) -> Result<String> {
        if let Some(region) = &self.region {
            return Ok(region.clone());
        }
        let arn = TopicArn::parse(topic_arn)?;
        if arn.region.is_empty() {
            return Err(AwsError::RegionNotSpecified);
        }
        Ok(arn.region)
    }

    /// Build the SDK configuration for `topic_arn`.
    pub async fn build_sdk_config(&self, topic_arn: &str) -> Result<aws_config::SdkConfig> {
        let region = self.resolve_region(topic_arn)?;
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(region));

        match &self.credentials {
            CredentialsSource::Profile(profile) => {
                loader = loader.profile_name(profile);
            }
            CredentialsSource::Explicit {
                access_key_id,
                secret_access_key,
                session_token,
            } => {
                let creds = aws_credential_types::Credentials::new(
                    access_key_id,
                    secret_access_key,
                    session_token.clone(),
                    None,
                    "hookbridge",
                );
                loader = loader.credentials_provider(creds);
            }
            CredentialsSource::Auto => {}
        }

        if let Some(endpoint) = &self.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }

        Ok(loader.load().await)
    }
}

/// Builder for AWS configuration.
#[derive(Debug, Default)]
pub struct AwsConfigBuilder {
    config: AwsConfig,
}

impl AwsConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the AWS region.
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.config.region = Some(region.into());
        self
    }

    /// Set the credentials source.
    pub fn credentials(mut self, credentials: CredentialsSource) -> Self {
        self.config.credentials = credentials;
        self
    }

    /// Use explicit credentials.
    pub fn explicit_credentials(
        mut self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        self.config.credentials = CredentialsSource::Explicit {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
        };
        self
    }

    /// Use a named profile.
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.config.credentials = CredentialsSource::Profile(profile.into());
        self
    }

    /// Set a custom endpoint URL.
    pub fn endpoint_url(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint_url = Some(url.into());
        self
    }

    /// Configure for LocalStack.
    pub fn localstack(self) -> Self {
        self.endpoint_url("http://localhost:4566")
    }

    pub fn build(self) -> AwsConfig {
        self.config
    }
}

/// Parsed `arn:<partition>:sns:<region>:<account>:<topic>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicArn {
    pub partition: String,
    pub region: String,
    pub account: String,
    pub topic: String,
}

impl TopicArn {
    pub fn parse(arn: &str) -> Result<Self> {
        let parts: Vec<&str> = arn.splitn(6, ':').collect();
        match parts.as_slice() {
            ["arn", partition, "sns", region, account, topic]
                if !partition.is_empty() && !topic.is_empty() && !topic.contains(':') =>
            {
                Ok(Self {
                    partition: partition.to_string(),
                    region: region.to_string(),
                    account: account.to_string(),
                    topic: topic.to_string(),
                })
            }
            _ => Err(AwsError::InvalidTopicArn(arn.to_string())),
        }
    }
}
