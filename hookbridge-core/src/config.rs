//! Bridge configuration
//!
//! All defaults are applied once when the configuration is built; nothing
//! is resolved per request.

use crate::{BridgeError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use url::Url;

/// Prefix for environment variables read by [`BridgeConfig::from_env`]
pub const ENV_PREFIX: &str = "HOOKBRIDGE";

/// Header carrying the SNS callback type
pub const DEFAULT_MESSAGE_TYPE_HEADER: &str = "x-amz-sns-message-type";

/// Path the confirmation endpoint is mounted on by default
pub const DEFAULT_WEBHOOK_PATH: &str = "/api/v1/webhook/sns";

/// Configuration for the subscription manager and confirmation endpoint
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Externally reachable base URL of this service, e.g. `https://bridge.example.com`
    pub self_url: String,

    /// Path of the confirmation endpoint
    pub webhook_path: String,

    /// Broker topic to subscribe to and publish on
    pub topic_arn: String,

    /// Address the HTTP server binds to
    pub listen_addr: String,

    /// Bounded publish queue size per generation
    pub queue_capacity: usize,

    /// Header carrying the callback type discriminator
    pub message_type_header: String,

    /// Answer 200 to callback types other than `SubscriptionConfirmation`
    /// instead of rejecting them
    pub ignore_unsupported_types: bool,

    /// Status for validation and parse failures
    pub validation_status: u16,

    /// Status when the broker confirm call fails
    pub upstream_error_status: u16,

    /// Largest accepted confirmation body, in bytes
    pub max_body_size: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            self_url: String::new(),
            webhook_path: DEFAULT_WEBHOOK_PATH.to_string(),
            topic_arn: String::new(),
            listen_addr: "0.0.0.0:8080".to_string(),
            queue_capacity: 100,
            message_type_header: DEFAULT_MESSAGE_TYPE_HEADER.to_string(),
            ignore_unsupported_types: false,
            validation_status: 400,
            upstream_error_status: 502,
            max_body_size: 256 * 1024,
        }
    }
}

impl BridgeConfig {
    pub fn builder() -> BridgeConfigBuilder {
        BridgeConfigBuilder::new()
    }

    /// Load from `HOOKBRIDGE_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(std::env::vars())
    }

    /// Load from an iterator of `(name, value)` pairs using the
    /// `HOOKBRIDGE_` prefix. Unknown names are ignored.
    pub fn from_vars<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let prefix = format!("{}_", ENV_PREFIX);
        let vars: HashMap<String, String> = vars
            .into_iter()
            .filter_map(|(key, value)| {
                key.strip_prefix(&prefix)
                    .map(|k| (k.to_ascii_lowercase(), value))
            })
            .collect();

        let mut config = Self::default();

        if let Some(v) = vars.get("self_url") {
            config.self_url = v.clone();
        }
        if let Some(v) = vars.get("webhook_path") {
            config.webhook_path = v.clone();
        }
        if let Some(v) = vars.get("topic_arn") {
            config.topic_arn = v.clone();
        }
        if let Some(v) = vars.get("listen_addr") {
            config.listen_addr = v.clone();
        }
        if let Some(v) = vars.get("queue_capacity") {
            config.queue_capacity = parse_number("queue_capacity", v)?;
        }
        if let Some(v) = vars.get("message_type_header") {
            config.message_type_header = v.to_ascii_lowercase();
        }
        if let Some(v) = vars.get("ignore_unsupported_types") {
            config.ignore_unsupported_types = v == "1" || v.eq_ignore_ascii_case("true");
        }
        if let Some(v) = vars.get("validation_status") {
            config.validation_status = parse_number("validation_status", v)?;
        }
        if let Some(v) = vars.get("upstream_error_status") {
            config.upstream_error_status = parse_number("upstream_error_status", v)?;
        }
        if let Some(v) = vars.get("max_body_size") {
            config.max_body_size = parse_number("max_body_size", v)?;
        }

        Ok(config)
    }

    /// Load from a `.toml` or `.json` file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| BridgeError::Config(format!("Failed to read {}: {}", path.display(), e)))?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml(&content),
            Some("json") => Self::from_json(&content),
            Some(ext) => Err(BridgeError::Config(format!("Unsupported format: {}", ext))),
            None => Err(BridgeError::Config("No file extension found".to_string())),
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| BridgeError::Config(format!("TOML parse error: {}", e)))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| BridgeError::Config(format!("JSON parse error: {}", e)))
    }

    /// Reject configurations the bridge cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.self_url.is_empty() {
            return Err(BridgeError::Config("self_url is required".to_string()));
        }

        let url = Url::parse(&self.self_url)
            .map_err(|e| BridgeError::Config(format!("Invalid self_url: {}", e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(BridgeError::Config(format!(
                "self_url must be http or https, got {}",
                url.scheme()
            )));
        }

        if self.topic_arn.is_empty() {
            return Err(BridgeError::Config("topic_arn is required".to_string()));
        }

        if !self.webhook_path.starts_with('/') {
            return Err(BridgeError::Config(format!(
                "webhook_path must start with '/': {}",
                self.webhook_path
            )));
        }

        if self.queue_capacity == 0 {
            return Err(BridgeError::Config(
                "queue_capacity must be greater than zero".to_string(),
            ));
        }

        if self.message_type_header.is_empty() {
            return Err(BridgeError::Config(
                "message_type_header must not be empty".to_string(),
            ));
        }

        self.socket_addr()?;
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.listen_addr
            .parse()
            .map_err(|e| BridgeError::Config(format!("Invalid listen_addr: {}", e)))
    }

    /// URL handed to the broker for generation `generation`.
    ///
    /// The generation travels back in the `generation` query parameter of
    /// the confirmation callback.
    pub fn callback_url(&self, generation: u64) -> Result<String> {
        let mut url = Url::parse(&self.self_url)
            .map_err(|e| BridgeError::Config(format!("Invalid self_url: {}", e)))?;

        let base = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{}{}", base, self.webhook_path));
        url.query_pairs_mut()
            .clear()
            .append_pair("generation", &generation.to_string());

        Ok(url.into())
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| BridgeError::Config(format!("{} is not a valid number: {}", name, value)))
}

/// Builder for [`BridgeConfig`]
#[derive(Debug, Clone, Default)]
pub struct BridgeConfigBuilder {
    config: BridgeConfig,
}

impl BridgeConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn self_url(mut self, url: impl Into<String>) -> Self {
        self.config.self_url = url.into();
        self
    }

    pub fn webhook_path(mut self, path: impl Into<String>) -> Self {
        self.config.webhook_path = path.into();
        self
    }

    pub fn topic_arn(mut self, arn: impl Into<String>) -> Self {
        self.config.topic_arn = arn.into();
        self
    }

    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    pub fn message_type_header(mut self, header: impl Into<String>) -> Self {
        self.config.message_type_header = header.into().to_ascii_lowercase();
        self
    }

    pub fn ignore_unsupported_types(mut self, ignore: bool) -> Self {
        self.config.ignore_unsupported_types = ignore;
        self
    }

    pub fn validation_status(mut self, status: u16) -> Self {
        self.config.validation_status = status;
        self
    }

    pub fn upstream_error_status(mut self, status: u16) -> Self {
        self.config.upstream_error_status = status;
        self
    }

    pub fn max_body_size(mut self, size: usize) -> Self {
        self.config.max_body_size = size;
        self
    }

    pub fn build(self) -> BridgeConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> BridgeConfig {
        BridgeConfig::builder()
            .self_url("https://bridge.example.com")
            .topic_arn("arn:aws:sns:us-east-1:123456789012:events")
            .build()
    }

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.webhook_path, "/api/v1/webhook/sns");
        assert_eq!(config.message_type_header, "x-amz-sns-message-type");
        assert_eq!(config.queue_capacity, 100);
        assert_eq!(config.validation_status, 400);
        assert_eq!(config.upstream_error_status, 502);
        assert!(!config.ignore_unsupported_types);
    }

    #[test]
    fn test_validate() {
        assert!(valid().validate().is_ok());

        let missing_url = BridgeConfig {
            self_url: String::new(),
            ..valid()
        };
        assert!(matches!(missing_url.validate(), Err(BridgeError::Config(_))));

        let missing_topic = BridgeConfig {
            topic_arn: String::new(),
            ..valid()
        };
        assert!(missing_topic.validate().is_err());

        let bad_path = BridgeConfig {
            webhook_path: "hooks".to_string(),
            ..valid()
        };
        assert!(bad_path.validate().is_err());

        let bad_scheme = BridgeConfig {
            self_url: "ftp://bridge.example.com".to_string(),
            ..valid()
        };
        assert!(bad_scheme.validate().is_err());

        let no_queue = BridgeConfig {
            queue_capacity: 0,
            ..valid()
        };
        assert!(no_queue.validate().is_err());

        let bad_addr = BridgeConfig {
            listen_addr: "localhost".to_string(),
            ..valid()
        };
        assert!(bad_addr.validate().is_err());
    }

    #[test]
    fn test_callback_url() {
        let config = valid();
        assert_eq!(
            config.callback_url(7).unwrap(),
            "https://bridge.example.com/api/v1/webhook/sns?generation=7"
        );

        let nested = BridgeConfig {
            self_url: "http://10.0.0.5:6000/bridge/".to_string(),
            ..valid()
        };
        assert_eq!(
            nested.callback_url(1).unwrap(),
            "http://10.0.0.5:6000/bridge/api/v1/webhook/sns?generation=1"
        );
    }

    #[test]
    fn test_from_vars() {
        let vars = vec![
            ("HOOKBRIDGE_SELF_URL".to_string(), "http://localhost:8080".to_string()),
            ("HOOKBRIDGE_TOPIC_ARN".to_string(), "arn:topic".to_string()),
            ("HOOKBRIDGE_QUEUE_CAPACITY".to_string(), "16".to_string()),
            ("HOOKBRIDGE_IGNORE_UNSUPPORTED_TYPES".to_string(), "true".to_string()),
            ("HOOKBRIDGE_MESSAGE_TYPE_HEADER".to_string(), "X-Message-Type".to_string()),
            ("PATH".to_string(), "/usr/bin".to_string()),
        ];

        let config = BridgeConfig::from_vars(vars).unwrap();
        assert_eq!(config.self_url, "http://localhost:8080");
        assert_eq!(config.topic_arn, "arn:topic");
        assert_eq!(config.queue_capacity, 16);
        assert!(config.ignore_unsupported_types);
        assert_eq!(config.message_type_header, "x-message-type");
        assert_eq!(config.webhook_path, DEFAULT_WEBHOOK_PATH);
    }

    #[test]
    fn test_from_vars_rejects_bad_number() {
        let vars = vec![(
            "HOOKBRIDGE_QUEUE_CAPACITY".to_string(),
            "lots".to_string(),
        )];
        assert!(matches!(
            BridgeConfig::from_vars(vars),
            Err(BridgeError::Config(_))
        ));
    }

    #[test]
    fn test_from_toml() {
        let config = BridgeConfig::from_toml(
            r#"
            self_url = "https://bridge.example.com"
            topic_arn = "arn:aws:sns:eu-west-1:1:t"
            queue_capacity = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.queue_capacity, 10);
        assert_eq!(config.listen_addr, "0.0.0.0:8080");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json() {
        let config = BridgeConfig::from_json(
            r#"{"self_url": "http://a", "topic_arn": "t", "upstream_error_status": 503}"#,
        )
        .unwrap();
        assert_eq!(config.upstream_error_status, 503);
        assert!(BridgeConfig::from_json("{").is_err());
    }
}
