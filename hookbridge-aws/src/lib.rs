//! # hookbridge AWS
//!
//! AWS SNS implementations of the hookbridge capabilities:
//!
//! - [`SnsBroker`]: subscribe, confirm and publish against one SNS topic
//! - [`SnsMessageValidator`]: structural checks on confirmation callbacks
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use hookbridge_aws::{AwsConfig, SnsBroker, SnsMessageValidator};
//! use hookbridge_core::{BridgeConfig, ConfirmationHandler, SubscriptionManager};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BridgeConfig::from_env()?;
//!     let aws = AwsConfig::from_env().build();
//!
//!     let broker = SnsBroker::from_config(&aws, &config.topic_arn).await?;
//!     let validator = SnsMessageValidator::new().with_topic_arn(&config.topic_arn);
//!
//!     let manager = Arc::new(SubscriptionManager::new(config, Arc::new(broker)));
//!     let handler = ConfirmationHandler::new(manager.clone(), Arc::new(validator));
//!
//!     manager.prepare_and_start().await;
//!     Ok(())
//! }
//! ```

mod broker;
mod config;
mod error;
mod validator;

pub use broker::{SnsBroker, protocol_for};
pub use config::{AwsConfig, AwsConfigBuilder, CredentialsSource, TopicArn};
pub use error::{AwsError, Result};
pub use validator::{DEFAULT_TOLERANCE, SnsMessageValidator};
