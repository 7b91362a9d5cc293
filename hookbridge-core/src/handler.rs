//! Confirmation handler
//!
//! Receives the broker's subscription confirmation callback, checks it with
//! the configured [`Validator`], confirms the token with the broker and
//! hands the result to the [`SubscriptionManager`].

use crate::manager::{ConfirmOutcome, SubscriptionManager};
use crate::message::{ConfirmationCallback, MessageType};
use crate::{BridgeError, HttpRequest, HttpResponse, Result, Validator};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Reason reported when a validator answers `Ok(false)`
pub const VALIDATION_FAILED: &str = "message failed validation";

/// Query parameter carrying the generation a callback belongs to.
///
/// Every callback URL the bridge registers carries it. A callback without
/// it is confirmed on behalf of the generation current when the request is
/// handled, which only affects callers that build the URL themselves.
pub const GENERATION_PARAM: &str = "generation";

/// HTTP handler for broker confirmation callbacks
#[derive(Clone)]
pub struct ConfirmationHandler {
    manager: Arc<SubscriptionManager>,
    validator: Arc<dyn Validator>,
}

impl ConfirmationHandler {
    pub fn new(manager: Arc<SubscriptionManager>, validator: Arc<dyn Validator>) -> Self {
        Self { manager, validator }
    }

    pub fn manager(&self) -> &Arc<SubscriptionManager> {
        &self.manager
    }

    /// Configured endpoint path
    pub fn path(&self) -> &str {
        &self.manager.config().webhook_path
    }

    /// Whether a request with this method and path is a confirmation callback.
    pub fn matches(&self, method: &str, path: &str) -> bool {
        method.eq_ignore_ascii_case("POST") && path == self.path()
    }

    /// Handle one callback. Never fails; errors become JSON error responses.
    pub async fn handle(&self, request: HttpRequest) -> HttpResponse {
        match self.process(&request).await {
            Ok(response) => response,
            Err(e) => self.error_response(&e),
        }
    }

    async fn process(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let config = self.manager.config();

        if request.body.len() > config.max_body_size {
            return Err(BridgeError::MalformedBody(format!(
                "body exceeds {} bytes",
                config.max_body_size
            )));
        }

        let header_type = request.header(&config.message_type_header).map(MessageType::parse);
        if let Some(kind) = &header_type {
            if !kind.is_confirmation() {
                return self.unsupported(kind);
            }
        }

        let callback: ConfirmationCallback = request.json()?;
        let kind = callback.kind();
        if !kind.is_confirmation() {
            if header_type.is_some() {
                return Err(BridgeError::MalformedBody(format!(
                    "header announces SubscriptionConfirmation but body has Type {}",
                    kind
                )));
            }
            return self.unsupported(&kind);
        }

        if callback.token.is_empty() {
            return Err(BridgeError::MalformedBody("missing Token".to_string()));
        }

        let generation = match request.query(GENERATION_PARAM) {
            Some(value) => value.parse::<u64>().map_err(|_| {
                BridgeError::MalformedBody(format!("invalid generation: {}", value))
            })?,
            None => self.manager.generation(),
        };

        self.validate(&callback).await?;

        match self.manager.confirm(&callback.token, generation).await? {
            ConfirmOutcome::Confirmed {
                generation,
                identifier,
            } => {
                info!(generation, identifier = %identifier, "Subscription confirmed");
            }
            ConfirmOutcome::Stale {
                generation,
                current,
            } => {
                debug!(generation, current, "Stale confirmation accepted without state change");
            }
            ConfirmOutcome::Closed { generation } => {
                debug!(generation, "Confirmation accepted after shutdown");
            }
        }

        Ok(HttpResponse::ok())
    }

    async fn validate(&self, callback: &ConfirmationCallback) -> Result<()> {
        match self.validator.validate(callback).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(BridgeError::Validation(VALIDATION_FAILED.to_string())),
            Err(BridgeError::Validation(reason)) => Err(BridgeError::Validation(reason)),
            Err(e) => Err(BridgeError::Validation(e.to_string())),
        }
    }

    fn unsupported(&self, kind: &MessageType) -> Result<HttpResponse> {
        if self.manager.config().ignore_unsupported_types {
            debug!(message_type = %kind, "Ignoring unsupported callback type");
            return Ok(HttpResponse::ok());
        }
        Err(BridgeError::UnsupportedMessageType(kind.to_string()))
    }

    fn error_response(&self, err: &BridgeError) -> HttpResponse {
        let config = self.manager.config();
        let status = match err {
            BridgeError::Validation(_)
            | BridgeError::MalformedBody(_)
            | BridgeError::UnsupportedMessageType(_) => config.validation_status,
            e if e.is_upstream() => config.upstream_error_status,
            e => e.status_code(),
        };

        warn!(status, error = %err, "Rejected confirmation callback");
        HttpResponse::json_error(status, err.to_string())
    }
}

impl std::fmt::Debug for ConfirmationHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfirmationHandler")
            .field("path", &self.path())
            .finish()
    }
}
