// Service wiring: manager, handler and HTTP listener

use hookbridge_core::{
    BridgeConfig, BridgeError, BrokerClient, ConfirmationHandler, Result, StateListener,
    SubscriptionManager, Validator, server,
};
use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Environment variable naming a configuration file.
pub const CONFIG_FILE_VAR: &str = "HOOKBRIDGE_CONFIG";

/// Load the bridge configuration from the file in `HOOKBRIDGE_CONFIG`, or
/// from `HOOKBRIDGE_*` variables when it is unset. The result is validated.
pub fn config_from_env() -> Result<BridgeConfig> {
    let config = match std::env::var(CONFIG_FILE_VAR) {
        Ok(path) if !path.is_empty() => BridgeConfig::from_file(Path::new(&path))?,
        _ => BridgeConfig::from_env()?,
    };
    config.validate()?;
    Ok(config)
}

/// A bound bridge: subscription manager, confirmation handler and listener.
pub struct Bridge {
    manager: Arc<SubscriptionManager>,
    handler: Arc<ConfirmationHandler>,
    listener: TcpListener,
}

impl Bridge {
    /// Bind `config.listen_addr` and wire the manager and handler.
    pub async fn bind(
        config: BridgeConfig,
        broker: Arc<dyn BrokerClient>,
        validator: Arc<dyn Validator>,
        listener: StateListener,
    ) -> Result<Self> {
        let addr = config.socket_addr()?;
        let tcp = TcpListener::bind(addr)
            .await
            .map_err(|e| BridgeError::Config(format!("Failed to bind {}: {}", addr, e)))?;

        let manager = Arc::new(SubscriptionManager::new(config, broker).with_listener(listener));
        let handler = Arc::new(ConfirmationHandler::new(Arc::clone(&manager), validator));

        Ok(Self {
            manager,
            handler,
            listener: tcp,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn manager(&self) -> &Arc<SubscriptionManager> {
        &self.manager
    }

    /// Subscribe, serve callbacks until `shutdown` resolves, then retire
    /// the publish worker.
    ///
    /// The listener is already accepting before the subscribe call, so a
    /// fast confirmation is never refused.
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Self {
            manager,
            handler,
            listener,
        } = self;

        let server = tokio::spawn(server::serve(listener, handler, shutdown));

        manager.prepare_and_start().await;

        let result = match server.await {
            Ok(result) => result,
            Err(e) => Err(BridgeError::Http(format!("server task failed: {}", e))),
        };

        manager.shutdown();
        info!("hookbridge stopped");
        result
    }
}
