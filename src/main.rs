use hookbridge::hookbridge_aws::{AwsConfig, SnsBroker, SnsMessageValidator};
use hookbridge::hookbridge_log::LogConfig;
use hookbridge::{Bridge, config_from_env, logging_listener};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match config_from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("hookbridge: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let _guard = match LogConfig::from_env().init() {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("hookbridge: failed to initialise logging: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let aws = AwsConfig::from_env().build();
    let broker = match SnsBroker::from_config(&aws, &config.topic_arn).await {
        Ok(broker) => broker,
        Err(e) => {
            error!(error = %e, "Failed to configure SNS client");
            return ExitCode::FAILURE;
        }
    };
    let validator = SnsMessageValidator::new().with_topic_arn(&config.topic_arn);

    info!(
        topic = %config.topic_arn,
        listen = %config.listen_addr,
        callback = %config.self_url,
        "Starting hookbridge"
    );

    let bridge = match Bridge::bind(
        config,
        Arc::new(broker),
        Arc::new(validator),
        logging_listener(),
    )
    .await
    {
        Ok(bridge) => bridge,
        Err(e) => {
            error!(error = %e, "Failed to start");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal");
        }
    };

    match bridge.run(shutdown).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "hookbridge exited with error");
            ExitCode::FAILURE
        }
    }
}
