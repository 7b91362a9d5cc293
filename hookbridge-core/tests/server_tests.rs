//! End-to-end tests for the HTTP server loop over a loopback socket.

use async_trait::async_trait;
use hookbridge_core::*;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

#[derive(Default)]
struct StubBroker {
    published: Mutex<Vec<String>>,
}

#[async_trait]
impl BrokerClient for StubBroker {
    async fn subscribe(&self, _callback_url: &str) -> Result<String> {
        Ok(PENDING_CONFIRMATION.to_string())
    }

    async fn confirm_subscription(&self, token: &str) -> Result<String> {
        Ok(format!("arn:aws:sns:us-east-1:123456789012:events:{}", token))
    }

    async fn publish(&self, message: &OutboundMessage) -> Result<()> {
        self.published.lock().push(message.payload_str().into_owned());
        Ok(())
    }
}

struct Running {
    addr: SocketAddr,
    manager: Arc<SubscriptionManager>,
    stop: oneshot::Sender<()>,
    server: tokio::task::JoinHandle<Result<()>>,
}

async fn start(config: BridgeConfig) -> Running {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let manager = Arc::new(SubscriptionManager::new(
        config,
        Arc::new(StubBroker::default()),
    ));
    let validator = |callback: &ConfirmationCallback| -> Result<bool> {
        if callback.signature == "forged" {
            return Err(BridgeError::Validation("signature does not verify".into()));
        }
        Ok(true)
    };
    let handler = Arc::new(ConfirmationHandler::new(
        Arc::clone(&manager),
        Arc::new(validator),
    ));

    let (stop, stopped) = oneshot::channel::<()>();
    let server = tokio::spawn(server::serve(listener, handler, async move {
        stopped.await.ok();
    }));

    Running {
        addr,
        manager,
        stop,
        server,
    }
}

fn config() -> BridgeConfig {
    BridgeConfig::builder()
        .self_url("http://127.0.0.1:8080")
        .topic_arn("arn:aws:sns:us-east-1:123456789012:events")
        .build()
}

fn confirmation_body(signature: &str) -> String {
    serde_json::json!({
        "Type": "SubscriptionConfirmation",
        "Token": "tok-1",
        "Signature": signature,
    })
    .to_string()
}

#[tokio::test]
async fn test_confirmation_over_http() {
    let running = start(config()).await;
    running.manager.prepare_and_start().await;

    let client = reqwest::Client::new();
    let response = client
        .post(format!(
            "http://{}/api/v1/webhook/sns?generation=1",
            running.addr
        ))
        .header("x-amz-sns-message-type", "SubscriptionConfirmation")
        .body(confirmation_body("c2ln"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    assert!(running.manager.is_ready());

    let health: serde_json::Value = client
        .get(format!("http://{}/health", running.addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health, serde_json::json!({"ready": true, "generation": 1}));

    running.stop.send(()).ok();
    running.server.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_validation_error_over_http() {
    let running = start(config()).await;
    running.manager.prepare_and_start().await;

    let response = reqwest::Client::new()
        .post(format!("http://{}/api/v1/webhook/sns", running.addr))
        .header("x-amz-sns-message-type", "SubscriptionConfirmation")
        .body(confirmation_body("forged"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
    assert_eq!(
        response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok()),
        Some("application/json; charset=UTF-8")
    );
    let body: ErrorResponse = response.json().await.unwrap();
    assert_eq!(body, ErrorResponse::new(400, "signature does not verify"));
    assert!(!running.manager.is_ready());

    running.stop.send(()).ok();
}

#[tokio::test]
async fn test_unknown_route_and_method() {
    let running = start(config()).await;
    let client = reqwest::Client::new();

    let missing = client
        .get(format!("http://{}/nope", running.addr))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status().as_u16(), 404);
    let body: ErrorResponse = missing.json().await.unwrap();
    assert_eq!(body.code, 404);

    let wrong_method = client
        .get(format!("http://{}/api/v1/webhook/sns", running.addr))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong_method.status().as_u16(), 405);

    let health: serde_json::Value = client
        .get(format!("http://{}/health", running.addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health, serde_json::json!({"ready": false, "generation": 0}));

    running.stop.send(()).ok();
}

#[tokio::test]
async fn test_oversized_body_rejected() {
    let config = BridgeConfig {
        max_body_size: 32,
        ..config()
    };
    let running = start(config).await;
    running.manager.prepare_and_start().await;

    let response = reqwest::Client::new()
        .post(format!("http://{}/api/v1/webhook/sns", running.addr))
        .header("x-amz-sns-message-type", "SubscriptionConfirmation")
        .body(confirmation_body(&"A".repeat(128)))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
    assert!(!running.manager.is_ready());

    running.stop.send(()).ok();
}

#[tokio::test]
async fn test_server_stops_on_shutdown() {
    let running = start(config()).await;
    running.stop.send(()).ok();

    let result = tokio::time::timeout(std::time::Duration::from_secs(5), running.server).await;
    assert!(matches!(result, Ok(Ok(Ok(())))));
}
