//! HTTP server loop
//!
//! Routes:
//! - `POST <webhook_path>` to the [`ConfirmationHandler`]
//! - `GET /health` to a readiness probe: `{"ready": bool, "generation": n}`
//! - anything else to a 404 JSON error

use crate::{BridgeError, ConfirmationHandler, HttpRequest, HttpResponse, Result};
use bytes::Bytes;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Incoming as IncomingBody;
use hyper::header::{HeaderName, HeaderValue};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::Serialize;
use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

/// Readiness probe path
pub const HEALTH_PATH: &str = "/health";

#[derive(Debug, Serialize)]
struct Health {
    ready: bool,
    generation: u64,
}

/// Accept connections on `listener` until `shutdown` resolves.
///
/// Connections already accepted run to completion on their own tasks.
pub async fn serve<F>(
    listener: TcpListener,
    handler: Arc<ConfirmationHandler>,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()>,
{
    let addr = listener.local_addr()?;
    info!(address = %addr, path = %handler.path(), "Webhook endpoint listening");

    tokio::pin!(shutdown);

    loop {
        let (stream, peer) = tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown signal received; no longer accepting connections");
                return Ok(());
            }
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!(error = %e, "Failed to accept connection");
                    continue;
                }
            },
        };

        let io = TokioIo::new(stream);
        let handler = Arc::clone(&handler);

        tokio::spawn(async move {
            let service = service_fn(move |req: Request<IncomingBody>| {
                let handler = Arc::clone(&handler);
                async move { Ok::<_, Infallible>(route(req, &handler).await) }
            });

            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                debug!(peer = %peer, error = %err, "Error serving connection");
            }
        });
    }
}

async fn route(req: Request<IncomingBody>, handler: &ConfirmationHandler) -> Response<Full<Bytes>> {
    let method = req.method().as_str().to_string();
    let path = req.uri().path().to_string();

    let response = if handler.matches(&method, &path) {
        let limit = handler.manager().config().max_body_size;
        match to_http_request(req, limit).await {
            Ok(request) => handler.handle(request).await,
            Err(e) => HttpResponse::json_error(
                handler.manager().config().validation_status,
                e.to_string(),
            ),
        }
    } else if path == handler.path() {
        HttpResponse::json_error(405, format!("Method {} not allowed", method))
    } else if path == HEALTH_PATH && method == "GET" {
        health(handler)
    } else {
        HttpResponse::not_found(format!("No route for {} {}", method, path))
    };

    debug!(method = %method, path = %path, status = response.status, "Request handled");
    to_hyper_response(response)
}

fn health(handler: &ConfirmationHandler) -> HttpResponse {
    let snapshot = handler.manager().load();
    let health = Health {
        ready: snapshot.is_ready(),
        generation: snapshot.generation,
    };

    HttpResponse::ok()
        .with_json(&health)
        .unwrap_or_else(|e| HttpResponse::json_error(500, e.to_string()))
}

/// Convert a hyper request, reading at most `limit` body bytes.
async fn to_http_request(req: Request<IncomingBody>, limit: usize) -> Result<HttpRequest> {
    let uri = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    let mut request = HttpRequest::from_uri(req.method().as_str(), &uri);
    for (name, value) in req.headers() {
        if let Ok(value) = value.to_str() {
            request = request.with_header(name.as_str(), value);
        }
    }

    let body = Limited::new(req.into_body(), limit)
        .collect()
        .await
        .map_err(|e| BridgeError::MalformedBody(format!("failed to read body: {}", e)))?
        .to_bytes();

    Ok(request.with_body(body.to_vec()))
}

fn to_hyper_response(response: HttpResponse) -> Response<Full<Bytes>> {
    let mut out = Response::new(Full::new(Bytes::from(response.body)));
    *out.status_mut() =
        StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    for (key, value) in response.headers {
        match (
            HeaderName::from_bytes(key.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            (Ok(name), Ok(value)) => {
                out.headers_mut().insert(name, value);
            }
            _ => warn!(header = %key, "Dropping invalid response header"),
        }
    }

    out
}
