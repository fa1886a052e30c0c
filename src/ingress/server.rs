// src/ingress/server.rs

//! The webhook endpoint.
//!
//! A request is verified, normalized into an [`Event`] and queued on the
//! runtime channel. The handler answers as soon as the event is queued; it
//! never waits for rules to run.

use std::future::Future;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method};
use axum::routing::any;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::RuntimeEvent;
use crate::types::Event;

use super::error::IngressError;
use super::signature::verify_signature;

pub const EVENT_HEADER: &str = "x-github-event";
pub const DELIVERY_HEADER: &str = "x-github-delivery";
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";
/// Legacy `sha1=` signature, only consulted when the sha256 one is absent.
pub const SHA1_SIGNATURE_HEADER: &str = "x-hub-signature";

/// What the endpoint needs from the configuration.
#[derive(Debug, Clone)]
pub struct IngressConfig {
    /// Route the endpoint is mounted on, e.g. `/webhook`.
    pub path: String,
    /// Shared secret for `X-Hub-Signature-256`; `None` disables verification.
    pub secret: Option<String>,
}

#[derive(Clone)]
struct IngressState {
    config: Arc<IngressConfig>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
}

/// Build the router: the webhook route plus a JSON 404 for everything else.
pub fn build_router(config: IngressConfig, runtime_tx: mpsc::Sender<RuntimeEvent>) -> Router {
    let path = config.path.clone();
    let state = IngressState {
        config: Arc::new(config),
        runtime_tx,
    };

    Router::new()
        .route(&path, any(receive))
        .fallback(not_found)
        .with_state(state)
}

/// Serve the webhook endpoint on `listener` until `shutdown` resolves.
pub async fn serve<F>(
    listener: TcpListener,
    config: IngressConfig,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, path = %config.path, "listening for webhooks");
    }
    let router = build_router(config, runtime_tx);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}

async fn receive(
    State(state): State<IngressState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, IngressError> {
    if method != Method::POST {
        debug!(%method, "non-POST request on webhook path");
        return Err(IngressError::NotFound);
    }

    let event = parse_event(&state.config, &headers, &body).inspect_err(|e| {
        warn!(error = ?e, "rejected webhook request");
    })?;

    info!(
        event_type = %event.event_type,
        delivery = %event.delivery_id,
        "received webhook"
    );

    state
        .runtime_tx
        .send(RuntimeEvent::EventReceived(Arc::new(event)))
        .await
        .map_err(|_| IngressError::Internal("runtime is not accepting events".into()))?;

    Ok(Json(serde_json::json!({ "ok": true })))
}

async fn not_found() -> IngressError {
    IngressError::NotFound
}

/// Verify and normalize one request.
pub fn parse_event(
    config: &IngressConfig,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Event, IngressError> {
    let event_type = required_header(headers, EVENT_HEADER)?;
    let delivery_id = required_header(headers, DELIVERY_HEADER)?;

    if let Some(secret) = &config.secret {
        let signature = header_value(headers, SIGNATURE_HEADER)
            .or_else(|| header_value(headers, SHA1_SIGNATURE_HEADER))
            .ok_or_else(|| {
                IngressError::bad_request(format!("missing {SIGNATURE_HEADER} header"))
            })?;
        if !verify_signature(secret, body, signature) {
            return Err(IngressError::bad_request("signature does not match"));
        }
    }

    let payload: Value = serde_json::from_slice(body)
        .map_err(|e| IngressError::bad_request(format!("invalid JSON body: {e}")))?;
    if !payload.is_object() {
        return Err(IngressError::bad_request("body must be a JSON object"));
    }

    Ok(Event::new(event_type, delivery_id, payload))
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn required_header<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, IngressError> {
    header_value(headers, name)
        .ok_or_else(|| IngressError::bad_request(format!("missing {name} header")))
}
