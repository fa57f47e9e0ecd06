use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Router,
};
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::chatwork::ChatworkId;
use crate::relay::{Outcome, Relay};
use crate::signature::{WebhookVerifier, SIGNATURE_HEADER};

const FAILURE_BODY: &str = "An error occurred while processing the request.";

/// Body of a Chatwork webhook request.
#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    pub webhook_event: WebhookEvent,
}

/// The message that triggered the webhook.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    // Account-level `mention_to_me` events name the sender `from_account_id`.
    #[serde(alias = "from_account_id")]
    pub account_id: ChatworkId,
    pub body: String,
    pub room_id: ChatworkId,
}

// Just enough of the payload to identify the sender, so the bot's own
// events are skipped even when the rest of the event is incomplete.
#[derive(Deserialize)]
struct SenderEnvelope {
    webhook_event: Sender,
}

#[derive(Deserialize)]
struct Sender {
    #[serde(alias = "from_account_id")]
    account_id: ChatworkId,
}

#[derive(Clone)]
pub struct AppState {
    relay: Arc<Relay>,
    verifier: Option<Arc<WebhookVerifier>>,
}

impl AppState {
    pub fn new(relay: Relay, verifier: Option<WebhookVerifier>) -> Self {
        Self {
            relay: Arc::new(relay),
            verifier: verifier.map(Arc::new),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/webhook", post(handle_webhook))
        .with_state(state)
}

/// Serve the webhook endpoint on `addr` until Ctrl-C.
pub async fn run(state: AppState, addr: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    info!("Chatwork bot listening at http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutting down...");
        })
        .await
        .context("Server error")?;

    Ok(())
}

async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, &'static str) {
    if let Some(verifier) = &state.verifier {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !verifier.verify(&body, signature) {
            warn!("Rejected webhook request with missing or invalid signature");
            return (StatusCode::UNAUTHORIZED, "Invalid webhook signature.");
        }
    }

    if let Ok(envelope) = serde_json::from_slice::<SenderEnvelope>(&body) {
        if state.relay.is_from_bot(&envelope.webhook_event.account_id) {
            info!("Received message from the bot itself. Skipping response.");
            return (StatusCode::OK, Outcome::SkippedOwnMessage.message());
        }
    }

    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(e) => {
            warn!("Invalid webhook payload: {}", e);
            return (StatusCode::BAD_REQUEST, "Invalid webhook payload.");
        }
    };

    match state.relay.handle(&payload.webhook_event).await {
        Ok(outcome) => (StatusCode::OK, outcome.message()),
        Err(e) => {
            error!(stage = e.stage(), "An error occurred: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, FAILURE_BODY)
        }
    }
}
