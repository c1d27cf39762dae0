//! Inbound WhatsApp webhook.
//!
//! Twilio posts each inbound message as a form (`Body`, `From`,
//! `ProfileName`). The reply is produced synchronously and delivered through
//! the messaging gateway; the webhook itself answers with empty TwiML.

use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::intent::IntentService;
use crate::platform::{split_message, IncomingMessage, MessagingGateway, MAX_MESSAGE_LEN};
use crate::store::Store;

const EMPTY_TWIML: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response/>";

pub const WELCOME: &str = "👋 Welcome to your journal! Send HELP anytime to see what I can do.";

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<IntentService>,
    pub store: Store,
    pub gateway: Arc<dyn MessagingGateway>,
    /// Empty means everyone.
    pub allowed_senders: Arc<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookForm {
    #[serde(rename = "Body", default)]
    body: String,
    #[serde(rename = "From", default)]
    from: String,
    #[serde(rename = "ProfileName")]
    profile_name: Option<String>,
}

pub fn router(state: AppState, webhook_path: &str) -> Router {
    Router::new()
        .route(webhook_path, post(receive_message))
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

fn twiml() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/xml")], EMPTY_TWIML)
}

async fn receive_message(
    State(state): State<AppState>,
    Form(form): Form<WebhookForm>,
) -> Result<impl IntoResponse, (StatusCode, &'static str)> {
    let incoming = IncomingMessage {
        sender: form.from.trim().to_string(),
        profile_name: form.profile_name.filter(|n| !n.trim().is_empty()),
        text: form.body.trim().to_string(),
    };

    if incoming.text.is_empty() || incoming.sender.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Missing required fields"));
    }

    if !state.allowed_senders.is_empty() && !state.allowed_senders.contains(&incoming.sender) {
        warn!("Ignoring message from unlisted sender {}", incoming.sender);
        return Ok(twiml());
    }

    info!("WhatsApp message from {}: {}", incoming.sender, incoming.text);

    let reply = match handle_incoming(&state, &incoming).await {
        Ok(reply) => reply,
        Err(e) => {
            error!("Failed to handle message from {}: {:#}", incoming.sender, e);
            return Err((StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"));
        }
    };

    for chunk in split_message(&reply, MAX_MESSAGE_LEN) {
        if let Err(e) = state.gateway.send_message(&incoming.sender, &chunk).await {
            error!("Failed to send reply to {}: {:#}", incoming.sender, e);
            break;
        }
    }

    Ok(twiml())
}

/// Resolve the user, record the raw text and produce the reply.
async fn handle_incoming(state: &AppState, incoming: &IncomingMessage) -> Result<String> {
    let (user_id, created) = state
        .store
        .ensure_user(&incoming.sender, incoming.profile_name.as_deref())
        .await?;
    if created {
        info!("New user {} for {}", user_id, incoming.sender);
    }

    let raw_id = state.store.save_raw_input(&user_id, &incoming.text).await?;
    let reply = state.service.process_command(&user_id, &incoming.text).await;
    // Reply already produced; the raw input stays unprocessed.
    if let Err(e) = state.store.mark_raw_input_processed(&raw_id).await {
        error!("Failed to mark raw input {} processed: {:#}", raw_id, e);
    }

    Ok(if created {
        format!("{}\n\n{}", WELCOME, reply)
    } else {
        reply
    })
}
