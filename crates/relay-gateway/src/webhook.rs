//! Webhook mode: Telegram POSTs updates to `/telegram/webhook`.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tracing::{info, warn};

use crate::channels::telegram::{TelegramBot, TgUpdate};

const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

#[derive(Clone)]
pub struct WebhookState {
    pub bot: Arc<TelegramBot>,
    pub secret: Option<String>,
}

pub fn router(state: WebhookState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/telegram/webhook", post(telegram_webhook))
        .with_state(state)
}

/// Acknowledge quickly; the update is handled on its own task.
async fn telegram_webhook(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    if let Some(ref expected) = state.secret {
        let provided = headers
            .get(SECRET_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if provided != expected.as_str() {
            warn!("Webhook call with wrong secret token");
            return StatusCode::FORBIDDEN;
        }
    }
    let update: TgUpdate = match serde_json::from_slice(&body) {
        Ok(u) => u,
        Err(e) => {
            // acknowledged anyway, or Telegram redelivers it forever
            warn!("Dropping unparseable webhook body: {e}");
            return StatusCode::OK;
        }
    };
    state.bot.spawn_update(update);
    StatusCode::OK
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

/// Register the webhook, serve until Ctrl-C, then remove the webhook.
pub async fn serve(state: WebhookState, bind: &str, public_url: &str) -> Result<()> {
    let api = Arc::clone(state.bot.api());
    api.set_webhook(public_url, state.secret.as_deref())
        .await
        .context("setWebhook failed")?;
    info!("Webhook registered: {public_url}");

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("binding to {bind}"))?;
    info!("Listening on {bind}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl-C: {e}");
            }
        })
        .await
        .context("webhook server exited")?;

    if let Err(e) = api.delete_webhook().await {
        warn!("deleteWebhook failed: {e:#}");
    }
    info!("Webhook server stopped");
    Ok(())
}
