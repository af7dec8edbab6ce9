//! Telegram Bot API channel adapter.
//!
//! `TelegramApi` wraps the HTTP methods the bot uses. `TelegramBot` routes
//! updates (from long polling or the webhook) to commands, inline answers or
//! the pipeline, one spawned task per update.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use relay_types::error::PipelineError;
use relay_types::message::{
    InboundMessage, MediaAttachment, MessageMedia, ParentMessage, ReplyFormat,
};

use crate::commands::{self, parse_command};
use crate::fetch::FileLocator;
use crate::pipeline::Pipeline;
use crate::reply::ReplySink;

/// Telegram rejects longer messages.
const MAX_MESSAGE_LEN: usize = 4096;

// ── Telegram API types ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TgResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
}

/// One update, from `getUpdates` or a webhook POST body.
#[derive(Debug, Deserialize)]
pub struct TgUpdate {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<TgMessage>,
    #[serde(default)]
    pub inline_query: Option<TgInlineQuery>,
}

#[derive(Debug, Deserialize)]
pub struct TgMessage {
    pub message_id: i64,
    pub chat: TgChat,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub voice: Option<TgFileRef>,
    #[serde(default)]
    pub video_note: Option<TgFileRef>,
    #[serde(default)]
    pub reply_to_message: Option<Box<TgMessage>>,
}

#[derive(Debug, Deserialize)]
pub struct TgChat {
    pub id: i64,
}

/// Any file-bearing object; only the id matters here.
#[derive(Debug, Deserialize)]
pub struct TgFileRef {
    pub file_id: String,
}

#[derive(Debug, Deserialize)]
struct TgFile {
    file_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TgInlineQuery {
    pub id: String,
    pub query: String,
}

impl TgMessage {
    fn media(&self) -> MessageMedia {
        MessageMedia {
            video_note: self
                .video_note
                .as_ref()
                .map(|v| MediaAttachment::video(v.file_id.clone())),
            voice: self
                .voice
                .as_ref()
                .map(|v| MediaAttachment::audio(v.file_id.clone())),
        }
    }

    pub fn to_inbound(&self) -> InboundMessage {
        InboundMessage {
            chat_id: self.chat.id,
            message_id: self.message_id,
            body: self.text.clone(),
            reply_to: self.reply_to_message.as_ref().map(|parent| ParentMessage {
                message_id: parent.message_id,
                media: parent.media(),
            }),
            media: self.media(),
        }
    }
}

fn parse_mode(format: ReplyFormat) -> Option<&'static str> {
    match format {
        ReplyFormat::Markdown => Some("Markdown"),
        ReplyFormat::Html => Some("HTML"),
        ReplyFormat::Plain => None,
    }
}

// ── API calls ───────────────────────────────────────────────────────────

pub struct TelegramApi {
    client: reqwest::Client,
    token: String,
    api_base: String,
}

impl TelegramApi {
    pub fn new(token: String, api_base: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            token,
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, self.token)
    }

    /// Download URL for a `file_path` returned by `getFile`.
    pub fn file_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{file_path}", self.api_base, self.token)
    }

    async fn call_raw<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &serde_json::Value,
    ) -> Result<TgResponse<T>> {
        self.client
            .post(self.method_url(method))
            .json(params)
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .with_context(|| format!("{method} request failed"))?
            .json()
            .await
            .with_context(|| format!("{method} returned an unreadable body"))
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: &serde_json::Value) -> Result<T> {
        let resp: TgResponse<T> = self.call_raw(method, params).await?;
        if !resp.ok {
            anyhow::bail!(
                "Telegram API error in {method}: {}",
                resp.description.unwrap_or_default()
            );
        }
        resp.result
            .ok_or_else(|| anyhow::anyhow!("{method} returned no result"))
    }

    pub async fn get_updates(&self, offset: i64, timeout: u64) -> Result<Vec<TgUpdate>> {
        let resp: TgResponse<Vec<TgUpdate>> = self
            .client
            .get(self.method_url("getUpdates"))
            .query(&[
                ("offset", offset.to_string()),
                ("timeout", timeout.to_string()),
                ("allowed_updates", r#"["message","inline_query"]"#.to_string()),
            ])
            .timeout(std::time::Duration::from_secs(timeout + 10))
            .send()
            .await
            .map_err(reqwest::Error::without_url)?
            .json()
            .await?;

        if !resp.ok {
            anyhow::bail!("Telegram API error: {}", resp.description.unwrap_or_default());
        }
        Ok(resp.result.unwrap_or_default())
    }

    /// Resolve a file id to its server-side path.
    pub async fn get_file(&self, file_id: &str) -> Result<String> {
        let file: TgFile = self
            .call("getFile", &serde_json::json!({ "file_id": file_id }))
            .await?;
        file.file_path
            .ok_or_else(|| anyhow::anyhow!("No file_path in getFile response"))
    }

    /// Send text, split at Telegram's length limit. A chunk that Telegram
    /// refuses in rich mode is re-sent once as plain text.
    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        format: ReplyFormat,
        reply_to: Option<i64>,
    ) -> Result<()> {
        for chunk in split_message(text, MAX_MESSAGE_LEN) {
            let mut params = serde_json::json!({
                "chat_id": chat_id,
                "text": chunk,
            });
            if let Some(reply_id) = reply_to {
                params["reply_parameters"] = serde_json::json!({
                    "message_id": reply_id,
                    "allow_sending_without_reply": true,
                });
            }

            let Some(mode) = parse_mode(format) else {
                self.call::<serde_json::Value>("sendMessage", &params).await?;
                continue;
            };

            let mut rich = params.clone();
            rich["parse_mode"] = serde_json::json!(mode);
            let resp: TgResponse<serde_json::Value> = self.call_raw("sendMessage", &rich).await?;
            if !resp.ok {
                warn!(
                    chat_id,
                    "sendMessage rejected {mode} ({}), retrying as plain text",
                    resp.description.unwrap_or_default()
                );
                self.call::<serde_json::Value>("sendMessage", &params).await?;
            }
        }
        Ok(())
    }

    /// Send a chat action (e.g. "typing"). Failures are logged, never returned.
    pub async fn send_chat_action(&self, chat_id: i64, action: &str) {
        let params = serde_json::json!({
            "chat_id": chat_id,
            "action": action,
        });
        if let Err(e) = self.call::<bool>("sendChatAction", &params).await {
            warn!("sendChatAction failed: {e:#}");
        }
    }

    pub async fn set_my_commands(&self, commands: &[(&str, &str)]) -> Result<()> {
        let commands: Vec<_> = commands
            .iter()
            .map(|(command, description)| {
                serde_json::json!({ "command": command, "description": description })
            })
            .collect();
        self.call::<bool>("setMyCommands", &serde_json::json!({ "commands": commands }))
            .await?;
        Ok(())
    }

    pub async fn answer_inline_query(
        &self,
        inline_query_id: &str,
        results: Vec<serde_json::Value>,
    ) -> Result<()> {
        let params = serde_json::json!({
            "inline_query_id": inline_query_id,
            "results": results,
        });
        self.call::<bool>("answerInlineQuery", &params).await?;
        Ok(())
    }

    /// Register the webhook. Telegram then POSTs updates instead of serving getUpdates.
    pub async fn set_webhook(&self, url: &str, secret: Option<&str>) -> Result<()> {
        let mut params = serde_json::json!({
            "url": url,
            "allowed_updates": ["message", "inline_query"],
        });
        if let Some(s) = secret {
            params["secret_token"] = serde_json::json!(s);
        }
        self.call::<bool>("setWebhook", &params).await?;
        Ok(())
    }

    /// Remove the webhook so getUpdates works again.
    pub async fn delete_webhook(&self) -> Result<()> {
        self.call::<bool>("deleteWebhook", &serde_json::json!({}))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl FileLocator for TelegramApi {
    async fn resolve_file_location(&self, file_id: &str) -> Result<String> {
        let file_path = self.get_file(file_id).await?;
        Ok(self.file_url(&file_path))
    }
}

#[async_trait]
impl ReplySink for TelegramApi {
    async fn send_reply(
        &self,
        chat_id: i64,
        reply_to: Option<i64>,
        text: &str,
        format: ReplyFormat,
    ) -> Result<(), PipelineError> {
        self.send_message(chat_id, text, format, reply_to)
            .await
            .map_err(|e| PipelineError::Reply(format!("{e:#}")))
    }

    async fn indicate_activity(&self, chat_id: i64) {
        self.send_chat_action(chat_id, "typing").await;
    }
}

/// Byte offset at which `text` exceeds `max_units` UTF-16 code units, the
/// unit Telegram measures message length in.
fn utf16_limit(text: &str, max_units: usize) -> Option<usize> {
    let mut units = 0;
    for (i, c) in text.char_indices() {
        units += c.len_utf16();
        if units > max_units {
            return Some(i);
        }
    }
    None
}

/// Split on newlines where possible, never inside a character.
fn split_message(text: &str, max_len: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut rest = text;
    while let Some(end) = utf16_limit(rest, max_len) {
        // a lone character wider than the limit still has to go somewhere
        let end = end.max(rest.chars().next().map_or(0, char::len_utf8));
        let split_at = rest[..end].rfind('\n').map_or(end, |i| i + 1);
        let (chunk, tail) = rest.split_at(split_at);
        chunks.push(chunk);
        rest = tail;
    }
    chunks.push(rest);
    chunks
}

// ── Update routing ──────────────────────────────────────────────────────

pub struct TelegramBot {
    api: Arc<TelegramApi>,
    pipeline: Arc<Pipeline>,
}

impl TelegramBot {
    pub fn new(api: Arc<TelegramApi>, pipeline: Arc<Pipeline>) -> Self {
        Self { api, pipeline }
    }

    pub fn api(&self) -> &Arc<TelegramApi> {
        &self.api
    }

    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }

    /// Advertise the bot's commands. Failure is logged, not fatal.
    pub async fn register_commands(&self) {
        match self.api.set_my_commands(commands::ADVERTISED).await {
            Ok(()) => info!("Registered {} bot command(s)", commands::ADVERTISED.len()),
            Err(e) => warn!("setMyCommands failed: {e:#}"),
        }
    }

    /// Handle one update on its own task.
    pub fn spawn_update(self: &Arc<Self>, update: TgUpdate) {
        let bot = Arc::clone(self);
        tokio::spawn(async move {
            bot.handle_update(update).await;
        });
    }

    pub async fn handle_update(&self, update: TgUpdate) {
        if let Some(query) = update.inline_query {
            let results = commands::inline_results(&query.query);
            if let Err(e) = self.api.answer_inline_query(&query.id, results).await {
                warn!("answerInlineQuery failed: {e:#}");
            }
            return;
        }

        let Some(msg) = update.message else {
            debug!(update_id = update.update_id, "Skipping update without message");
            return;
        };

        if let Some(command) = msg.text.as_deref().and_then(parse_command) {
            info!(chat_id = msg.chat.id, ?command, "Command received");
            if let Err(e) = self
                .api
                .send_message(msg.chat.id, command.reply_text(), ReplyFormat::Plain, None)
                .await
            {
                error!("Command reply failed: {e:#}");
            }
            return;
        }

        self.pipeline.handle(&msg.to_inbound()).await;
    }

    /// Long-poll `getUpdates` forever, spawning a task per update.
    pub async fn run_polling(self: Arc<Self>, timeout: u64) {
        let mut offset: i64 = 0;
        info!("Telegram adapter started (long polling)");

        loop {
            match self.api.get_updates(offset, timeout).await {
                Ok(updates) => {
                    for update in updates {
                        offset = offset.max(update.update_id + 1);
                        self.spawn_update(update);
                    }
                }
                Err(e) => {
                    warn!("Telegram polling error: {e:#}");
                    tokio::time::sleep(tokio::time::Duration::from_secs(5)).await;
                }
            }
        }
    }
}
