//! Reply delivery: the generated text on success, a fixed apology otherwise.

use async_trait::async_trait;
use tracing::{error, info};

use relay_types::error::PipelineError;
use relay_types::message::ReplyFormat;

/// Where replies go. Implemented by the transport.
#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn send_reply(
        &self,
        chat_id: i64,
        reply_to: Option<i64>,
        text: &str,
        format: ReplyFormat,
    ) -> Result<(), PipelineError>;

    /// Signal that work has started on the chat. Best effort.
    async fn indicate_activity(&self, _chat_id: i64) {}
}

/// Final state of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Not addressed to the bot, or nothing to transcribe. Nothing was sent.
    Ignored,
    RepliedWithResult,
    RepliedWithFallback,
    /// A reply was attempted but the transport refused it. Nothing reached
    /// the chat.
    Undelivered,
}

pub struct ReplyDispatcher {
    format: ReplyFormat,
    fallback_text: String,
}

impl ReplyDispatcher {
    pub fn new(format: ReplyFormat, fallback_text: impl Into<String>) -> Self {
        Self {
            format,
            fallback_text: fallback_text.into(),
        }
    }

    /// Send either the generated text or the fallback. The pipeline error, if
    /// any, is logged here and never shown to the user.
    pub async fn dispatch(
        &self,
        sink: &dyn ReplySink,
        chat_id: i64,
        reply_to: Option<i64>,
        result: Result<String, PipelineError>,
    ) -> Outcome {
        let (text, format, outcome) = match result {
            Ok(text) => (text, self.format, Outcome::RepliedWithResult),
            Err(e) => {
                error!(chat_id, stage = e.stage(), "Pipeline failed: {e}");
                (
                    self.fallback_text.clone(),
                    ReplyFormat::Plain,
                    Outcome::RepliedWithFallback,
                )
            }
        };

        match sink.send_reply(chat_id, reply_to, &text, format).await {
            Ok(()) => {
                info!(chat_id, ?outcome, "Reply sent");
                outcome
            }
            Err(e) => {
                error!(chat_id, stage = e.stage(), intended = ?outcome, "Reply could not be delivered: {e}");
                Outcome::Undelivered
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingSink;

    #[tokio::test]
    async fn success_forwards_text_verbatim_with_configured_format() {
        let sink = RecordingSink::default();
        let dispatcher = ReplyDispatcher::new(ReplyFormat::Html, "sorry");
        let outcome = dispatcher
            .dispatch(&sink, 3, Some(9), Ok("<b>hi</b>".to_string()))
            .await;

        assert_eq!(outcome, Outcome::RepliedWithResult);
        let sent = sink.sent();
        assert_eq!(sent[0].text, "<b>hi</b>");
        assert_eq!(sent[0].format, ReplyFormat::Html);
        assert_eq!(sent[0].reply_to, Some(9));
    }

    #[tokio::test]
    async fn error_sends_fixed_fallback_without_details() {
        let sink = RecordingSink::default();
        let dispatcher = ReplyDispatcher::new(ReplyFormat::Markdown, "sorry");
        let outcome = dispatcher
            .dispatch(&sink, 3, None, Err(PipelineError::Generation("secret detail".into())))
            .await;

        assert_eq!(outcome, Outcome::RepliedWithFallback);
        assert_eq!(sink.texts(), vec!["sorry".to_string()]);
        assert_eq!(sink.sent()[0].format, ReplyFormat::Plain);
    }

    #[tokio::test]
    async fn refused_delivery_is_reported_as_undelivered() {
        let sink = RecordingSink::failing();
        let dispatcher = ReplyDispatcher::new(ReplyFormat::Markdown, "sorry");
        let outcome = dispatcher.dispatch(&sink, 3, None, Ok("text".into())).await;
        assert_eq!(outcome, Outcome::Undelivered);

        let outcome = dispatcher
            .dispatch(&sink, 3, None, Err(PipelineError::Transcription("401".into())))
            .await;
        assert_eq!(outcome, Outcome::Undelivered);
        assert_eq!(sink.texts(), vec!["text".to_string(), "sorry".to_string()]);
    }
}
