//! resolve → fetch → transcribe → generate → reply, once per inbound message.
//!
//! Holds no mutable state, so one `Arc<Pipeline>` is shared by every task.

use std::sync::Arc;

use tracing::{debug, info};

use relay_types::config::RelayConfig;
use relay_types::error::PipelineError;
use relay_types::message::{InboundMessage, MediaAttachment};

use crate::fetch::ContentFetcher;
use crate::llm::Generator;
use crate::reply::{Outcome, ReplyDispatcher, ReplySink};
use crate::resolver::resolve_media;
use crate::stt::Transcriber;
use crate::system_prompt::{build_request, extract_instruction};

/// Collaborators handed to the pipeline at construction.
pub struct Collaborators {
    pub fetcher: Arc<dyn ContentFetcher>,
    pub transcriber: Arc<dyn Transcriber>,
    pub generator: Arc<dyn Generator>,
    pub replies: Arc<dyn ReplySink>,
}

pub struct Pipeline {
    mention: String,
    direct_attachments: bool,
    fetcher: Arc<dyn ContentFetcher>,
    transcriber: Arc<dyn Transcriber>,
    generator: Arc<dyn Generator>,
    replies: Arc<dyn ReplySink>,
    dispatcher: ReplyDispatcher,
}

impl Pipeline {
    pub fn new(config: &RelayConfig, collaborators: Collaborators) -> Self {
        Self {
            mention: config.telegram.mention.clone(),
            direct_attachments: config.reply.direct_attachments,
            fetcher: collaborators.fetcher,
            transcriber: collaborators.transcriber,
            generator: collaborators.generator,
            replies: collaborators.replies,
            dispatcher: ReplyDispatcher::new(config.reply.parse_mode, config.reply.fallback_text.clone()),
        }
    }

    pub fn mention(&self) -> &str {
        &self.mention
    }

    /// Run one message to a terminal state. Never returns an error: failures
    /// become the fallback reply.
    pub async fn handle(&self, msg: &InboundMessage) -> Outcome {
        let Some(attachment) = resolve_media(msg, &self.mention, self.direct_attachments) else {
            debug!(chat_id = msg.chat_id, message_id = msg.message_id, "Message ignored");
            return Outcome::Ignored;
        };

        info!(
            chat_id = msg.chat_id,
            message_id = msg.message_id,
            kind = %attachment.kind,
            "Processing attachment"
        );
        self.replies.indicate_activity(msg.chat_id).await;

        let result = self.run_stages(msg, attachment).await;
        self.dispatcher
            .dispatch(self.replies.as_ref(), msg.chat_id, Some(msg.message_id), result)
            .await
    }

    async fn run_stages(
        &self,
        msg: &InboundMessage,
        attachment: &MediaAttachment,
    ) -> Result<String, PipelineError> {
        let content = self.fetcher.fetch(attachment).await?;
        let transcript = self.transcriber.transcribe(&content).await?;
        drop(content);

        let instruction = extract_instruction(msg.body.as_deref(), &self.mention);
        let request = build_request(instruction, transcript);
        self.generator.generate(&request).await
    }
}
