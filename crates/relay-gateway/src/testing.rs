//! In-memory collaborators that record what the pipeline asked of them.

use std::sync::Mutex;

use async_trait::async_trait;

use relay_types::error::PipelineError;
use relay_types::message::{
    GenerationRequest, InboundMessage, MediaAttachment, MediaKind, MessageMedia, ParentMessage,
    ReplyFormat, RetrievedContent,
};

use crate::fetch::ContentFetcher;
use crate::llm::Generator;
use crate::reply::ReplySink;
use crate::stt::Transcriber;

pub const MENTION: &str = "@bot";

/// An addressed-or-not message replying to a voice note.
pub fn voice_reply(body: &str, voice_id: &str) -> InboundMessage {
    InboundMessage {
        chat_id: -100,
        message_id: 7,
        body: Some(body.to_string()),
        reply_to: Some(ParentMessage {
            message_id: 6,
            media: MessageMedia {
                video_note: None,
                voice: Some(MediaAttachment::audio(voice_id)),
            },
        }),
        media: MessageMedia::default(),
    }
}

fn lock<T: Clone>(m: &Mutex<Vec<T>>) -> Vec<T> {
    m.lock().map(|v| v.clone()).unwrap_or_default()
}

pub struct FakeFetcher {
    data: Option<Vec<u8>>,
    calls: Mutex<Vec<MediaAttachment>>,
}

impl FakeFetcher {
    pub fn ok(data: &[u8]) -> Self {
        Self {
            data: Some(data.to_vec()),
            calls: Mutex::default(),
        }
    }

    pub fn failing() -> Self {
        Self {
            data: None,
            calls: Mutex::default(),
        }
    }

    pub fn calls(&self) -> Vec<MediaAttachment> {
        lock(&self.calls)
    }
}

#[async_trait]
impl ContentFetcher for FakeFetcher {
    async fn fetch(&self, attachment: &MediaAttachment) -> Result<RetrievedContent, PipelineError> {
        self.calls.lock().unwrap().push(attachment.clone());
        match &self.data {
            Some(data) => Ok(RetrievedContent {
                kind: attachment.kind,
                data: data.clone(),
            }),
            None => Err(PipelineError::ContentRetrieval("connection reset".into())),
        }
    }
}

pub struct FakeTranscriber {
    text: Option<String>,
    calls: Mutex<Vec<(MediaKind, Vec<u8>)>>,
}

impl FakeTranscriber {
    pub fn ok(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            calls: Mutex::default(),
        }
    }

    pub fn failing() -> Self {
        Self {
            text: None,
            calls: Mutex::default(),
        }
    }

    pub fn calls(&self) -> Vec<(MediaKind, Vec<u8>)> {
        lock(&self.calls)
    }
}

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, content: &RetrievedContent) -> Result<String, PipelineError> {
        self.calls
            .lock()
            .unwrap()
            .push((content.kind, content.data.clone()));
        self.text
            .clone()
            .ok_or_else(|| PipelineError::Transcription("400 unsupported".into()))
    }
}

pub struct FakeGenerator {
    text: Option<String>,
    calls: Mutex<Vec<GenerationRequest>>,
}

impl FakeGenerator {
    pub fn ok(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            calls: Mutex::default(),
        }
    }

    pub fn failing() -> Self {
        Self {
            text: None,
            calls: Mutex::default(),
        }
    }

    pub fn calls(&self) -> Vec<GenerationRequest> {
        lock(&self.calls)
    }
}

#[async_trait]
impl Generator for FakeGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, PipelineError> {
        self.calls.lock().unwrap().push(request.clone());
        self.text
            .clone()
            .ok_or_else(|| PipelineError::Generation("502 upstream".into()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentReply {
    pub chat_id: i64,
    pub reply_to: Option<i64>,
    pub text: String,
    pub format: ReplyFormat,
}

#[derive(Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<SentReply>>,
    activity: Mutex<Vec<i64>>,
    fail: bool,
}

impl RecordingSink {
    /// Records the reply, then reports a delivery failure.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn sent(&self) -> Vec<SentReply> {
        lock(&self.sent)
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent().into_iter().map(|r| r.text).collect()
    }

    pub fn activity_count(&self) -> usize {
        lock(&self.activity).len()
    }
}

#[async_trait]
impl ReplySink for RecordingSink {
    async fn send_reply(
        &self,
        chat_id: i64,
        reply_to: Option<i64>,
        text: &str,
        format: ReplyFormat,
    ) -> Result<(), PipelineError> {
        self.sent.lock().unwrap().push(SentReply {
            chat_id,
            reply_to,
            text: text.to_string(),
            format,
        });
        if self.fail {
            return Err(PipelineError::Reply("chat not found".into()));
        }
        Ok(())
    }

    async fn indicate_activity(&self, chat_id: i64) {
        self.activity.lock().unwrap().push(chat_id);
    }
}
