use serde::{Deserialize, Serialize};

/// Kind of media the pipeline knows how to transcribe.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    /// Round video note.
    Video,
    /// Voice note.
    Audio,
}

impl MediaKind {
    /// File extension handed to the transcription service as a format hint.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Video => "mp4",
            Self::Audio => "ogg",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Video => "video/mp4",
            Self::Audio => "audio/ogg",
        }
    }

    /// Name of the multipart file part, e.g. `video.mp4`.
    pub fn file_name(self) -> String {
        format!("{self}.{}", self.extension())
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Video => write!(f, "video"),
            Self::Audio => write!(f, "audio"),
        }
    }
}

/// A media attachment as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAttachment {
    pub kind: MediaKind,
    /// Opaque, provider-assigned file identifier.
    pub file_id: String,
}

impl MediaAttachment {
    pub fn video(file_id: impl Into<String>) -> Self {
        Self {
            kind: MediaKind::Video,
            file_id: file_id.into(),
        }
    }

    pub fn audio(file_id: impl Into<String>) -> Self {
        Self {
            kind: MediaKind::Audio,
            file_id: file_id.into(),
        }
    }
}

/// Media carried by a single chat message. A message may carry both kinds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageMedia {
    pub video_note: Option<MediaAttachment>,
    pub voice: Option<MediaAttachment>,
}

/// The message this one replies to, reduced to what the pipeline inspects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentMessage {
    pub message_id: i64,
    pub media: MessageMedia,
}

/// A chat message handed to the pipeline. Never mutated after construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub chat_id: i64,
    pub message_id: i64,
    /// Message text. Captions on media are not read.
    pub body: Option<String>,
    pub reply_to: Option<ParentMessage>,
    pub media: MessageMedia,
}

/// Downloaded media bytes together with the kind they were fetched as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievedContent {
    pub kind: MediaKind,
    pub data: Vec<u8>,
}

impl RetrievedContent {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
}

/// One role-tagged message sent to the generation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Everything the generator needs for one invocation. Built fresh per message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub persona: String,
    pub instruction: String,
    pub transcript: String,
}

/// How reply text should be interpreted by the transport.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReplyFormat {
    #[default]
    Markdown,
    Html,
    Plain,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_follows_kind() {
        assert_eq!(MediaKind::Video.file_name(), "video.mp4");
        assert_eq!(MediaKind::Audio.file_name(), "audio.ogg");
        assert_eq!(MediaKind::Video.mime_type(), "video/mp4");
        assert_eq!(MediaKind::Audio.mime_type(), "audio/ogg");
    }
}
