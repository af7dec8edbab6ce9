//! Speech-to-Text — OpenAI-compatible `/audio/transcriptions` endpoint.

use async_trait::async_trait;
use tracing::info;

use relay_types::config::TranscriptionConfig;
use relay_types::error::PipelineError;
use relay_types::message::RetrievedContent;

#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Turn downloaded media into plain text.
    async fn transcribe(&self, content: &RetrievedContent) -> Result<String, PipelineError>;
}

pub struct WhisperTranscriber {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl WhisperTranscriber {
    pub fn new(config: &TranscriptionConfig, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        }
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, content: &RetrievedContent) -> Result<String, PipelineError> {
        let err = |e: String| PipelineError::Transcription(e);

        info!("STT: transcribing {} bytes of {}", content.len(), content.kind);

        // The extension is only a format hint for the service.
        let part = reqwest::multipart::Part::bytes(content.data.clone())
            .file_name(content.kind.file_name())
            .mime_str(content.kind.mime_type())
            .map_err(|e| err(format!("invalid mime type: {e}")))?;

        let form = reqwest::multipart::Form::new()
            .text("model", self.model.clone())
            .text("response_format", "text")
            .part("file", part);

        let resp = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| err(format!("request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(err(format!("API error ({status}): {body}")));
        }

        let text = resp
            .text()
            .await
            .map_err(|e| err(format!("failed to read response: {e}")))?
            .trim()
            .to_string();
        info!("STT: transcribed {} chars", text.chars().count());
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_types::message::MediaKind;

    fn transcriber(url: String) -> WhisperTranscriber {
        let config = TranscriptionConfig {
            api_key: None,
            base_url: url,
            model: "whisper-1".to_string(),
        };
        WhisperTranscriber::new(&config, "sk-test".to_string())
    }

    #[tokio::test]
    async fn sends_named_file_and_returns_trimmed_text() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/audio/transcriptions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(mockito::Matcher::AllOf(vec![
                mockito::Matcher::Regex(r#"filename="audio\.ogg""#.to_string()),
                mockito::Matcher::Regex("response_format".to_string()),
            ]))
            .with_status(200)
            .with_body("hello there\n")
            .create_async()
            .await;

        let content = RetrievedContent {
            kind: MediaKind::Audio,
            data: b"OggS".to_vec(),
        };
        let text = transcriber(server.url()).transcribe(&content).await.unwrap();
        assert_eq!(text, "hello there");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn video_uses_mp4_name() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/audio/transcriptions")
            .match_body(mockito::Matcher::Regex(r#"filename="video\.mp4""#.to_string()))
            .with_status(200)
            .with_body("hi")
            .create_async()
            .await;

        let content = RetrievedContent {
            kind: MediaKind::Video,
            data: vec![0, 0, 0, 24],
        };
        transcriber(server.url()).transcribe(&content).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn service_error_is_transcription_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/audio/transcriptions")
            .with_status(400)
            .with_body("unsupported format")
            .create_async()
            .await;

        let content = RetrievedContent {
            kind: MediaKind::Audio,
            data: vec![1, 2, 3],
        };
        let err = transcriber(server.url()).transcribe(&content).await.unwrap_err();
        assert!(matches!(err, PipelineError::Transcription(ref m) if m.contains("unsupported format")));
    }
}
