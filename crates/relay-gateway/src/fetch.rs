//! Content retrieval: file id → download URL → bytes in memory.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use relay_types::error::PipelineError;
use relay_types::message::{MediaAttachment, RetrievedContent};

#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch(&self, attachment: &MediaAttachment) -> Result<RetrievedContent, PipelineError>;
}

/// Maps a provider file id to a short-lived download URL.
#[async_trait]
pub trait FileLocator: Send + Sync {
    async fn resolve_file_location(&self, file_id: &str) -> anyhow::Result<String>;
}

/// Resolves through a [`FileLocator`], then downloads with one plain GET.
/// The whole body is buffered; there is no size cap and no retry.
pub struct HttpContentFetcher {
    locator: Arc<dyn FileLocator>,
    client: reqwest::Client,
}

impl HttpContentFetcher {
    pub fn new(locator: Arc<dyn FileLocator>) -> Self {
        Self {
            locator,
            client: reqwest::Client::new(),
        }
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, reqwest::Error> {
        let resp = self.client.get(url).send().await?.error_for_status()?;
        Ok(resp.bytes().await?.to_vec())
    }
}

#[async_trait]
impl ContentFetcher for HttpContentFetcher {
    async fn fetch(&self, attachment: &MediaAttachment) -> Result<RetrievedContent, PipelineError> {
        let url = self
            .locator
            .resolve_file_location(&attachment.file_id)
            .await
            .map_err(|e| PipelineError::ContentRetrieval(format!("file lookup failed: {e:#}")))?;

        // The URL embeds the bot token, so only the id is logged.
        let data = self.download(&url).await.map_err(|e| {
            PipelineError::ContentRetrieval(format!(
                "download of {} failed: {}",
                attachment.file_id,
                e.without_url()
            ))
        })?;

        info!("Fetched {} ({} bytes)", attachment.kind, data.len());
        Ok(RetrievedContent {
            kind: attachment.kind,
            data,
        })
    }
}
