pub mod channels;
pub mod commands;
pub mod config;
pub mod fetch;
pub mod llm;
pub mod pipeline;
pub mod reply;
pub mod resolver;
pub mod stt;
pub mod system_prompt;
pub mod webhook;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use relay_types::config::ValidatedConfig;

use channels::telegram::{TelegramApi, TelegramBot};
use fetch::HttpContentFetcher;
use llm::OpenRouterClient;
use pipeline::{Collaborators, Pipeline};
use stt::WhisperTranscriber;

/// Wire the production collaborators together. Each handle is created once
/// here and passed down; nothing is global.
pub fn build_bot(validated: &ValidatedConfig) -> Arc<TelegramBot> {
    let config = &validated.config;

    let api = Arc::new(TelegramApi::new(
        validated.bot_token.clone(),
        &config.telegram.api_base,
    ));
    let collaborators = Collaborators {
        fetcher: Arc::new(HttpContentFetcher::new(api.clone())),
        transcriber: Arc::new(WhisperTranscriber::new(
            &config.transcription,
            validated.transcription_api_key.clone(),
        )),
        generator: Arc::new(OpenRouterClient::new(
            &config.generation,
            validated.generation_api_key.clone(),
        )),
        replies: api.clone(),
    };
    let pipeline = Arc::new(Pipeline::new(config, collaborators));
    Arc::new(TelegramBot::new(api, pipeline))
}
