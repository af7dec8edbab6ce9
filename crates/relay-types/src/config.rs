use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::message::ReplyFormat;

pub const DEFAULT_MENTION: &str = "@huliganmaster3000_bot";
pub const DEFAULT_FALLBACK_TEXT: &str = "Извините, не получилось разобрать это сообщение.";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub transcription: TranscriptionConfig,
    #[serde(default)]
    pub reply: ReplyConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot token. `BOT_TOKEN` takes priority at runtime.
    pub bot_token: Option<String>,
    /// Literal handle a message must contain to be processed.
    pub mention: String,
    pub api_base: String,
    pub poll_timeout_secs: u64,
    pub webhook_url: Option<String>,
    pub webhook_secret: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// `OPENROUTER_API_KEY` takes priority at runtime.
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    /// Falls back to the generation key only when both services share a
    /// `base_url`.
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplyConfig {
    pub parse_mode: ReplyFormat,
    pub fallback_text: String,
    /// Also consider media attached to the addressed message itself,
    /// after the replied-to message has been checked.
    pub direct_attachments: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            mention: DEFAULT_MENTION.to_string(),
            api_base: "https://api.telegram.org".to_string(),
            poll_timeout_secs: 30,
            webhook_url: None,
            webhook_secret: None,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://openrouter.ai/api/v1".to_string(),
            model: "anthropic/claude-sonnet-4".to_string(),
        }
    }
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "whisper-1".to_string(),
        }
    }
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            parse_mode: ReplyFormat::Markdown,
            fallback_text: DEFAULT_FALLBACK_TEXT.to_string(),
            direct_attachments: false,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Configuration with every required credential present.
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    pub bot_token: String,
    pub generation_api_key: String,
    pub transcription_api_key: String,
    pub config: RelayConfig,
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl RelayConfig {
    /// Check that the process can start. Runs once, before any network call.
    pub fn validate(self) -> Result<ValidatedConfig, ConfigError> {
        let bot_token = non_empty(&self.telegram.bot_token).ok_or(ConfigError::Missing("BOT_TOKEN"))?;
        let generation_api_key =
            non_empty(&self.generation.api_key).ok_or(ConfigError::Missing("OPENROUTER_API_KEY"))?;
        let same_provider = self.transcription.base_url.trim_end_matches('/')
            == self.generation.base_url.trim_end_matches('/');
        let transcription_api_key = match non_empty(&self.transcription.api_key) {
            Some(key) => key,
            None if same_provider => generation_api_key.clone(),
            None => return Err(ConfigError::Missing("TRANSCRIPTION_API_KEY")),
        };

        if self.telegram.mention.is_empty() {
            return Err(ConfigError::Invalid {
                key: "telegram.mention",
                message: "mention handle must not be empty".to_string(),
            });
        }

        Ok(ValidatedConfig {
            bot_token,
            generation_api_key,
            transcription_api_key,
            config: self,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_credentials() -> RelayConfig {
        let mut cfg = RelayConfig::default();
        cfg.telegram.bot_token = Some("123:abc".to_string());
        cfg.generation.api_key = Some("sk-or".to_string());
        cfg.transcription.api_key = Some("sk-openai".to_string());
        cfg
    }

    #[test]
    fn missing_bot_token_is_fatal() {
        let mut cfg = with_credentials();
        cfg.telegram.bot_token = None;
        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Missing("BOT_TOKEN")));
    }

    #[test]
    fn blank_generation_key_is_missing() {
        let mut cfg = with_credentials();
        cfg.generation.api_key = Some("   ".to_string());
        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Missing("OPENROUTER_API_KEY")));
    }

    #[test]
    fn generation_key_never_sent_to_other_transcription_host() {
        let mut cfg = with_credentials();
        cfg.transcription.api_key = None;
        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Missing("TRANSCRIPTION_API_KEY")));

        let validated = with_credentials().validate().unwrap();
        assert_eq!(validated.transcription_api_key, "sk-openai");
        assert_eq!(validated.generation_api_key, "sk-or");
    }

    #[test]
    fn transcription_key_shared_when_hosts_match() {
        let mut cfg = with_credentials();
        cfg.transcription.api_key = None;
        cfg.transcription.base_url = format!("{}/", cfg.generation.base_url);
        let validated = cfg.validate().unwrap();
        assert_eq!(validated.transcription_api_key, "sk-or");
    }

    #[test]
    fn empty_mention_rejected() {
        let mut cfg = with_credentials();
        cfg.telegram.mention.clear();
        assert!(matches!(
            cfg.validate().unwrap_err(),
            ConfigError::Invalid { key: "telegram.mention", .. }
        ));
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg: RelayConfig = toml::from_str("[reply]\nparse_mode = \"plain\"\n").unwrap();
        assert_eq!(cfg.reply.parse_mode, ReplyFormat::Plain);
        assert_eq!(cfg.reply.fallback_text, DEFAULT_FALLBACK_TEXT);
        assert_eq!(cfg.telegram.mention, DEFAULT_MENTION);
        assert_eq!(cfg.generation.model, "anthropic/claude-sonnet-4");
    }
}
