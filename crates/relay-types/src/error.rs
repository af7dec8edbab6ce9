use std::path::PathBuf;

use thiserror::Error;

/// Per-message failures. All of them end in the fallback reply.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("content retrieval failed: {0}")]
    ContentRetrieval(String),
    #[error("transcription failed: {0}")]
    Transcription(String),
    #[error("generation failed: {0}")]
    Generation(String),
    #[error("reply delivery failed: {0}")]
    Reply(String),
}

impl PipelineError {
    /// Short name of the stage that failed, for log fields.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::ContentRetrieval(_) => "fetch",
            Self::Transcription(_) => "transcribe",
            Self::Generation(_) => "generate",
            Self::Reply(_) => "reply",
        }
    }
}

/// Startup-only failures. Any of these aborts the process.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required setting {0} is not set")]
    Missing(&'static str),
    #[error("failed to read config from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config at {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_names() {
        assert_eq!(PipelineError::ContentRetrieval("x".into()).stage(), "fetch");
        assert_eq!(PipelineError::Transcription("x".into()).stage(), "transcribe");
        assert_eq!(PipelineError::Generation("x".into()).stage(), "generate");
    }

    #[test]
    fn missing_names_the_variable() {
        let err = ConfigError::Missing("BOT_TOKEN");
        assert_eq!(err.to_string(), "required setting BOT_TOKEN is not set");
    }
}
