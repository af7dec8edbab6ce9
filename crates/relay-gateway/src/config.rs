use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, info};

use relay_types::config::RelayConfig;
use relay_types::error::ConfigError;

/// Returns the relay home directory (~/.relay/)
pub fn relay_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".relay")
}

/// Returns the default config file path (~/.relay/config.toml)
pub fn config_path() -> PathBuf {
    relay_home().join("config.toml")
}

/// Load config from `path` (or the default location) and apply environment
/// overrides. A missing file yields the defaults.
pub fn load_config(path: Option<&Path>) -> Result<RelayConfig, ConfigError> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(config_path);

    let mut config = if path.exists() {
        let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let config: RelayConfig = toml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.clone(),
            message: e.to_string(),
        })?;
        info!("Loaded config from {}", path.display());
        config
    } else {
        debug!("No config at {}, using defaults", path.display());
        RelayConfig::default()
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Environment variables take priority over file values. Empty values are ignored.
pub fn apply_env_overrides(config: &mut RelayConfig, lookup: impl Fn(&str) -> Option<String>) {
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = get("BOT_TOKEN") {
        config.telegram.bot_token = Some(v);
    }
    if let Some(v) = get("OPENROUTER_API_KEY") {
        config.generation.api_key = Some(v);
    }
    if let Some(v) = get("TRANSCRIPTION_API_KEY") {
        config.transcription.api_key = Some(v);
    }
    if let Some(v) = get("BOT_MENTION") {
        config.telegram.mention = v;
    }
    if let Some(v) = get("WEBHOOK_URL") {
        config.telegram.webhook_url = Some(v);
    }
    if let Some(v) = get("WEBHOOK_SECRET") {
        config.telegram.webhook_secret = Some(v);
    }
}

/// Write the default config to `path`, creating parent directories. Refuses to
/// overwrite an existing file.
pub fn write_default_config(path: &Path) -> anyhow::Result<()> {
    if path.exists() {
        anyhow::bail!("{} already exists", path.display());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let toml_str = toml::to_string_pretty(&RelayConfig::default())
        .context("Failed to serialize default config")?;
    std::fs::write(path, toml_str)
        .with_context(|| format!("Failed to write default config to {}", path.display()))?;
    Ok(())
}
