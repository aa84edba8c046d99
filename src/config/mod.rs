//! Configuration management for talkforge-rs
//!
//! Settings are layered, later layers winning:
//! 1. Built-in defaults
//! 2. Config file (`<config dir>/talkforge/config.json`)
//! 3. `.env` file and environment variables
//! 4. CLI parameters (applied by the binary)

pub mod settings;

use std::path::{Path, PathBuf};

pub use self::settings::ClientConfig;
use crate::error::{ForgeError, Result};

/// Overrides the server base URL
pub const ENV_BASE_URL: &str = "TALKFORGE_BASE_URL";

/// Enables or disables post-stream processing (`true`/`false`/`1`/`0`)
pub const ENV_POST_PROCESS: &str = "TALKFORGE_POST_PROCESS";

/// Get the configuration directory path
#[must_use]
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("talkforge")
}

/// Get the default config file path
#[must_use]
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Load configuration from `path` (or the default location) and the environment
///
/// # Errors
///
/// Returns an error if the config file cannot be read or parsed, or an
/// environment override has an unusable value
pub fn load(path: Option<&Path>) -> Result<ClientConfig> {
    // A missing .env is normal.
    let _ = dotenv::dotenv();

    let path = path.map_or_else(config_path, Path::to_path_buf);
    let mut config = ClientConfig::load_from_path(&path)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;

    tracing::debug!(path = %path.display(), base_url = %config.base_url, "Loaded client config");
    Ok(config)
}

/// Apply environment overrides using `lookup` to read variables
///
/// # Errors
///
/// Returns [`ForgeError::ConfigValidation`] for an unparseable boolean
pub fn apply_env_overrides<F>(config: &mut ClientConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(base_url) = lookup(ENV_BASE_URL).filter(|v| !v.trim().is_empty()) {
        config.base_url = base_url.trim().to_string();
    }

    if let Some(raw) = lookup(ENV_POST_PROCESS) {
        config.post_process = parse_bool(&raw).ok_or_else(|| {
            ForgeError::ConfigValidation(format!("{ENV_POST_PROCESS} is not a boolean: {raw}"))
        })?;
    }

    Ok(())
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
