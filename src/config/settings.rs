//! Client settings persisted as JSON

use std::{fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::error::{ForgeError, Result};

/// Client configuration (stored in `<config dir>/talkforge/config.json`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Server base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path of the streaming submit endpoint
    #[serde(default = "default_stream_path")]
    pub stream_path: String,

    /// Path of the post-processing endpoint; `{id}` is the session ID
    #[serde(default = "default_post_process_path")]
    pub post_process_path: String,

    /// Replace the streamed message with the server-processed version
    #[serde(default)]
    pub post_process: bool,

    /// Connect timeout in seconds. Never applied to the open stream.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,

    /// Verbose logging enabled
    #[serde(default)]
    pub verbose: bool,
}

fn default_base_url() -> String {
    "http://localhost:8090".to_string()
}

fn default_stream_path() -> String {
    "/api/v1/chat/stream/submit".to_string()
}

fn default_post_process_path() -> String {
    "/api/v1/session/{id}/postprocess/last".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            stream_path: default_stream_path(),
            post_process_path: default_post_process_path(),
            post_process: false,
            request_timeout_secs: None,
            verbose: false,
        }
    }
}

impl ClientConfig {
    /// Load configuration from a specific path
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|e| ForgeError::ConfigParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        serde_json::from_str(&contents).map_err(|e| ForgeError::ConfigParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Save configuration to a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Full URL of the streaming submit endpoint
    #[must_use]
    pub fn stream_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.stream_path)
    }

    /// Full URL of the post-processing endpoint for a session
    #[must_use]
    pub fn post_process_url(&self, session_id: &str) -> String {
        format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            self.post_process_path.replace("{id}", session_id)
        )
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// Check the settings before any request is made
    ///
    /// # Errors
    ///
    /// Returns [`ForgeError::ConfigValidation`] describing the first problem found
    pub fn validate(&self) -> Result<()> {
        let base = self.base_url.trim();
        if base.is_empty() {
            return Err(ForgeError::ConfigValidation("baseUrl is empty".to_string()));
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ForgeError::ConfigValidation(format!(
                "baseUrl must be http(s): {base}"
            )));
        }
        if !self.stream_path.starts_with('/') {
            return Err(ForgeError::ConfigValidation(format!(
                "streamPath must start with '/': {}",
                self.stream_path
            )));
        }
        if self.request_timeout_secs == Some(0) {
            return Err(ForgeError::ConfigValidation(
                "requestTimeoutSecs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
