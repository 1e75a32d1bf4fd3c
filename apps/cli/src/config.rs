//! Client configuration.
//!
//! Stored as TOML:
//! - Linux: `~/.config/mediashare/client.toml`
//! - Windows: `%APPDATA%/mediashare/client.toml`

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use mediashare_uploader::{RetryPolicy, UploadConfig};

/// Client configuration. Every field falls back to its default when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// WebSocket endpoint of the media service.
    pub server_url: String,

    /// Upload chunk size in bytes.
    pub chunk_size: usize,

    /// Attempts per chunk, including the first.
    pub max_attempts: u32,

    /// Pause between chunk attempts.
    pub retry_backoff_ms: u64,

    /// Posts per feed page.
    pub page_size: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let upload = UploadConfig::default();
        Self {
            server_url: "ws://127.0.0.1:8080/ws".into(),
            chunk_size: upload.chunk_size,
            max_attempts: upload.retry.max_attempts,
            retry_backoff_ms: upload.retry.backoff.as_millis() as u64,
            page_size: 20,
        }
    }
}

impl ClientConfig {
    /// Loads the configuration at `path`, creating it with defaults if missing.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            let config = ClientConfig::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    /// Settings for the upload coordinator.
    pub fn upload_config(&self) -> UploadConfig {
        UploadConfig {
            chunk_size: self.chunk_size,
            retry: RetryPolicy {
                max_attempts: self.max_attempts,
                backoff: Duration::from_millis(self.retry_backoff_ms),
            },
        }
    }
}

/// Returns the platform-specific configuration file path.
pub fn config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        PathBuf::from(appdata).join("mediashare").join("client.toml")
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        PathBuf::from(home)
            .join(".config")
            .join("mediashare")
            .join("client.toml")
    }
}
