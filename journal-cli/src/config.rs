use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const API_URL_ENV: &str = "SPRING_JOURNAL_API_URL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalConfig {
    /// Base URL of the journal backend, e.g. "https://springjournal.onrender.com"
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// OAuth client id registered with Google. Required for `google-login`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_client_id: Option<String>,
    /// Must match the redirect URI registered with Google.
    #[serde(default = "default_redirect_uri")]
    pub oauth_redirect_uri: String,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_api_url() -> String {
    spring_journal::DEFAULT_API_URL.to_string()
}

fn default_redirect_uri() -> String {
    "http://localhost:9876/auth/google/callback".to_string()
}

fn default_timeout_secs() -> u64 {
    spring_journal::DEFAULT_TIMEOUT.as_secs()
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            google_client_id: None,
            oauth_redirect_uri: default_redirect_uri(),
            request_timeout_secs: default_timeout_secs(),
        }
    }
}

impl JournalConfig {
    /// Directory holding config.toml and the saved session.
    pub fn root_path() -> Result<PathBuf> {
        Ok(dirs::config_dir()
            .context("Cannot determine config directory")?
            .join("spring-journal"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::root_path()?.join("config.toml"))
    }

    /// Load config from disk, then apply environment overrides. Returns the
    /// defaults if the file doesn't exist.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config at {}", path.display()))?;
            Self::from_toml(&raw)
                .with_context(|| format!("Failed to parse config at {}", path.display()))?
        } else {
            Self::default()
        };

        if let Ok(api_url) = std::env::var(API_URL_ENV) {
            if !api_url.trim().is_empty() {
                config.api_url = api_url;
            }
        }
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Write the default config if none exists yet and return its path.
    pub fn ensure_exists() -> Result<PathBuf> {
        let path = Self::config_path()?;
        if !path.exists() {
            Self::default().save_to(&path)?;
        }
        Ok(path)
    }

    fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = toml::to_string_pretty(self)?;
        std::fs::write(path, raw)?;
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(JournalConfig::from_toml("").unwrap(), JournalConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = JournalConfig::from_toml(
            r#"
            api_url = "http://localhost:8080"
            google_client_id = "client-123"
            "#,
        )
        .unwrap();

        assert_eq!(config.api_url, "http://localhost:8080");
        assert_eq!(config.google_client_id.as_deref(), Some("client-123"));
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(
            config.oauth_redirect_uri,
            "http://localhost:9876/auth/google/callback"
        );
    }

    #[test]
    fn saved_defaults_parse_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        JournalConfig::default().save_to(&path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert_eq!(JournalConfig::from_toml(&raw).unwrap(), JournalConfig::default());
    }

    #[test]
    fn zero_timeout_is_clamped() {
        let config = JournalConfig {
            request_timeout_secs: 0,
            ..JournalConfig::default()
        };
        assert_eq!(config.timeout(), Duration::from_secs(1));
    }
}
