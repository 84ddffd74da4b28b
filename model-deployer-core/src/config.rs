//! Deployer configuration
//!
//! Loaded from a TOML file; every field has a default so a file only needs
//! to name what differs. The CLI applies its overrides on top.

use anyhow::{Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// How changes in the model directory are detected
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchMode {
    /// Periodic snapshot diff
    #[default]
    Poll,
    /// Native filesystem notifications
    Notify,
}

/// Invalid configuration values
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("No model directory configured")]
    MissingModelDir,

    #[error("Poll interval must be greater than zero")]
    ZeroPollInterval,

    #[error("Invalid model collection URL '{url}': {message}")]
    InvalidCollectionUrl { url: String, message: String },
}

/// Top-level deployer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployerConfig {
    /// Base URL of the model collection; derived from `server` when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_collection: Option<String>,

    /// Directory watched for model files
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_dir: Option<PathBuf>,

    /// Milliseconds between poll cycles
    pub poll_interval_ms: u64,

    /// Milliseconds to wait before the initial scan
    pub warmup_ms: u64,

    /// Milliseconds to let native events settle before dispatching them
    pub settle_ms: u64,

    /// Timeout for a single deploy or undeploy request
    pub request_timeout_secs: u64,

    /// Change detection strategy
    pub mode: WatchMode,

    /// Companion scoring server, used to compose the collection URL
    pub server: ServerConfig,
}

impl Default for DeployerConfig {
    fn default() -> Self {
        Self {
            model_collection: None,
            model_dir: None,
            poll_interval_ms: 10_000,
            warmup_ms: 30_000,
            settle_ms: 500,
            request_timeout_secs: 30,
            mode: WatchMode::Poll,
            server: ServerConfig::default(),
        }
    }
}

/// Location of the scoring server hosting the model collection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub context_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "localhost".to_string(), port: 8080, context_path: "/openscoring".to_string() }
    }
}

impl ServerConfig {
    /// `http://{host}:{port}{context_path}/model`
    pub fn collection_url(&self) -> String {
        let context = self.context_path.trim_matches('/');
        if context.is_empty() {
            format!("http://{}:{}/model", self.host, self.port)
        } else {
            format!("http://{}:{}/{}/model", self.host, self.port, context)
        }
    }
}

impl DeployerConfig {
    /// Load configuration from file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;

        Ok(())
    }

    /// Base URL of the model collection
    pub fn collection_url(&self) -> String {
        match &self.model_collection {
            Some(url) => url.clone(),
            None => self.server.collection_url(),
        }
    }

    pub fn model_dir(&self) -> Result<&Path, ConfigError> {
        match &self.model_dir {
            Some(dir) if !dir.as_os_str().is_empty() => Ok(dir),
            _ => Err(ConfigError::MissingModelDir),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn warmup(&self) -> Duration {
        Duration::from_millis(self.warmup_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Check the values the sync loop cannot run without
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.model_dir()?;

        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }

        validate_collection_url(&self.collection_url())
    }
}

/// Collection URLs must be absolute http(s) URLs
pub fn validate_collection_url(url: &str) -> Result<(), ConfigError> {
    let invalid = |message: String| ConfigError::InvalidCollectionUrl { url: url.to_string(), message };

    let parsed = Url::parse(url).map_err(|e| invalid(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(invalid(format!("unsupported scheme '{}'", other))),
    }
    if parsed.cannot_be_a_base() {
        return Err(invalid("URL cannot be used as a base".to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = DeployerConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_secs(10));
        assert_eq!(config.warmup(), Duration::from_secs(30));
        assert_eq!(config.mode, WatchMode::Poll);
        assert_eq!(config.collection_url(), "http://localhost:8080/openscoring/model");
    }

    #[test]
    fn test_collection_url_from_server() {
        let server = ServerConfig { host: "scoring".to_string(), port: 9000, context_path: "/".to_string() };
        assert_eq!(server.collection_url(), "http://scoring:9000/model");

        let server = ServerConfig { context_path: "api/".to_string(), ..ServerConfig::default() };
        assert_eq!(server.collection_url(), "http://localhost:8080/api/model");
    }

    #[test]
    fn test_explicit_collection_wins() {
        let config = DeployerConfig {
            model_collection: Some("https://models.example.com/model".to_string()),
            ..DeployerConfig::default()
        };
        assert_eq!(config.collection_url(), "https://models.example.com/model");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("deployer.toml");
        std::fs::write(
            &path,
            r#"
model_dir = "/srv/models"
mode = "notify"

[server]
port = 8181
"#,
        )
        .unwrap();

        let config = DeployerConfig::from_file(&path).unwrap();
        assert_eq!(config.model_dir().unwrap(), Path::new("/srv/models"));
        assert_eq!(config.mode, WatchMode::Notify);
        assert_eq!(config.poll_interval_ms, 10_000);
        assert_eq!(config.collection_url(), "http://localhost:8181/openscoring/model");
    }

    #[test]
    fn test_save_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("deployer.toml");

        let config = DeployerConfig {
            model_dir: Some(PathBuf::from("/srv/models")),
            poll_interval_ms: 2_500,
            ..DeployerConfig::default()
        };
        config.save(&path).unwrap();

        let loaded = DeployerConfig::from_file(&path).unwrap();
        assert_eq!(loaded.poll_interval_ms, 2_500);
        assert_eq!(loaded.model_dir, config.model_dir);
    }

    #[test]
    fn test_unparsable_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("deployer.toml");
        std::fs::write(&path, "poll_interval_ms = \"soon\"").unwrap();

        assert!(DeployerConfig::from_file(&path).is_err());
    }

    #[test]
    fn test_validation() {
        let mut config = DeployerConfig::default();
        assert_eq!(config.validate(), Err(ConfigError::MissingModelDir));

        config.model_dir = Some(PathBuf::from("models"));
        assert_eq!(config.validate(), Ok(()));

        config.poll_interval_ms = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroPollInterval));

        config.poll_interval_ms = 1_000;
        config.model_collection = Some("ftp://models/model".to_string());
        assert!(matches!(config.validate(), Err(ConfigError::InvalidCollectionUrl { .. })));

        config.model_collection = Some("not a url".to_string());
        assert!(matches!(config.validate(), Err(ConfigError::InvalidCollectionUrl { .. })));
    }
}
