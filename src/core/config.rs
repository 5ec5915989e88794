use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Process-wide configuration, built once at startup and passed by reference
/// into every component. There are no module-scope clients.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_api_host")]
    pub api_host: String,

    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// SQLite file location. Defaults to the platform data dir.
    #[serde(default)]
    pub db_path: Option<PathBuf>,

    /// HMAC secret for webhook signatures. Verification is advisory:
    /// a missing or bad signature is logged, never rejected.
    #[serde(default)]
    pub webhook_secret: Option<String>,

    /// Seconds a `processing` job may sit untouched before a read
    /// triggers a provider poll.
    #[serde(default = "default_staleness_secs")]
    pub staleness_secs: i64,

    #[serde(default)]
    pub provider: ProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_provider_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_token: String,

    /// Client-side bound on the poll fetch. The provider endpoint gives no
    /// timeout guarantee of its own.
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
}

fn default_api_host() -> String {
    "127.0.0.1".to_string()
}
fn default_api_port() -> u16 {
    8920
}
fn default_staleness_secs() -> i64 {
    3600
}
fn default_provider_base_url() -> String {
    "https://api.replicate.com/v1".to_string()
}
fn default_poll_timeout_secs() -> u64 {
    30
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_host: default_api_host(),
            api_port: default_api_port(),
            db_path: None,
            webhook_secret: None,
            staleness_secs: default_staleness_secs(),
            provider: ProviderConfig::default(),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_provider_base_url(),
            api_token: String::new(),
            poll_timeout_secs: default_poll_timeout_secs(),
        }
    }
}

impl AppConfig {
    /// Load `faceforge.toml` (explicit path, or the current directory),
    /// then apply FACEFORGE_* environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("faceforge.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("reading {}", config_path.display()))?;
            toml::from_str(&content)
                .with_context(|| format!("parsing {}", config_path.display()))?
        } else {
            info!("No faceforge.toml found, using defaults.");
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("FACEFORGE_API_HOST") {
            self.api_host = host;
        }
        if let Ok(port) = std::env::var("FACEFORGE_API_PORT")
            && let Ok(port) = port.parse()
        {
            self.api_port = port;
        }
        if let Ok(path) = std::env::var("FACEFORGE_DB_PATH") {
            self.db_path = Some(PathBuf::from(path));
        }
        if let Ok(secret) = std::env::var("FACEFORGE_WEBHOOK_SECRET") {
            self.webhook_secret = Some(secret);
        }
        if let Ok(token) = std::env::var("FACEFORGE_PROVIDER_TOKEN") {
            self.provider.api_token = token;
        }
        if let Ok(url) = std::env::var("FACEFORGE_PROVIDER_URL") {
            self.provider.base_url = url;
        }
    }

    /// Resolved SQLite path, defaulting under the platform data directory.
    pub fn db_path(&self) -> PathBuf {
        self.db_path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("faceforge")
                .join("faceforge.db")
        })
    }
}
