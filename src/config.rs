use crate::client::{DEFAULT_BASE_URL, DEFAULT_TOP_K};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the chatdesk home directory
pub const HOME_ENV: &str = "CHATDESK_HOME";

/// Environment variable overriding the service address
pub const API_URL_ENV: &str = "CHATDESK_API_URL";

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Question-answering service
    pub api: ApiConfig,

    /// Where conversations are kept
    pub storage: StorageConfig,

    /// Log output
    pub logging: LoggingConfig,

    /// Chatdesk home directory
    #[serde(skip)]
    pub home: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    /// Retrieval width sent with every question
    pub top_k: u32,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            top_k: DEFAULT_TOP_K,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding chats.json, defaults to the home directory
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Defaults to `<home>/logs`
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: None,
        }
    }
}

impl Config {
    /// Default home: `$CHATDESK_HOME`, else `~/.chatdesk`
    pub fn default_home() -> Result<PathBuf> {
        if let Ok(home) = std::env::var(HOME_ENV) {
            return Ok(PathBuf::from(home));
        }
        let home = dirs::home_dir().context("Could not find home directory")?;
        Ok(home.join(".chatdesk"))
    }

    /// Load `config.toml` from the default home and apply env overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::default_home()?)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load `<home>/config.toml`, falling back to defaults when absent
    pub fn load_from(home: &Path) -> Result<Self> {
        let config_path = home.join("config.toml");

        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path)
                .context("Failed to read config file")?;
            toml::from_str(&content)
                .context("Failed to parse config file")?
        } else {
            Config::default()
        };

        config.home = home.to_path_buf();
        Ok(config)
    }

    /// Apply environment overrides through `lookup`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(API_URL_ENV).filter(|url| !url.trim().is_empty()) {
            self.api.base_url = url;
        }
    }

    /// Save configuration to `<home>/config.toml`
    pub fn save(&self) -> Result<()> {
        fs::create_dir_all(&self.home)
            .context("Failed to create chatdesk directory")?;
        let content = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;
        fs::write(self.home.join("config.toml"), content)
            .context("Failed to write config file")?;
        Ok(())
    }

    /// Write `<home>/config.toml` from the file's own settings if it is missing.
    /// Environment and command-line overrides are never written.
    pub fn init_file(home: &Path) -> Result<PathBuf> {
        let path = home.join("config.toml");
        if !path.exists() {
            Self::load_from(home)?.save()?;
        }
        Ok(path)
    }

    pub fn data_dir(&self) -> PathBuf {
        self.storage
            .data_dir
            .clone()
            .unwrap_or_else(|| self.home.clone())
    }

    pub fn log_dir(&self) -> PathBuf {
        self.logging
            .dir
            .clone()
            .unwrap_or_else(|| self.home.join("logs"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load_from(temp_dir.path()).unwrap();

        assert_eq!(config.api.base_url, "http://127.0.0.1:8000");
        assert_eq!(config.api.top_k, 4);
        assert_eq!(config.data_dir(), temp_dir.path());
        assert_eq!(config.log_dir(), temp_dir.path().join("logs"));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("config.toml"),
            "[api]\nbase_url = \"http://rag.internal:9000\"\n\n[logging]\nlevel = \"debug\"\n",
        )
        .unwrap();

        let config = Config::load_from(temp_dir.path()).unwrap();
        assert_eq!(config.api.base_url, "http://rag.internal:9000");
        assert_eq!(config.api.top_k, 4);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn invalid_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("config.toml"), "[api\n").unwrap();
        assert!(Config::load_from(temp_dir.path()).is_err());
    }

    #[test]
    fn env_overrides_base_url() {
        let mut config = Config::default();
        config.apply_env(|key| (key == API_URL_ENV).then(|| "http://10.0.0.2:8000".to_string()));
        assert_eq!(config.api.base_url, "http://10.0.0.2:8000");

        config.apply_env(|_| Some("  ".to_string()));
        assert_eq!(config.api.base_url, "http://10.0.0.2:8000");
    }

    #[test]
    fn save_then_load() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::load_from(temp_dir.path()).unwrap();
        config.api.top_k = 6;
        config.save().unwrap();

        let reloaded = Config::load_from(temp_dir.path()).unwrap();
        assert_eq!(reloaded.api.top_k, 6);
    }

    #[test]
    fn init_file_skips_overrides() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::load_from(temp_dir.path()).unwrap();
        config.apply_env(|_| Some("http://10.0.0.2:8000".to_string()));
        config.storage.data_dir = Some(temp_dir.path().join("elsewhere"));

        let path = Config::init_file(&config.home).unwrap();
        assert!(path.exists());

        let written = Config::load_from(temp_dir.path()).unwrap();
        assert_eq!(written.api.base_url, "http://127.0.0.1:8000");
        assert_eq!(written.storage.data_dir, None);
    }

    #[test]
    fn init_file_keeps_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[api]\ntop_k = 8\n").unwrap();

        Config::init_file(temp_dir.path()).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "[api]\ntop_k = 8\n");
    }
}
