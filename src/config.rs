//! Bot configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main bot configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bot identity configuration
    pub bot: BotConfig,

    /// Storage configuration
    pub storage: StorageConfig,

    /// Backup schedule and retention
    pub backup: BackupConfig,

    /// Presentation knobs
    pub ui: UiConfig,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Call this early in startup to fail fast with clear error messages.
    /// The platform token is checked where a platform transport is built,
    /// not here; the console transport runs without one.
    pub fn validate(&self) -> Result<()> {
        if self.ui.page_size == 0 {
            return Err(eyre::eyre!("ui.page-size must be at least 1"));
        }
        if self.backup.keep == 0 {
            return Err(eyre::eyre!("backup.keep must be at least 1"));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .todobot.yml
        let local_config = PathBuf::from(".todobot.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/todobot/todobot.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("todobot").join("todobot.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Bot identity configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Environment variable containing the chat platform token
    #[serde(rename = "token-env")]
    pub token_env: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            token_env: "TODOBOT_TOKEN".to_string(),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        // Use XDG data directory (~/.local/share/todobot on Linux)
        let database_path = dirs::data_dir()
            .map(|d| d.join("todobot"))
            .unwrap_or_else(|| PathBuf::from(".todobot"))
            .join("todo.db");

        Self { database_path }
    }
}

/// Backup schedule and retention
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    /// Directory backup artifacts are written to
    pub dir: PathBuf,

    /// Artifact file name prefix
    pub prefix: String,

    /// How many recent artifacts to retain
    pub keep: usize,

    /// Daily trigger time, HH:MM local
    #[serde(rename = "daily-at")]
    pub daily_at: String,

    /// How often the scheduler checks the trigger
    #[serde(rename = "poll-interval-secs")]
    pub poll_interval_secs: u64,
}

impl Default for BackupConfig {
    fn default() -> Self {
        let dir = dirs::data_dir()
            .map(|d| d.join("todobot"))
            .unwrap_or_else(|| PathBuf::from(".todobot"))
            .join("backups");

        Self {
            dir,
            prefix: "todo_backup".to_string(),
            keep: 7,
            daily_at: "02:00".to_string(),
            poll_interval_secs: 3600,
        }
    }
}

/// Presentation knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Tasks shown per list page
    #[serde(rename = "page-size")]
    pub page_size: usize,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self { page_size: 5 }
    }
}
