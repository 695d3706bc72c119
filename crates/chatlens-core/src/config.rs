use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ChatlensError, Result};

/// Top-level configuration for chatlens.
///
/// Loaded from `~/.chatlens/config.toml` by default. Each section maps to
/// one crate of the workspace.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatlensConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub sentiment: SentimentConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
}

impl ChatlensConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ChatlensConfig = toml::from_str(&content)?;
        config.validate()?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Reject settings the rest of the system cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.storage.pool_size == 0 {
            return Err(ChatlensError::Config(
                "storage.pool_size must be at least 1".into(),
            ));
        }
        if self.generation.timeout_secs == 0 {
            return Err(ChatlensError::Config(
                "generation.timeout_secs must be greater than 0".into(),
            ));
        }
        if self.sentiment.negative_threshold > self.sentiment.positive_threshold {
            return Err(ChatlensError::Config(format!(
                "sentiment.negative_threshold ({}) exceeds positive_threshold ({})",
                self.sentiment.negative_threshold, self.sentiment.positive_threshold
            )));
        }
        if self.analytics.width == 0 || self.analytics.height == 0 {
            return Err(ChatlensError::Config(
                "analytics dashboard dimensions must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// Absolute path of the SQLite database file.
    pub fn database_path(&self) -> PathBuf {
        self.general.resolved_data_dir().join(&self.storage.db_file)
    }

    /// Absolute path of the dashboard image, overwritten on every render.
    pub fn dashboard_path(&self) -> PathBuf {
        self.general
            .resolved_data_dir()
            .join(&self.analytics.dashboard_file)
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Data directory for the database and rendered dashboards.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.chatlens/data".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl GeneralConfig {
    /// `data_dir` with a leading `~` expanded to the home directory.
    pub fn resolved_data_dir(&self) -> PathBuf {
        expand_home(&self.data_dir)
    }
}

/// Record store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file name inside `data_dir`.
    pub db_file: String,
    /// Number of pooled SQLite connections.
    pub pool_size: usize,
    /// How long a writer waits on a locked database before failing.
    pub busy_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_file: "chatlens.db".to_string(),
            pool_size: 4,
            busy_timeout_ms: 5_000,
        }
    }
}

/// External reasoning service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Upper bound on a single generation call.
    pub timeout_secs: u64,
    /// Instruction sent alongside media payloads.
    pub media_prompt: String,
    pub max_output_tokens: Option<u32>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-1.5-flash".to_string(),
            api_key_env: "GEMINI_API".to_string(),
            timeout_secs: 30,
            media_prompt: "Describe this content in detail.".to_string(),
            max_output_tokens: None,
        }
    }
}

/// Lexical sentiment classifier settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentConfig {
    /// Scores strictly above this are Positive.
    pub positive_threshold: f64,
    /// Scores strictly below this are Negative.
    pub negative_threshold: f64,
    /// Inputs longer than this (in chars) are rejected as a scoring fault.
    pub max_input_chars: usize,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            positive_threshold: 0.2,
            negative_threshold: -0.2,
            max_input_chars: 16_384,
        }
    }
}

/// Analytics and dashboard settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Dashboard file name inside `data_dir`.
    pub dashboard_file: String,
    pub width: u32,
    pub height: u32,
    /// How many of the most active conversations to rank.
    pub top_n: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            dashboard_file: "dashboard.png".to_string(),
            width: 1200,
            height: 800,
            top_n: 5,
        }
    }
}

/// Ingestion pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Reply used when generation fails for a text event.
    pub fallback_reply: String,
    /// Description recorded when a media item could not be analyzed.
    pub media_failure_notice: String,
    /// Seconds a per-conversation worker waits for new events before retiring.
    pub dispatcher_idle_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fallback_reply: "Sorry, I couldn't come up with a reply right now. Please try again later."
                .to_string(),
            media_failure_notice: "Could not analyze this file.".to_string(),
            dispatcher_idle_secs: 60,
        }
    }
}

/// Telegram transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Environment variable holding the bot token.
    pub token_env: String,
    /// Long-polling timeout passed to `getUpdates`.
    pub poll_timeout_secs: u32,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token_env: "TELEGRAM_TOKEN".to_string(),
            poll_timeout_secs: 30,
        }
    }
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        #[cfg(target_os = "windows")]
        let home = std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string());
        #[cfg(not(target_os = "windows"))]
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(rest)
    } else {
        PathBuf::from(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = ChatlensConfig::default();
        assert_eq!(config.general.data_dir, "~/.chatlens/data");
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.storage.pool_size, 4);
        assert_eq!(config.generation.timeout_secs, 30);
        assert_eq!(config.generation.api_key_env, "GEMINI_API");
        assert!((config.sentiment.positive_threshold - 0.2).abs() < f64::EPSILON);
        assert!((config.sentiment.negative_threshold + 0.2).abs() < f64::EPSILON);
        assert_eq!(config.analytics.top_n, 5);
        assert_eq!(config.analytics.dashboard_file, "dashboard.png");
        assert_eq!(config.telegram.token_env, "TELEGRAM_TOKEN");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
[general]
data_dir = "/srv/chatlens"
log_level = "debug"

[generation]
model = "gemini-2.0-flash"
timeout_secs = 10

[analytics]
top_n = 3
"#;
        let file = create_temp_config(content);
        let config = ChatlensConfig::load(file.path()).unwrap();
        assert_eq!(config.general.data_dir, "/srv/chatlens");
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.generation.model, "gemini-2.0-flash");
        assert_eq!(config.generation.timeout_secs, 10);
        assert_eq!(config.analytics.top_n, 3);
        // Untouched sections keep defaults.
        assert_eq!(config.storage.db_file, "chatlens.db");
    }

    #[test]
    fn test_load_rejects_zero_timeout() {
        let file = create_temp_config("[generation]\ntimeout_secs = 0\n");
        let err = ChatlensConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ChatlensError::Config(_)));
    }

    #[test]
    fn test_validate_inverted_thresholds() {
        let mut config = ChatlensConfig::default();
        config.sentiment.positive_threshold = -0.5;
        config.sentiment.negative_threshold = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_pool() {
        let mut config = ChatlensConfig::default();
        config.storage.pool_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_invalid_toml() {
        let file = create_temp_config("this is not [valid toml");
        assert!(ChatlensConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = ChatlensConfig::load_or_default(Path::new("/nonexistent/config.toml"));
        assert_eq!(config.general.data_dir, "~/.chatlens/data");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = ChatlensConfig::default();
        config.analytics.width = 640;
        config.save(&path).unwrap();

        let reloaded = ChatlensConfig::load(&path).unwrap();
        assert_eq!(reloaded.analytics.width, 640);
    }

    #[test]
    fn test_paths_join_data_dir() {
        let mut config = ChatlensConfig::default();
        config.general.data_dir = "/var/lib/chatlens".into();
        assert_eq!(
            config.database_path(),
            PathBuf::from("/var/lib/chatlens/chatlens.db")
        );
        assert_eq!(
            config.dashboard_path(),
            PathBuf::from("/var/lib/chatlens/dashboard.png")
        );
    }

    #[test]
    fn test_expand_home_leaves_absolute_paths() {
        assert_eq!(expand_home("/tmp/x"), PathBuf::from("/tmp/x"));
        assert!(!expand_home("~/data").to_string_lossy().starts_with('~'));
    }
}
