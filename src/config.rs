/// Application configuration: persisted as TOML in the platform config directory.
///
/// Linux:   ~/.config/dota-coach-live/config.toml
/// Windows: %APPDATA%\dota-coach-live\config.toml
///
/// Every field has a default so a partial or missing file still loads.
use crate::rules::Category;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const APP_DIR_NAME: &str = "dota-coach-live";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// JSON-lines tick feed written by the game-state bridge.
    #[serde(default = "default_feed_path")]
    pub feed_path: PathBuf,

    /// Rule catalog to load. Unset = the catalog built into the binary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_path: Option<PathBuf>,

    #[serde(default = "default_true")]
    pub voice_enabled: bool,

    #[serde(default)]
    pub chat_enabled: bool,

    /// Directory holding `<audio_key>.mp3` voice clips.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_dir: Option<PathBuf>,

    /// Whole hint families the user switched off.
    #[serde(default)]
    pub disabled_categories: Vec<Category>,

    /// Record which rules fired per match in the local SQLite history.
    #[serde(default = "default_true")]
    pub record_history: bool,

    /// `tracing` filter directive, e.g. "dota_coach_lib=debug".
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_true() -> bool { true }

fn default_feed_path() -> PathBuf {
    app_dir().join("feed.jsonl")
}

fn default_log_filter() -> String {
    "dota_coach_lib=info".to_owned()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            feed_path:           default_feed_path(),
            catalog_path:        None,
            voice_enabled:       true,
            chat_enabled:        false,
            audio_dir:           None,
            disabled_categories: Vec::new(),
            record_history:      true,
            log_filter:          default_log_filter(),
        }
    }
}

impl AppConfig {
    pub fn is_enabled(&self, category: Category) -> bool {
        !self.disabled_categories.contains(&category)
    }
}

/// Root directory for config, logs and history. Falls back to the temp dir
/// on platforms without a config directory.
pub fn app_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR_NAME)
}

// ---------------------------------------------------------------------------
// Load / save
// ---------------------------------------------------------------------------

pub fn load_or_default(config_dir: &Path) -> Result<AppConfig> {
    let path = config_dir.join("config.toml");
    if path.exists() {
        let raw = std::fs::read_to_string(&path)?;
        let cfg: AppConfig = toml::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("Config parse error in {:?}: {}", path, e))?;
        Ok(cfg)
    } else {
        Ok(AppConfig::default())
    }
}

pub fn save(config: &AppConfig, config_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(config_dir)?;
    let raw = toml::to_string_pretty(config)
        .map_err(|e| anyhow::anyhow!("Config serialize error: {}", e))?;
    std::fs::write(config_dir.join("config.toml"), raw)?;
    Ok(())
}
