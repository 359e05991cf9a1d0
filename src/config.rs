//! Configuration management for Callpilot
//!
//! Persistent settings with schema versioning and migrations. Configuration
//! is stored in `~/.callpilot/config.json`; the in-memory copy is cached
//! behind a `RwLock` and loaded on first access. Everything tunable about
//! detection lives here: the target package, the timing pads and the
//! keyword overrides.

use anyhow::{Context, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

use crate::classify::KeywordSets;

/// Current config schema version
const CURRENT_VERSION: u32 = 1;

/// Global config instance for caching
static CONFIG: OnceLock<RwLock<Config>> = OnceLock::new();

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Schema version for migrations
    pub version: u32,
    /// Call detection settings
    pub detection: DetectionConfig,
    /// Delays and pacing
    pub timing: TimingConfig,
    /// Keyword overrides for the classifiers
    pub keywords: KeywordConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            detection: DetectionConfig::default(),
            timing: TimingConfig::default(),
            keywords: KeywordConfig::default(),
        }
    }
}

/// Call detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Package name of the messaging app being monitored
    pub target_package: String,
    /// Literal markers checked against notification text in addition to the
    /// call-phrase keyword set
    pub extra_call_markers: Vec<String>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            target_package: "com.whatsapp".to_string(),
            extra_call_markers: vec![
                "voice call".to_string(),
                "video call".to_string(),
                "calling".to_string(),
                "ringing".to_string(),
            ],
        }
    }
}

/// Timing configuration, all in milliseconds
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Pause before scanning after a UI event, letting transitions settle
    pub ui_settle_delay_ms: u64,
    /// Pause before a delegated answer attempt, letting the app foreground
    /// itself (padded for slow OEM launchers)
    pub delegate_delay_ms: u64,
    /// Pause between synthetic taps
    pub tap_pacing_ms: u64,
    /// Stroke duration for one synthetic tap. Advisory for the gesture
    /// dispatcher implementation; the core never times strokes itself.
    pub tap_duration_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            ui_settle_delay_ms: 800,
            delegate_delay_ms: 1500,
            tap_pacing_ms: 800,
            tap_duration_ms: 150,
        }
    }
}

impl TimingConfig {
    pub fn ui_settle_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.ui_settle_delay_ms)
    }

    pub fn delegate_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.delegate_delay_ms)
    }

    pub fn tap_pacing(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.tap_pacing_ms)
    }

    pub fn tap_duration(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.tap_duration_ms)
    }
}

/// Keyword overrides. Empty lists mean "use the built-in multilingual
/// defaults".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordConfig {
    pub call_phrases: Vec<String>,
    pub answer_labels: Vec<String>,
}

impl KeywordConfig {
    /// The effective keyword sets after applying overrides.
    pub fn sets(&self) -> KeywordSets {
        KeywordSets::from_lists(&self.call_phrases, &self.answer_labels)
    }
}

/// Get the path to the config file (~/.callpilot/config.json)
pub fn get_config_path() -> PathBuf {
    get_config_dir().join("config.json")
}

/// Get the path to the config directory (~/.callpilot)
pub fn get_config_dir() -> PathBuf {
    home_dir_or_fallback().join(".callpilot")
}

/// Get the home directory, falling back to /tmp if unavailable
fn home_dir_or_fallback() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| {
        tracing::error!("Could not determine home directory, using /tmp");
        PathBuf::from("/tmp")
    })
}

/// Ensure the config directory exists
fn ensure_config_dir() -> Result<()> {
    let dir = get_config_dir();
    if !dir.exists() {
        fs::create_dir_all(&dir).context("Failed to create config directory")?;
    }
    Ok(())
}

/// Load configuration from disk
pub fn load_from_disk() -> Result<Config> {
    let path = get_config_path();

    if !path.exists() {
        tracing::info!("Config file not found, using defaults");
        return Ok(Config::default());
    }

    let contents = fs::read_to_string(&path).context("Failed to read config file")?;
    let config: Config = serde_json::from_str(&contents).context("Failed to parse config")?;

    migrate_config(config)
}

/// Save configuration to disk
pub fn save_to_disk(config: &Config) -> Result<()> {
    ensure_config_dir()?;

    let path = get_config_path();
    let contents = serde_json::to_string_pretty(config).context("Failed to serialise config")?;
    fs::write(&path, contents).context("Failed to write config file")?;

    tracing::info!(
        "Config saved to disk: target_package={}",
        config.detection.target_package
    );
    Ok(())
}

/// Migrate configuration from older schema versions
fn migrate_config(mut config: Config) -> Result<Config> {
    let original_version = config.version;

    while config.version < CURRENT_VERSION {
        config = apply_migration(config)?;
    }

    if config.version != original_version {
        tracing::info!(
            "Migrated config from version {} to {}",
            original_version,
            config.version
        );
        save_to_disk(&config)?;
    }

    Ok(config)
}

/// Apply a single migration step
fn apply_migration(config: Config) -> Result<Config> {
    match config.version {
        0 => {
            let mut migrated = config;
            migrated.version = 1;
            Ok(migrated)
        }
        v => anyhow::bail!("Unknown config version: {v}"),
    }
}

/// Get the global config instance
fn get_config_instance() -> &'static RwLock<Config> {
    CONFIG.get_or_init(|| {
        let config = load_from_disk().unwrap_or_else(|e| {
            tracing::error!("Failed to load config, using defaults: {e:#}");
            Config::default()
        });
        tracing::info!(
            "Config loaded: target_package={}",
            config.detection.target_package
        );
        RwLock::new(config)
    })
}

/// Get the current configuration (cached after first access)
pub fn get_config() -> Config {
    get_config_instance().read().clone()
}

/// Replace the current configuration and persist it to disk. The version
/// field is forced to the current schema.
pub fn set_config(mut config: Config) -> Result<()> {
    config.version = CURRENT_VERSION;
    save_to_disk(&config)?;

    let mut cached = get_config_instance().write();
    *cached = config;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.version, CURRENT_VERSION);
        assert_eq!(config.detection.target_package, "com.whatsapp");
        assert_eq!(config.timing.ui_settle_delay_ms, 800);
        assert_eq!(config.timing.delegate_delay_ms, 1500);
        assert_eq!(config.timing.tap_pacing_ms, 800);
        assert_eq!(config.timing.tap_duration_ms, 150);
        assert!(config.keywords.call_phrases.is_empty());
    }

    #[test]
    fn test_roundtrip_serialisation() {
        let config = Config::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.detection.target_package, config.detection.target_package);
        assert_eq!(parsed.timing.ui_settle_delay_ms, config.timing.ui_settle_delay_ms);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let parsed: Config =
            serde_json::from_str(r#"{"detection":{"target_package":"org.telegram.messenger"}}"#)
                .unwrap();
        assert_eq!(parsed.detection.target_package, "org.telegram.messenger");
        // Untouched sections come from defaults.
        assert_eq!(parsed.timing.ui_settle_delay_ms, 800);
        assert!(!parsed.detection.extra_call_markers.is_empty());
    }

    #[test]
    fn test_migration_from_version_zero() {
        let parsed: Config = serde_json::from_str(r#"{"version":0}"#).unwrap();
        let migrated = apply_migration(parsed).unwrap();
        assert_eq!(migrated.version, 1);
    }

    #[test]
    fn test_keyword_overrides() {
        let keywords = KeywordConfig {
            call_phrases: vec!["custom ring".to_string()],
            answer_labels: Vec::new(),
        };
        let sets = keywords.sets();
        assert!(crate::classify::classify_call_text("CUSTOM RING", &sets));
        assert!(crate::classify::classify_answer_label("answer", &sets));
    }
}
