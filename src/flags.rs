//! Persistent setup flags
//!
//! Small boolean flags recording which one-time setup prompts have already
//! been shown or addressed. The readiness machine consults these so a user
//! who declined a prompt is not nagged on every re-evaluation.
//!
//! Stored separately from the main config in `~/.callpilot/settings.json`
//! so that wiping configuration does not replay the onboarding prompts.

use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use crate::config::get_config_dir;

/// First launch of the app, before any setup step has run
pub const FLAG_FIRST_RUN: &str = "first_run";
/// The autostart settings prompt has been shown once
pub const FLAG_AUTOSTART_ADDRESSED: &str = "autostart_addressed";
/// The battery optimisation prompt has been shown once
pub const FLAG_BATTERY_ADDRESSED: &str = "battery_optimization_addressed";
/// The final manual checklist has been shown once
pub const FLAG_FINAL_CHECKLIST_SHOWN: &str = "final_checklist_shown";

/// Key-value store for boolean setup flags.
///
/// Missing keys read as `false`. Writes are expected to persist immediately
/// where the backing store supports it.
pub trait FlagStore: Send + Sync {
    fn get(&self, key: &str) -> bool;
    fn set(&self, key: &str, value: bool);
}

/// JSON-file-backed flag store
///
/// The whole file is rewritten on every `set`. Flags change a handful of
/// times over the life of an install, so there is no write batching.
pub struct JsonFlagStore {
    path: PathBuf,
    cache: Mutex<Map<String, Value>>,
}

impl JsonFlagStore {
    /// Open the default store at ~/.callpilot/settings.json
    pub fn open_default() -> Result<Self> {
        Self::open(get_config_dir().join("settings.json"))
    }

    /// Open a store at an explicit path, loading existing flags if present
    pub fn open(path: PathBuf) -> Result<Self> {
        let cache = if path.exists() {
            let contents = fs::read_to_string(&path).context("Failed to read settings file")?;
            serde_json::from_str(&contents).context("Failed to parse settings file")?
        } else {
            Map::new()
        };
        Ok(Self {
            path,
            cache: Mutex::new(cache),
        })
    }

    fn persist(&self, cache: &Map<String, Value>) {
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                if let Err(e) = fs::create_dir_all(parent) {
                    tracing::error!("Failed to create settings directory: {e}");
                    return;
                }
            }
        }
        match serde_json::to_string_pretty(cache) {
            Ok(contents) => {
                if let Err(e) = fs::write(&self.path, contents) {
                    tracing::error!("Failed to write settings file: {e}");
                }
            }
            Err(e) => tracing::error!("Failed to serialise settings: {e}"),
        }
    }
}

impl FlagStore for JsonFlagStore {
    fn get(&self, key: &str) -> bool {
        self.cache
            .lock()
            .get(key)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    fn set(&self, key: &str, value: bool) {
        let mut cache = self.cache.lock();
        cache.insert(key.to_string(), Value::Bool(value));
        self.persist(&cache);
    }
}

/// In-memory flag store for tests and ephemeral sessions
#[derive(Default)]
pub struct MemoryFlagStore {
    flags: Mutex<HashMap<String, bool>>,
}

impl MemoryFlagStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FlagStore for MemoryFlagStore {
    fn get(&self, key: &str) -> bool {
        self.flags.lock().get(key).copied().unwrap_or(false)
    }

    fn set(&self, key: &str, value: bool) {
        self.flags.lock().insert(key.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_store_defaults_false() {
        let store = MemoryFlagStore::new();
        assert!(!store.get(FLAG_BATTERY_ADDRESSED));
        store.set(FLAG_BATTERY_ADDRESSED, true);
        assert!(store.get(FLAG_BATTERY_ADDRESSED));
    }

    #[test]
    fn test_json_store_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");

        let store = JsonFlagStore::open(path.clone()).unwrap();
        assert!(!store.get(FLAG_AUTOSTART_ADDRESSED));
        store.set(FLAG_AUTOSTART_ADDRESSED, true);
        store.set(FLAG_FIRST_RUN, false);
        drop(store);

        let reopened = JsonFlagStore::open(path).unwrap();
        assert!(reopened.get(FLAG_AUTOSTART_ADDRESSED));
        assert!(!reopened.get(FLAG_FIRST_RUN));
    }

    #[test]
    fn test_json_store_creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let store = JsonFlagStore::open(path.clone()).unwrap();
        store.set(FLAG_FINAL_CHECKLIST_SHOWN, true);
        assert!(path.exists());
    }

    #[test]
    fn test_json_store_ignores_non_boolean_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"first_run": "yes"}"#).unwrap();

        let store = JsonFlagStore::open(path).unwrap();
        assert!(!store.get(FLAG_FIRST_RUN));
    }
}
