//! Settings stores implementing [`Settings`](crate::traits::Settings).
//!
//! * [`MemorySettings`] keeps everything in memory, for tests and throwaway sessions.
//! * [`JsonFileSettings`] loads a flat JSON object from disk and writes it back on
//!   [`save`](JsonFileSettings::save).
//!
//! ```rust
//! use hwsense::settings::MemorySettings;
//! use hwsense::traits::{Settings, SettingsExt};
//!
//! let settings = MemorySettings::new();
//! settings.set_bool("/ram/load/0:hidden", true);
//! assert!(settings.contains("/ram/load/0:hidden"));
//! assert!(settings.get_bool("/ram/load/0:hidden", false));
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::debug;

use crate::error::Result;
use crate::traits::Settings;

/// In-memory settings store
#[derive(Debug, Default)]
pub struct MemorySettings {
    values: RwLock<HashMap<String, String>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }
}

impl Settings for MemorySettings {
    fn get(&self, key: &str, default: &str) -> String {
        self.values.read().get(key).cloned().unwrap_or_else(|| default.to_string())
    }

    fn set(&self, key: &str, value: &str) {
        self.values.write().insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.values.write().remove(key);
    }

    fn contains(&self, key: &str) -> bool {
        self.values.read().contains_key(key)
    }
}

/// Settings persisted as a JSON object of string values
#[derive(Debug)]
pub struct JsonFileSettings {
    path: PathBuf,
    values: RwLock<BTreeMap<String, String>>,
}

impl JsonFileSettings {
    /// Loads `path`. A missing file yields an empty store.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let values = match std::fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "settings file not found, starting empty");
                BTreeMap::new()
            },
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, values: RwLock::new(values) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the current values to disk, creating parent directories.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(&*self.values.read())?;
        std::fs::write(&self.path, content)?;
        debug!(path = %self.path.display(), "settings saved");
        Ok(())
    }
}

impl Settings for JsonFileSettings {
    fn get(&self, key: &str, default: &str) -> String {
        self.values.read().get(key).cloned().unwrap_or_else(|| default.to_string())
    }

    fn set(&self, key: &str, value: &str) {
        self.values.write().insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.values.write().remove(key);
    }

    fn contains(&self, key: &str) -> bool {
        self.values.read().contains_key(key)
    }
}
