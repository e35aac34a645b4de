//! Computer configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::group::RetryPolicy;

/// Which groups a [`Computer`](crate::Computer) opens, and how patiently
/// background detection retries. Every field has a default, so `{}` is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputerConfig {
    /// Open the memory group
    #[serde(default = "default_enabled")]
    pub memory_enabled: bool,

    /// Open the USB controller group
    #[serde(default = "default_enabled")]
    pub controller_enabled: bool,

    /// Retry policy for driver-dependent detection
    #[serde(default)]
    pub detection: RetryPolicy,
}

fn default_enabled() -> bool {
    true
}

impl Default for ComputerConfig {
    fn default() -> Self {
        Self { memory_enabled: default_enabled(), controller_enabled: default_enabled(), detection: RetryPolicy::default() }
    }
}

impl ComputerConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a JSON file, falling back to defaults when it does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn validate(&self) -> Result<()> {
        self.detection.validate()
    }
}
