//! Per-calendar local configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ForceCalError, ForceCalResult};

/// Configuration stored in each calendar's .forcecal/config.toml
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct LocalCalendarConfig {
    /// Display name (the directory slug derives from it).
    pub name: Option<String>,
    /// IANA zone for day queries; host zone when unset.
    pub timezone: Option<String>,
}

impl LocalCalendarConfig {
    /// Load config from .forcecal/config.toml
    pub fn load(calendar_dir: &Path) -> ForceCalResult<Self> {
        let path = calendar_dir.join(".forcecal/config.toml");

        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let config: LocalCalendarConfig =
                toml::from_str(&content).map_err(|e| ForceCalError::Config(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to .forcecal/config.toml
    pub fn save(&self, calendar_dir: &Path) -> ForceCalResult<()> {
        let dir = calendar_dir.join(".forcecal");
        std::fs::create_dir_all(&dir)?;

        let path = dir.join("config.toml");

        let content =
            toml::to_string_pretty(self).map_err(|e| ForceCalError::Config(e.to_string()))?;

        std::fs::write(&path, content)?;

        Ok(())
    }
}
