//! Global forcecal configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{ForceCalError, ForceCalResult};

static DEFAULT_DATA_PATH: &str = "~/calendar";

fn default_data_path() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_PATH)
}

fn is_default_data_path(p: &PathBuf) -> bool {
    *p == default_data_path()
}

/// Global configuration at ~/.config/forcecal/config.toml
///
/// Calendar-specific configuration (display name, timezone) is stored in
/// each calendar's .forcecal/config.toml file instead.
#[derive(Serialize, Deserialize, Clone)]
pub struct ForceCalDirConfig {
    #[serde(default = "default_data_path", skip_serializing_if = "is_default_data_path")]
    pub calendar_dir: PathBuf,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_calendar: Option<String>,
}

impl Default for ForceCalDirConfig {
    fn default() -> Self {
        ForceCalDirConfig {
            calendar_dir: default_data_path(),
            default_calendar: None,
        }
    }
}

impl ForceCalDirConfig {
    pub fn config_path() -> ForceCalResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ForceCalError::Config("Could not determine config directory".into()))?
            .join("forcecal");

        Ok(config_dir.join("config.toml"))
    }

    /// Save the current config to ~/.config/forcecal/config.toml
    pub fn save(&self) -> ForceCalResult<()> {
        let config_path = Self::config_path()?;

        let content =
            toml::to_string_pretty(self).map_err(|e| ForceCalError::Config(e.to_string()))?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(&config_path, content)
            .map_err(|e| ForceCalError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &std::path::Path) -> ForceCalResult<()> {
        let contents = format!(
            "\
# forcecal configuration

# Where your calendars live:
# calendar_dir = \"{}\"

# Default calendar for new events:
# default_calendar = \"personal\"
",
            DEFAULT_DATA_PATH
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ForceCalError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| ForceCalError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }
}
