//! Root calendar directory management.

use std::path::PathBuf;

use config::{Config, File};

use crate::error::{ForceCalError, ForceCalResult};
use crate::forcecal_config::ForceCalDirConfig;
use crate::local::LocalCalendar;

#[derive(Clone)]
pub struct ForceCalDir {
    config: ForceCalDirConfig,
}

impl ForceCalDir {
    pub fn load() -> ForceCalResult<Self> {
        let config_path = ForceCalDirConfig::config_path()?;

        if !config_path.exists() {
            ForceCalDirConfig::create_default_config(&config_path)?;
        }

        let config: ForceCalDirConfig = Config::builder()
            .add_source(File::from(config_path).required(false))
            .build()
            .map_err(|e| ForceCalError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| ForceCalError::Config(e.to_string()))?;

        Ok(ForceCalDir { config })
    }

    /// Root for a fixed data directory (tests, scripting).
    pub fn at(path: PathBuf) -> Self {
        ForceCalDir {
            config: ForceCalDirConfig {
                calendar_dir: path,
                default_calendar: None,
            },
        }
    }

    pub fn data_path(&self) -> PathBuf {
        let full_path_str =
            shellexpand::tilde(&self.config.calendar_dir.to_string_lossy()).into_owned();

        PathBuf::from(full_path_str)
    }

    /// Returns the calendar directory path in display-friendly form,
    /// keeping `~` instead of expanding to the full home directory.
    pub fn display_path(&self) -> PathBuf {
        self.config.calendar_dir.clone()
    }

    /// Discover calendars by scanning calendar_dir for subdirectories
    /// with .forcecal markers.
    pub fn calendars(&self) -> Vec<LocalCalendar> {
        let data_path = self.data_path();

        let Ok(entries) = std::fs::read_dir(&data_path) else {
            return Vec::new();
        };

        let mut calendars: Vec<LocalCalendar> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_dir() && path.join(".forcecal").exists())
            .filter_map(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .and_then(|name| LocalCalendar::load(self, name).ok())
            })
            .collect();

        calendars.sort_by(|a, b| a.slug.cmp(&b.slug));
        calendars
    }

    pub fn default_calendar(&self) -> Option<LocalCalendar> {
        let name = self.config.default_calendar.as_ref()?;
        self.calendars().into_iter().find(|c| &c.slug == name)
    }

    /// Set the default calendar if one isn't already configured.
    /// Returns true if the default was set.
    pub fn set_default_calendar_if_unset(&mut self, slug: &str) -> ForceCalResult<bool> {
        if self.config.default_calendar.is_some() {
            return Ok(false);
        }
        self.config.default_calendar = Some(slug.to_string());
        self.config.save()?;
        Ok(true)
    }
}
