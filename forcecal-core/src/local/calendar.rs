//! Calendar directory management.

use std::fmt;
use std::path::PathBuf;

use crate::calendar::{Calendar, CalendarConfig};
use crate::error::{ForceCalError, ForceCalResult};
use crate::event::{Event, EventTime};
use crate::forcecal::ForceCalDir;
use crate::local::config::LocalCalendarConfig;
use crate::local::event::StoredEvent;
use crate::timezone;

#[derive(Clone)]
pub struct LocalCalendar {
    pub slug: String,
    pub config: LocalCalendarConfig,
    root: PathBuf,
}

impl LocalCalendar {
    /// Create a new calendar directory under the root.
    pub fn create(root: &ForceCalDir, name: &str, tz: Option<&str>) -> ForceCalResult<Self> {
        if let Some(tz) = tz {
            // Fail before any directory is made.
            timezone::parse_tz(tz)?;
        }

        let slug = Self::unique_slug_for(root, Some(name))?;
        let dir = root.data_path().join(&slug);
        std::fs::create_dir_all(&dir)?;

        let config = LocalCalendarConfig {
            name: Some(name.to_string()),
            timezone: tz.map(String::from),
        };
        config.save(&dir)?;

        tracing::info!(slug = %slug, "created calendar");
        Ok(LocalCalendar {
            slug,
            config,
            root: root.data_path(),
        })
    }

    pub fn load(root: &ForceCalDir, slug: &str) -> ForceCalResult<Self> {
        let calendar_dir = root.data_path().join(slug);
        if !calendar_dir.join(".forcecal").exists() {
            return Err(ForceCalError::CalendarNotFound(slug.to_string()));
        }
        let config = LocalCalendarConfig::load(&calendar_dir)?;

        Ok(LocalCalendar {
            slug: slug.to_string(),
            config,
            root: root.data_path(),
        })
    }

    fn base_slug_for(name: Option<&str>) -> String {
        name.map(slug::slugify)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "calendar".to_string())
    }

    /// Generate a unique slug that doesn't conflict with existing calendar
    /// directories. If the base slug exists, tries slug-2, slug-3, etc.
    pub fn unique_slug_for(root: &ForceCalDir, name: Option<&str>) -> ForceCalResult<String> {
        let base = Self::base_slug_for(name);
        let data_path = root.data_path();

        if !data_path.join(&base).exists() {
            return Ok(base);
        }

        for n in 2..=100 {
            let suffixed = format!("{}-{}", base, n);
            if !data_path.join(&suffixed).exists() {
                return Ok(suffixed);
            }
        }

        Err(ForceCalError::Config(format!(
            "Too many calendar name collisions for '{}'",
            base
        )))
    }

    pub fn path(&self) -> PathBuf {
        self.root.join(&self.slug)
    }

    pub fn display_name(&self) -> &str {
        self.config.name.as_deref().unwrap_or(&self.slug)
    }

    /// The calendar's zone: configured, else the host zone.
    pub fn tz(&self) -> ForceCalResult<timezone::Tz> {
        match &self.config.timezone {
            Some(name) => timezone::parse_tz(name),
            None => Ok(timezone::system_tz()),
        }
    }

    pub fn save_config(&self) -> ForceCalResult<()> {
        self.config.save(&self.path())
    }

    // EVENT OPERATIONS

    /// Load events from the calendar directory. Unparseable files are
    /// skipped with a warning rather than failing the whole calendar.
    pub fn events(&self) -> ForceCalResult<Vec<StoredEvent>> {
        let data_path = self.path();

        let entries = std::fs::read_dir(&data_path)?;

        let local_events = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|e| e == "ics"))
            .filter_map(|path| match StoredEvent::from_file(path.clone()) {
                Ok(stored) => Some(stored),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unparseable event file");
                    None
                }
            })
            .collect();

        Ok(local_events)
    }

    pub fn create_event(&self, event: &Event) -> ForceCalResult<()> {
        let dir = self.path();
        std::fs::create_dir_all(&dir)?;

        let event_slug = self.unique_event_slug_for(event)?;
        let event_path = dir.join(format!("{}.ics", event_slug));
        let stored = StoredEvent::new(event_path, event);

        stored.save()
    }

    /// Update an event file by finding it via uid and replacing its content.
    /// For recurring event instances, also matches on recurrence_id.
    pub fn update_event(&self, uid: &str, event: &Event) -> ForceCalResult<()> {
        self.delete_event_by_uid(uid, event.recurrence_id.as_ref())?;
        self.create_event(event)
    }

    /// Delete an event file by uid.
    /// For recurring event instances, also matches on recurrence_id.
    pub fn delete_event_by_uid(
        &self,
        uid: &str,
        recurrence_id: Option<&EventTime>,
    ) -> ForceCalResult<()> {
        if let Some(stored) = self
            .events()?
            .into_iter()
            .find(|e| e.event.uid == uid && e.event.recurrence_id.as_ref() == recurrence_id)
        {
            std::fs::remove_file(&stored.path)?;
        }
        Ok(())
    }

    /// Hydrate the in-memory engine from this calendar's files.
    pub fn load_engine(&self) -> ForceCalResult<Calendar> {
        let config = CalendarConfig {
            timezone: self.tz()?,
            ..CalendarConfig::default()
        };
        let mut engine = Calendar::new(config);

        for stored in self.events()? {
            if let Err(e) = engine.add_event(stored.event) {
                tracing::warn!(path = %stored.path.display(), error = %e, "skipping event file");
            }
        }

        Ok(engine)
    }

    fn unique_event_slug_for(&self, event: &Event) -> ForceCalResult<String> {
        let data_path = self.path();
        let base = StoredEvent::base_slug_for(event);

        // Try base slug first (check with .ics extension)
        if !data_path.join(format!("{}.ics", base)).exists() {
            return Ok(base);
        }

        // Collision - try suffixes
        for n in 2..=100 {
            let suffixed = format!("{}-{}", base, n);
            if !data_path.join(format!("{}.ics", suffixed)).exists() {
                return Ok(suffixed);
            }
        }

        Err(ForceCalError::Config(format!(
            "Too many event name collisions for '{}'",
            base
        )))
    }
}

impl fmt::Display for LocalCalendar {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.slug)
    }
}
