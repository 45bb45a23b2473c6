//! Event files on disk.

use std::path::PathBuf;

use crate::error::{ForceCalError, ForceCalResult};
use crate::event::{Event, EventTime};
use crate::ics::{generate_ics, parse_event};

/// A calendar event stored as an .ics file.
#[derive(Debug, Clone)]
pub struct StoredEvent {
    /// Path to the .ics file
    pub path: PathBuf,
    /// The event data
    pub event: Event,
}

impl StoredEvent {
    pub fn new(path: PathBuf, event: &Event) -> Self {
        StoredEvent {
            path,
            event: event.clone(),
        }
    }

    pub fn from_file(path: PathBuf) -> ForceCalResult<Self> {
        let content = std::fs::read_to_string(&path)?;

        let event = parse_event(&content).ok_or_else(|| {
            ForceCalError::IcsParse(format!("Failed to parse event from {}", path.display()))
        })?;

        Ok(StoredEvent { path, event })
    }

    pub fn save(&self) -> ForceCalResult<()> {
        let ics_content = generate_ics(&self.event)?;
        std::fs::write(&self.path, ics_content)?;
        Ok(())
    }

    /// Generate the base filename slug for an event.
    /// Timed events: `YYYY-MM-DDTHHMM__slug`
    /// All-day events: `YYYY-MM-DD__slug`
    /// Recurring masters: `_recurring__slug`
    /// Override instances: `YYYY-MM-DDTHHMM__slug__override`
    pub fn base_slug_for(event: &Event) -> String {
        let slug = slug::slugify(&event.summary);

        if event.recurrence.is_some() {
            return format!("_recurring__{}", slug);
        }

        let date = match &event.start {
            EventTime::Date(d) => d.format("%Y-%m-%d").to_string(),
            EventTime::DateTimeUtc(dt) => dt.format("%Y-%m-%dT%H%M").to_string(),
            EventTime::DateTimeFloating(dt) => dt.format("%Y-%m-%dT%H%M").to_string(),
            EventTime::DateTimeZoned { datetime, .. } => {
                datetime.format("%Y-%m-%dT%H%M").to_string()
            }
        };

        if event.recurrence_id.is_some() {
            format!("{}__{}__override", date, slug)
        } else {
            format!("{}__{}", date, slug)
        }
    }
}
