//! Calendar event types.
//!
//! Events keep their wall-clock form in [`EventTime`] and derive the UTC
//! instant on demand, so both local and UTC views stay available without
//! storing them twice. All other fields map 1:1 onto iCalendar properties.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::date_range::DateRange;
use crate::timezone::{self, Tz};

/// A calendar event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub uid: String,
    pub summary: String,
    pub description: Option<String>,
    pub location: Option<String>,
    /// Free-form tags (ICS CATEGORIES); used by the category index.
    pub categories: Vec<String>,
    pub start: EventTime,
    pub end: EventTime,
    pub status: EventStatus,

    // Recurrence fields
    /// RRULE + EXDATEs for master events
    pub recurrence: Option<Recurrence>,
    /// Original occurrence start for override instances (ICS RECURRENCE-ID)
    pub recurrence_id: Option<EventTime>,

    // Alarms & Availability
    /// Reminders/alarms for this event
    pub reminders: Vec<Reminder>,
    /// Whether event blocks time (OPAQUE) or is free (TRANSPARENT)
    pub transparency: Transparency,

    // Meeting Data
    /// Event organizer
    pub organizer: Option<Attendee>,
    /// Event attendees/participants
    pub attendees: Vec<Attendee>,
    /// Conference/video call URL
    pub conference_url: Option<String>,

    // Revision tracking
    /// Last modification timestamp (LAST-MODIFIED)
    pub updated: Option<DateTime<Utc>>,
    /// Revision sequence number (SEQUENCE)
    pub sequence: Option<i64>,

    /// Custom X- properties, preserved for round-tripping
    pub custom_properties: Vec<(String, String)>,
}

impl Event {
    /// Create an event with a fresh uid and defaults everywhere else.
    pub fn new(summary: &str, start: EventTime, end: EventTime) -> Self {
        Event {
            uid: format!("{}@forcecal", uuid::Uuid::new_v4()),
            summary: summary.to_string(),
            description: None,
            location: None,
            categories: Vec::new(),
            start,
            end,
            status: EventStatus::Confirmed,
            recurrence: None,
            recurrence_id: None,
            reminders: Vec::new(),
            transparency: Transparency::Opaque,
            organizer: None,
            attendees: Vec::new(),
            conference_url: None,
            updated: None,
            sequence: None,
            custom_properties: Vec::new(),
        }
    }

    /// Identity within a store: uid alone for regular events and masters,
    /// uid + occurrence start for override instances (a master and its
    /// overrides share a uid).
    pub fn unique_id(&self) -> String {
        match &self.recurrence_id {
            Some(rid) => format!("{}::{}", self.uid, rid.to_ics_string()),
            None => self.uid.clone(),
        }
    }

    pub fn is_all_day(&self) -> bool {
        matches!(self.start, EventTime::Date(_))
    }

    pub fn is_recurring(&self) -> bool {
        self.recurrence.is_some()
    }

    /// Event duration. All-day events span whole days (DTEND exclusive);
    /// None when either endpoint has no resolvable instant.
    pub fn duration(&self) -> Option<Duration> {
        match (&self.start, &self.end) {
            (EventTime::Date(s), EventTime::Date(e)) => Some(Duration::days((*e - *s).num_days())),
            _ => match (self.start.to_utc(), self.end.to_utc()) {
                (Some(s), Some(e)) => Some(e - s),
                _ => None,
            },
        }
    }

    /// Whether the event's span intersects the given range.
    pub fn overlaps(&self, range: &DateRange) -> bool {
        let start = self.start.to_utc().or_else(|| self.start.day_start_utc());
        let end = self.end.to_utc().or_else(|| self.end.day_start_utc());

        let starts_before_range_end = match (start, range.to) {
            (Some(s), Some(to)) => s <= to,
            _ => true,
        };
        let ends_after_range_start = match (end.or(start), range.from) {
            (Some(e), Some(from)) => e >= from,
            _ => true,
        };

        starts_before_range_end && ends_after_range_start
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.summary)
    }
}

/// When an event starts or ends, in one of the four iCalendar time shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventTime {
    /// All-day (ICS VALUE=DATE)
    Date(NaiveDate),
    /// Pinned to UTC (ICS `...Z`)
    DateTimeUtc(DateTime<Utc>),
    /// Floating: same wall-clock everywhere (no Z, no TZID)
    DateTimeFloating(NaiveDateTime),
    /// Wall-clock in a named IANA zone (ICS TZID parameter)
    DateTimeZoned { datetime: NaiveDateTime, tzid: String },
}

impl EventTime {
    /// The UTC instant this time names. None for all-day dates and for
    /// zoned times whose tzid doesn't resolve.
    pub fn to_utc(&self) -> Option<DateTime<Utc>> {
        match self {
            EventTime::Date(_) => None,
            EventTime::DateTimeUtc(dt) => Some(*dt),
            EventTime::DateTimeFloating(dt) => Some(dt.and_utc()),
            EventTime::DateTimeZoned { datetime, tzid } => {
                let tz = timezone::parse_tz(tzid).ok()?;
                timezone::local_to_utc(*datetime, tz).ok()
            }
        }
    }

    /// Midnight UTC of the date, for ordering all-day events against timed ones.
    pub fn day_start_utc(&self) -> Option<DateTime<Utc>> {
        match self {
            EventTime::Date(d) => Some(d.and_hms_opt(0, 0, 0)?.and_utc()),
            _ => self.to_utc(),
        }
    }

    /// The calendar day this time falls on, viewed from `tz`.
    pub fn date_naive(&self, tz: Tz) -> NaiveDate {
        match self {
            EventTime::Date(d) => *d,
            EventTime::DateTimeUtc(dt) => dt.with_timezone(&tz).date_naive(),
            EventTime::DateTimeFloating(dt) => dt.date(),
            EventTime::DateTimeZoned { datetime, .. } => datetime.date(),
        }
    }

    /// ICS-format value, used both on the wire and as the override map key.
    pub fn to_ics_string(&self) -> String {
        match self {
            EventTime::Date(d) => d.format("%Y%m%d").to_string(),
            EventTime::DateTimeUtc(dt) => dt.format("%Y%m%dT%H%M%SZ").to_string(),
            EventTime::DateTimeFloating(dt) => dt.format("%Y%m%dT%H%M%S").to_string(),
            EventTime::DateTimeZoned { datetime, tzid } => {
                format!("TZID={}:{}", tzid, datetime.format("%Y%m%dT%H%M%S"))
            }
        }
    }
}

impl fmt::Display for EventTime {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EventTime::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            EventTime::DateTimeUtc(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M UTC")),
            EventTime::DateTimeFloating(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M")),
            EventTime::DateTimeZoned { datetime, tzid } => {
                write!(f, "{} {}", datetime.format("%Y-%m-%d %H:%M"), tzid)
            }
        }
    }
}

/// A recurrence definition on a master event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recurrence {
    /// RFC 5545 RRULE value, e.g. "FREQ=WEEKLY;BYDAY=MO,WE,FR"
    pub rrule: String,
    /// Occurrences excluded from expansion (ICS EXDATE)
    pub exdates: Vec<EventTime>,
}

/// An event attendee (also used for organizer)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attendee {
    /// Display name
    pub name: Option<String>,
    /// Email address
    pub email: String,
    /// Response status (ICS PARTSTAT)
    pub response_status: Option<ParticipationStatus>,
}

/// ICS PARTSTAT values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ParticipationStatus {
    Accepted,
    Declined,
    Tentative,
    Delegated,
    NeedsAction,
}

impl ParticipationStatus {
    pub fn from_ics_str(s: &str) -> Option<Self> {
        match s {
            "ACCEPTED" => Some(ParticipationStatus::Accepted),
            "DECLINED" => Some(ParticipationStatus::Declined),
            "TENTATIVE" => Some(ParticipationStatus::Tentative),
            "DELEGATED" => Some(ParticipationStatus::Delegated),
            "NEEDS-ACTION" => Some(ParticipationStatus::NeedsAction),
            _ => None,
        }
    }

    pub fn as_ics_str(&self) -> &'static str {
        match self {
            ParticipationStatus::Accepted => "ACCEPTED",
            ParticipationStatus::Declined => "DECLINED",
            ParticipationStatus::Tentative => "TENTATIVE",
            ParticipationStatus::Delegated => "DELEGATED",
            ParticipationStatus::NeedsAction => "NEEDS-ACTION",
        }
    }
}

/// A reminder/alarm for an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    /// Minutes before the event to trigger
    pub minutes: i64,
}

/// Event transparency (busy/free status)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Transparency {
    /// Event blocks time on calendar (default)
    Opaque,
    /// Event does not block time (shows as free)
    Transparent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventStatus {
    Confirmed,
    Tentative,
    Cancelled,
}
