//! RRULE expansion for recurring events.
//!
//! Expands a master recurring event into individual instances within a date
//! range, respecting EXDATEs and per-instance overrides.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use rrule::RRuleSet;

use crate::constants::MAX_OCCURRENCES;
use crate::error::{ForceCalError, ForceCalResult};
use crate::event::{Event, EventTime, Recurrence};

/// Build an iCalendar-format RRULE string for the rrule crate parser.
fn build_rrule_string(start: &EventTime, recurrence: &Recurrence) -> String {
    let mut lines = Vec::new();

    // DTSTART — the rrule crate needs a datetime, so all-day dates become midnight UTC
    let dtstart = match start {
        EventTime::Date(d) => {
            format!("DTSTART:{}T000000Z", d.format("%Y%m%d"))
        }
        EventTime::DateTimeUtc(dt) => {
            format!("DTSTART:{}", dt.format("%Y%m%dT%H%M%SZ"))
        }
        EventTime::DateTimeFloating(dt) => {
            format!("DTSTART:{}Z", dt.format("%Y%m%dT%H%M%S"))
        }
        EventTime::DateTimeZoned { datetime, tzid } => {
            format!("DTSTART;TZID={}:{}", tzid, datetime.format("%Y%m%dT%H%M%S"))
        }
    };
    lines.push(dtstart);

    // RRULE
    lines.push(format!("RRULE:{}", recurrence.rrule));

    // EXDATE lines
    for exdate in &recurrence.exdates {
        let exdate_str = match exdate {
            EventTime::Date(d) => format!("EXDATE:{}T000000Z", d.format("%Y%m%d")),
            EventTime::DateTimeUtc(dt) => {
                format!("EXDATE:{}", dt.format("%Y%m%dT%H%M%SZ"))
            }
            EventTime::DateTimeFloating(dt) => {
                format!("EXDATE:{}Z", dt.format("%Y%m%dT%H%M%S"))
            }
            EventTime::DateTimeZoned { datetime, tzid } => {
                format!("EXDATE;TZID={}:{}", tzid, datetime.format("%Y%m%dT%H%M%S"))
            }
        };
        lines.push(exdate_str);
    }

    lines.join("\n")
}

/// Convert an rrule occurrence datetime back to an EventTime matching the master's variant.
fn occurrence_to_event_time(dt: &DateTime<rrule::Tz>, master_start: &EventTime) -> EventTime {
    match master_start {
        EventTime::Date(_) => EventTime::Date(dt.date_naive()),
        EventTime::DateTimeUtc(_) => EventTime::DateTimeUtc(dt.with_timezone(&Utc)),
        EventTime::DateTimeFloating(_) => EventTime::DateTimeFloating(dt.naive_utc()),
        EventTime::DateTimeZoned { tzid, .. } => EventTime::DateTimeZoned {
            datetime: dt.naive_local(),
            tzid: tzid.clone(),
        },
    }
}

/// Instance end preserving the master's EventTime variant. Zoned instances
/// add the duration in wall-clock terms, so a 1-hour meeting stays an hour
/// across a DST transition.
fn instance_end(master: &Event, occurrence: &DateTime<rrule::Tz>, duration: Duration) -> EventTime {
    match (&master.start, &master.end) {
        (EventTime::Date(d_start), EventTime::Date(d_end)) => {
            let day_diff = (*d_end - *d_start).num_days();
            EventTime::Date(occurrence.date_naive() + Duration::days(day_diff))
        }
        (EventTime::DateTimeUtc(_), _) => {
            EventTime::DateTimeUtc(occurrence.with_timezone(&Utc) + duration)
        }
        (EventTime::DateTimeFloating(_), _) => {
            EventTime::DateTimeFloating(occurrence.naive_utc() + duration)
        }
        (EventTime::DateTimeZoned { tzid, .. }, _) => EventTime::DateTimeZoned {
            datetime: occurrence.naive_local() + duration,
            tzid: tzid.clone(),
        },
        _ => EventTime::DateTimeUtc(occurrence.with_timezone(&Utc) + duration),
    }
}

/// Expand a recurring master event into individual instances within
/// [range_start, range_end].
///
/// - `overrides` maps RECURRENCE-ID ICS strings to override Events (instance
///   exceptions). If an override exists for a given occurrence, it replaces
///   the generated instance verbatim.
/// - The master event itself is NOT included; only expanded instances with
///   `recurrence_id` set and `recurrence` cleared.
pub fn expand_recurring_event(
    master: &Event,
    range_start: DateTime<Utc>,
    range_end: DateTime<Utc>,
    overrides: &HashMap<String, Event>,
) -> ForceCalResult<Vec<Event>> {
    let recurrence = match &master.recurrence {
        Some(r) => r,
        None => return Ok(Vec::new()),
    };

    let rrule_str = build_rrule_string(&master.start, recurrence);

    let rrule_set: RRuleSet = rrule_str.parse().map_err(|e| {
        ForceCalError::Recurrence(format!(
            "Failed to parse RRULE for event '{}': {}",
            master.uid, e
        ))
    })?;

    // Convert range boundaries to rrule's Tz type.
    // Widen by 1 second to make the range inclusive (after/before are exclusive).
    let tz = rrule::Tz::UTC;
    let after = (range_start - Duration::seconds(1)).with_timezone(&tz);
    let before = (range_end + Duration::seconds(1)).with_timezone(&tz);

    let result = rrule_set.after(after).before(before).all(MAX_OCCURRENCES);
    if result.limited {
        tracing::warn!(uid = %master.uid, cap = MAX_OCCURRENCES, "recurrence expansion hit occurrence cap");
    }

    // Master event duration, reapplied to every instance
    let duration = match (master.start.to_utc(), master.end.to_utc()) {
        (Some(s), Some(e)) => e - s,
        _ => Duration::zero(),
    };

    let mut events = Vec::new();

    for occ_dt in &result.dates {
        let occ_event_time = occurrence_to_event_time(occ_dt, &master.start);
        let ics_key = occ_event_time.to_ics_string();

        if let Some(override_event) = overrides.get(&ics_key) {
            events.push(override_event.clone());
        } else {
            let mut instance = master.clone();
            instance.end = instance_end(master, occ_dt, duration);
            instance.start = occ_event_time.clone();
            instance.recurrence = None;
            instance.recurrence_id = Some(occ_event_time);
            events.push(instance);
        }
    }

    Ok(events)
}
