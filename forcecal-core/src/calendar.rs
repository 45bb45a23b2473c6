//! The calendar facade: composes the store, recurrence expansion, search,
//! and undo/redo history behind one caller-facing API.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};

use crate::constants::DEFAULT_HISTORY_DEPTH;
use crate::date_range::DateRange;
use crate::error::{ForceCalError, ForceCalResult};
use crate::event::{Event, EventTime};
use crate::history::StateHistory;
use crate::ics;
use crate::recurrence::expand_recurring_event;
use crate::search::{EventSearch, SearchQuery};
use crate::store::{EventStore, ListenerId, StoreChange};
use crate::timezone::{self, Tz};

#[derive(Debug, Clone)]
pub struct CalendarConfig {
    /// Zone used for day bucketing and day/week queries.
    pub timezone: Tz,
    /// First day of the week for week queries.
    pub week_starts_on: Weekday,
    /// Undo/redo depth.
    pub history_depth: usize,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        CalendarConfig {
            timezone: timezone::system_tz(),
            week_starts_on: Weekday::Mon,
            history_depth: DEFAULT_HISTORY_DEPTH,
        }
    }
}

pub struct Calendar {
    config: CalendarConfig,
    store: EventStore,
    search: EventSearch,
    history: StateHistory,
}

impl Default for Calendar {
    fn default() -> Self {
        Calendar::new(CalendarConfig::default())
    }
}

impl Calendar {
    pub fn new(config: CalendarConfig) -> Self {
        Calendar {
            store: EventStore::new(config.timezone),
            search: EventSearch::new(),
            history: StateHistory::new(config.history_depth),
            config,
        }
    }

    pub fn config(&self) -> &CalendarConfig {
        &self.config
    }

    pub fn timezone(&self) -> Tz {
        self.config.timezone
    }

    /// Switch the calendar's zone; day buckets are recomputed.
    pub fn set_timezone(&mut self, tz: Tz) {
        self.config.timezone = tz;
        self.store.set_timezone(tz);
        self.search.rebuild(&self.store);
    }

    // MUTATIONS
    // Every mutation snapshots first, so it is a single undo step.

    /// Add a new event. Errors when an event with the same identity exists.
    pub fn add_event(&mut self, event: Event) -> ForceCalResult<()> {
        validate(&event)?;
        let id = event.unique_id();
        if self.store.get(&id).is_some() {
            return Err(ForceCalError::InvalidEvent(format!(
                "Event '{}' already exists (use update_event)",
                id
            )));
        }

        self.history.record(self.store.snapshot());
        self.search.index_event(&event);
        self.store.insert(event);
        Ok(())
    }

    /// Replace an existing event. Errors when the identity is unknown.
    pub fn update_event(&mut self, event: Event) -> ForceCalResult<()> {
        validate(&event)?;
        let id = event.unique_id();
        if self.store.get(&id).is_none() {
            return Err(ForceCalError::EventNotFound(id));
        }

        self.history.record(self.store.snapshot());
        self.search.remove_event(&id);
        self.search.index_event(&event);
        self.store.insert(event);
        Ok(())
    }

    /// Remove an event. Removing a recurring master also removes its
    /// override instances (they are meaningless without it).
    pub fn remove_event(&mut self, id: &str) -> ForceCalResult<Event> {
        let Some(event) = self.store.get(id).cloned() else {
            return Err(ForceCalError::EventNotFound(id.to_string()));
        };

        self.history.record(self.store.snapshot());

        let mut doomed = vec![event.unique_id()];
        if event.is_recurring() {
            doomed.extend(self.store.overrides_for(&event.uid).values().map(Event::unique_id));
        }
        for id in &doomed {
            self.search.remove_event(id);
            self.store.remove(id);
        }
        Ok(event)
    }

    /// Import every event from ICS content; one undo step for the batch.
    /// Returns the number of events imported.
    pub fn import_ics(&mut self, content: &str) -> ForceCalResult<usize> {
        let events = ics::parse_calendar(content)?;

        self.history.record(self.store.snapshot());

        let mut imported = 0;
        for event in events {
            if let Err(e) = validate(&event) {
                tracing::warn!(uid = %event.uid, error = %e, "skipping invalid imported event");
                continue;
            }
            let id = event.unique_id();
            self.search.remove_event(&id);
            self.search.index_event(&event);
            self.store.insert(event);
            imported += 1;
        }

        tracing::info!(imported, "ICS import complete");
        Ok(imported)
    }

    /// Export the full calendar as one VCALENDAR.
    pub fn export_ics(&self, name: Option<&str>) -> ForceCalResult<String> {
        ics::generate_calendar(&self.store.snapshot(), name)
    }

    // HISTORY

    /// Step back one mutation. Returns false when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        match self.history.undo(self.store.snapshot()) {
            Some(previous) => {
                self.store.restore(previous);
                self.search.rebuild(&self.store);
                true
            }
            None => false,
        }
    }

    /// Reapply the last undone mutation.
    pub fn redo(&mut self) -> bool {
        match self.history.redo(self.store.snapshot()) {
            Some(next) => {
                self.store.restore(next);
                self.search.rebuild(&self.store);
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // QUERIES

    pub fn get_event(&self, id: &str) -> Option<&Event> {
        self.store.get(id)
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// The canonical event set (recurring masters included, not expanded).
    pub fn events(&self) -> Vec<Event> {
        self.store.snapshot()
    }

    /// All events visible on a calendar day: indexed singles plus recurring
    /// masters expanded over that day, in the calendar's zone.
    pub fn events_for_date(&self, date: NaiveDate) -> ForceCalResult<Vec<Event>> {
        let (day_start, day_end) = self.day_bounds_utc(date)?;

        let mut events: Vec<Event> = self
            .store
            .events_for_day(date)
            .into_iter()
            .filter(|e| !self.is_shadowed_override(e))
            .cloned()
            .collect();

        // Expand a day wider than the target so instances whose UTC form
        // lands outside the local day (all-day occurrences, zone offsets)
        // still surface, then keep the ones actually touching the day.
        let expanded = self.expand_masters(
            day_start - Duration::days(1),
            day_end + Duration::days(1),
        )?;
        events.extend(
            expanded
                .into_iter()
                .filter(|e| touches_day(e, date, self.config.timezone)),
        );

        sort_for_display(&mut events);
        Ok(events)
    }

    /// Events intersecting the range, recurrences expanded.
    pub fn events_in_range(&self, range: &DateRange) -> ForceCalResult<Vec<Event>> {
        let mut events: Vec<Event> = self
            .store
            .events_in_range(range)
            .into_iter()
            .filter(|e| !self.is_shadowed_override(e))
            .cloned()
            .collect();

        let from = range.from.unwrap_or_else(|| Utc::now() - Duration::days(36525));
        let to = range.to.unwrap_or_else(|| Utc::now() + Duration::days(36525));
        let expanded = self.expand_masters(from - Duration::days(1), to + Duration::days(1))?;
        events.extend(expanded.into_iter().filter(|e| e.overlaps(range)));

        sort_for_display(&mut events);
        Ok(events)
    }

    /// Events in the week containing `date`, per `week_starts_on`.
    pub fn events_for_week(&self, date: NaiveDate) -> ForceCalResult<Vec<Event>> {
        let start = week_start(date, self.config.week_starts_on);
        let (from, _) = self.day_bounds_utc(start)?;
        let (_, to) = self.day_bounds_utc(start + Duration::days(6))?;
        self.events_in_range(&DateRange::between(from, to))
    }

    pub fn search(&self, query: &SearchQuery) -> Vec<Event> {
        self.search.query(query, &self.store)
    }

    // NOTIFICATION

    pub fn subscribe(&mut self, listener: impl Fn(&StoreChange) + Send + 'static) -> ListenerId {
        self.store.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) {
        self.store.unsubscribe(id);
    }

    // INTERNALS

    /// UTC bounds of a local calendar day, inclusive on both ends.
    fn day_bounds_utc(&self, date: NaiveDate) -> ForceCalResult<(DateTime<Utc>, DateTime<Utc>)> {
        let tz = self.config.timezone;
        let midnight = |d: NaiveDate| {
            timezone::local_to_utc(d.and_hms_opt(0, 0, 0).expect("midnight is valid"), tz)
        };
        let start = midnight(date)?;
        let next = midnight(date + Duration::days(1))?;
        Ok((start, next - Duration::seconds(1)))
    }

    /// Expand every recurring master over [from, to], overrides applied.
    fn expand_masters(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> ForceCalResult<Vec<Event>> {
        let mut instances = Vec::new();
        for master in self.store.recurring_masters() {
            let overrides = self.store.overrides_for(&master.uid);
            instances.extend(expand_recurring_event(master, from, to, &overrides)?);
        }
        Ok(instances)
    }

    /// An override instance already surfaced through its master's expansion;
    /// returning it from the day index too would duplicate it.
    fn is_shadowed_override(&self, event: &Event) -> bool {
        event.recurrence_id.is_some() && self.store.has_master(&event.uid)
    }
}

/// Reject events the engine can't reason about.
fn validate(event: &Event) -> ForceCalResult<()> {
    if event.uid.trim().is_empty() {
        return Err(ForceCalError::InvalidEvent("Event uid is empty".into()));
    }

    match (&event.start, &event.end) {
        (EventTime::Date(s), EventTime::Date(e)) => {
            if e < s {
                return Err(ForceCalError::InvalidEvent(format!(
                    "Event '{}' ends before it starts",
                    event.uid
                )));
            }
        }
        (EventTime::Date(_), _) | (_, EventTime::Date(_)) => {
            return Err(ForceCalError::InvalidEvent(format!(
                "Event '{}' mixes all-day and timed endpoints",
                event.uid
            )));
        }
        _ => {
            if let (Some(s), Some(e)) = (event.start.to_utc(), event.end.to_utc()) {
                if e < s {
                    return Err(ForceCalError::InvalidEvent(format!(
                        "Event '{}' ends before it starts",
                        event.uid
                    )));
                }
            }
        }
    }

    Ok(())
}

/// Whether an event (instance or single) touches the given local day.
fn touches_day(event: &Event, date: NaiveDate, tz: Tz) -> bool {
    let start = event.start.date_naive(tz);
    let mut end = event.end.date_naive(tz);
    if event.is_all_day() && end > start {
        end -= Duration::days(1);
    }
    if end < start {
        end = start;
    }
    start <= date && date <= end
}

/// All-day events lead within a day; everything else by start instant.
fn sort_for_display(events: &mut [Event]) {
    events.sort_by(|a, b| {
        a.start
            .day_start_utc()
            .cmp(&b.start.day_start_utc())
            .then_with(|| b.is_all_day().cmp(&a.is_all_day()))
            .then_with(|| a.unique_id().cmp(&b.unique_id()))
    });
}

/// First day of the week containing `date`.
fn week_start(date: NaiveDate, week_starts_on: Weekday) -> NaiveDate {
    let offset = (7 + date.weekday().num_days_from_monday()
        - week_starts_on.num_days_from_monday())
        % 7;
    date - Duration::days(offset as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Recurrence;
    use chrono::TimeZone;
    use std::sync::{Arc, Mutex};

    fn utc_calendar() -> Calendar {
        Calendar::new(CalendarConfig {
            timezone: Tz::UTC,
            week_starts_on: Weekday::Mon,
            history_depth: DEFAULT_HISTORY_DEPTH,
        })
    }

    fn timed_event(uid: &str, summary: &str, y: i32, mo: u32, d: u32, h: u32) -> Event {
        let mut event = Event::new(
            summary,
            EventTime::DateTimeUtc(Utc.with_ymd_and_hms(y, mo, d, h, 0, 0).unwrap()),
            EventTime::DateTimeUtc(Utc.with_ymd_and_hms(y, mo, d, h + 1, 0, 0).unwrap()),
        );
        event.uid = uid.into();
        event
    }

    fn weekly_master(uid: &str) -> Event {
        let mut master = timed_event(uid, "Standup", 2024, 1, 1, 10);
        master.recurrence = Some(Recurrence {
            rrule: "FREQ=WEEKLY;BYDAY=MO".into(),
            exdates: vec![],
        });
        master
    }

    #[test]
    fn test_add_get_remove_roundtrip() {
        let mut cal = utc_calendar();
        cal.add_event(timed_event("ev-1", "Review", 2024, 2, 14, 10)).unwrap();

        assert_eq!(cal.len(), 1);
        assert_eq!(cal.get_event("ev-1").unwrap().summary, "Review");

        let removed = cal.remove_event("ev-1").unwrap();
        assert_eq!(removed.uid, "ev-1");
        assert!(cal.is_empty());
    }

    #[test]
    fn test_add_duplicate_uid_is_rejected() {
        let mut cal = utc_calendar();
        cal.add_event(timed_event("ev-1", "Review", 2024, 2, 14, 10)).unwrap();

        let err = cal
            .add_event(timed_event("ev-1", "Other", 2024, 2, 15, 10))
            .unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn test_update_unknown_uid_is_an_error() {
        let mut cal = utc_calendar();
        let err = cal
            .update_event(timed_event("ghost", "Nope", 2024, 2, 14, 10))
            .unwrap_err();
        assert!(matches!(err, ForceCalError::EventNotFound(_)));
    }

    #[test]
    fn test_validation_rejects_inverted_times() {
        let mut cal = utc_calendar();
        let mut event = timed_event("ev-1", "Backwards", 2024, 2, 14, 10);
        event.end = EventTime::DateTimeUtc(Utc.with_ymd_and_hms(2024, 2, 14, 9, 0, 0).unwrap());

        assert!(cal.add_event(event).is_err());
    }

    #[test]
    fn test_validation_rejects_mixed_all_day_and_timed() {
        let mut cal = utc_calendar();
        let mut event = timed_event("ev-1", "Mixed", 2024, 2, 14, 10);
        event.start = EventTime::Date(NaiveDate::from_ymd_opt(2024, 2, 14).unwrap());

        assert!(cal.add_event(event).is_err());
    }

    #[test]
    fn test_events_for_date_expands_recurrences() {
        let mut cal = utc_calendar();
        cal.add_event(weekly_master("standup")).unwrap();
        cal.add_event(timed_event("single", "Dentist", 2024, 1, 8, 14)).unwrap();

        // Monday Jan 8: one standup instance plus the dentist.
        let events = cal
            .events_for_date(NaiveDate::from_ymd_opt(2024, 1, 8).unwrap())
            .unwrap();
        assert_eq!(events.len(), 2);

        let standup = events.iter().find(|e| e.uid == "standup").unwrap();
        assert!(standup.recurrence_id.is_some(), "expanded instance expected");

        // Tuesday Jan 9: nothing.
        let events = cal
            .events_for_date(NaiveDate::from_ymd_opt(2024, 1, 9).unwrap())
            .unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_override_is_not_duplicated_in_day_view() {
        let mut cal = utc_calendar();
        cal.add_event(weekly_master("standup")).unwrap();

        // Jan 8 instance renamed via an override.
        let mut moved = timed_event("standup", "Standup (moved)", 2024, 1, 8, 11);
        moved.recurrence_id = Some(EventTime::DateTimeUtc(
            Utc.with_ymd_and_hms(2024, 1, 8, 10, 0, 0).unwrap(),
        ));
        cal.add_event(moved).unwrap();

        let events = cal
            .events_for_date(NaiveDate::from_ymd_opt(2024, 1, 8).unwrap())
            .unwrap();

        assert_eq!(events.len(), 1, "override must replace, not duplicate: {:#?}", events);
        assert_eq!(events[0].summary, "Standup (moved)");
    }

    #[test]
    fn test_removing_master_cascades_to_overrides() {
        let mut cal = utc_calendar();
        cal.add_event(weekly_master("standup")).unwrap();

        let mut moved = timed_event("standup", "Standup (moved)", 2024, 1, 8, 11);
        moved.recurrence_id = Some(EventTime::DateTimeUtc(
            Utc.with_ymd_and_hms(2024, 1, 8, 10, 0, 0).unwrap(),
        ));
        cal.add_event(moved).unwrap();
        assert_eq!(cal.len(), 2);

        cal.remove_event("standup").unwrap();
        assert!(cal.is_empty(), "orphan overrides should go with the master");
    }

    #[test]
    fn test_undo_redo_roundtrip() {
        let mut cal = utc_calendar();
        cal.add_event(timed_event("ev-1", "First", 2024, 2, 14, 10)).unwrap();
        cal.add_event(timed_event("ev-2", "Second", 2024, 2, 15, 10)).unwrap();

        assert!(cal.undo());
        assert_eq!(cal.len(), 1);
        assert!(cal.get_event("ev-2").is_none());

        assert!(cal.redo());
        assert_eq!(cal.len(), 2);
        assert!(cal.get_event("ev-2").is_some());

        // Search index follows the restored state.
        assert_eq!(cal.search(&SearchQuery::text("second")).len(), 1);
    }

    #[test]
    fn test_undo_with_no_history_returns_false() {
        let mut cal = utc_calendar();
        assert!(!cal.undo());
        assert!(!cal.redo());
    }

    #[test]
    fn test_mutation_after_undo_discards_redo() {
        let mut cal = utc_calendar();
        cal.add_event(timed_event("ev-1", "First", 2024, 2, 14, 10)).unwrap();
        assert!(cal.undo());
        assert!(cal.can_redo());

        cal.add_event(timed_event("ev-2", "Second", 2024, 2, 15, 10)).unwrap();
        assert!(!cal.can_redo());
    }

    #[test]
    fn test_import_is_one_undo_step() {
        let mut cal = utc_calendar();
        let ics = r#"BEGIN:VCALENDAR
VERSION:2.0
PRODID:TEST
BEGIN:VEVENT
UID:imported-1
SUMMARY:First
DTSTART:20240101T100000Z
DTEND:20240101T110000Z
END:VEVENT
BEGIN:VEVENT
UID:imported-2
SUMMARY:Second
DTSTART:20240102T100000Z
DTEND:20240102T110000Z
END:VEVENT
END:VCALENDAR"#;

        let imported = cal.import_ics(ics).unwrap();
        assert_eq!(imported, 2);
        assert_eq!(cal.len(), 2);

        assert!(cal.undo());
        assert!(cal.is_empty(), "the whole batch should undo at once");
    }

    #[test]
    fn test_export_import_roundtrip_preserves_events() {
        let mut cal = utc_calendar();
        cal.add_event(weekly_master("standup")).unwrap();
        cal.add_event(timed_event("single", "Dentist", 2024, 1, 8, 14)).unwrap();

        let ics = cal.export_ics(Some("Test")).unwrap();

        let mut restored = utc_calendar();
        assert_eq!(restored.import_ics(&ics).unwrap(), 2);
        assert_eq!(restored.len(), 2);
        assert!(restored.get_event("standup").unwrap().is_recurring());
    }

    #[test]
    fn test_subscribe_sees_facade_mutations() {
        let seen: Arc<Mutex<Vec<StoreChange>>> = Arc::default();
        let sink = Arc::clone(&seen);

        let mut cal = utc_calendar();
        cal.subscribe(move |change| sink.lock().unwrap().push(change.clone()));

        cal.add_event(timed_event("ev-1", "First", 2024, 2, 14, 10)).unwrap();
        cal.undo();

        let kinds: Vec<_> = seen.lock().unwrap().iter().map(|c| c.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![crate::store::ChangeKind::Added, crate::store::ChangeKind::Replaced]
        );
    }

    #[test]
    fn test_events_for_week_honors_week_start() {
        let mut cal = Calendar::new(CalendarConfig {
            timezone: Tz::UTC,
            week_starts_on: Weekday::Sun,
            history_depth: DEFAULT_HISTORY_DEPTH,
        });
        // Sunday Jan 7 and Saturday Jan 13 bracket a Sun-start week.
        cal.add_event(timed_event("sun", "Sunday", 2024, 1, 7, 10)).unwrap();
        cal.add_event(timed_event("sat", "Saturday", 2024, 1, 13, 10)).unwrap();
        cal.add_event(timed_event("next", "Next sunday", 2024, 1, 14, 10)).unwrap();

        let week = cal
            .events_for_week(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap())
            .unwrap();
        let uids: Vec<&str> = week.iter().map(|e| e.uid.as_str()).collect();
        assert_eq!(uids, vec!["sun", "sat"]);
    }

    #[test]
    fn test_day_view_in_zoned_calendar() {
        let ny = timezone::parse_tz("America/New_York").unwrap();
        let mut cal = Calendar::new(CalendarConfig {
            timezone: ny,
            week_starts_on: Weekday::Mon,
            history_depth: DEFAULT_HISTORY_DEPTH,
        });

        // 03:00 UTC Jan 15 = Jan 14 evening in New York.
        cal.add_event(timed_event("late", "Late call", 2024, 1, 15, 3)).unwrap();

        let jan14 = cal
            .events_for_date(NaiveDate::from_ymd_opt(2024, 1, 14).unwrap())
            .unwrap();
        assert_eq!(jan14.len(), 1);

        let jan15 = cal
            .events_for_date(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap())
            .unwrap();
        assert!(jan15.is_empty());
    }

    #[test]
    fn test_all_day_recurring_event_shows_on_its_day_in_zoned_calendar() {
        let ny = timezone::parse_tz("America/New_York").unwrap();
        let mut cal = Calendar::new(CalendarConfig {
            timezone: ny,
            week_starts_on: Weekday::Mon,
            history_depth: DEFAULT_HISTORY_DEPTH,
        });

        let mut chores = Event::new(
            "Chores",
            EventTime::Date(NaiveDate::from_ymd_opt(2024, 1, 6).unwrap()),
            EventTime::Date(NaiveDate::from_ymd_opt(2024, 1, 7).unwrap()),
        );
        chores.uid = "chores".into();
        chores.recurrence = Some(Recurrence {
            rrule: "FREQ=WEEKLY".into(),
            exdates: vec![],
        });
        cal.add_event(chores).unwrap();

        // Next Saturday, viewed from a zone west of UTC.
        let events = cal
            .events_for_date(NaiveDate::from_ymd_opt(2024, 1, 13).unwrap())
            .unwrap();
        assert_eq!(events.len(), 1, "all-day occurrence must not slip a day");
        assert!(events[0].is_all_day());
    }
}
