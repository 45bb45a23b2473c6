//! Canonical event set with spatial indexing and change notification.
//!
//! The store owns every event in a calendar, keyed by [`Event::unique_id`].
//! Non-recurring events are indexed into day, month, and category buckets so
//! day/month views are a lookup rather than a scan. Recurring masters can't
//! be day-indexed (their occurrences are unbounded), so they live in a
//! separate id set and get expanded at query time by the recurrence module.

use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::{Datelike, Duration, NaiveDate};

use crate::date_range::DateRange;
use crate::event::Event;
use crate::timezone::Tz;

/// Longest event span the day index will materialize buckets for.
const MAX_INDEXED_SPAN_DAYS: i64 = 366;

/// What changed in the store.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeKind {
    Added,
    Updated,
    Removed,
    /// Whole-store replacement (undo/redo restore).
    Replaced,
}

/// Notification payload delivered to listeners after each mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreChange {
    pub kind: ChangeKind,
    /// Unique id of the affected event; empty for whole-store replacement.
    pub id: String,
}

/// Handle for removing a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerId(usize);

type Listener = Box<dyn Fn(&StoreChange) + Send>;

pub struct EventStore {
    tz: Tz,
    events: HashMap<String, Event>,
    by_day: HashMap<NaiveDate, HashSet<String>>,
    by_month: HashMap<(i32, u32), HashSet<String>>,
    by_category: HashMap<String, HashSet<String>>,
    recurring: HashSet<String>,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener_id: usize,
}

impl EventStore {
    /// Day and month buckets are computed in `tz` (the calendar's zone).
    pub fn new(tz: Tz) -> Self {
        EventStore {
            tz,
            events: HashMap::new(),
            by_day: HashMap::new(),
            by_month: HashMap::new(),
            by_category: HashMap::new(),
            recurring: HashSet::new(),
            listeners: Vec::new(),
            next_listener_id: 0,
        }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Event> {
        self.events.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.values()
    }

    /// Insert or replace an event, reindexing it. Returns true when an
    /// existing event with the same unique id was replaced.
    pub fn insert(&mut self, event: Event) -> bool {
        let id = event.unique_id();

        let replaced = self.events.remove(&id).is_some();
        if replaced {
            self.deindex(&id);
        }

        self.index(&id, &event);
        self.events.insert(id.clone(), event);

        tracing::debug!(id = %id, replaced, "store insert");
        let kind = if replaced { ChangeKind::Updated } else { ChangeKind::Added };
        self.notify(&StoreChange { kind, id });
        replaced
    }

    /// Remove an event by unique id, cleaning every index bucket it was in.
    pub fn remove(&mut self, id: &str) -> Option<Event> {
        let event = self.events.remove(id)?;
        self.deindex(id);

        tracing::debug!(id = %id, "store remove");
        self.notify(&StoreChange {
            kind: ChangeKind::Removed,
            id: id.to_string(),
        });
        Some(event)
    }

    pub fn clear(&mut self) {
        self.events.clear();
        self.by_day.clear();
        self.by_month.clear();
        self.by_category.clear();
        self.recurring.clear();
        self.notify(&StoreChange {
            kind: ChangeKind::Replaced,
            id: String::new(),
        });
    }

    /// Non-recurring events touching the given day, via the day index.
    pub fn events_for_day(&self, date: NaiveDate) -> Vec<&Event> {
        self.hydrate(self.by_day.get(&date))
    }

    /// Non-recurring events touching the given month, via the month index.
    pub fn events_for_month(&self, year: i32, month: u32) -> Vec<&Event> {
        self.hydrate(self.by_month.get(&(year, month)))
    }

    /// Events carrying the given category (case-insensitive).
    pub fn events_for_category(&self, category: &str) -> Vec<&Event> {
        self.hydrate(self.by_category.get(&category.to_lowercase()))
    }

    /// Non-recurring events intersecting the range. Unbounded ranges force a
    /// scan; bounded queries should prefer the day/month lookups.
    pub fn events_in_range(&self, range: &DateRange) -> Vec<&Event> {
        let mut found: Vec<&Event> = self
            .events
            .values()
            .filter(|e| !e.is_recurring())
            .filter(|e| e.overlaps(range))
            .collect();
        found.sort_by_key(|e| e.unique_id());
        found
    }

    /// Recurring master events, for the recurrence engine to expand.
    pub fn recurring_masters(&self) -> Vec<&Event> {
        let mut masters: Vec<&Event> = self
            .recurring
            .iter()
            .filter_map(|id| self.events.get(id))
            .collect();
        masters.sort_by_key(|e| e.unique_id());
        masters
    }

    /// Whether a recurring master with this uid exists.
    pub fn has_master(&self, uid: &str) -> bool {
        self.recurring.contains(uid)
    }

    /// Override instances recorded for a master, keyed by their
    /// RECURRENCE-ID in ICS form.
    pub fn overrides_for(&self, uid: &str) -> HashMap<String, Event> {
        self.events
            .values()
            .filter(|e| e.uid == uid && e.recurrence_id.is_some())
            .map(|e| {
                let key = e.recurrence_id.as_ref().expect("filtered above").to_ics_string();
                (key, e.clone())
            })
            .collect()
    }

    /// Deep copy of the full event set, in deterministic order.
    pub fn snapshot(&self) -> Vec<Event> {
        let ids: BTreeSet<&String> = self.events.keys().collect();
        ids.into_iter()
            .map(|id| self.events[id].clone())
            .collect()
    }

    /// Replace the full event set (undo/redo restore). Rebuilds all indices
    /// and emits a single Replaced notification.
    pub fn restore(&mut self, events: Vec<Event>) {
        self.events.clear();
        self.by_day.clear();
        self.by_month.clear();
        self.by_category.clear();
        self.recurring.clear();

        for event in events {
            let id = event.unique_id();
            self.index(&id, &event);
            self.events.insert(id, event);
        }

        tracing::debug!(count = self.events.len(), "store restore");
        self.notify(&StoreChange {
            kind: ChangeKind::Replaced,
            id: String::new(),
        });
    }

    /// Re-bucket the day/month indices under a new zone.
    pub fn set_timezone(&mut self, tz: Tz) {
        if tz == self.tz {
            return;
        }
        self.tz = tz;
        let events = self.snapshot();
        self.restore(events);
    }

    pub fn subscribe(&mut self, listener: impl Fn(&StoreChange) + Send + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener_id);
        self.next_listener_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) {
        self.listeners.retain(|(lid, _)| *lid != id);
    }

    fn notify(&self, change: &StoreChange) {
        for (_, listener) in &self.listeners {
            listener(change);
        }
    }

    fn hydrate(&self, ids: Option<&HashSet<String>>) -> Vec<&Event> {
        let Some(ids) = ids else {
            return Vec::new();
        };
        let mut ids: Vec<&String> = ids.iter().collect();
        ids.sort();
        ids.iter().filter_map(|id| self.events.get(*id)).collect()
    }

    fn index(&mut self, id: &str, event: &Event) {
        for category in &event.categories {
            self.by_category
                .entry(category.to_lowercase())
                .or_default()
                .insert(id.to_string());
        }

        if event.is_recurring() {
            self.recurring.insert(id.to_string());
            return;
        }

        for day in days_spanned(event, self.tz) {
            self.by_day.entry(day).or_default().insert(id.to_string());
            self.by_month
                .entry((day.year(), day.month()))
                .or_default()
                .insert(id.to_string());
        }
    }

    fn deindex(&mut self, id: &str) {
        self.recurring.remove(id);
        retain_buckets(&mut self.by_day, id);
        retain_buckets(&mut self.by_month, id);
        retain_buckets(&mut self.by_category, id);
    }
}

fn retain_buckets<K: std::hash::Hash + Eq>(index: &mut HashMap<K, HashSet<String>>, id: &str) {
    index.retain(|_, ids| {
        ids.remove(id);
        !ids.is_empty()
    });
}

/// Every calendar day the event touches, viewed from `tz`.
/// All-day ends are exclusive per iCalendar; timed ends are inclusive
/// (an event running 22:00-02:00 touches both days).
fn days_spanned(event: &Event, tz: Tz) -> Vec<NaiveDate> {
    let start = event.start.date_naive(tz);
    let mut end = event.end.date_naive(tz);

    if event.is_all_day() && end > start {
        end -= Duration::days(1);
    }
    if end < start {
        end = start;
    }
    // Bounded so a malformed span can't flood the index.
    if (end - start).num_days() > MAX_INDEXED_SPAN_DAYS {
        end = start + Duration::days(MAX_INDEXED_SPAN_DAYS);
    }

    let mut days = Vec::new();
    let mut day = start;
    while day <= end {
        days.push(day);
        day += Duration::days(1);
    }
    days
}
