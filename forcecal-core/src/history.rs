//! Bounded undo/redo history over store snapshots.
//!
//! Snapshots are deep copies of the full event set, taken by the facade
//! before every mutation. Depth is bounded; the oldest state falls off when
//! the bound is hit.

use crate::constants::DEFAULT_HISTORY_DEPTH;
use crate::event::Event;

pub struct StateHistory {
    undo: Vec<Vec<Event>>,
    redo: Vec<Vec<Event>>,
    max_depth: usize,
}

impl Default for StateHistory {
    fn default() -> Self {
        StateHistory::new(DEFAULT_HISTORY_DEPTH)
    }
}

impl StateHistory {
    pub fn new(max_depth: usize) -> Self {
        StateHistory {
            undo: Vec::new(),
            redo: Vec::new(),
            max_depth: max_depth.max(1),
        }
    }

    /// Record the pre-mutation state. Any redo branch is discarded: once a
    /// new change lands, the undone states can't be reapplied coherently.
    pub fn record(&mut self, snapshot: Vec<Event>) {
        self.redo.clear();
        self.undo.push(snapshot);
        if self.undo.len() > self.max_depth {
            self.undo.remove(0);
        }
    }

    /// Step back: current state moves to the redo stack, the previous
    /// snapshot is returned for the caller to restore.
    pub fn undo(&mut self, current: Vec<Event>) -> Option<Vec<Event>> {
        let previous = self.undo.pop()?;
        self.redo.push(current);
        Some(previous)
    }

    /// Step forward again after an undo.
    pub fn redo(&mut self, current: Vec<Event>) -> Option<Vec<Event>> {
        let next = self.redo.pop()?;
        self.undo.push(current);
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventTime;
    use chrono::{TimeZone, Utc};

    fn state(uids: &[&str]) -> Vec<Event> {
        uids.iter()
            .map(|uid| {
                let mut e = Event::new(
                    uid,
                    EventTime::DateTimeUtc(Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap()),
                    EventTime::DateTimeUtc(Utc.with_ymd_and_hms(2024, 1, 1, 11, 0, 0).unwrap()),
                );
                e.uid = uid.to_string();
                e
            })
            .collect()
    }

    fn uids(events: &[Event]) -> Vec<String> {
        events.iter().map(|e| e.uid.clone()).collect()
    }

    #[test]
    fn test_undo_redo_walks_states_both_ways() {
        let mut history = StateHistory::default();

        history.record(state(&[]));
        history.record(state(&["a"]));
        // Live state is now ["a", "b"].

        let previous = history.undo(state(&["a", "b"])).unwrap();
        assert_eq!(uids(&previous), vec!["a"]);

        let next = history.redo(previous).unwrap();
        assert_eq!(uids(&next), vec!["a", "b"]);
    }

    #[test]
    fn test_empty_stacks_return_none() {
        let mut history = StateHistory::default();
        assert!(!history.can_undo());
        assert!(!history.can_redo());
        assert!(history.undo(state(&["x"])).is_none());
        assert!(history.redo(state(&["x"])).is_none());
    }

    #[test]
    fn test_new_record_discards_redo_branch() {
        let mut history = StateHistory::default();
        history.record(state(&[]));

        let _ = history.undo(state(&["a"]));
        assert!(history.can_redo());

        // A fresh mutation invalidates the undone future.
        history.record(state(&["b"]));
        assert!(!history.can_redo());
    }

    #[test]
    fn test_depth_bound_evicts_oldest() {
        let mut history = StateHistory::new(3);
        for i in 0..5 {
            let label = format!("v{}", i);
            history.record(state(&[label.as_str()]));
        }

        // Only the 3 most recent states survive: v4, v3, v2.
        let mut current = state(&["live"]);
        let mut seen = Vec::new();
        while let Some(prev) = history.undo(current) {
            seen.push(uids(&prev)[0].clone());
            current = prev;
        }
        assert_eq!(seen, vec!["v4", "v3", "v2"]);
    }

    #[test]
    fn test_clear_drops_both_stacks() {
        let mut history = StateHistory::default();
        history.record(state(&["a"]));
        let _ = history.undo(state(&["b"]));

        history.clear();
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }
}
