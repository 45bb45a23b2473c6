//! Indexed text search over the event store.
//!
//! Keeps an inverted token index (lowercased word -> event ids) over summary,
//! description, location, and categories. The facade feeds it on every
//! mutation; `rebuild` recovers the index wholesale after an undo/redo
//! restore.

use std::collections::{HashMap, HashSet};

use crate::date_range::DateRange;
use crate::event::Event;
use crate::store::EventStore;

/// Tokens shorter than this are noise and never indexed.
const MIN_TOKEN_LEN: usize = 2;

/// A search request. All criteria are optional and AND-ed together.
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    /// Free text; every token must prefix-match some indexed token.
    pub text: Option<String>,
    /// Category filter (case-insensitive).
    pub category: Option<String>,
    /// Only events intersecting this range.
    pub range: Option<DateRange>,
    /// Cap on returned results.
    pub limit: Option<usize>,
}

impl SearchQuery {
    pub fn text(text: &str) -> Self {
        SearchQuery {
            text: Some(text.to_string()),
            ..Default::default()
        }
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }

    pub fn with_range(mut self, range: DateRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[derive(Default)]
pub struct EventSearch {
    tokens: HashMap<String, HashSet<String>>,
}

impl EventSearch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an event's searchable text to the index.
    pub fn index_event(&mut self, event: &Event) {
        let id = event.unique_id();
        for token in tokenize_event(event) {
            self.tokens.entry(token).or_default().insert(id.clone());
        }
    }

    /// Drop an event from the index by unique id.
    pub fn remove_event(&mut self, id: &str) {
        self.tokens.retain(|_, ids| {
            ids.remove(id);
            !ids.is_empty()
        });
    }

    /// Rebuild from scratch to mirror the store (after a restore).
    pub fn rebuild(&mut self, store: &EventStore) {
        self.tokens.clear();
        for event in store.iter() {
            self.index_event(event);
        }
    }

    /// Run a query, hydrating results from the store.
    /// Results are sorted by start time (all-day events first within a day).
    pub fn query(&self, query: &SearchQuery, store: &EventStore) -> Vec<Event> {
        let candidates: Option<HashSet<String>> = query
            .text
            .as_deref()
            .map(|text| self.candidates_for_text(text));

        let mut results: Vec<Event> = match candidates {
            // Token index narrowed the candidate set.
            Some(ids) => {
                let mut ids: Vec<String> = ids.into_iter().collect();
                ids.sort();
                ids.iter()
                    .filter_map(|id| store.get(id))
                    .cloned()
                    .collect()
            }
            // No text criterion: start from the category index or the
            // whole store.
            None => match query.category.as_deref() {
                Some(category) => store
                    .events_for_category(category)
                    .into_iter()
                    .cloned()
                    .collect(),
                None => store.iter().cloned().collect(),
            },
        };

        if let Some(category) = query.category.as_deref() {
            let wanted = category.to_lowercase();
            results.retain(|e| e.categories.iter().any(|c| c.to_lowercase() == wanted));
        }

        if let Some(range) = &query.range {
            results.retain(|e| e.overlaps(range));
        }

        results.sort_by(|a, b| {
            a.start
                .day_start_utc()
                .cmp(&b.start.day_start_utc())
                .then_with(|| b.is_all_day().cmp(&a.is_all_day()))
                .then_with(|| a.unique_id().cmp(&b.unique_id()))
        });

        if let Some(limit) = query.limit {
            results.truncate(limit);
        }

        results
    }

    /// Ids matching every query token (prefix match per token).
    fn candidates_for_text(&self, text: &str) -> HashSet<String> {
        let mut result: Option<HashSet<String>> = None;

        for query_token in tokenize(text) {
            let mut matched: HashSet<String> = HashSet::new();
            for (token, ids) in &self.tokens {
                if token.starts_with(&query_token) {
                    matched.extend(ids.iter().cloned());
                }
            }

            result = Some(match result {
                None => matched,
                Some(prev) => prev.intersection(&matched).cloned().collect(),
            });

            if result.as_ref().is_some_and(|r| r.is_empty()) {
                break;
            }
        }

        result.unwrap_or_default()
    }
}

fn tokenize_event(event: &Event) -> HashSet<String> {
    let mut tokens = tokenize(&event.summary);
    if let Some(desc) = &event.description {
        tokens.extend(tokenize(desc));
    }
    if let Some(loc) = &event.location {
        tokens.extend(tokenize(loc));
    }
    for category in &event.categories {
        tokens.extend(tokenize(category));
    }
    tokens
}

fn tokenize(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() >= MIN_TOKEN_LEN)
        .map(String::from)
        .collect()
}
