//! Shared constants for the forcecal engine.

/// Default window (in days, either side of now) for unbounded event queries.
pub const DEFAULT_RANGE_DAYS: i64 = 90;

/// Cap on occurrences materialized per recurrence expansion.
pub const MAX_OCCURRENCES: u16 = 365;

/// Default undo/redo history depth.
pub const DEFAULT_HISTORY_DEPTH: usize = 50;

/// PRODID emitted in generated ICS output.
pub const ICS_PRODID: &str = "FORCECAL";
