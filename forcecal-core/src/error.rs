//! Error types for the forcecal engine.

use thiserror::Error;

/// Errors that can occur in forcecal operations.
#[derive(Error, Debug)]
pub enum ForceCalError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Calendar not found: {0}")]
    CalendarNotFound(String),

    #[error("Event not found: {0}")]
    EventNotFound(String),

    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    #[error("Timezone error: {0}")]
    Timezone(String),

    #[error("Recurrence error: {0}")]
    Recurrence(String),

    #[error("ICS parse error: {0}")]
    IcsParse(String),

    #[error("ICS generation error: {0}")]
    IcsGenerate(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for forcecal operations.
pub type ForceCalResult<T> = Result<T, ForceCalError>;
