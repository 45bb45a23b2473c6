//! iCalendar wire format support.

mod generate;
mod parse;

pub use generate::{generate_calendar, generate_ics};
pub use parse::{parse_calendar, parse_event};
