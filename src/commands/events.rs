use anyhow::Result;
use chrono::NaiveDate;
use forcecal_core::DateRange;
use forcecal_core::event::Event;
use forcecal_core::local::LocalCalendar;
use owo_colors::OwoColorize;

use crate::render;

pub fn run(
    calendars: Vec<LocalCalendar>,
    from: Option<&str>,
    to: Option<&str>,
    date: Option<&str>,
) -> Result<()> {
    let mut all_events: Vec<(String, Event)> = Vec::new();

    for cal in &calendars {
        let engine = cal.load_engine()?;

        let events = match date {
            Some(date) => {
                let day = NaiveDate::parse_from_str(date, "%Y-%m-%d")
                    .map_err(|_| anyhow::anyhow!("Invalid date '{}'. Expected YYYY-MM-DD", date))?;
                engine.events_for_date(day)?
            }
            None => {
                let range = DateRange::from_args(from, to).map_err(|e| anyhow::anyhow!(e))?;
                engine.events_in_range(&range)?
            }
        };

        for event in events {
            all_events.push((cal.slug.clone(), event));
        }
    }

    // Sort across calendars by start time
    all_events.sort_by(|a, b| {
        a.1.start
            .day_start_utc()
            .cmp(&b.1.start.day_start_utc())
            .then_with(|| b.1.is_all_day().cmp(&a.1.is_all_day()))
    });

    if all_events.is_empty() {
        println!("{}", "No events found".dimmed());
        return Ok(());
    }

    render::print_grouped_by_day(&all_events);

    Ok(())
}
