use anyhow::Result;
use forcecal_core::SearchQuery;
use forcecal_core::event::Event;
use forcecal_core::local::LocalCalendar;
use owo_colors::OwoColorize;

use crate::render;

pub fn run(
    calendars: Vec<LocalCalendar>,
    query: &str,
    category: Option<&str>,
    limit: usize,
) -> Result<()> {
    let mut search_query = SearchQuery::text(query).with_limit(limit);
    if let Some(category) = category {
        search_query = search_query.with_category(category);
    }

    let mut all_events: Vec<(String, Event)> = Vec::new();
    for cal in &calendars {
        let engine = cal.load_engine()?;
        for event in engine.search(&search_query) {
            all_events.push((cal.slug.clone(), event));
        }
    }

    if all_events.is_empty() {
        println!("{}", format!("No events matching '{}'", query).dimmed());
        return Ok(());
    }

    for (cal_slug, event) in &all_events {
        let date = render::format_date_label(&event.start);
        println!("{} {}", date.bold(), render::render_event_line(event, cal_slug));
    }

    Ok(())
}
