//! Terminal rendering helpers for event listings.

use forcecal_core::event::{Event, EventTime};
use owo_colors::OwoColorize;

/// Format a date as a human-readable label (e.g. "Today", "Tomorrow", "Wed Feb 25")
pub fn format_date_label(time: &EventTime) -> String {
    let today = chrono::Local::now().date_naive();

    let date = match time {
        EventTime::Date(d) => *d,
        EventTime::DateTimeUtc(dt) => dt.with_timezone(&chrono::Local).date_naive(),
        EventTime::DateTimeFloating(dt) => dt.date(),
        EventTime::DateTimeZoned { datetime, .. } => datetime.date(),
    };

    let diff = (date - today).num_days();
    match diff {
        0 => "Today".to_string(),
        1 => "Tomorrow".to_string(),
        _ => date.format("%a %b %-d").to_string(),
    }
}

/// Format the time portion of an event (e.g. "15:00" or "all-day")
pub fn format_time(time: &EventTime) -> String {
    match time {
        EventTime::Date(_) => "all-day".to_string(),
        EventTime::DateTimeUtc(dt) => {
            format!("{:>7}", dt.with_timezone(&chrono::Local).format("%H:%M"))
        }
        EventTime::DateTimeFloating(dt) => format!("{:>7}", dt.format("%H:%M")),
        EventTime::DateTimeZoned { datetime, .. } => format!("{:>7}", datetime.format("%H:%M")),
    }
}

/// One listing line: time, summary, calendar tag, category tags.
pub fn render_event_line(event: &Event, calendar_slug: &str) -> String {
    let time = format_time(&event.start);
    let mut line = format!("  {} {}", time, event.summary);

    if !event.categories.is_empty() {
        let tags = event
            .categories
            .iter()
            .map(|c| format!("#{}", c))
            .collect::<Vec<_>>()
            .join(" ");
        line.push_str(&format!(" {}", tags.cyan()));
    }

    let cal_tag = format!("[{}]", calendar_slug);
    line.push_str(&format!(" {}", cal_tag.dimmed()));
    line
}

/// Print events grouped under day headers, in listing order.
pub fn print_grouped_by_day(events: &[(String, Event)]) {
    let mut current_date: Option<String> = None;

    for (cal_slug, event) in events {
        let date_label = format_date_label(&event.start);

        if current_date.as_ref() != Some(&date_label) {
            if current_date.is_some() {
                println!();
            }
            println!("{}", date_label.bold());
            current_date = Some(date_label);
        }

        println!("{}", render_event_line(event, cal_slug));
    }
}
