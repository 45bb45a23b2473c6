use anyhow::{Context, Result};
use forcecal_core::ics;
use forcecal_core::local::LocalCalendar;
use owo_colors::OwoColorize;

pub fn run(calendar: LocalCalendar, file: &str) -> Result<()> {
    let content =
        std::fs::read_to_string(file).with_context(|| format!("Could not read '{}'", file))?;

    let events = ics::parse_calendar(&content)?;

    let mut imported = 0;
    for event in &events {
        calendar.create_event(event)?;
        imported += 1;
    }

    println!(
        "{} Imported {} event{} into {}",
        "✓".green(),
        imported,
        if imported == 1 { "" } else { "s" },
        calendar.slug.bold()
    );

    Ok(())
}
