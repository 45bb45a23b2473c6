use anyhow::Result;
use forcecal_core::forcecal::ForceCalDir;
use owo_colors::OwoColorize;

pub fn run() -> Result<()> {
    let root = ForceCalDir::load()?;
    let calendars = root.calendars();

    if calendars.is_empty() {
        println!(
            "{}",
            format!(
                "No calendars in {}. Create one with: forcecal init <name>",
                root.display_path().display()
            )
            .dimmed()
        );
        return Ok(());
    }

    let default = root.default_calendar().map(|c| c.slug.clone());

    for calendar in calendars {
        let marker = if Some(&calendar.slug) == default.as_ref() {
            "*"
        } else {
            " "
        };
        let tz = calendar
            .config
            .timezone
            .clone()
            .unwrap_or_else(|| "(host zone)".to_string());
        let event_count = calendar.events().map(|e| e.len()).unwrap_or(0);

        println!(
            "{} {} {} {}",
            marker,
            calendar.slug.bold(),
            tz.dimmed(),
            format!("({} events)", event_count).dimmed()
        );
    }

    Ok(())
}
