use anyhow::Result;
use forcecal_core::forcecal::ForceCalDir;
use forcecal_core::local::LocalCalendar;
use owo_colors::OwoColorize;

pub fn run(name: &str, timezone: Option<&str>) -> Result<()> {
    let mut root = ForceCalDir::load()?;

    let calendar = LocalCalendar::create(&root, name, timezone)?;

    println!(
        "{} Created calendar {} at {}",
        "✓".green(),
        calendar.slug.bold(),
        calendar.path().display()
    );

    if root.set_default_calendar_if_unset(&calendar.slug)? {
        println!("  Set as default calendar");
    }

    Ok(())
}
