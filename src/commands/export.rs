use anyhow::Result;
use forcecal_core::local::LocalCalendar;
use owo_colors::OwoColorize;

pub fn run(calendar: LocalCalendar, out: Option<&str>) -> Result<()> {
    let engine = calendar.load_engine()?;
    let ics = engine.export_ics(Some(calendar.display_name()))?;

    match out {
        Some(path) => {
            std::fs::write(path, &ics)?;
            println!(
                "{} Exported {} event{} to {}",
                "✓".green(),
                engine.len(),
                if engine.len() == 1 { "" } else { "s" },
                path.bold()
            );
        }
        None => print!("{}", ics),
    }

    Ok(())
}
