mod commands;
mod render;

use anyhow::Result;
use clap::{Parser, Subcommand};
use forcecal_core::forcecal::ForceCalDir;
use forcecal_core::local::LocalCalendar;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "forcecal")]
#[command(about = "Manage your forcecal calendar directories: events, recurrence, search, ICS")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new calendar directory
    Init {
        name: String,

        /// IANA timezone for day views (e.g. "Europe/Stockholm"); host zone if omitted
        #[arg(short, long)]
        timezone: Option<String>,
    },
    /// List discovered calendars
    Calendars,
    /// Create a new event
    New {
        title: String,

        /// Only operate on this calendar (by slug)
        #[arg(short, long)]
        calendar: Option<String>,

        /// Start date/time (e.g. "2025-03-20 15:00", "tomorrow 9am")
        #[arg(short, long)]
        start: String,

        /// End date/time; defaults to start + duration
        #[arg(short, long)]
        end: Option<String>,

        /// Event length (e.g. "45m", "2h"); used when --end is omitted
        #[arg(short, long, default_value = "1h")]
        duration: String,

        /// All-day event (start/end interpreted as dates)
        #[arg(long)]
        all_day: bool,

        #[arg(short, long)]
        location: Option<String>,

        /// Category tags (repeatable)
        #[arg(long = "category")]
        categories: Vec<String>,

        /// RFC 5545 recurrence rule (e.g. "FREQ=WEEKLY;BYDAY=MO,WE,FR")
        #[arg(long)]
        rrule: Option<String>,

        /// Reminder lead time before the event (e.g. "30m", "1h")
        #[arg(long)]
        reminder: Option<String>,
    },
    /// List events, recurrences expanded
    Events {
        /// Only operate on this calendar (by slug)
        #[arg(short, long)]
        calendar: Option<String>,

        /// Show events from this date (YYYY-MM-DD, or "start" for all past events)
        #[arg(long)]
        from: Option<String>,

        /// Show events until this date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,

        /// Show a single day (YYYY-MM-DD); overrides --from/--to
        #[arg(long)]
        date: Option<String>,
    },
    /// Search events by text, category, and range
    Search {
        query: String,

        /// Only operate on this calendar (by slug)
        #[arg(short, long)]
        calendar: Option<String>,

        #[arg(long)]
        category: Option<String>,

        /// Cap on results per calendar
        #[arg(long, default_value_t = 25)]
        limit: usize,
    },
    /// Import events from an ICS file
    Import {
        /// Path to the .ics file
        file: String,

        /// Only operate on this calendar (by slug)
        #[arg(short, long)]
        calendar: Option<String>,
    },
    /// Export a calendar as one ICS file
    Export {
        /// Only operate on this calendar (by slug)
        #[arg(short, long)]
        calendar: Option<String>,

        /// Output path; stdout if omitted
        #[arg(short, long)]
        out: Option<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { name, timezone } => commands::init::run(&name, timezone.as_deref()),
        Commands::Calendars => commands::calendars::run(),
        Commands::New {
            title,
            calendar,
            start,
            end,
            duration,
            all_day,
            location,
            categories,
            rrule,
            reminder,
        } => {
            let calendar = resolve_calendar(calendar.as_deref())?;
            commands::new::run(commands::new::NewEventArgs {
                calendar,
                title,
                start,
                end,
                duration,
                all_day,
                location,
                categories,
                rrule,
                reminder,
            })
        }
        Commands::Events {
            calendar,
            from,
            to,
            date,
        } => {
            let calendars = resolve_calendars(calendar.as_deref())?;
            commands::events::run(calendars, from.as_deref(), to.as_deref(), date.as_deref())
        }
        Commands::Search {
            query,
            calendar,
            category,
            limit,
        } => {
            let calendars = resolve_calendars(calendar.as_deref())?;
            commands::search::run(calendars, &query, category.as_deref(), limit)
        }
        Commands::Import { file, calendar } => {
            let calendar = resolve_calendar(calendar.as_deref())?;
            commands::import::run(calendar, &file)
        }
        Commands::Export { calendar, out } => {
            let calendar = resolve_calendar(calendar.as_deref())?;
            commands::export::run(calendar, out.as_deref())
        }
    }
}

fn require_calendars(root: &ForceCalDir) -> Result<Vec<LocalCalendar>> {
    let all = root.calendars();

    if all.is_empty() {
        anyhow::bail!(
            "No calendars found in {}.\n\n\
            Create your first calendar with:\n  \
            forcecal init <name>\n\n\
            Example:\n  \
            forcecal init personal",
            root.display_path().display()
        );
    }

    Ok(all)
}

fn resolve_calendars(filter: Option<&str>) -> Result<Vec<LocalCalendar>> {
    let root = ForceCalDir::load()?;
    let all = require_calendars(&root)?;

    match filter {
        Some(slug) => match all.into_iter().find(|c| c.slug == slug) {
            Some(cal) => Ok(vec![cal]),
            None => {
                let available: Vec<_> =
                    root.calendars().iter().map(|c| c.slug.clone()).collect();
                anyhow::bail!(
                    "Calendar '{}' not found. Available: {}",
                    slug,
                    available.join(", ")
                );
            }
        },
        None => Ok(all),
    }
}

/// A single target calendar: the named one, else the configured default,
/// else the only calendar there is.
fn resolve_calendar(filter: Option<&str>) -> Result<LocalCalendar> {
    let root = ForceCalDir::load()?;
    let mut all = require_calendars(&root)?;

    if let Some(slug) = filter {
        return all
            .into_iter()
            .find(|c| c.slug == slug)
            .ok_or_else(|| anyhow::anyhow!("Calendar '{}' not found", slug));
    }

    if let Some(default) = root.default_calendar() {
        return Ok(default);
    }

    if all.len() == 1 {
        return Ok(all.remove(0));
    }

    let available: Vec<_> = all.iter().map(|c| c.slug.clone()).collect();
    anyhow::bail!(
        "Multiple calendars and no default configured. Pick one with --calendar ({})",
        available.join(", ")
    )
}
