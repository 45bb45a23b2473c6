use anyhow::{Context, Result};
use chrono::Duration;
use forcecal_core::event::{Event, EventTime, Recurrence, Reminder};
use forcecal_core::local::LocalCalendar;
use owo_colors::OwoColorize;

pub struct NewEventArgs {
    pub calendar: LocalCalendar,
    pub title: String,
    pub start: String,
    pub end: Option<String>,
    pub duration: String,
    pub all_day: bool,
    pub location: Option<String>,
    pub categories: Vec<String>,
    pub rrule: Option<String>,
    pub reminder: Option<String>,
}

pub fn run(args: NewEventArgs) -> Result<()> {
    let tz = args.calendar.tz()?;

    let start_naive = fuzzydate::parse(&args.start)
        .map_err(|e| anyhow::anyhow!("Could not parse start '{}': {:?}", args.start, e))?;

    let (start, end) = if args.all_day {
        let start_date = start_naive.date();
        let end_date = match &args.end {
            Some(end) => fuzzydate::parse(end)
                .map_err(|e| anyhow::anyhow!("Could not parse end '{}': {:?}", end, e))?
                .date(),
            // DTEND is exclusive: a one-day event ends the next morning.
            None => start_date + Duration::days(1),
        };
        (EventTime::Date(start_date), EventTime::Date(end_date))
    } else {
        let end_naive = match &args.end {
            Some(end) => fuzzydate::parse(end)
                .map_err(|e| anyhow::anyhow!("Could not parse end '{}': {:?}", end, e))?,
            None => {
                let length = humantime::parse_duration(&args.duration)
                    .with_context(|| format!("Could not parse duration '{}'", args.duration))?;
                start_naive + Duration::from_std(length)?
            }
        };
        let tzid = tz.name().to_string();
        (
            EventTime::DateTimeZoned {
                datetime: start_naive,
                tzid: tzid.clone(),
            },
            EventTime::DateTimeZoned {
                datetime: end_naive,
                tzid,
            },
        )
    };

    let mut event = Event::new(&args.title, start, end);
    event.location = args.location;
    event.categories = args.categories;

    if let Some(rrule) = args.rrule {
        event.recurrence = Some(Recurrence {
            rrule,
            exdates: vec![],
        });
    }

    if let Some(reminder) = args.reminder {
        let lead = humantime::parse_duration(&reminder)
            .with_context(|| format!("Could not parse reminder '{}'", reminder))?;
        event.reminders = vec![Reminder {
            minutes: (lead.as_secs() / 60) as i64,
        }];
    }

    // Validate through the engine before anything is written, so a bad
    // RRULE or inverted times never land on disk.
    let mut engine = args.calendar.load_engine()?;
    engine.add_event(event.clone())?;
    if event.is_recurring() {
        let today = chrono::Utc::now().date_naive();
        engine.events_for_date(today)?;
    }

    args.calendar.create_event(&event)?;

    println!(
        "{} Created {} ({} {})",
        "✓".green(),
        event.summary.bold(),
        event.start,
        format!("[{}]", args.calendar.slug).dimmed()
    );

    Ok(())
}
