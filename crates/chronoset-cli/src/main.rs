//! `chronoset` CLI: compute recurrence schedules and run interval algebra
//! from the command line.
//!
//! ## Usage
//!
//! ```sh
//! # Next 5 occurrences of every recurrence in a config file
//! chronoset --config schedules.toml next --count 5
//!
//! # One recurrence, from a fixed instant, as JSON
//! chronoset --config schedules.toml next --name standup --now 2026-06-01T07:00:00-04:00 --json
//!
//! # Interval algebra
//! chronoset union "(-inf, 3)" "(0, 5)" "[1, 2]"
//! chronoset union --lowest "(-inf, 3)" "(0, 5)" "[1, 2]"
//! chronoset intersect --kind date "[2026-03-01, 2026-04-01)" "[2026-03-20, 2026-06-20]"
//! chronoset complement "[1, 4)"
//!
//! # Daylight saving window of a year
//! chronoset daylight --timezone Europe/Berlin 2026
//! ```
//!
//! Logging goes to stderr and follows `RUST_LOG` (default `chronoset=warn`).

mod config;

use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use chronoset::{
    AmbiguousTimeBehavior, Denominator, Domain, Interval, IntervalCollection, Occurrences,
    TimezoneContext,
};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use crate::config::ChronosetConfig;

#[derive(Parser)]
#[command(
    name = "chronoset",
    version,
    about = "Recurrence schedules and interval algebra"
)]
struct Cli {
    /// Schedule configuration file
    #[arg(short, long, global = true, default_value = "chronoset.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the next occurrences of the configured recurrences
    Next {
        /// Only the recurrence with this name
        #[arg(long)]
        name: Option<String>,
        /// Occurrences per recurrence; 0 is rejected
        #[arg(short = 'n', long, default_value_t = 1)]
        count: u32,
        /// Reference instant: RFC 3339, or a local reading `YYYY-MM-DDTHH:MM[:SS]`
        #[arg(long)]
        now: Option<String>,
        /// IANA timezone, overriding the config file
        #[arg(short, long)]
        timezone: Option<String>,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Union of intervals in canonical form
    Union {
        /// Split at every boundary instead of merging
        #[arg(long)]
        lowest: bool,
        #[arg(long, value_enum, default_value_t = ValueKind::Int)]
        kind: ValueKind,
        #[arg(required = true)]
        intervals: Vec<String>,
    },
    /// Intersection of intervals
    Intersect {
        #[arg(long, value_enum, default_value_t = ValueKind::Int)]
        kind: ValueKind,
        #[arg(required = true)]
        intervals: Vec<String>,
    },
    /// Complement of the union of intervals
    Complement {
        #[arg(long, value_enum, default_value_t = ValueKind::Int)]
        kind: ValueKind,
        #[arg(required = true)]
        intervals: Vec<String>,
    },
    /// Print the daylight saving window of a year
    Daylight {
        /// IANA timezone, overriding the config file
        #[arg(short, long)]
        timezone: Option<String>,
        year: i32,
    },
}

/// Value domain of interval arguments.
#[derive(Clone, Copy, ValueEnum)]
enum ValueKind {
    Int,
    Date,
    Datetime,
}

#[derive(Clone, Copy)]
enum Algebra {
    Union(Denominator),
    Intersect,
    Complement,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "chronoset=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Next {
            name,
            count,
            now,
            timezone,
            json,
        } => {
            anyhow::ensure!(count > 0, "--count must be at least 1");
            let config = ChronosetConfig::load(&cli.config)?;
            let ctx = config.timezone_context(timezone.as_deref());
            let now = match now {
                Some(text) => parse_now(&ctx, &text)?,
                None => ctx.now(),
            };
            print_next(&config, &ctx, name.as_deref(), count, &now, json)?;
        }
        Commands::Union {
            lowest,
            kind,
            intervals,
        } => {
            let denominator = if lowest {
                Denominator::Lowest
            } else {
                Denominator::Highest
            };
            run_algebra(kind, Algebra::Union(denominator), &intervals)?;
        }
        Commands::Intersect { kind, intervals } => {
            run_algebra(kind, Algebra::Intersect, &intervals)?;
        }
        Commands::Complement { kind, intervals } => {
            run_algebra(kind, Algebra::Complement, &intervals)?;
        }
        Commands::Daylight { timezone, year } => {
            let ctx = match timezone {
                Some(id) => TimezoneContext::try_new(&id)
                    .with_context(|| format!("Unknown timezone: {id}"))?,
                None => ChronosetConfig::load(&cli.config)?.timezone_context(None),
            };
            match ctx.daylight_changes(year) {
                Some(daylight) => println!("{ctx} {year}: {daylight}"),
                None => println!("{ctx} {year}: no daylight saving time"),
            }
        }
    }

    Ok(())
}

fn print_next(
    config: &ChronosetConfig,
    ctx: &TimezoneContext,
    name: Option<&str>,
    count: u32,
    now: &DateTime<FixedOffset>,
    json: bool,
) -> Result<()> {
    let recurrences: Vec<_> = config
        .recurrences()
        .into_iter()
        .filter(|r| name.is_none() || r.name() == name)
        .collect();
    if recurrences.is_empty() {
        match name {
            Some(name) => anyhow::bail!("No recurrence named '{name}' in the config"),
            None => anyhow::bail!("The config defines no recurrences"),
        }
    }

    let mut rows = Vec::new();
    for (index, recurrence) in recurrences.iter().enumerate() {
        let label = recurrence
            .name()
            .map(String::from)
            .unwrap_or_else(|| format!("#{index}"));
        for schedule in recurrence.schedule(ctx, Occurrences::Bounded(count), now) {
            let schedule = schedule.with_context(|| format!("Failed to schedule '{label}'"))?;
            if json {
                rows.push(serde_json::json!({
                    "name": label,
                    "occurs_on": schedule.occurs_on().to_rfc3339(),
                    "due_secs": schedule.due_time().num_seconds(),
                }));
            } else {
                println!("{label}\t{schedule}");
            }
        }
    }
    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    }
    Ok(())
}

/// RFC 3339 instants are taken as given; bare readings are local to `ctx`.
fn parse_now(ctx: &TimezoneContext, text: &str) -> Result<DateTime<FixedOffset>> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(text) {
        return Ok(instant);
    }
    let local = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M"))
        .with_context(|| format!("Invalid --now value: {text}"))?;
    ctx.resolve(&local, AmbiguousTimeBehavior::StandardTime)
        .with_context(|| format!("{local} does not exist in {ctx}"))
}

fn run_algebra(kind: ValueKind, op: Algebra, texts: &[String]) -> Result<()> {
    match kind {
        ValueKind::Int => apply::<i64>(op, texts),
        ValueKind::Date => apply::<NaiveDate>(op, texts),
        ValueKind::Datetime => apply::<NaiveDateTime>(op, texts),
    }
}

fn apply<T>(op: Algebra, texts: &[String]) -> Result<()>
where
    T: Domain + FromStr + Display,
    T::Err: Display,
{
    let intervals = texts
        .iter()
        .map(|text| {
            text.parse::<Interval<T>>()
                .with_context(|| format!("Invalid interval: {text}"))
        })
        .collect::<Result<IntervalCollection<T>>>()?;

    let result = match op {
        Algebra::Union(denominator) => intervals.union(denominator),
        Algebra::Intersect => IntervalCollection::new(vec![intervals.intersection()]),
        Algebra::Complement => intervals.complement(),
    };
    for interval in &result {
        if interval.is_empty() {
            println!("(empty)");
        } else {
            println!("{interval}");
        }
    }
    Ok(())
}
