//! Race results CLI
//!
//! Collects club members' results for a date window into an HTML report.

use std::path::{Path, PathBuf};

use chrono::{Datelike, Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use raceresults::{
    error::{AppError, Result},
    models::{Config, DateRange, Roster},
    pipeline::{self, CombinedSource, RunSettings},
    services::Report,
    sources::SourceKind,
    utils::http,
};

/// Race results collector
#[derive(Parser, Debug)]
#[command(
    name = "raceresults",
    version,
    about = "Collect club members' road race results into one HTML report"
)]
struct Cli {
    /// Roster CSV with first and last name columns
    #[arg(long = "ml", global = true)]
    membership_list: Option<PathBuf>,

    /// Output file
    #[arg(short, long, global = true, default_value = "results.html")]
    output: PathBuf,

    /// Year (default: this year)
    #[arg(short, long, global = true)]
    year: Option<i32>,

    /// Month (default: this month)
    #[arg(short, long, global = true, value_parser = clap::value_parser!(u32).range(1..=12))]
    month: Option<u32>,

    /// Day range within the month
    #[arg(short, long, global = true, num_args = 2, value_names = ["START", "STOP"])]
    day: Option<Vec<u32>>,

    /// Verbosity level
    #[arg(short, long, global = true, value_enum, default_value_t = Verbosity::Info)]
    verbose: Verbosity,

    /// Configuration file
    #[arg(long, global = true, default_value = "raceresults.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Verbosity {
    Error,
    Warn,
    Info,
    Debug,
}

impl Verbosity {
    fn as_filter(self) -> &'static str {
        match self {
            Verbosity::Error => "error",
            Verbosity::Warn => "warn",
            Verbosity::Info => "info",
            Verbosity::Debug => "debug",
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compuscore results
    Compuscore,

    /// BestRace results
    Bestrace,

    /// CoolRunning results
    Coolrunning {
        /// States to search (default from config)
        #[arg(short, long, num_args = 1..)]
        states: Vec<String>,
    },

    /// Active.com results
    Active {
        /// States to search (default from config)
        #[arg(short, long, num_args = 1..)]
        states: Vec<String>,
    },

    /// L&M Sports results
    Lmsports,

    /// New York Road Runners team results
    Nyrr {
        /// Team code (default from config)
        #[arg(short, long)]
        team: Option<String>,
    },

    /// Compuscore, BestRace, Active and NYRR merged into one report
    All {
        /// States searched on Active (default from config)
        #[arg(short, long, num_args = 1..)]
        states: Vec<String>,

        /// NYRR team code (default from config)
        #[arg(short, long)]
        team: Option<String>,
    },
}

/// Initialize logging based on verbosity level.
fn init_logging(verbosity: Verbosity) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(verbosity.as_filter()))
        .format_timestamp_secs()
        .init();
}

/// Date window from the year/month/day arguments.
///
/// Without `--day` the window runs from the first of the month through today,
/// or through the month's last day when the month is already over.
fn date_range(year: i32, month: u32, day: Option<&[u32]>, today: NaiveDate) -> Result<DateRange> {
    let on = |d: u32| {
        NaiveDate::from_ymd_opt(year, month, d)
            .ok_or_else(|| AppError::config(format!("no such date {year}-{month:02}-{d:02}")))
    };

    match day {
        Some([start, stop]) => DateRange::new(on(*start)?, on(*stop)?),
        Some(_) => Err(AppError::config("--day takes a start and a stop day")),
        None => {
            let first = on(1)?;
            let last = last_day_of_month(year, month)?;
            DateRange::new(first, last.min(today.max(first)))
        }
    }
}

fn last_day_of_month(year: i32, month: u32) -> Result<NaiveDate> {
    let (y, m) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(y, m, 1)
        .and_then(|d| d.pred_opt())
        .ok_or_else(|| AppError::config(format!("no such month {year}-{month:02}")))
}

fn load_roster(path: Option<&PathBuf>) -> Result<Roster> {
    let path = path.ok_or_else(|| AppError::config("--ml <roster> is required for this source"))?;
    let roster = Roster::load(path)?;
    if roster.is_empty() {
        log::warn!("Roster {} has no names", path.display());
    }
    log::info!("Loaded {} names from {}", roster.len(), path.display());
    Ok(roster)
}

fn upper(states: Vec<String>) -> Vec<String> {
    states.into_iter().map(|s| s.to_uppercase()).collect()
}

/// Main entry point for the CLI application.
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load_or_default(&cli.config);
    config.validate()?;

    let today = Local::now().date_naive();
    let range = date_range(
        cli.year.unwrap_or(today.year()),
        cli.month.unwrap_or(today.month()),
        cli.day.as_deref(),
        today,
    )?;
    log::info!("Searching {} through {}", range.start(), range.stop());

    let (kind, states) = match cli.command {
        Command::Compuscore => (SourceKind::Compuscore, Vec::new()),
        Command::Bestrace => (SourceKind::BestRace, Vec::new()),
        Command::Coolrunning { states } => (SourceKind::CoolRunning, states),
        Command::Active { states } => (SourceKind::Active, upper(states)),
        Command::Lmsports => (SourceKind::LmSports, Vec::new()),
        Command::Nyrr { team } => {
            if let Some(team) = team {
                config.sources.nyrr_team = team;
            }
            (SourceKind::NewYorkRR, Vec::new())
        }
        Command::All { states, team } => {
            if let Some(team) = team {
                config.sources.nyrr_team = team;
            }
            return run_all(cli.membership_list.as_ref(), &cli.output, range, upper(states), &config);
        }
    };

    let roster = if kind.uses_roster() {
        load_roster(cli.membership_list.as_ref())?
    } else {
        Roster::empty()
    };
    let regions = if states.is_empty() {
        kind.default_regions(&config, false)
    } else {
        states
    };

    let client = http::create_client(&config.http)?;
    let source = kind.build(client, &config);
    let report = Report::new(&cli.output, &config.report.stylesheet);
    let outcome = pipeline::run_source(source.as_ref(), &roster, &RunSettings::new(range, regions), &report)?;

    log::info!("Wrote {} race cards to {}", outcome.cards, cli.output.display());
    Ok(())
}

fn run_all(
    membership_list: Option<&PathBuf>,
    output: &Path,
    range: DateRange,
    states: Vec<String>,
    config: &Config,
) -> Result<()> {
    let roster = load_roster(membership_list)?;
    let client = http::create_client(&config.http)?;

    let sources: Vec<CombinedSource> = SourceKind::COMBINED
        .iter()
        .map(|kind| {
            let regions = match kind {
                SourceKind::Active if !states.is_empty() => states.clone(),
                _ => kind.default_regions(config, true),
            };
            CombinedSource::new(kind.build(client.clone(), config), regions)
        })
        .collect();

    let report = Report::new(output, &config.report.stylesheet);
    let outcome = pipeline::run_combined(&sources, &roster, range, &report)?;
    log::info!("Wrote {} race cards to {}", outcome.cards, output.display());
    Ok(())
}
