mod error_formatter;
mod formatter;
mod workspace;

use anyhow::{Context, Result};
use chrono::{FixedOffset, Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use formatter::Formatter;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use zmanim::{BatchRequest, Engine, Location, NoaaProvider, ZmanimError};

#[derive(Parser)]
#[command(name = "zmanim")]
#[command(about = "Halachic times from formulas.")]
#[command(
    long_about = "Zmanim evaluates formulas such as `sunrise - 72min` or `proportional_hours(3, gra)` for a date and location.\nFormula sets are loaded from .json files; zmanim tagged with calendar events are only computed on days those events occur."
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Calculate zmanim for a date and location
    ///
    /// Loads all .json formula sets from the workspace, classifies the given
    /// calendar event titles and prints every zman that applies.
    Run {
        /// Zman keys to calculate (default: all)
        keys: Vec<String>,
        /// Workspace root directory containing .json formula sets
        #[arg(short = 'd', long = "dir", default_value = ".")]
        workdir: PathBuf,
        #[command(flatten)]
        day: DayArgs,
        #[command(flatten)]
        place: PlaceArgs,
        /// Print the batch as JSON
        #[arg(long, conflicts_with = "raw")]
        json: bool,
        /// Output key and value only (for piping to other tools)
        #[arg(short = 'r', long)]
        raw: bool,
    },
    /// Parse and validate a single formula
    ///
    /// Prints the canonical form of the formula, or the error with the
    /// offending part of the formula highlighted.
    Check {
        /// Formula text, e.g. "sunrise - 72min"
        formula: String,
    },
    /// List all zmanim and event patterns in a workspace
    List {
        /// Workspace root directory containing .json formula sets
        #[arg(default_value = ".")]
        root: PathBuf,
    },
    /// Show which event tags are active for a date and set of titles
    Classify {
        /// Workspace root directory containing .json formula sets
        #[arg(short = 'd', long = "dir", default_value = ".")]
        workdir: PathBuf,
        #[command(flatten)]
        day: DayArgs,
    },
}

#[derive(Args)]
struct DayArgs {
    /// Civil date (default: today)
    #[arg(long, value_name = "YYYY-MM-DD")]
    date: Option<NaiveDate>,
    /// Calendar event title active on the date (repeatable)
    #[arg(short = 'e', long = "event", value_name = "TITLE")]
    events: Vec<String>,
    /// Also derive erev_shabbos and shabbos from the weekday
    #[arg(long)]
    weekdays: bool,
}

impl DayArgs {
    fn date(&self) -> NaiveDate {
        self.date.unwrap_or_else(|| Local::now().date_naive())
    }
}

#[derive(Args)]
struct PlaceArgs {
    /// Latitude in degrees, north positive
    #[arg(long, allow_negative_numbers = true)]
    lat: f64,
    /// Longitude in degrees, east positive
    #[arg(long, allow_negative_numbers = true)]
    lon: f64,
    /// Elevation in metres
    #[arg(long, default_value_t = 0.0)]
    elevation: f64,
    /// UTC offset results are shown in
    #[arg(long, value_name = "+HH:MM", default_value = "+00:00", allow_hyphen_values = true, value_parser = parse_utc_offset)]
    utc_offset: FixedOffset,
}

impl PlaceArgs {
    fn location(&self) -> Location {
        Location::new(self.lat, self.lon, self.utc_offset).with_elevation(self.elevation)
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "zmanim=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Run {
            keys,
            workdir,
            day,
            place,
            json,
            raw,
        } => run_command(workdir, keys, day, place, *json, *raw),
        Commands::Check { formula } => check_command(formula),
        Commands::List { root } => list_command(root),
        Commands::Classify { workdir, day } => classify_command(workdir, day),
    };

    if let Err(e) = result {
        if let Some(zmanim_err) = e.downcast_ref::<ZmanimError>() {
            eprintln!("{}", error_formatter::format_error(zmanim_err, "<formula>"));
        } else {
            eprintln!("Error: {}", e);
        }
        std::process::exit(1);
    }
}

fn new_engine(weekdays: bool) -> Engine {
    Engine::new(NoaaProvider::new()).with_weekday_events(weekdays)
}

fn run_command(
    workdir: &Path,
    keys: &[String],
    day: &DayArgs,
    place: &PlaceArgs,
    json: bool,
    raw: bool,
) -> Result<()> {
    let mut engine = new_engine(day.weekdays);
    workspace::load_workspace(&mut engine, workdir)?;

    for key in keys {
        if engine.get_zman(key).is_none() {
            anyhow::bail!("Zman '{}' not found in {}", key, workdir.display());
        }
    }

    let mut request = BatchRequest::new(day.date(), place.location());
    if !keys.is_empty() {
        request = request.with_keys(keys.iter().cloned());
    }
    for title in &day.events {
        request = request.with_event_title(title.clone());
    }

    let response = engine.calculate(&request);
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&response).context("cannot serialize batch")?
        );
    } else {
        print!("{}", Formatter::default().format_response(&response, raw));
    }

    Ok(())
}

fn check_command(formula: &str) -> Result<()> {
    let engine = new_engine(false);
    let expression = engine.check_formula(formula)?;
    println!("{}", expression);
    Ok(())
}

fn list_command(root: &Path) -> Result<()> {
    let mut engine = new_engine(false);

    println!("Loading workspace from {}...", root.display());
    let file_count = workspace::load_workspace(&mut engine, root)?;

    let mut problems = Vec::new();
    for zman in engine.zmanim() {
        if let Err(error) = engine.check_formula(&zman.formula) {
            problems.push(error_formatter::format_error(&error, &zman.key));
        }
    }

    println!();
    print!(
        "{}",
        Formatter::default().format_workspace_summary(
            file_count,
            engine.zmanim(),
            engine.event_patterns()
        )
    );
    for problem in problems {
        eprintln!("{}", problem);
    }

    Ok(())
}

fn classify_command(workdir: &Path, day: &DayArgs) -> Result<()> {
    let mut engine = new_engine(day.weekdays);
    workspace::load_workspace(&mut engine, workdir)?;

    let active = engine.classify(&day.events, day.date());
    if active.is_empty() {
        println!("{}", Formatter::default().format_active_events(&active));
    } else {
        for tag in active.iter() {
            println!("{}", tag);
        }
    }

    Ok(())
}

/// Parse `+HH:MM`, `-HH:MM`, `+HH` or `Z`
fn parse_utc_offset(text: &str) -> Result<FixedOffset, String> {
    let text = if text.eq_ignore_ascii_case("z") { "+00:00" } else { text };
    let (sign, rest) = match text.as_bytes().first() {
        Some(b'+') => (1, &text[1..]),
        Some(b'-') => (-1, &text[1..]),
        _ => return Err(format!("UTC offset '{}' must start with + or -", text)),
    };
    let (hours, minutes) = rest.split_once(':').unwrap_or((rest, "0"));
    let hours: i32 = hours
        .parse()
        .map_err(|_| format!("invalid hours in UTC offset '{}'", text))?;
    let minutes: i32 = minutes
        .parse()
        .map_err(|_| format!("invalid minutes in UTC offset '{}'", text))?;
    if hours > 14 || minutes >= 60 {
        return Err(format!("UTC offset '{}' is out of range", text));
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .ok_or_else(|| format!("UTC offset '{}' is out of range", text))
}
