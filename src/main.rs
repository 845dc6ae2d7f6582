use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tabled::Tabled;
use track_correlation::api::formatting::{
    divergence_rows, fix_rows, place_rows, route_rows, visit_rows, CsvFormatter, JsonFormatter, OutputFormat,
    TextFormatter,
};
use track_correlation::{
    load_reference, ConfigurationManager, MatchMode, RouteFilter, TrackAnalyzer, TrackLoader,
};

#[derive(Debug, Parser)]
#[command(name = "track-correlate", version, about = "Correlate GPS tracks with reference places")]
struct Cli {
    /// JSON analysis configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    format: OutputFormat,

    /// Radius in meters; grouping radius for positions/visits, comparison radius for route/compare
    #[arg(long, global = true)]
    radius: Option<f64>,

    /// UTC offset for reported times, in minutes
    #[arg(long, global = true, allow_hyphen_values = true)]
    utc_offset: Option<i32>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List track fixes, optionally grouped per place
    Positions {
        track: PathBuf,
        #[arg(long)]
        places: Option<PathBuf>,
    },
    /// Arrival/departure per place with alert verdicts
    Visits { track: PathBuf, places: PathBuf },
    /// Match each route stop with an expected arrival to a track fix
    Route {
        track: PathBuf,
        places: PathBuf,
        /// Take the earliest fix within the radius instead of the nearest one
        #[arg(long)]
        first_within: bool,
    },
    /// Point-by-point divergence of a test track from a base track
    Compare {
        base: PathBuf,
        test: PathBuf,
        /// Only read paths from the KML folder with this name
        #[arg(long)]
        folder: Option<String>,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    let mut builder = env_logger::Builder::new();

    builder
        .filter(None, log::LevelFilter::Warn)
        .filter(Some("track_correlation"), level)
        .filter(Some("track_correlate"), level)
        .parse_default_env()
        .init();
}

fn load_config(cli: &Cli) -> Result<ConfigurationManager> {
    let mut manager = match &cli.config {
        Some(path) => ConfigurationManager::from_file(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => ConfigurationManager::new(),
    };

    if let Some(minutes) = cli.utc_offset {
        manager.set_utc_offset_minutes(minutes).context("Invalid --utc-offset")?;
    }

    if let Some(radius) = cli.radius {
        match cli.command {
            Command::Positions { .. } | Command::Visits { .. } => {
                manager.set_grouping_radius(radius).context("Invalid --radius")?;
            }
            Command::Route { .. } | Command::Compare { .. } => {
                manager.set_compare_radius(radius).context("Invalid --radius")?;
            }
        }
    }

    match &cli.command {
        Command::Route { first_within: true, .. } => {
            manager.set_match_mode(MatchMode::FirstWithin);
        }
        Command::Compare { folder: Some(folder), .. } => {
            manager.set_path_folder(Some(folder.clone()));
        }
        _ => {}
    }

    Ok(manager)
}

fn render<R, J>(format: OutputFormat, rows: &[R], json: &J) -> Result<String>
where
    R: Tabled + Serialize,
    J: Serialize + ?Sized,
{
    Ok(match format {
        OutputFormat::Text => TextFormatter::new().format_table(rows),
        OutputFormat::Json => JsonFormatter::pretty().format_json(json)?,
        OutputFormat::Csv => CsvFormatter::new().format_csv(rows)?,
    })
}

fn load_track(loader: &TrackLoader, path: &Path) -> Result<Vec<track_correlation::Position>> {
    loader
        .load_positions(path)
        .with_context(|| format!("Failed to load track {}", path.display()))
}

fn load_places(path: &Path, filter: RouteFilter) -> Result<Vec<track_correlation::Location>> {
    load_reference(path, filter).with_context(|| format!("Failed to load places {}", path.display()))
}

fn run(cli: Cli) -> Result<String> {
    let manager = load_config(&cli)?;
    let config = manager.get_config().clone();
    let loader = TrackLoader::new(config.utc_offset()?).with_path_folder(config.path_folder.clone());
    let analyzer = TrackAnalyzer::new(config)?;

    match &cli.command {
        Command::Positions { track, places } => {
            let positions = load_track(&loader, track)?;
            match places {
                Some(places) => {
                    let locations = load_places(places, RouteFilter::All)?;
                    let grouped = analyzer.positions_by_place(&positions, &locations);
                    render(cli.format, &place_rows(&grouped), &grouped)
                }
                None => render(cli.format, &fix_rows(&positions), &positions),
            }
        }
        Command::Visits { track, places } => {
            let positions = load_track(&loader, track)?;
            let locations = load_places(places, RouteFilter::All)?;
            let report = analyzer.visits(&positions, &locations);
            render(cli.format, &visit_rows(&report.summaries), &report)
        }
        Command::Route { track, places, .. } => {
            let positions = load_track(&loader, track)?;
            let locations = load_places(places, RouteFilter::RequireArrival)?;
            let matches = analyzer
                .compare_route(&positions, &locations)
                .context("Route comparison failed")?;
            render(cli.format, &route_rows(&matches), &matches)
        }
        Command::Compare { base, test, .. } => {
            let base_path = loader
                .load_path(base)
                .with_context(|| format!("Failed to load base track {}", base.display()))?;
            let test_path = loader
                .load_path(test)
                .with_context(|| format!("Failed to load test track {}", test.display()))?;
            let comparison = analyzer.compare_tracks(&base_path, &test_path);

            let mut output = render(cli.format, &divergence_rows(&comparison), &comparison)?;
            if cli.format == OutputFormat::Text {
                output.push('\n');
                output.push_str(&TextFormatter::new().comparison_footer(&comparison));
            }
            Ok(output)
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let output = run(cli)?;
    println!("{}", output);
    Ok(())
}
