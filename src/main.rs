//! CLI entry point for the branch transit rater.
//!
//! Loads branch, stop and route files, runs the accessibility, overlap and
//! gap analyses, and writes CSV/JSON projections for the charting layer.

use anyhow::{Result, bail};
use branch_transit_rater::analyzers::analyzer::{Pipeline, analyze};
use branch_transit_rater::analyzers::zones::ZoneClassifier;
use branch_transit_rater::config::AnalysisConfig;
use branch_transit_rater::geo::GeoPoint;
use branch_transit_rater::output::{print_json, print_pretty};
use branch_transit_rater::parser::Dataset;
use clap::{Args, Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "branch_transit_rater")]
#[command(about = "Rates bank branch locations against public transit coverage", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct InputArgs {
    /// Combined branch CSV, or a directory of <bank>_branches.csv files
    #[arg(short, long, default_value = "data/branches")]
    branches: PathBuf,

    /// Stop list JSON
    #[arg(short, long, default_value = "data/stops.json")]
    stops: PathBuf,

    /// Route details JSON
    #[arg(short, long, default_value = "data/busDetails.json")]
    routes: PathBuf,

    /// Analysis config JSON; defaults apply when omitted
    #[arg(short, long)]
    config: Option<String>,

    /// Owner treated as the home bank for overlap and gap analysis
    #[arg(long)]
    home: Option<String>,

    #[arg(long)]
    accessibility_radius: Option<f64>,

    #[arg(long)]
    overlap_radius: Option<f64>,

    #[arg(long)]
    gap_radius: Option<f64>,

    /// Minimum route count for a stop to be considered high traffic
    #[arg(long)]
    traffic_threshold: Option<u32>,
}

impl InputArgs {
    /// Config file (or defaults) with command-line overrides applied.
    fn resolve_config(&self) -> Result<AnalysisConfig> {
        let mut config = load_config(self.config.as_deref())?;

        if let Some(home) = &self.home {
            config.home_owner = Some(home.clone());
        }
        if let Some(r) = self.accessibility_radius {
            config.accessibility_radius_meters = r;
        }
        if let Some(r) = self.overlap_radius {
            config.overlap_radius_meters = r;
        }
        if let Some(r) = self.gap_radius {
            config.gap_radius_meters = r;
        }
        if let Some(t) = self.traffic_threshold {
            config.high_traffic_route_threshold = t;
        }

        config.validate()?;
        Ok(config)
    }

    fn load_dataset(&self) -> Result<Dataset> {
        Dataset::load(&self.branches, &self.stops, &self.routes)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run every analysis and write CSV/JSON outputs
    Analyze {
        #[command(flatten)]
        input: InputArgs,

        /// Directory to write outputs to
        #[arg(short, long, default_value = "output")]
        output_dir: PathBuf,
    },
    /// Log the top expansion gaps for the home owner
    Gaps {
        #[command(flatten)]
        input: InputArgs,

        /// Number of gaps to show
        #[arg(short = 'n', long, default_value_t = 10)]
        top: usize,
    },
    /// Log per-owner accessibility summaries as JSON
    Summary {
        #[command(flatten)]
        input: InputArgs,
    },
    /// Show the zone a coordinate falls in
    Zone {
        #[arg(short, long)]
        config: Option<String>,

        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/branch_transit_rater.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("branch_transit_rater.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze { input, output_dir } => {
            let config = input.resolve_config()?;
            let dataset = input.load_dataset()?;
            let output = analyze(&dataset, &config, &output_dir)?;
            print_pretty(&output.report);

            info!(
                branches = output.report.total_branches,
                without_nearby_stops = output.report.branches_without_nearby_stops,
                five_plus_stops = output.report.branches_with_five_plus_stops,
                "Run summary"
            );
        }
        Commands::Gaps { input, top } => {
            let config = input.resolve_config()?;
            let home_owner = config.require_home_owner()?.to_string();
            let pipeline = Pipeline::new(&config)?;
            let dataset = input.load_dataset()?;

            let output = pipeline.run(&dataset);
            let Some(competitive) = output.competitive else {
                bail!("no competitive analysis produced for {home_owner}");
            };

            if competitive.gaps.is_empty() {
                warn!(home_owner = %home_owner, "No expansion gaps found");
            }

            for (rank, gap) in competitive.gaps.iter().take(top).enumerate() {
                info!(
                    rank = rank + 1,
                    stop_id = %gap.stop.id,
                    latitude = gap.stop.location.latitude(),
                    longitude = gap.stop.location.longitude(),
                    routes = gap.stop.route_count,
                    competitors = gap.competitors_nearby,
                    hub = gap.stop.is_hub,
                    "Gap"
                );
            }
        }
        Commands::Summary { input } => {
            let config = input.resolve_config()?;
            let pipeline = Pipeline::new(&config)?;
            let dataset = input.load_dataset()?;

            let output = pipeline.run(&dataset);
            print_json(&output.owners)?;
        }
        Commands::Zone { config, lat, lon } => {
            let config = load_config(config.as_deref())?;
            let zones = ZoneClassifier::from_config(&config)?;
            let Some(point) = GeoPoint::new(lat, lon) else {
                bail!("coordinate ({lat}, {lon}) is out of range");
            };

            info!(lat, lon, zone = zones.classify(point), "Zone");
        }
    }

    Ok(())
}

fn load_config(path: Option<&str>) -> Result<AnalysisConfig> {
    match path {
        Some(path) => AnalysisConfig::load(path),
        None => Ok(AnalysisConfig::default()),
    }
}
