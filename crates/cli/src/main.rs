use airtrace_core::attribution::MatchPolicy;
use airtrace_core::{AnalysisConfig, Pipeline, PollutantStatus};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Attribute pollutant concentrations to local emissions or regional transport
#[derive(Parser, Debug)]
#[command(name = "airtrace")]
#[command(about = "Wind-driven pollution attribution", long_about = None)]
struct Args {
    /// JSON configuration file (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory of per-period wind grids
    #[arg(long)]
    wind_dir: Option<PathBuf>,

    /// Directory holding <code>_timeseries.json and <code>_composite.json
    #[arg(long)]
    processed_dir: Option<PathBuf>,

    /// Directory outputs are written to
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Analyze only this pollutant (repeatable)
    #[arg(short, long)]
    pollutant: Vec<String>,

    /// Local/advected wind speed threshold in m/s
    #[arg(short, long)]
    threshold: Option<f64>,

    /// Severe episode percentile (0-100)
    #[arg(long)]
    episode_percentile: Option<f64>,

    /// Hotspot percentile (0-100)
    #[arg(long)]
    hotspot_percentile: Option<f64>,

    /// DBSCAN neighbourhood radius in km
    #[arg(long)]
    eps: Option<f64>,

    /// Trajectory horizon in hours
    #[arg(long)]
    hours_back: Option<u32>,

    /// Let later source categories overwrite earlier matches instead of picking the nearest
    #[arg(long)]
    last_match: bool,

    /// Debug logging (overridden by `RUST_LOG`)
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn apply(&self, config: &mut AnalysisConfig) {
        if let Some(dir) = &self.wind_dir {
            config.paths.wind_dir.clone_from(dir);
        }
        if let Some(dir) = &self.processed_dir {
            config.paths.processed_dir.clone_from(dir);
        }
        if let Some(dir) = &self.output_dir {
            config.paths.output_dir.clone_from(dir);
        }
        if !self.pollutant.is_empty() {
            config.pollutants.clone_from(&self.pollutant);
        }
        if let Some(t) = self.threshold {
            config.wind_speed_threshold = t;
        }
        if let Some(p) = self.episode_percentile {
            config.episode_percentile = p;
        }
        if let Some(p) = self.hotspot_percentile {
            config.hotspot_percentile = p;
        }
        if let Some(eps) = self.eps {
            config.cluster_eps_km = eps;
        }
        if let Some(h) = self.hours_back {
            config.trajectory.hours_back = h;
        }
        if self.last_match {
            config.source_match_policy = MatchPolicy::LastMatch;
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut config = match &args.config {
        Some(path) => match AnalysisConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                error!("{e}");
                return ExitCode::FAILURE;
            }
        },
        None => AnalysisConfig::default(),
    };
    args.apply(&mut config);

    let pipeline = match Pipeline::new(config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    match pipeline.run() {
        Ok(summary) => {
            for report in &summary.pollutants {
                info!(
                    "{:<5} {:?}: {} severe episodes, {} hotspot cells in {} clusters",
                    report.pollutant,
                    report.status,
                    report.severe_episodes,
                    report.hotspot_cells,
                    report.hotspot_clusters
                );
            }
            if summary
                .pollutants
                .iter()
                .all(|p| p.status == PollutantStatus::Failed)
            {
                error!("No pollutant produced output");
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
