//! Per-pollutant analysis pipeline
//!
//! The wind field is loaded once and shared by every pollutant. Each pollutant then
//! runs two independent stages:
//!
//! 1. **Series**: load `<code>_timeseries.json`, classify regimes, detect severe
//!    episodes, write `<code>_classified.json` and (if any) `<code>_severe_episodes.json`.
//! 2. **Composite**: load `<code>_composite.json`, find and cluster hotspots, match
//!    them to known sources, compute seasonal means, write `<code>_hotspots.json` and
//!    `<code>_seasonal.json`.
//!
//! A failure in one stage is recorded on that pollutant's [`PollutantReport`] and does
//! not stop the other stage or the other pollutants. Only a missing wind field or an
//! unwritable output directory aborts the run.

pub mod persistence;

use crate::attribution::episode::EpisodeDetector;
use crate::attribution::hotspot::{cluster_count, source_type_counts};
use crate::attribution::regime::{classify_series, RegimeSummary};
use crate::attribution::seasonal::seasonal_means;
use crate::config::AnalysisConfig;
use crate::core_types::GeoPoint;
use crate::error::{AttributionError, Result};
use crate::grid::{SpatialField, WindField, WindFieldStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Outcome of one pollutant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollutantStatus {
    /// Every stage ran
    Completed,
    /// At least one stage was skipped or failed, at least one produced output
    Partial,
    /// No stage produced output
    Failed,
}

/// A stage that did not run, and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedStage {
    pub stage: String,
    pub reason: String,
}

/// What happened to one pollutant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollutantReport {
    pub pollutant: String,
    pub status: PollutantStatus,
    pub regimes: Option<RegimeSummary>,
    pub severe_episodes: usize,
    pub hotspot_cells: usize,
    pub hotspot_clusters: usize,
    pub source_types: Vec<(String, usize)>,
    pub seasons: usize,
    pub skipped: Vec<SkippedStage>,
    pub outputs: Vec<PathBuf>,
}

impl PollutantReport {
    fn new(pollutant: &str) -> Self {
        Self {
            pollutant: pollutant.to_string(),
            status: PollutantStatus::Completed,
            regimes: None,
            severe_episodes: 0,
            hotspot_cells: 0,
            hotspot_clusters: 0,
            source_types: Vec::new(),
            seasons: 0,
            skipped: Vec::new(),
            outputs: Vec::new(),
        }
    }

    fn skip(&mut self, stage: &str, reason: impl Into<String>) {
        let reason = reason.into();
        warn!("{}: skipping {stage}: {reason}", self.pollutant);
        self.skipped.push(SkippedStage {
            stage: stage.to_string(),
            reason,
        });
    }

    fn finish(&mut self) {
        self.status = if self.skipped.is_empty() {
            PollutantStatus::Completed
        } else if self.outputs.is_empty() {
            PollutantStatus::Failed
        } else {
            PollutantStatus::Partial
        };
    }
}

/// Contents of `run_summary.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub generated_at: DateTime<Utc>,
    pub reference: GeoPoint,
    pub wind_timestamps: usize,
    pub wind_start: Option<DateTime<Utc>>,
    pub wind_end: Option<DateTime<Utc>>,
    pub pollutants: Vec<PollutantReport>,
}

impl RunSummary {
    /// Pollutants that did not fail outright
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.pollutants
            .iter()
            .filter(|p| p.status != PollutantStatus::Failed)
            .count()
    }
}

/// Runs the attribution stages for every configured pollutant
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: AnalysisConfig,
}

impl Pipeline {
    /// # Errors
    /// [`AttributionError::InvalidConfig`] when the configuration does not validate.
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    #[must_use]
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Load the wind field and analyze every pollutant
    ///
    /// # Errors
    /// [`AttributionError::DataUnavailable`] when no wind data can be loaded, or an
    /// I/O error when the output directory or run summary cannot be written.
    pub fn run(&self) -> Result<RunSummary> {
        let store = WindFieldStore::new(&self.config.paths.wind_dir, self.config.store_options());
        let field = store.load()?;
        self.run_with_field(&field)
    }

    /// Analyze every pollutant against an already loaded wind field
    ///
    /// # Errors
    /// I/O errors creating the output directory or writing the run summary.
    pub fn run_with_field(&self, field: &WindField) -> Result<RunSummary> {
        let output_dir = &self.config.paths.output_dir;
        fs::create_dir_all(output_dir).map_err(|e| AttributionError::io(output_dir, e))?;

        let pollutants: Vec<PollutantReport> = self
            .config
            .pollutants
            .iter()
            .map(|code| self.analyze_pollutant(field, code))
            .collect();

        let summary = RunSummary {
            generated_at: Utc::now(),
            reference: self.config.reference,
            wind_timestamps: field.times().len(),
            wind_start: field.times().first().copied(),
            wind_end: field.times().last().copied(),
            pollutants,
        };
        persistence::write_json_atomic(&output_dir.join("run_summary.json"), &summary)?;

        info!(
            "Run complete: {}/{} pollutants produced output",
            summary.succeeded(),
            summary.pollutants.len()
        );
        Ok(summary)
    }

    /// Run both stages for one pollutant; failures end up in the report
    #[must_use]
    pub fn analyze_pollutant(&self, field: &WindField, code: &str) -> PollutantReport {
        info!("Analyzing {code}");
        let mut report = PollutantReport::new(code);

        if let Err(e) = self.series_stage(field, code, &mut report) {
            error!("{code}: series analysis failed: {e}");
            report.skip("series", e.to_string());
        }
        let composite_input = persistence::composite_path(&self.config.paths.processed_dir, code);
        match persistence::load_spatial_field(&composite_input) {
            Ok(composite) => {
                if let Err(e) = self.hotspot_stage(code, &composite, &mut report) {
                    report.skip("hotspots", e.to_string());
                }
                if let Err(e) = self.seasonal_stage(code, &composite, &mut report) {
                    report.skip("seasonal", e.to_string());
                }
            }
            Err(e) => {
                report.skip("hotspots", e.to_string());
                report.skip("seasonal", e.to_string());
            }
        }

        report.finish();
        info!("{code}: {:?}", report.status);
        report
    }

    fn series_stage(&self, field: &WindField, code: &str, report: &mut PollutantReport) -> Result<()> {
        let cfg = &self.config;
        let input = persistence::timeseries_path(&cfg.paths.processed_dir, code);
        let mut series = persistence::load_series(&input)?;
        if series.is_empty() {
            warn!("{code}: time series is empty");
        }

        let summary = classify_series(
            &mut series,
            field,
            cfg.reference,
            cfg.series_period,
            cfg.wind_speed_threshold,
        )?;
        let classified = persistence::output_path(&cfg.paths.output_dir, code, "classified");
        persistence::write_json_atomic(&classified, &series)?;
        report.outputs.push(classified);
        report.regimes = Some(summary);

        let detector = EpisodeDetector::new(field, cfg.reference, cfg.trajectory);
        let episodes = detector.detect(&series, cfg.episode_percentile);
        report.severe_episodes = episodes.len();
        if episodes.is_empty() {
            info!("{code}: no severe episodes to write");
        } else {
            let path = persistence::output_path(&cfg.paths.output_dir, code, "severe_episodes");
            persistence::write_json_atomic(&path, &episodes)?;
            report.outputs.push(path);
        }
        Ok(())
    }

    fn hotspot_stage(&self, code: &str, composite: &SpatialField, report: &mut PollutantReport) -> Result<()> {
        let cfg = &self.config;
        let cells = cfg.hotspot_clusterer().run(&composite.temporal_mean());
        report.hotspot_cells = cells.len();
        report.hotspot_clusters = cluster_count(&cells);
        report.source_types = source_type_counts(&cells);

        let path = persistence::output_path(&cfg.paths.output_dir, code, "hotspots");
        persistence::write_json_atomic(&path, &cells)?;
        report.outputs.push(path);
        Ok(())
    }

    fn seasonal_stage(&self, code: &str, composite: &SpatialField, report: &mut PollutantReport) -> Result<()> {
        let cfg = &self.config;
        let seasons = seasonal_means(composite, &cfg.seasons);
        report.seasons = seasons.len();
        if seasons.is_empty() {
            report.skip("seasonal", "composite has no timestamps in any configured season");
            return Ok(());
        }

        let path = persistence::output_path(&cfg.paths.output_dir, code, "seasonal");
        persistence::write_json_atomic(&path, &seasons)?;
        report.outputs.push(path);
        Ok(())
    }
}
