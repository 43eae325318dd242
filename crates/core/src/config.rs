//! Analysis configuration
//!
//! Every tunable of the engine lives in [`AnalysisConfig`]. It is read from a JSON
//! file where any omitted field takes its default, then validated once before the
//! pipeline starts. Defaults describe the Delhi NCR study area.

use crate::attribution::cluster::DEFAULT_MIN_SAMPLES;
use crate::attribution::hotspot::HotspotClusterer;
use crate::attribution::regime::DEFAULT_SPEED_THRESHOLD;
use crate::attribution::seasonal::{default_seasons, Season};
use crate::attribution::sources::{delhi_known_sources, MatchPolicy, SourceCategory};
use crate::attribution::trajectory::TrajectoryConfig;
use crate::core_types::{GeoPoint, Period};
use crate::error::{AttributionError, Result};
use crate::grid::WindStoreOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Input and output locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory of per-period wind grids
    pub wind_dir: PathBuf,
    /// Directory holding `<code>_timeseries.json` and `<code>_composite.json`
    pub processed_dir: PathBuf,
    /// Directory outputs are written to (created if missing)
    pub output_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            wind_dir: PathBuf::from("data/wind"),
            processed_dir: PathBuf::from("data/processed"),
            output_dir: PathBuf::from("outputs"),
        }
    }
}

/// Full configuration of an attribution run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Point wind is read at for classification and trajectories start from
    pub reference: GeoPoint,

    /// Wind speeds strictly below this are `local` (m/s)
    pub wind_speed_threshold: f64,

    /// Period the pollutant series is aggregated over
    pub series_period: Period,

    pub trajectory: TrajectoryConfig,

    /// Percentile (0-100) a record must reach to be a severe episode
    pub episode_percentile: f64,

    /// Percentile (0-100) a cell mean must reach to be a hotspot
    pub hotspot_percentile: f64,

    /// DBSCAN neighbourhood radius (km)
    pub cluster_eps_km: f64,
    /// DBSCAN core point size, the point itself included
    pub cluster_min_samples: usize,

    /// Sources strictly closer than this are attributed (km)
    pub source_match_radius_km: f64,
    pub source_match_policy: MatchPolicy,
    pub known_sources: Vec<SourceCategory>,

    pub seasons: Vec<Season>,

    /// Pollutant codes; each names a `<code>_timeseries.json` / `<code>_composite.json` pair
    pub pollutants: Vec<String>,

    /// Average the merged wind field over this period before use
    pub wind_resample: Option<Period>,

    pub paths: PathsConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            reference: GeoPoint::new(77.2090, 28.6139),
            wind_speed_threshold: DEFAULT_SPEED_THRESHOLD,
            series_period: Period::Monthly,
            trajectory: TrajectoryConfig::default(),
            episode_percentile: 90.0,
            hotspot_percentile: 90.0,
            cluster_eps_km: 5.0,
            cluster_min_samples: DEFAULT_MIN_SAMPLES,
            source_match_radius_km: 10.0,
            source_match_policy: MatchPolicy::Nearest,
            known_sources: delhi_known_sources(),
            seasons: default_seasons(),
            pollutants: ["NO2", "SO2", "CO", "HCHO"].map(String::from).to_vec(),
            wind_resample: None,
            paths: PathsConfig::default(),
        }
    }
}

fn check_percentile(name: &str, value: f64) -> Result<()> {
    if (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(AttributionError::invalid_parameter(
            name,
            &format!("must be within [0, 100], got {value}"),
        ))
    }
}

fn check_positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(AttributionError::invalid_parameter(
            name,
            &format!("must be finite and positive, got {value}"),
        ))
    }
}

impl AnalysisConfig {
    /// Read a JSON configuration file and validate it
    ///
    /// # Errors
    /// I/O and parse failures, or [`AttributionError::InvalidConfig`] from [`Self::validate`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| AttributionError::io(path, e))?;
        let config: Self =
            serde_json::from_str(&contents).map_err(|e| AttributionError::parse(path, e))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every value is within its valid range
    ///
    /// # Errors
    /// [`AttributionError::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if !self.reference.is_finite() {
            return Err(AttributionError::invalid_parameter(
                "reference",
                "coordinates must be finite",
            ));
        }
        if !(self.wind_speed_threshold.is_finite() && self.wind_speed_threshold >= 0.0) {
            return Err(AttributionError::invalid_parameter(
                "wind_speed_threshold",
                &format!("must be finite and non-negative, got {}", self.wind_speed_threshold),
            ));
        }
        if self.trajectory.step_hours == 0 {
            return Err(AttributionError::invalid_parameter(
                "trajectory.step_hours",
                "must be positive, got 0",
            ));
        }

        check_percentile("episode_percentile", self.episode_percentile)?;
        check_percentile("hotspot_percentile", self.hotspot_percentile)?;
        check_positive("cluster_eps_km", self.cluster_eps_km)?;
        check_positive("source_match_radius_km", self.source_match_radius_km)?;

        if self.cluster_min_samples == 0 {
            return Err(AttributionError::invalid_parameter(
                "cluster_min_samples",
                "must be at least 1",
            ));
        }

        for season in &self.seasons {
            if let Some(m) = season.months.iter().find(|m| !(1..=12).contains(*m)) {
                return Err(AttributionError::invalid_parameter(
                    "seasons",
                    &format!("season {} has invalid month {m}", season.name),
                ));
            }
        }

        for code in &self.pollutants {
            if code.is_empty() || code.contains(['/', '\\']) || code.starts_with('.') {
                return Err(AttributionError::invalid_parameter(
                    "pollutants",
                    &format!("invalid pollutant code {code:?}"),
                ));
            }
        }

        Ok(())
    }

    #[must_use]
    pub fn store_options(&self) -> WindStoreOptions {
        WindStoreOptions {
            resample: self.wind_resample,
        }
    }

    /// Hotspot clusterer carrying this configuration's thresholds and sources
    #[must_use]
    pub fn hotspot_clusterer(&self) -> HotspotClusterer<'_> {
        HotspotClusterer {
            percentile: self.hotspot_percentile,
            eps_km: self.cluster_eps_km,
            min_samples: self.cluster_min_samples,
            radius_km: self.source_match_radius_km,
            policy: self.source_match_policy,
            sources: &self.known_sources,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AnalysisConfig::default();
        config.validate().unwrap();
        assert_eq!(config.trajectory.hours_back, 72);
        assert_eq!(config.pollutants.len(), 4);
        assert_eq!(config.known_sources.len(), 3);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let json = r#"{
            "wind_speed_threshold": 5.0,
            "trajectory": {"hours_back": 12},
            "source_match_policy": "last_match",
            "pollutants": ["NO2"]
        }"#;
        let config: AnalysisConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.wind_speed_threshold, 5.0);
        assert_eq!(config.trajectory.hours_back, 12);
        assert_eq!(config.trajectory.step_hours, 6);
        assert_eq!(config.source_match_policy, MatchPolicy::LastMatch);
        assert_eq!(config.pollutants, vec!["NO2".to_string()]);
        assert_eq!(config.reference, GeoPoint::new(77.2090, 28.6139));
        assert_eq!(config.paths, PathsConfig::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let cases: Vec<(&str, Box<dyn Fn(&mut AnalysisConfig)>)> = vec![
            ("step_hours", Box::new(|c: &mut AnalysisConfig| c.trajectory.step_hours = 0)),
            ("episode_percentile", Box::new(|c: &mut AnalysisConfig| c.episode_percentile = 101.0)),
            ("hotspot_percentile", Box::new(|c: &mut AnalysisConfig| c.hotspot_percentile = f64::NAN)),
            ("cluster_eps_km", Box::new(|c: &mut AnalysisConfig| c.cluster_eps_km = 0.0)),
            ("cluster_min_samples", Box::new(|c: &mut AnalysisConfig| c.cluster_min_samples = 0)),
            ("wind_speed_threshold", Box::new(|c: &mut AnalysisConfig| c.wind_speed_threshold = -1.0)),
            ("seasons", Box::new(|c: &mut AnalysisConfig| c.seasons[0].months.push(13))),
            ("pollutants", Box::new(|c: &mut AnalysisConfig| c.pollutants.push("../NO2".into()))),
        ];

        for (field, mutate) in cases {
            let mut config = AnalysisConfig::default();
            mutate(&mut config);
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains(field), "{field}: {err}");
        }
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = AnalysisConfig::load("/nonexistent/airtrace.json").unwrap_err();
        assert!(matches!(err, AttributionError::Io { .. }));
    }
}
