//! Severe pollution episodes
//!
//! An episode is any record whose value reaches the chosen percentile of the
//! series. Each one gets a back-trajectory from the domain reference point so the
//! report can say where the air arrived from.

use crate::attribution::trajectory::{integrate_with, TrajectoryConfig};
use crate::core_types::{stats, GeoPoint, PollutantSeries, SeriesRecord};
use crate::grid::WindField;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// A classified record above the severity threshold, with its trajectory summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SevereEpisode {
    #[serde(flatten)]
    pub record: SeriesRecord,

    /// Oldest point the trajectory reached; `None` when no step could be sampled
    pub terminal_lon: Option<f64>,
    pub terminal_lat: Option<f64>,

    /// Planar start-to-terminal distance (degrees × 111 km)
    pub distance_km: Option<f64>,

    /// Waypoints actually integrated (short when the trajectory was truncated)
    pub trajectory_steps: usize,
}

/// Flags extreme periods and traces them back through the wind field
#[derive(Debug, Clone)]
pub struct EpisodeDetector<'a> {
    field: &'a WindField,
    reference: GeoPoint,
    trajectory: TrajectoryConfig,
}

impl<'a> EpisodeDetector<'a> {
    pub fn new(field: &'a WindField, reference: GeoPoint, trajectory: TrajectoryConfig) -> Self {
        Self {
            field,
            reference,
            trajectory,
        }
    }

    /// Severe episodes at `percentile`, in series order
    ///
    /// Returns an empty list when the series has no present values.
    pub fn detect(&self, series: &PollutantSeries, percentile: f64) -> Vec<SevereEpisode> {
        let threshold = match stats::threshold(&series.present_values(), percentile) {
            Ok(threshold) => threshold,
            Err(e) => {
                info!("{e}; no severe episodes");
                return Vec::new();
            }
        };

        let selected: Vec<&SeriesRecord> = series
            .iter()
            .filter(|r| r.present_value().is_some_and(|v| v >= threshold))
            .collect();
        info!(
            "Found {} severe episodes (>= {:.4e}, {}th percentile)",
            selected.len(),
            threshold,
            percentile
        );

        // Trajectories share only the read-only field
        selected
            .par_iter()
            .map(|record| self.trace(record))
            .collect()
    }

    fn trace(&self, record: &SeriesRecord) -> SevereEpisode {
        let trajectory = integrate_with(self.field, self.reference, record.date, &self.trajectory);
        if trajectory.len() < self.trajectory.max_steps() {
            debug!(
                "Episode {} trajectory truncated at {}/{} steps",
                record.date,
                trajectory.len(),
                self.trajectory.max_steps()
            );
        }

        let terminal = trajectory.terminal();
        SevereEpisode {
            record: record.clone(),
            terminal_lon: terminal.map(|w| w.lon),
            terminal_lat: terminal.map(|w| w.lat),
            distance_km: trajectory.distance_km(),
            trajectory_steps: trajectory.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{DateTime, TimeZone, Utc};

    fn field(u: f64, v: f64) -> WindField {
        let times: Vec<DateTime<Utc>> = (0..120)
            .map(|d| Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::days(d))
            .collect();
        let lat = (0..=40).map(|i| 24.0 + f64::from(i) * 0.25).collect();
        let lon = (0..=40).map(|i| 72.0 + f64::from(i) * 0.25).collect();
        WindField::uniform(&times, lat, lon, u, v).unwrap()
    }

    fn series(values: &[f64]) -> PollutantSeries {
        PollutantSeries::from_values(values.iter().enumerate().map(|(i, &v)| {
            (
                Utc.with_ymd_and_hms(2023, 1 + i as u32, 15, 0, 0, 0).unwrap(),
                v,
            )
        }))
    }

    #[test]
    fn test_percentile_100_returns_maximum_with_ties() {
        let field = field(0.0, 0.0);
        let detector = EpisodeDetector::new(&field, GeoPoint::new(77.2, 28.6), TrajectoryConfig::default());
        let episodes = detector.detect(&series(&[1.0, 5.0, 3.0, 5.0]), 100.0);

        assert_eq!(episodes.len(), 2);
        assert!(episodes.iter().all(|e| e.record.value == Some(5.0)));
        assert!(episodes[0].record.date < episodes[1].record.date);
    }

    #[test]
    fn test_empty_series_yields_no_episodes() {
        let field = field(0.0, 0.0);
        let detector = EpisodeDetector::new(&field, GeoPoint::new(77.2, 28.6), TrajectoryConfig::default());
        assert!(detector.detect(&series(&[f64::NAN, f64::NAN]), 90.0).is_empty());
        assert!(detector.detect(&PollutantSeries::default(), 90.0).is_empty());
    }

    #[test]
    fn test_episode_carries_terminal_and_distance() {
        // Steady 2 m/s northerly: 12 steps of 6 h move the parcel north
        let field = field(0.0, -2.0);
        let reference = GeoPoint::new(77.2, 28.6);
        let detector = EpisodeDetector::new(&field, reference, TrajectoryConfig::default());
        let episodes = detector.detect(&series(&[1.0, 2.0, 10.0]), 90.0);

        assert_eq!(episodes.len(), 1);
        let e = &episodes[0];
        assert_eq!(e.trajectory_steps, 12);
        let dlat = 12.0 * 2.0 * 21_600.0 / 111_320.0;
        assert_relative_eq!(e.terminal_lat.unwrap(), 28.6 + dlat, epsilon = 1e-9);
        assert_relative_eq!(e.terminal_lon.unwrap(), 77.2, epsilon = 1e-12);
        assert_relative_eq!(e.distance_km.unwrap(), dlat * 111.0, epsilon = 1e-6);
    }

    #[test]
    fn test_episode_without_wind_has_no_terminal() {
        let field = field(0.0, 0.0);
        // Reference far outside the wind grid
        let detector = EpisodeDetector::new(&field, GeoPoint::new(10.0, 10.0), TrajectoryConfig::default());
        let episodes = detector.detect(&series(&[1.0, 9.0]), 90.0);

        assert_eq!(episodes.len(), 1);
        assert_eq!(episodes[0].terminal_lon, None);
        assert_eq!(episodes[0].distance_km, None);
        assert_eq!(episodes[0].trajectory_steps, 0);
    }

    #[test]
    fn test_episode_serializes_flat() {
        let field = field(0.0, 0.0);
        let detector = EpisodeDetector::new(&field, GeoPoint::new(77.2, 28.6), TrajectoryConfig::default());
        let episodes = detector.detect(&series(&[1.0, 9.0]), 90.0);
        let json = serde_json::to_value(&episodes[0]).unwrap();
        assert_eq!(json["value"], 9.0);
        assert!(json.get("terminal_lat").is_some());
    }
}
