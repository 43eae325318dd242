//! Backward trajectory integration
//!
//! Reconstructs where an air parcel arriving at a point most likely came from by
//! stepping backward in time against the local wind.
//!
//! # Scheme
//!
//! Fixed-step backward Euler on a sphere approximated with a constant
//! 111.32 km/degree scale:
//!
//! ```text
//! Δlon = -(u · Δt) / (111320 · cos(lat))
//! Δlat = -(v · Δt) / 111320
//! ```
//!
//! The wind vector points where air moves *toward*, so moving against it walks the
//! parcel back to where it was one step earlier. Wind is taken from the field node
//! nearest in time and space; there is no interpolation and no domain-edge handling
//! beyond what sampling provides.
//!
//! # Truncation
//!
//! When sampling fails at a step (time or position outside coverage, missing
//! sample) integration stops and the waypoints collected so far are returned.
//! A short path is a normal outcome, not an error.

use crate::core_types::geo::METERS_PER_DEGREE;
use crate::core_types::GeoPoint;
use crate::grid::WindField;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Trajectory horizon and step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrajectoryConfig {
    /// How far back to integrate (hours)
    pub hours_back: u32,
    /// Integration step (hours)
    pub step_hours: u32,
}

impl Default for TrajectoryConfig {
    fn default() -> Self {
        Self {
            hours_back: 72,
            step_hours: 6,
        }
    }
}

impl TrajectoryConfig {
    /// Number of steps a full (untruncated) trajectory takes: `⌈hours_back / step_hours⌉`
    #[must_use]
    pub fn max_steps(&self) -> usize {
        if self.step_hours == 0 {
            return 0;
        }
        self.hours_back.div_ceil(self.step_hours) as usize
    }
}

/// One point of a trajectory
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    /// Time the wind was sampled at
    pub time: DateTime<Utc>,
    /// Parcel position after stepping back from `time`
    pub lon: f64,
    pub lat: f64,
    pub u_wind: f64,
    pub v_wind: f64,
}

impl Waypoint {
    #[must_use]
    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.lon, self.lat)
    }
}

/// Backward path from a start point, newest waypoint first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub start: GeoPoint,
    pub start_time: DateTime<Utc>,
    pub waypoints: Vec<Waypoint>,
}

impl Trajectory {
    /// Oldest waypoint reached
    #[must_use]
    pub fn terminal(&self) -> Option<&Waypoint> {
        self.waypoints.last()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Planar distance (degrees × 111 km) from start to terminal
    #[must_use]
    pub fn distance_km(&self) -> Option<f64> {
        self.terminal()
            .map(|w| w.position().planar_distance_km(&self.start))
    }
}

/// Position one step upwind of `position`
#[must_use]
pub fn step_back(position: GeoPoint, u: f64, v: f64, step_seconds: f64) -> GeoPoint {
    let lat_rad = position.lat.to_radians();
    GeoPoint {
        lon: position.lon - (u * step_seconds) / (METERS_PER_DEGREE * lat_rad.cos()),
        lat: position.lat - (v * step_seconds) / METERS_PER_DEGREE,
    }
}

/// Integrate a backward trajectory
///
/// # Arguments
///
/// * `field` - Merged wind field
/// * `start` - Arrival point
/// * `start_time` - Arrival time
/// * `hours_back` - Horizon (hours)
/// * `step_hours` - Step (hours); zero yields an empty trajectory
///
/// # Returns
///
/// At most `⌈hours_back / step_hours⌉` waypoints, fewer when wind runs out.
pub fn integrate(
    field: &WindField,
    start: GeoPoint,
    start_time: DateTime<Utc>,
    hours_back: u32,
    step_hours: u32,
) -> Trajectory {
    let mut trajectory = Trajectory {
        start,
        start_time,
        waypoints: Vec::new(),
    };
    if step_hours == 0 {
        warn!("Trajectory step of 0 hours requested; returning empty trajectory");
        return trajectory;
    }

    let step_seconds = f64::from(step_hours) * 3600.0;
    let mut position = start;

    for hour in (0..hours_back).step_by(step_hours as usize) {
        let time = start_time - Duration::hours(i64::from(hour));

        let sample = match field.sample(time, position.lon, position.lat) {
            Ok(sample) => sample,
            Err(e) => {
                debug!(
                    "Trajectory from {} truncated after {} steps: {e}",
                    start_time,
                    trajectory.len()
                );
                break;
            }
        };

        position = step_back(position, sample.u, sample.v, step_seconds);
        trajectory.waypoints.push(Waypoint {
            time,
            lon: position.lon,
            lat: position.lat,
            u_wind: sample.u,
            v_wind: sample.v,
        });
    }

    trajectory
}

/// [`integrate`] with horizon and step taken from `config`
pub fn integrate_with(
    field: &WindField,
    start: GeoPoint,
    start_time: DateTime<Utc>,
    config: &TrajectoryConfig,
) -> Trajectory {
    integrate(field, start, start_time, config.hours_back, config.step_hours)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::WindFrame;
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    fn daily(days: u32) -> Vec<DateTime<Utc>> {
        (1..=days)
            .map(|d| Utc.with_ymd_and_hms(2023, 1, d, 0, 0, 0).unwrap())
            .collect()
    }

    fn mesh() -> (Vec<f64>, Vec<f64>) {
        let lat = (0..=40).map(|i| 24.0 + f64::from(i) * 0.25).collect();
        let lon = (0..=40).map(|i| 72.0 + f64::from(i) * 0.25).collect();
        (lat, lon)
    }

    #[test]
    fn test_max_steps_rounds_up() {
        let cfg = TrajectoryConfig::default();
        assert_eq!(cfg.max_steps(), 12);
        assert_eq!(
            TrajectoryConfig {
                hours_back: 13,
                step_hours: 6
            }
            .max_steps(),
            3
        );
    }

    #[test]
    fn test_calm_field_stays_at_start() {
        let (lat, lon) = mesh();
        let field = WindField::uniform(&daily(10), lat, lon, 0.0, 0.0).unwrap();
        let start = GeoPoint::new(77.209, 28.6139);
        let start_time = Utc.with_ymd_and_hms(2023, 1, 8, 0, 0, 0).unwrap();

        let traj = integrate(&field, start, start_time, 72, 6);

        assert_eq!(traj.len(), 12);
        for w in &traj.waypoints {
            assert_eq!(w.position(), start);
        }
        assert_eq!(traj.distance_km(), Some(0.0));
    }

    #[test]
    fn test_waypoint_times_step_backward() {
        let (lat, lon) = mesh();
        let field = WindField::uniform(&daily(10), lat, lon, 0.0, 0.0).unwrap();
        let start_time = Utc.with_ymd_and_hms(2023, 1, 8, 0, 0, 0).unwrap();

        let traj = integrate(&field, GeoPoint::new(77.0, 28.0), start_time, 24, 6);
        let hours: Vec<i64> = traj
            .waypoints
            .iter()
            .map(|w| (start_time - w.time).num_hours())
            .collect();
        assert_eq!(hours, vec![0, 6, 12, 18]);
    }

    #[test]
    fn test_easterly_wind_moves_parcel_east() {
        // Wind from the east (u < 0): the parcel came from the east
        let (lat, lon) = mesh();
        let field = WindField::uniform(&daily(10), lat, lon, -5.0, 0.0).unwrap();
        let start = GeoPoint::new(77.0, 28.0);
        let traj = integrate(&field, start, Utc.with_ymd_and_hms(2023, 1, 8, 0, 0, 0).unwrap(), 6, 6);

        let expected = 77.0 + 5.0 * 21_600.0 / (111_320.0 * 28.0_f64.to_radians().cos());
        assert_relative_eq!(traj.waypoints[0].lon, expected, epsilon = 1e-9);
        assert_relative_eq!(traj.waypoints[0].lat, 28.0);
    }

    #[test]
    fn test_truncates_when_time_coverage_ends() {
        let (lat, lon) = mesh();
        // Wind only for Jan 1..=2; start on Jan 2 and ask for 72 h
        let field = WindField::uniform(&daily(2), lat, lon, 0.0, 0.0).unwrap();
        let start_time = Utc.with_ymd_and_hms(2023, 1, 2, 0, 0, 0).unwrap();

        let traj = integrate(&field, GeoPoint::new(77.0, 28.0), start_time, 72, 6);

        // 0, 6, ... 36 h back stay within half a day of Jan 1
        assert_eq!(traj.len(), 7);
        assert!(traj.len() < TrajectoryConfig::default().max_steps());
    }

    #[test]
    fn test_single_frame_field_truncates_on_time() {
        let (lat, lon) = mesh();
        let field = WindField::uniform(&daily(1), lat, lon, 0.0, 0.0).unwrap();
        let start = GeoPoint::new(77.0, 28.0);

        let far = Utc.with_ymd_and_hms(2024, 2, 5, 0, 0, 0).unwrap();
        assert!(integrate(&field, start, far, 72, 6).is_empty());

        // Only the step sampled exactly at the frame time survives
        let on_frame = daily(1)[0];
        assert_eq!(integrate(&field, start, on_frame, 72, 6).len(), 1);
    }

    #[test]
    fn test_truncates_when_parcel_leaves_grid() {
        let field = WindField::uniform(
            &daily(10),
            vec![28.0, 28.5, 29.0],
            vec![77.0, 77.5, 78.0],
            0.0,
            -10.0,
        )
        .unwrap();
        let traj = integrate(
            &field,
            GeoPoint::new(77.5, 28.5),
            Utc.with_ymd_and_hms(2023, 1, 8, 0, 0, 0).unwrap(),
            72,
            6,
        );
        // First step moves ~1.94° north, beyond 29.25
        assert_eq!(traj.len(), 1);
    }

    #[test]
    fn test_missing_wind_truncates() {
        let times = daily(3);
        let frames = times
            .iter()
            .enumerate()
            .map(|(i, &time)| WindFrame {
                time,
                u: vec![if i == 1 { f64::NAN } else { 0.0 }; 4],
                v: vec![0.0; 4],
            })
            .collect();
        let field = WindField::from_frames(vec![28.0, 29.0], vec![77.0, 78.0], frames).unwrap();

        let traj = integrate(
            &field,
            GeoPoint::new(77.0, 28.0),
            Utc.with_ymd_and_hms(2023, 1, 3, 0, 0, 0).unwrap(),
            48,
            6,
        );
        // 0 h and 6 h map to Jan 3; 12 h is a tie resolved to Jan 2 (missing)
        assert_eq!(traj.len(), 2);
    }

    #[test]
    fn test_zero_step_is_empty() {
        let (lat, lon) = mesh();
        let field = WindField::uniform(&daily(2), lat, lon, 1.0, 1.0).unwrap();
        let traj = integrate(
            &field,
            GeoPoint::new(77.0, 28.0),
            Utc.with_ymd_and_hms(2023, 1, 2, 0, 0, 0).unwrap(),
            72,
            0,
        );
        assert!(traj.is_empty());
        assert_eq!(traj.distance_km(), None);
    }

    #[test]
    fn test_integration_is_deterministic() {
        let (lat, lon) = mesh();
        let field = WindField::uniform(&daily(10), lat, lon, 3.0, -2.0).unwrap();
        let start_time = Utc.with_ymd_and_hms(2023, 1, 8, 0, 0, 0).unwrap();
        let a = integrate_with(&field, GeoPoint::new(77.2, 28.6), start_time, &TrajectoryConfig::default());
        let b = integrate_with(&field, GeoPoint::new(77.2, 28.6), start_time, &TrajectoryConfig::default());
        assert_eq!(a, b);
    }
}
