//! Time-indexed gridded wind field
//!
//! Holds (u, v) wind components on a fixed latitude/longitude mesh for a strictly
//! increasing sequence of timestamps, plus per-cell wind speed and wind-from
//! direction derived once when the field is built.
//!
//! # Layout
//!
//! All per-cell arrays are flattened `[time][lat][lon]`:
//!
//! ```text
//! index = it * (n_lat * n_lon) + ilat * n_lon + ilon
//! ```
//!
//! Missing samples are stored as NaN.
//!
//! # Sampling
//!
//! [`WindField::sample`] picks the nearest timestamp and the nearest mesh node. A
//! request is outside coverage (and fails with
//! [`AttributionError::SamplingGap`]) when it lies more than half a spacing beyond
//! the first/last coordinate of an axis. The time spacing is the median interval
//! between timestamps. A single-timestamp field covers exactly that instant. A
//! spatial axis with a single coordinate accepts any position.

use crate::core_types::{stats, wind_from_direction, wind_speed, GeoPoint, Period};
use crate::error::{AttributionError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Wind components for every cell of the mesh at one timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct WindFrame {
    pub time: DateTime<Utc>,
    /// Eastward component, `[lat][lon]` flattened
    pub u: Vec<f64>,
    /// Northward component, `[lat][lon]` flattened
    pub v: Vec<f64>,
}

/// Wind sampled at one point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindSample {
    /// Timestamp of the field slice the sample came from
    pub time: DateTime<Utc>,
    pub u: f64,
    pub v: f64,
}

/// Merged, immutable wind field
#[derive(Debug, Clone)]
pub struct WindField {
    times: Vec<DateTime<Utc>>,
    latitude: Vec<f64>,
    longitude: Vec<f64>,

    u: Vec<f64>,
    v: Vec<f64>,

    /// Cached √(u² + v²)
    speed: Vec<f64>,
    /// Cached wind-from direction, degrees in [0, 360)
    direction: Vec<f64>,

    /// Half the median time spacing; zero for single-timestamp fields
    time_tolerance: Duration,
}

impl WindField {
    /// Merge frames into a field
    ///
    /// Frames are stably sorted by time; when several frames share a timestamp the
    /// first one supplied wins. Every frame must cover the full mesh.
    ///
    /// # Errors
    /// - [`AttributionError::DataUnavailable`] when `frames` or the mesh is empty
    /// - [`AttributionError::InvalidConfig`] when a frame does not match the mesh size
    pub fn from_frames(
        latitude: Vec<f64>,
        longitude: Vec<f64>,
        mut frames: Vec<WindFrame>,
    ) -> Result<Self> {
        if frames.is_empty() {
            return Err(AttributionError::DataUnavailable(
                "wind field has no timestamps".into(),
            ));
        }
        if latitude.is_empty() || longitude.is_empty() {
            return Err(AttributionError::DataUnavailable(
                "wind field has an empty latitude/longitude mesh".into(),
            ));
        }

        let cells = latitude.len() * longitude.len();
        if let Some(bad) = frames
            .iter()
            .find(|f| f.u.len() != cells || f.v.len() != cells)
        {
            return Err(AttributionError::InvalidConfig(format!(
                "wind frame at {} has {}/{} values, mesh needs {cells}",
                bad.time,
                bad.u.len(),
                bad.v.len()
            )));
        }

        frames.sort_by_key(|f| f.time);
        frames.dedup_by_key(|f| f.time);

        let times: Vec<DateTime<Utc>> = frames.iter().map(|f| f.time).collect();
        let mut u = Vec::with_capacity(frames.len() * cells);
        let mut v = Vec::with_capacity(frames.len() * cells);
        for frame in frames {
            u.extend(frame.u);
            v.extend(frame.v);
        }

        let speed = u.iter().zip(&v).map(|(&u, &v)| wind_speed(u, v)).collect();
        let direction = u
            .iter()
            .zip(&v)
            .map(|(&u, &v)| wind_from_direction(u, v))
            .collect();
        let time_tolerance =
            median_spacing(&times).map_or_else(Duration::zero, |spacing| spacing / 2);

        Ok(Self {
            times,
            latitude,
            longitude,
            u,
            v,
            speed,
            direction,
            time_tolerance,
        })
    }

    /// Field with the same (u, v) everywhere, at every timestamp
    ///
    /// # Errors
    /// Same as [`WindField::from_frames`].
    pub fn uniform(
        times: &[DateTime<Utc>],
        latitude: Vec<f64>,
        longitude: Vec<f64>,
        u: f64,
        v: f64,
    ) -> Result<Self> {
        let cells = latitude.len() * longitude.len();
        let frames = times
            .iter()
            .map(|&time| WindFrame {
                time,
                u: vec![u; cells],
                v: vec![v; cells],
            })
            .collect();
        Self::from_frames(latitude, longitude, frames)
    }

    #[inline]
    fn index(&self, it: usize, ilat: usize, ilon: usize) -> usize {
        it * (self.latitude.len() * self.longitude.len()) + ilat * self.longitude.len() + ilon
    }

    #[must_use]
    pub fn times(&self) -> &[DateTime<Utc>] {
        &self.times
    }

    #[must_use]
    pub fn latitude(&self) -> &[f64] {
        &self.latitude
    }

    #[must_use]
    pub fn longitude(&self) -> &[f64] {
        &self.longitude
    }

    /// `(n_time, n_lat, n_lon)`
    #[must_use]
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.times.len(), self.latitude.len(), self.longitude.len())
    }

    /// `(u, v)` at a grid node
    #[must_use]
    pub fn wind_at_grid(&self, it: usize, ilat: usize, ilon: usize) -> (f64, f64) {
        let idx = self.index(it, ilat, ilon);
        (self.u[idx], self.v[idx])
    }

    /// Cached wind speed at a grid node
    #[must_use]
    pub fn speed_at_grid(&self, it: usize, ilat: usize, ilon: usize) -> f64 {
        self.speed[self.index(it, ilat, ilon)]
    }

    /// Cached wind-from direction at a grid node
    #[must_use]
    pub fn direction_at_grid(&self, it: usize, ilat: usize, ilon: usize) -> f64 {
        self.direction[self.index(it, ilat, ilon)]
    }

    /// Nearest timestamp index, `None` outside time coverage
    #[must_use]
    pub fn nearest_time_index(&self, time: DateTime<Utc>) -> Option<usize> {
        let first = *self.times.first()?;
        let last = *self.times.last()?;
        if time < first - self.time_tolerance || time > last + self.time_tolerance {
            return None;
        }

        let pos = self.times.partition_point(|&t| t < time);
        if pos == 0 {
            return Some(0);
        }
        if pos == self.times.len() {
            return Some(pos - 1);
        }
        // Ties go to the earlier timestamp
        if time - self.times[pos - 1] <= self.times[pos] - time {
            Some(pos - 1)
        } else {
            Some(pos)
        }
    }

    /// Nearest latitude row, `None` outside the mesh
    #[must_use]
    pub fn nearest_lat_index(&self, lat: f64) -> Option<usize> {
        nearest_coordinate(&self.latitude, lat)
    }

    /// Nearest longitude column, `None` outside the mesh
    #[must_use]
    pub fn nearest_lon_index(&self, lon: f64) -> Option<usize> {
        nearest_coordinate(&self.longitude, lon)
    }

    /// Wind at the node nearest in time and space
    ///
    /// # Errors
    /// [`AttributionError::SamplingGap`] when the request is outside coverage or the
    /// nearest sample is missing.
    pub fn sample(&self, time: DateTime<Utc>, lon: f64, lat: f64) -> Result<WindSample> {
        let gap = |reason| AttributionError::SamplingGap {
            time,
            lon,
            lat,
            reason,
        };

        let it = self
            .nearest_time_index(time)
            .ok_or_else(|| gap("outside time coverage"))?;
        let ilat = self
            .nearest_lat_index(lat)
            .ok_or_else(|| gap("latitude outside grid"))?;
        let ilon = self
            .nearest_lon_index(lon)
            .ok_or_else(|| gap("longitude outside grid"))?;

        let (u, v) = self.wind_at_grid(it, ilat, ilon);
        if !u.is_finite() || !v.is_finite() {
            return Err(gap("missing wind sample"));
        }

        Ok(WindSample {
            time: self.times[it],
            u,
            v,
        })
    }

    /// Full `(time, u, v)` series at the node nearest to `point`
    ///
    /// Missing samples are kept as NaN.
    ///
    /// # Errors
    /// [`AttributionError::DataUnavailable`] when `point` lies outside the mesh.
    pub fn point_series(&self, point: GeoPoint) -> Result<Vec<(DateTime<Utc>, f64, f64)>> {
        let (Some(ilat), Some(ilon)) = (
            self.nearest_lat_index(point.lat),
            self.nearest_lon_index(point.lon),
        ) else {
            return Err(AttributionError::DataUnavailable(format!(
                "point ({:.4}, {:.4}) lies outside the wind grid",
                point.lon, point.lat
            )));
        };

        Ok(self
            .times
            .iter()
            .enumerate()
            .map(|(it, &time)| {
                let (u, v) = self.wind_at_grid(it, ilat, ilon);
                (time, u, v)
            })
            .collect())
    }

    /// Average every cell over calendar periods
    ///
    /// u and v are averaged separately (missing samples skipped); speed and direction
    /// are then derived from the averaged components. Each output timestamp is the
    /// start of its period.
    ///
    /// # Errors
    /// Same as [`WindField::from_frames`].
    pub fn resample(&self, period: Period) -> Result<WindField> {
        let cells = self.latitude.len() * self.longitude.len();
        let mut frames: Vec<WindFrame> = Vec::new();

        let mut group_start = 0;
        while group_start < self.times.len() {
            let key = period.start_of(self.times[group_start]);
            let group_end = group_start
                + self.times[group_start..]
                    .iter()
                    .take_while(|&&t| period.start_of(t) == key)
                    .count();

            let mut u = Vec::with_capacity(cells);
            let mut v = Vec::with_capacity(cells);
            for cell in 0..cells {
                u.push(stats::nan_mean(
                    (group_start..group_end).map(|it| self.u[it * cells + cell]),
                ));
                v.push(stats::nan_mean(
                    (group_start..group_end).map(|it| self.v[it * cells + cell]),
                ));
            }
            frames.push(WindFrame {
                time: period.start_time(self.times[group_start]),
                u,
                v,
            });

            group_start = group_end;
        }

        Self::from_frames(self.latitude.clone(), self.longitude.clone(), frames)
    }
}

/// Median interval between consecutive timestamps
fn median_spacing(times: &[DateTime<Utc>]) -> Option<Duration> {
    let mut gaps: Vec<Duration> = times.windows(2).map(|w| w[1] - w[0]).collect();
    if gaps.is_empty() {
        return None;
    }
    gaps.sort();
    Some(gaps[gaps.len() / 2])
}

/// Index of the coordinate nearest to `target`
///
/// Works for ascending or descending axes (reanalysis latitude usually descends).
fn nearest_coordinate(axis: &[f64], target: f64) -> Option<usize> {
    if !target.is_finite() {
        return None;
    }
    if axis.len() == 1 {
        return Some(0);
    }

    let (min, max) = axis
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &c| {
            (lo.min(c), hi.max(c))
        });
    let half_spacing = (max - min) / (axis.len() - 1) as f64 / 2.0;
    if target < min - half_spacing || target > max + half_spacing {
        return None;
    }

    axis.iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| (*a - target).abs().total_cmp(&(*b - target).abs()))
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    fn t(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 1, day, hour, 0, 0).unwrap()
    }

    fn frame(time: DateTime<Utc>, u: f64, v: f64) -> WindFrame {
        WindFrame {
            time,
            u: vec![u; 4],
            v: vec![v; 4],
        }
    }

    #[test]
    fn test_merge_sorts_and_keeps_first_duplicate() {
        let field = WindField::from_frames(
            vec![28.0, 29.0],
            vec![77.0, 78.0],
            vec![frame(t(2, 0), 1.0, 0.0), frame(t(1, 0), 2.0, 0.0), frame(t(2, 0), 9.0, 0.0)],
        )
        .unwrap();

        assert_eq!(field.times(), &[t(1, 0), t(2, 0)]);
        assert_eq!(field.wind_at_grid(0, 0, 0), (2.0, 0.0));
        assert_eq!(
            field.wind_at_grid(1, 1, 1),
            (1.0, 0.0),
            "First occurrence of a duplicated timestamp must win"
        );
    }

    #[test]
    fn test_derived_fields_cached() {
        let field = WindField::from_frames(
            vec![28.0, 29.0],
            vec![77.0, 78.0],
            vec![frame(t(1, 0), 3.0, 4.0)],
        )
        .unwrap();

        assert_relative_eq!(field.speed_at_grid(0, 1, 0), 5.0);
        assert_relative_eq!(
            field.direction_at_grid(0, 1, 0),
            wind_from_direction(3.0, 4.0)
        );
    }

    #[test]
    fn test_mismatched_frame_rejected() {
        let bad = WindFrame {
            time: t(1, 0),
            u: vec![0.0; 3],
            v: vec![0.0; 3],
        };
        let result = WindField::from_frames(vec![28.0, 29.0], vec![77.0, 78.0], vec![bad]);
        assert!(matches!(result, Err(AttributionError::InvalidConfig(_))));
    }

    #[test]
    fn test_empty_field_is_data_unavailable() {
        let result = WindField::from_frames(vec![28.0], vec![77.0], Vec::new());
        assert!(matches!(result, Err(AttributionError::DataUnavailable(_))));
    }

    #[test]
    fn test_sample_nearest_and_coverage() {
        let times: Vec<_> = (1..=3).map(|d| t(d, 0)).collect();
        let field = WindField::uniform(&times, vec![29.0, 28.5, 28.0], vec![77.0, 77.5], 1.0, 2.0)
            .unwrap();

        // Within half a day of coverage
        let s = field.sample(t(3, 11), 77.2, 28.6).unwrap();
        assert_eq!(s.time, t(3, 0));
        assert_eq!((s.u, s.v), (1.0, 2.0));

        assert!(matches!(
            field.sample(t(3, 13), 77.2, 28.6),
            Err(AttributionError::SamplingGap { .. })
        ));
        assert!(field.sample(t(1, 0), 80.0, 28.6).is_err());
        assert!(field.sample(t(1, 0), 77.2, 27.0).is_err());
        assert!(field.sample(t(1, 0), 77.2, f64::NAN).is_err());
    }

    #[test]
    fn test_single_timestamp_covers_only_that_instant() {
        let field = WindField::uniform(&[t(1, 0)], vec![28.0, 29.0], vec![77.0, 78.0], 1.0, 0.0)
            .unwrap();

        assert_eq!(field.sample(t(1, 0), 77.0, 28.0).unwrap().time, t(1, 0));
        assert_eq!(field.nearest_time_index(t(1, 1)), None);
        assert!(matches!(
            field.sample(t(1, 0) + Duration::days(400), 77.0, 28.0),
            Err(AttributionError::SamplingGap { .. })
        ));
        assert!(field.sample(t(1, 0) - Duration::hours(6), 77.0, 28.0).is_err());
    }

    #[test]
    fn test_resample_keeps_daily_field_sampleable() {
        let field = WindField::uniform(&[t(1, 0), t(1, 12)], vec![28.0], vec![77.0], 2.0, 0.0)
            .unwrap();

        // One day collapses to one timestamp at midnight
        let daily = field.resample(Period::Daily).unwrap();
        assert_eq!(daily.times(), &[t(1, 0)]);
        assert_eq!(daily.sample(t(1, 0), 77.0, 28.0).unwrap().u, 2.0);
        assert!(daily.sample(t(1, 12), 77.0, 28.0).is_err());
    }

    #[test]
    fn test_descending_latitude_nearest() {
        let field = WindField::uniform(&[t(1, 0)], vec![29.0, 28.5, 28.0], vec![77.0], 0.0, 0.0)
            .unwrap();
        assert_eq!(field.nearest_lat_index(28.1), Some(2));
        assert_eq!(field.nearest_lat_index(28.9), Some(0));
        // Single-column longitude axis accepts anything
        assert_eq!(field.nearest_lon_index(10.0), Some(0));
    }

    #[test]
    fn test_missing_sample_is_gap() {
        let field = WindField::from_frames(
            vec![28.0, 29.0],
            vec![77.0, 78.0],
            vec![frame(t(1, 0), f64::NAN, 0.0)],
        )
        .unwrap();
        assert!(field.sample(t(1, 0), 77.0, 28.0).is_err());
    }

    #[test]
    fn test_resample_daily_averages_components() {
        let field = WindField::from_frames(
            vec![28.0],
            vec![77.0],
            vec![
                WindFrame { time: t(1, 0), u: vec![10.0], v: vec![0.0] },
                WindFrame { time: t(1, 12), u: vec![-10.0], v: vec![2.0] },
                WindFrame { time: t(2, 6), u: vec![f64::NAN], v: vec![f64::NAN] },
                WindFrame { time: t(2, 18), u: vec![4.0], v: vec![4.0] },
            ],
        )
        .unwrap();

        let daily = field.resample(Period::Daily).unwrap();
        assert_eq!(daily.times(), &[t(1, 0), t(2, 0)]);
        assert_eq!(daily.wind_at_grid(0, 0, 0), (0.0, 1.0));
        assert_eq!(daily.wind_at_grid(1, 0, 0), (4.0, 4.0));
        assert_relative_eq!(daily.speed_at_grid(0, 0, 0), 1.0);
    }

    #[test]
    fn test_point_series_outside_grid() {
        let field = WindField::uniform(&[t(1, 0)], vec![28.0, 29.0], vec![77.0, 78.0], 0.0, 0.0)
            .unwrap();
        assert!(field.point_series(GeoPoint::new(77.2, 28.6)).is_ok());
        assert!(matches!(
            field.point_series(GeoPoint::new(90.0, 28.6)),
            Err(AttributionError::DataUnavailable(_))
        ));
    }
}
