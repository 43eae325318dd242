//! Pollution regime classification
//!
//! Labels each observation period as dominated by local emissions or by advection
//! from one of four compass sectors.
//!
//! # Rule
//!
//! Low wind traps locally emitted pollution, so any period whose wind speed falls
//! below the threshold is `local` regardless of direction. Otherwise the wind-from
//! direction picks the sector:
//!
//! ```text
//! [315, 360) ∪ [0, 45) → advected_north
//! [ 45, 135)           → advected_east
//! [135, 225)           → advected_south
//! [225, 315)           → advected_west
//! ```
//!
//! Sector boundaries belong to the sector clockwise of them (45° is east).
//!
//! # Temporal alignment
//!
//! Pollutant observations are periodic (monthly composites) while wind is daily or
//! hourly. Wind at the reference point is averaged *component-wise* over each
//! pollutant period before speed and direction are computed. Classifying each wind
//! sample first and aggregating labels afterwards gives different regime boundaries.

use crate::core_types::{wind_from_direction, wind_speed, GeoPoint, Period, PollutantSeries};
use crate::error::Result;
use crate::grid::WindField;
use chrono::NaiveDate;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

/// Default local/advected wind speed split (m/s)
pub const DEFAULT_SPEED_THRESHOLD: f64 = 4.0;

/// Regime of one observation period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    /// Wind below threshold: pollution accumulates from local sources
    Local,
    AdvectedNorth,
    AdvectedEast,
    AdvectedSouth,
    AdvectedWest,
    /// Direction undefined (non-finite components)
    AdvectedOther,
}

impl Regime {
    pub const ALL: [Regime; 6] = [
        Regime::Local,
        Regime::AdvectedNorth,
        Regime::AdvectedEast,
        Regime::AdvectedSouth,
        Regime::AdvectedWest,
        Regime::AdvectedOther,
    ];

    #[must_use]
    pub fn is_local(self) -> bool {
        self == Regime::Local
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Regime::Local => "local",
            Regime::AdvectedNorth => "advected_north",
            Regime::AdvectedEast => "advected_east",
            Regime::AdvectedSouth => "advected_south",
            Regime::AdvectedWest => "advected_west",
            Regime::AdvectedOther => "advected_other",
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sector for a wind-from direction in degrees
pub fn sector_for_direction(direction: f64) -> Regime {
    if (315.0..360.0).contains(&direction) || (0.0..45.0).contains(&direction) {
        Regime::AdvectedNorth
    } else if (45.0..135.0).contains(&direction) {
        Regime::AdvectedEast
    } else if (135.0..225.0).contains(&direction) {
        Regime::AdvectedSouth
    } else if (225.0..315.0).contains(&direction) {
        Regime::AdvectedWest
    } else {
        Regime::AdvectedOther
    }
}

/// Classify a single wind vector
///
/// # Arguments
///
/// * `u` - Eastward wind component (m/s)
/// * `v` - Northward wind component (m/s)
/// * `speed_threshold` - Speeds strictly below this are `local` (m/s)
pub fn classify(u: f64, v: f64, speed_threshold: f64) -> Regime {
    if wind_speed(u, v) < speed_threshold {
        return Regime::Local;
    }
    sector_for_direction(wind_from_direction(u, v))
}

/// Counts of each regime over a classified series
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegimeSummary {
    pub total_records: usize,
    /// Records with wind data (and therefore a regime)
    pub classified_records: usize,
    pub local_records: usize,
    pub advected_records: usize,
    /// Share of all records, in percent
    pub local_percent: f64,
    pub advected_percent: f64,
    pub by_regime: Vec<(Regime, usize)>,
}

impl RegimeSummary {
    pub fn from_series(series: &PollutantSeries) -> Self {
        let mut counts: FxHashMap<Regime, usize> = FxHashMap::default();
        for regime in series.iter().filter_map(|r| r.regime) {
            *counts.entry(regime).or_default() += 1;
        }

        let total = series.len();
        let local = series.iter().filter(|r| r.is_local).count();
        let advected = series.iter().filter(|r| r.is_advected).count();
        let percent = |n: usize| {
            if total == 0 {
                0.0
            } else {
                n as f64 / total as f64 * 100.0
            }
        };

        let by_regime = Regime::ALL
            .iter()
            .filter_map(|r| counts.get(r).map(|&n| (*r, n)))
            .collect();

        Self {
            total_records: total,
            classified_records: counts.values().sum(),
            local_records: local,
            advected_records: advected,
            local_percent: percent(local),
            advected_percent: percent(advected),
            by_regime,
        }
    }
}

/// Classify every record of `series` from the wind at `reference`
///
/// Wind at the grid node nearest `reference` is averaged per `period`; each record
/// gets the mean (u, v) of the period containing its date, the derived speed and
/// direction, and its regime. Records in periods without any wind sample are left
/// unclassified.
///
/// # Errors
/// [`crate::AttributionError::DataUnavailable`] when `reference` lies outside the wind grid.
pub fn classify_series(
    series: &mut PollutantSeries,
    field: &WindField,
    reference: GeoPoint,
    period: Period,
    speed_threshold: f64,
) -> Result<RegimeSummary> {
    let wind = field.point_series(reference)?;

    // Sum of (u, v) and sample count per period
    let mut sums: FxHashMap<NaiveDate, (f64, f64, usize)> = FxHashMap::default();
    for (time, u, v) in wind {
        if !u.is_finite() || !v.is_finite() {
            continue;
        }
        let entry = sums.entry(period.start_of(time)).or_default();
        entry.0 += u;
        entry.1 += v;
        entry.2 += 1;
    }
    debug!("Wind averaged over {} {:?} periods", sums.len(), period);

    let mut missing = 0usize;
    for record in series.records_mut() {
        match sums.get(&period.start_of(record.date)) {
            Some(&(su, sv, n)) if n > 0 => {
                let u = su / n as f64;
                let v = sv / n as f64;
                record.set_wind(
                    u,
                    v,
                    wind_speed(u, v),
                    wind_from_direction(u, v),
                    classify(u, v, speed_threshold),
                );
            }
            _ => {
                record.clear_wind();
                missing += 1;
            }
        }
    }

    if missing > 0 {
        warn!("{missing} records have no wind data for their period and stay unclassified");
    }

    let summary = RegimeSummary::from_series(series);
    info!(
        "Classified {} records: {} local ({:.1}%), {} advected ({:.1}%)",
        summary.total_records,
        summary.local_records,
        summary.local_percent,
        summary.advected_records,
        summary.advected_percent
    );
    Ok(summary)
}
