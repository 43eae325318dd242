//! Pollutant concentration time series
//!
//! Records start out with just a date and a value. Classification stages add wind and
//! regime fields in place; the original value is never touched.

use crate::attribution::Regime;
use crate::core_types::stats;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One observation period of a pollutant series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesRecord {
    pub date: DateTime<Utc>,

    /// Concentration (arbitrary unit); `None` when the observation is missing
    pub value: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub u_wind: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub v_wind: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_direction: Option<f64>,

    /// `None` when wind was unavailable for this period
    #[serde(default)]
    pub regime: Option<Regime>,
    #[serde(default)]
    pub is_local: bool,
    #[serde(default)]
    pub is_advected: bool,
}

impl SeriesRecord {
    /// Create a bare record; NaN values are stored as missing
    #[must_use]
    pub fn new(date: DateTime<Utc>, value: f64) -> Self {
        Self {
            date,
            value: value.is_finite().then_some(value),
            u_wind: None,
            v_wind: None,
            wind_speed: None,
            wind_direction: None,
            regime: None,
            is_local: false,
            is_advected: false,
        }
    }

    /// Value if present and finite
    #[must_use]
    pub fn present_value(&self) -> Option<f64> {
        self.value.filter(|v| v.is_finite())
    }

    /// Attach a period-mean wind vector and its regime
    pub fn set_wind(&mut self, u: f64, v: f64, speed: f64, direction: f64, regime: Regime) {
        self.u_wind = Some(u);
        self.v_wind = Some(v);
        self.wind_speed = Some(speed);
        self.wind_direction = Some(direction);
        self.regime = Some(regime);
        self.is_local = regime.is_local();
        self.is_advected = !regime.is_local();
    }

    /// Drop derived wind fields (wind unavailable for this period)
    pub fn clear_wind(&mut self) {
        self.u_wind = None;
        self.v_wind = None;
        self.wind_speed = None;
        self.wind_direction = None;
        self.regime = None;
        self.is_local = false;
        self.is_advected = false;
    }
}

/// Time-ordered pollutant series
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<SeriesRecord>", into = "Vec<SeriesRecord>")]
pub struct PollutantSeries {
    records: Vec<SeriesRecord>,
}

impl PollutantSeries {
    /// Build a series, sorting records by date
    #[must_use]
    pub fn new(mut records: Vec<SeriesRecord>) -> Self {
        records.sort_by_key(|r| r.date);
        Self { records }
    }

    /// Build from `(date, value)` pairs
    #[must_use]
    pub fn from_values(values: impl IntoIterator<Item = (DateTime<Utc>, f64)>) -> Self {
        Self::new(
            values
                .into_iter()
                .map(|(date, value)| SeriesRecord::new(date, value))
                .collect(),
        )
    }

    #[must_use]
    pub fn records(&self) -> &[SeriesRecord] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [SeriesRecord] {
        &mut self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SeriesRecord> {
        self.records.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All present values, in date order
    #[must_use]
    pub fn present_values(&self) -> Vec<f64> {
        self.records
            .iter()
            .filter_map(SeriesRecord::present_value)
            .collect()
    }

    /// Percentile over present values, `None` when nothing is present
    #[must_use]
    pub fn percentile(&self, pct: f64) -> Option<f64> {
        stats::percentile(&self.present_values(), pct)
    }
}

impl From<Vec<SeriesRecord>> for PollutantSeries {
    fn from(records: Vec<SeriesRecord>) -> Self {
        Self::new(records)
    }
}

impl From<PollutantSeries> for Vec<SeriesRecord> {
    fn from(series: PollutantSeries) -> Self {
        series.records
    }
}

impl<'a> IntoIterator for &'a PollutantSeries {
    type Item = &'a SeriesRecord;
    type IntoIter = std::slice::Iter<'a, SeriesRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
