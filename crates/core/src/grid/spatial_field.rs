//! Gridded pollutant composites
//!
//! A composite is a stack of `[lat][lon]` grids, one per timestamp (monthly composites
//! in practice), or a single timeless grid. Hotspot detection works on the long-run
//! per-cell mean; seasonal analysis works on means over subsets of timestamps.

use crate::core_types::stats;
use crate::error::{AttributionError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// On-disk layout of a composite (`time` may be omitted for a single grid)
#[derive(Debug, Deserialize)]
pub(crate) struct SpatialFieldFile {
    #[serde(default)]
    pub time: Vec<DateTime<Utc>>,
    pub latitude: Vec<f64>,
    pub longitude: Vec<f64>,
    pub values: Vec<Option<f64>>,
}

/// Pollutant composite, flattened `[time][lat][lon]`, NaN = missing
#[derive(Debug, Clone)]
pub struct SpatialField {
    times: Vec<DateTime<Utc>>,
    latitude: Vec<f64>,
    longitude: Vec<f64>,
    values: Vec<f64>,
}

/// One value per cell, flattened `[lat][lon]`, NaN = missing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeanGrid {
    pub latitude: Vec<f64>,
    pub longitude: Vec<f64>,
    pub values: Vec<f64>,
}

impl SpatialField {
    /// Build a composite; `times` empty means a single timeless grid
    ///
    /// # Errors
    /// [`AttributionError::InvalidConfig`] when `values` does not match the shape.
    pub fn new(
        times: Vec<DateTime<Utc>>,
        latitude: Vec<f64>,
        longitude: Vec<f64>,
        values: Vec<f64>,
    ) -> Result<Self> {
        let layers = times.len().max(1);
        let expected = layers * latitude.len() * longitude.len();
        if values.len() != expected {
            return Err(AttributionError::InvalidConfig(format!(
                "composite holds {} values, expected {expected}",
                values.len()
            )));
        }

        Ok(Self {
            times,
            latitude,
            longitude,
            values,
        })
    }

    pub(crate) fn from_file(path: &Path, file: SpatialFieldFile) -> Result<Self> {
        let values = file
            .values
            .into_iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect();
        Self::new(file.time, file.latitude, file.longitude, values)
            .map_err(|e| AttributionError::malformed(path, e.to_string()))
    }

    #[must_use]
    pub fn times(&self) -> &[DateTime<Utc>] {
        &self.times
    }

    #[must_use]
    pub fn has_time(&self) -> bool {
        !self.times.is_empty()
    }

    #[inline]
    fn cells(&self) -> usize {
        self.latitude.len() * self.longitude.len()
    }

    /// Per-cell mean over the given time layers, skipping missing samples
    #[must_use]
    pub fn mean_over(&self, layers: &[usize]) -> MeanGrid {
        let cells = self.cells();
        let values = (0..cells)
            .map(|cell| stats::nan_mean(layers.iter().map(|&it| self.values[it * cells + cell])))
            .collect();

        MeanGrid {
            latitude: self.latitude.clone(),
            longitude: self.longitude.clone(),
            values,
        }
    }

    /// Long-run per-cell mean (the grid itself when there is no time axis)
    #[must_use]
    pub fn temporal_mean(&self) -> MeanGrid {
        if self.has_time() {
            let layers: Vec<usize> = (0..self.times.len()).collect();
            self.mean_over(&layers)
        } else {
            MeanGrid {
                latitude: self.latitude.clone(),
                longitude: self.longitude.clone(),
                values: self.values.clone(),
            }
        }
    }
}

impl MeanGrid {
    /// Iterate `(lon, lat, value)` over every cell, row-major
    pub fn cells(&self) -> impl Iterator<Item = (f64, f64, f64)> + '_ {
        self.latitude.iter().enumerate().flat_map(move |(ilat, &lat)| {
            self.longitude
                .iter()
                .enumerate()
                .map(move |(ilon, &lon)| (lon, lat, self.values[ilat * self.longitude.len() + ilon]))
        })
    }

    /// Present (finite) cell values
    #[must_use]
    pub fn present_values(&self) -> Vec<f64> {
        stats::present_values(&self.values)
    }
}
