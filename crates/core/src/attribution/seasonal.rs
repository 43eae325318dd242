//! Seasonal means of a gridded composite
//!
//! Each season is a set of calendar months. A season's mean is the per-cell mean
//! over the composite timestamps that fall in those months; its anomaly is that mean
//! minus the long-run mean of the whole composite.

use crate::grid::SpatialField;
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Named set of calendar months (1 = January)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Season {
    pub name: String,
    pub months: Vec<u32>,
}

impl Season {
    pub fn new(name: impl Into<String>, months: impl Into<Vec<u32>>) -> Self {
        Self {
            name: name.into(),
            months: months.into(),
        }
    }

    #[must_use]
    pub fn contains_month(&self, month: u32) -> bool {
        self.months.contains(&month)
    }
}

/// North Indian seasons
#[must_use]
pub fn default_seasons() -> Vec<Season> {
    vec![
        Season::new("winter", [12, 1, 2]),
        Season::new("summer", [3, 4, 5]),
        Season::new("monsoon", [6, 7, 8, 9]),
        Season::new("post_monsoon", [10, 11]),
    ]
}

/// Mean and anomaly grids of one season, flattened `[lat][lon]`, `None` = missing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalMean {
    pub season: String,
    pub timestep_count: usize,
    pub latitude: Vec<f64>,
    pub longitude: Vec<f64>,
    pub mean: Vec<Option<f64>>,
    pub anomaly: Vec<Option<f64>>,
}

fn present(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

/// Per-season means over `field`, in season order
///
/// Seasons without any timestamp are omitted; a field without a time axis yields
/// nothing.
#[must_use]
pub fn seasonal_means(field: &SpatialField, seasons: &[Season]) -> Vec<SeasonalMean> {
    if !field.has_time() {
        info!("Composite has no time axis; skipping seasonal means");
        return Vec::new();
    }

    let annual = field.temporal_mean();
    let mut out = Vec::with_capacity(seasons.len());

    for season in seasons {
        let layers: Vec<usize> = field
            .times()
            .iter()
            .enumerate()
            .filter(|(_, t)| season.contains_month(t.month()))
            .map(|(i, _)| i)
            .collect();
        if layers.is_empty() {
            debug!("Season {} has no timesteps", season.name);
            continue;
        }

        let grid = field.mean_over(&layers);
        let anomaly = grid
            .values
            .iter()
            .zip(&annual.values)
            .map(|(&s, &a)| present(s - a))
            .collect();

        out.push(SeasonalMean {
            season: season.name.clone(),
            timestep_count: layers.len(),
            mean: grid.values.iter().copied().map(present).collect(),
            anomaly,
            latitude: grid.latitude,
            longitude: grid.longitude,
        });
    }

    info!("Computed {} seasonal means", out.len());
    out
}
