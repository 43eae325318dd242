//! Persistent pollution hotspots
//!
//! Cells whose long-run mean reaches a percentile of all present cells are hotspot
//! candidates. Candidates are grouped with DBSCAN and each one is attributed to the
//! known emission source it lies close to, if any.

use crate::attribution::cluster::{dbscan, DEFAULT_MIN_SAMPLES, NOISE};
use crate::attribution::sources::{match_source, MatchPolicy, SourceCategory, UNKNOWN_SOURCE};
use crate::core_types::{stats, GeoPoint};
use crate::grid::MeanGrid;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// A grid cell flagged as a hotspot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotspotCell {
    pub longitude: f64,
    pub latitude: f64,
    pub mean_value: f64,

    /// DBSCAN cluster, `-1` for noise
    pub cluster_id: i32,

    /// Source category, or `unknown`
    pub source_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

impl HotspotCell {
    #[must_use]
    pub fn new(longitude: f64, latitude: f64, mean_value: f64) -> Self {
        Self {
            longitude,
            latitude,
            mean_value,
            cluster_id: NOISE,
            source_type: UNKNOWN_SOURCE.to_string(),
            source_name: None,
            distance_km: None,
        }
    }

    #[must_use]
    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.longitude, self.latitude)
    }

    #[must_use]
    pub fn is_noise(&self) -> bool {
        self.cluster_id == NOISE
    }
}

/// Cells whose mean is at or above the `percentile` of present cells, row-major
///
/// Percentile 0 keeps every present cell; 100 or more keeps none. Missing cells
/// never qualify.
pub fn find_hotspots(mean: &MeanGrid, percentile: f64) -> Vec<HotspotCell> {
    if percentile >= 100.0 {
        debug!("Hotspot percentile {percentile} selects no cells");
        return Vec::new();
    }
    let threshold = match stats::threshold(&mean.present_values(), percentile) {
        Ok(threshold) => threshold,
        Err(e) => {
            info!("Mean field: {e}; no hotspots");
            return Vec::new();
        }
    };

    let cells: Vec<HotspotCell> = mean
        .cells()
        .filter(|&(_, _, value)| value.is_finite() && value >= threshold)
        .map(|(lon, lat, value)| HotspotCell::new(lon, lat, value))
        .collect();
    info!(
        "Found {} hotspot cells (>= {:.4e}, {}th percentile)",
        cells.len(),
        threshold,
        percentile
    );
    cells
}

/// Assign DBSCAN cluster ids to `cells` in place
pub fn cluster(cells: &mut [HotspotCell], eps_km: f64, min_samples: usize) {
    let points: Vec<GeoPoint> = cells.iter().map(HotspotCell::position).collect();
    let labels = dbscan(&points, eps_km, min_samples);
    for (cell, label) in cells.iter_mut().zip(labels) {
        cell.cluster_id = label;
    }

    let clusters = cluster_count(cells);
    let noise = cells.iter().filter(|c| c.is_noise()).count();
    info!("Identified {clusters} hotspot clusters ({noise} noise cells)");
}

/// Number of distinct clusters among `cells` (noise excluded)
#[must_use]
pub fn cluster_count(cells: &[HotspotCell]) -> usize {
    cells
        .iter()
        .filter_map(|c| usize::try_from(c.cluster_id).ok())
        .max()
        .map_or(0, |max| max + 1)
}

/// Attribute each cell to a known source within `radius_km`
pub fn match_sources(
    cells: &mut [HotspotCell],
    categories: &[SourceCategory],
    radius_km: f64,
    policy: MatchPolicy,
) {
    for cell in cells.iter_mut() {
        match match_source(cell.position(), categories, radius_km, policy) {
            Some(m) => {
                cell.source_type = m.category;
                cell.source_name = Some(m.name);
                cell.distance_km = Some(m.distance_km);
            }
            None => {
                cell.source_type = UNKNOWN_SOURCE.to_string();
                cell.source_name = None;
                cell.distance_km = None;
            }
        }
    }
}

/// Number of cells per source type, sorted by type
#[must_use]
pub fn source_type_counts(cells: &[HotspotCell]) -> Vec<(String, usize)> {
    let mut counts: FxHashMap<&str, usize> = FxHashMap::default();
    for cell in cells {
        *counts.entry(cell.source_type.as_str()).or_default() += 1;
    }
    let mut counts: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(k, n)| (k.to_string(), n))
        .collect();
    counts.sort();
    counts
}

/// Threshold, cluster and attribute in one pass
#[derive(Debug, Clone)]
pub struct HotspotClusterer<'a> {
    pub percentile: f64,
    pub eps_km: f64,
    pub min_samples: usize,
    pub radius_km: f64,
    pub policy: MatchPolicy,
    pub sources: &'a [SourceCategory],
}

impl<'a> HotspotClusterer<'a> {
    /// Clusterer with default DBSCAN and matching parameters
    #[must_use]
    pub fn new(sources: &'a [SourceCategory]) -> Self {
        Self {
            percentile: 90.0,
            eps_km: 5.0,
            min_samples: DEFAULT_MIN_SAMPLES,
            radius_km: 10.0,
            policy: MatchPolicy::default(),
            sources,
        }
    }

    #[must_use]
    pub fn run(&self, mean: &MeanGrid) -> Vec<HotspotCell> {
        let mut cells = find_hotspots(mean, self.percentile);
        cluster(&mut cells, self.eps_km, self.min_samples);
        match_sources(&mut cells, self.sources, self.radius_km, self.policy);

        for (source_type, n) in source_type_counts(&cells) {
            debug!("  {source_type}: {n} cells");
        }
        cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribution::sources::{delhi_known_sources, KnownSource};

    /// 5x5 grid at 0.01° spacing around (77.28, 28.54), values 1..=25 row-major
    fn ramp() -> MeanGrid {
        MeanGrid {
            latitude: (0..5).map(|i| 28.52 + f64::from(i) * 0.01).collect(),
            longitude: (0..5).map(|i| 77.26 + f64::from(i) * 0.01).collect(),
            values: (1..=25).map(f64::from).collect(),
        }
    }

    #[test]
    fn test_percentile_selects_upper_cells() {
        let grid = ramp();
        let cells = find_hotspots(&grid, 90.0);
        // 90th percentile of 1..=25 is 22.6: cells 23, 24, 25
        let values: Vec<f64> = cells.iter().map(|c| c.mean_value).collect();
        assert_eq!(values, vec![23.0, 24.0, 25.0]);
        assert!(cells.iter().all(|c| c.latitude == grid.latitude[4]));
    }

    #[test]
    fn test_percentile_boundaries() {
        let mut grid = ramp();
        grid.values[3] = f64::NAN;
        assert_eq!(find_hotspots(&grid, 0.0).len(), 24);
        assert!(find_hotspots(&grid, 100.0).is_empty());
        assert!(find_hotspots(&grid, 150.0).is_empty());
    }

    #[test]
    fn test_all_missing_grid_has_no_hotspots() {
        let mut grid = ramp();
        grid.values.iter_mut().for_each(|v| *v = f64::NAN);
        assert!(find_hotspots(&grid, 50.0).is_empty());
    }

    #[test]
    fn test_cluster_labels_adjacent_cells() {
        let mut cells = find_hotspots(&ramp(), 80.0);
        assert_eq!(cells.len(), 5);
        cells.push(HotspotCell::new(80.0, 20.0, 99.0));

        cluster(&mut cells, 5.0, 3);
        assert!(cells[..5].iter().all(|c| c.cluster_id == 0));
        assert!(cells[5].is_noise());
        assert_eq!(cluster_count(&cells), 1);
    }

    #[test]
    fn test_match_sources_sets_unknown() {
        let mut cells = vec![
            HotspotCell::new(77.29, 28.55, 1.0),
            HotspotCell::new(70.0, 20.0, 1.0),
        ];
        match_sources(&mut cells, &delhi_known_sources(), 10.0, MatchPolicy::Nearest);

        assert_eq!(cells[0].source_type, "industrial_areas");
        assert_eq!(cells[0].source_name.as_deref(), Some("Okhla Industrial Area"));
        assert!(cells[0].distance_km.is_some());
        assert_eq!(cells[1].source_type, UNKNOWN_SOURCE);
        assert_eq!(cells[1].source_name, None);
    }

    #[test]
    fn test_clusterer_end_to_end() {
        let sources = vec![SourceCategory {
            category: "power_plants".into(),
            sources: vec![KnownSource::new("Plant", 77.30, 28.56)],
        }];
        let mut clusterer = HotspotClusterer::new(&sources);
        clusterer.percentile = 80.0;

        let cells = clusterer.run(&ramp());
        assert_eq!(cells.len(), 5);
        assert!(cells.iter().all(|c| c.cluster_id == 0));
        assert!(cells.iter().all(|c| c.source_type == "power_plants"));
        assert_eq!(source_type_counts(&cells), vec![("power_plants".to_string(), 5)]);
    }

    #[test]
    fn test_unmatched_cell_serializes_without_source_name() {
        let json = serde_json::to_value(HotspotCell::new(77.0, 28.0, 1.0)).unwrap();
        assert_eq!(json["source_type"], "unknown");
        assert_eq!(json["cluster_id"], -1);
        assert!(json.get("source_name").is_none());
    }
}
