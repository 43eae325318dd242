//! Known emission sources and hotspot-to-source matching
//!
//! Sources are grouped by category in a fixed, ordered list. Distances use the
//! straight degree offset × 111 km, consistent with the coarse grid the engine works
//! on; a source matches when it is strictly closer than the match radius.

use crate::core_types::GeoPoint;
use serde::{Deserialize, Serialize};

/// Label given to hotspots with no known source in range
pub const UNKNOWN_SOURCE: &str = "unknown";

/// A named point source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnownSource {
    pub name: String,
    pub lon: f64,
    pub lat: f64,
}

impl KnownSource {
    pub fn new(name: impl Into<String>, lon: f64, lat: f64) -> Self {
        Self {
            name: name.into(),
            lon,
            lat,
        }
    }

    #[must_use]
    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.lon, self.lat)
    }
}

/// Sources of one category (e.g. `power_plants`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceCategory {
    pub category: String,
    pub sources: Vec<KnownSource>,
}

/// How to resolve a cell that is in range of several sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// Closest source wins; equal distances keep the one listed first
    #[default]
    Nearest,
    /// Every in-range source overwrites the previous one, so the last listed wins.
    /// Reproduces older outputs where category order decided the label.
    LastMatch,
}

/// Source assigned to a hotspot cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceMatch {
    pub category: String,
    pub name: String,
    pub distance_km: f64,
}

/// Find the source a point should be attributed to
pub fn match_source(
    point: GeoPoint,
    categories: &[SourceCategory],
    radius_km: f64,
    policy: MatchPolicy,
) -> Option<SourceMatch> {
    let mut best: Option<SourceMatch> = None;

    for category in categories {
        for source in &category.sources {
            let distance_km = point.planar_distance_km(&source.position());
            if distance_km.is_nan() || distance_km >= radius_km {
                continue;
            }

            let replace = match (&best, policy) {
                (None, _) | (Some(_), MatchPolicy::LastMatch) => true,
                (Some(current), MatchPolicy::Nearest) => distance_km < current.distance_km,
            };
            if replace {
                best = Some(SourceMatch {
                    category: category.category.clone(),
                    name: source.name.clone(),
                    distance_km,
                });
            }
        }
    }

    best
}

/// Reference sources for the Delhi NCR region
#[must_use]
pub fn delhi_known_sources() -> Vec<SourceCategory> {
    vec![
        SourceCategory {
            category: "power_plants".into(),
            sources: vec![
                KnownSource::new("Badarpur TPS", 77.3083, 28.5014),
                KnownSource::new("Rajghat TPS", 77.2300, 28.6400),
            ],
        },
        SourceCategory {
            category: "industrial_areas".into(),
            sources: vec![
                KnownSource::new("Okhla Industrial Area", 77.2833, 28.5500),
                KnownSource::new("Noida Industrial Area", 77.3167, 28.5667),
            ],
        },
        SourceCategory {
            category: "crop_burning_regions".into(),
            sources: vec![
                KnownSource::new("Punjab", 75.3412, 30.0668),
                KnownSource::new("Haryana", 76.0856, 29.0588),
            ],
        },
    ]
}
