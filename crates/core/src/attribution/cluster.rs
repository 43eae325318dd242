//! Density-based clustering of geographic points (DBSCAN)
//!
//! Points are neighbours when their great-circle separation is at most `eps_km / 111`
//! degrees of arc. A point whose neighbourhood (itself included) holds at least
//! `min_samples` points is a core point; clusters grow from core points through
//! their neighbours. Points reachable from no core point are noise.
//!
//! Cluster ids are assigned 0, 1, 2, … in the order their first core point appears
//! in the input. A border point reachable from two clusters joins the one found
//! first.
//!
//! Neighbour search goes through a hash grid with `eps`-sized buckets so only
//! nearby buckets are scanned. The longitude window is `eps / cos(|lat| + eps)`
//! degrees wide, which bounds every point of an `eps` cap. When that window reaches
//! a pole or crosses a multiple of 180° (the antimeridian for [-180, 180]
//! longitudes, the prime meridian seam for [0, 360)) every point is scanned.

use crate::core_types::geo::KM_PER_DEGREE;
use crate::core_types::GeoPoint;
use rustc_hash::FxHashMap;

/// Cluster id given to points that belong to no cluster
pub const NOISE: i32 = -1;

/// Default minimum neighbourhood size for a core point
pub const DEFAULT_MIN_SAMPLES: usize = 3;

/// Hash grid over lon/lat buckets of `bucket_deg` degrees
struct BucketIndex {
    buckets: FxHashMap<(i64, i64), Vec<usize>>,
    bucket_deg: f64,
    len: usize,
}

impl BucketIndex {
    fn build(points: &[GeoPoint], bucket_deg: f64) -> Self {
        let mut buckets: FxHashMap<(i64, i64), Vec<usize>> = FxHashMap::default();
        for (i, p) in points.iter().enumerate() {
            buckets.entry(Self::key(p, bucket_deg)).or_default().push(i);
        }
        Self {
            buckets,
            bucket_deg,
            len: points.len(),
        }
    }

    fn key(p: &GeoPoint, bucket_deg: f64) -> (i64, i64) {
        (
            (p.lon / bucket_deg).floor() as i64,
            (p.lat / bucket_deg).floor() as i64,
        )
    }

    /// Candidate indices that may lie within one bucket width of arc from `p`
    fn candidates(&self, p: &GeoPoint) -> Vec<usize> {
        let max_lat = p.lat.abs() + self.bucket_deg;
        let lon_span = if max_lat < 90.0 {
            self.bucket_deg / max_lat.to_radians().cos()
        } else {
            f64::INFINITY
        };
        let west = ((p.lon - lon_span) / 180.0).floor();
        let east = ((p.lon + lon_span) / 180.0).floor();
        if !lon_span.is_finite() || west != east {
            return (0..self.len).collect();
        }

        let (kx, ky) = Self::key(p, self.bucket_deg);
        let lon_reach = (lon_span / self.bucket_deg).ceil() as i64 + 1;
        (-lon_reach..=lon_reach)
            .flat_map(|dx| (-1..=1).map(move |dy| (kx + dx, ky + dy)))
            .filter_map(|key| self.buckets.get(&key))
            .flatten()
            .copied()
            .collect()
    }
}

/// Cluster `points`, returning one label per point (`NOISE` or a cluster id)
///
/// # Arguments
///
/// * `points` - Point coordinates
/// * `eps_km` - Neighbourhood radius (km), converted to degrees of arc by / 111
/// * `min_samples` - Minimum neighbourhood size (self included) of a core point
pub fn dbscan(points: &[GeoPoint], eps_km: f64, min_samples: usize) -> Vec<i32> {
    let n = points.len();
    let mut labels = vec![NOISE; n];
    if n == 0 || eps_km.is_nan() || eps_km <= 0.0 {
        return labels;
    }

    let eps_deg = eps_km / KM_PER_DEGREE;
    let index = BucketIndex::build(points, eps_deg);

    let neighbours: Vec<Vec<usize>> = points
        .iter()
        .map(|p| {
            let mut found: Vec<usize> = index
                .candidates(p)
                .into_iter()
                .filter(|&j| p.central_angle_deg(&points[j]) <= eps_deg)
                .collect();
            found.sort_unstable();
            found
        })
        .collect();
    let is_core: Vec<bool> = neighbours.iter().map(|nb| nb.len() >= min_samples).collect();

    let mut next_cluster = 0;
    for seed in 0..n {
        if labels[seed] != NOISE || !is_core[seed] {
            continue;
        }

        labels[seed] = next_cluster;
        let mut stack = vec![seed];
        while let Some(p) = stack.pop() {
            for &q in &neighbours[p] {
                if labels[q] == NOISE {
                    labels[q] = next_cluster;
                    if is_core[q] {
                        stack.push(q);
                    }
                }
            }
        }
        next_cluster += 1;
    }

    labels
}
