//! Geographic points and the distance approximations used by the engine
//!
//! Three distance scales coexist on purpose:
//! - [`METERS_PER_DEGREE`] (111.32 km) converts wind displacement to degrees during
//!   trajectory integration.
//! - [`KM_PER_DEGREE`] (111 km) turns straight degree offsets into kilometres for
//!   episode distances, source matching and the clustering radius.
//! - [`EARTH_RADIUS_KM`] backs the great-circle (haversine) metric used by clustering.
//!
//! None of them is corrected for the ellipsoid.

use serde::{Deserialize, Serialize};

/// Metres per degree of latitude used by trajectory integration
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// Kilometres per degree used for planar distance approximations
pub const KM_PER_DEGREE: f64 = 111.0;

/// Mean Earth radius (km)
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A longitude/latitude pair in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

impl GeoPoint {
    #[must_use]
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Straight-line distance in degree space scaled by [`KM_PER_DEGREE`]
    #[must_use]
    pub fn planar_distance_km(&self, other: &GeoPoint) -> f64 {
        let dlon = self.lon - other.lon;
        let dlat = self.lat - other.lat;
        (dlon * dlon + dlat * dlat).sqrt() * KM_PER_DEGREE
    }

    /// Great-circle central angle between two points, in degrees of arc
    #[must_use]
    pub fn central_angle_deg(&self, other: &GeoPoint) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let dlat = lat2 - lat1;
        let dlon = (other.lon - self.lon).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        // Rounding can push `a` a hair above 1 for antipodal points
        let c = 2.0 * a.sqrt().min(1.0).asin();
        c.to_degrees()
    }

    /// Haversine distance in kilometres
    #[must_use]
    pub fn haversine_km(&self, other: &GeoPoint) -> f64 {
        self.central_angle_deg(other).to_radians() * EARTH_RADIUS_KM
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.lon.is_finite() && self.lat.is_finite()
    }
}
