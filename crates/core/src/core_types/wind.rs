//! Wind vector helpers
//!
//! Components follow the meteorological convention: `u` is the eastward and `v` the
//! northward component (m/s), so the vector points where the air is moving *toward*.
//! Direction is reported as the bearing the wind blows *from*:
//!
//! ```text
//! direction = (atan2(-u, -v) · 180/π + 360) mod 360      0 = North, 90 = East
//! ```

use nalgebra::Vector2;

/// Horizontal wind vector `(u, v)` in m/s
pub type WindVector = Vector2<f64>;

/// Wind speed √(u² + v²)
#[inline]
#[must_use]
pub fn wind_speed(u: f64, v: f64) -> f64 {
    WindVector::new(u, v).norm()
}

/// Wind-from direction in degrees, mapped to [0, 360)
#[inline]
#[must_use]
pub fn wind_from_direction(u: f64, v: f64) -> f64 {
    ((-u).atan2(-v).to_degrees() + 360.0) % 360.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_cardinal_directions() {
        // Air moving south comes from the north
        assert_relative_eq!(wind_from_direction(0.0, -10.0), 0.0);
        // Air moving west comes from the east
        assert_relative_eq!(wind_from_direction(-10.0, 0.0), 90.0);
        assert_relative_eq!(wind_from_direction(0.0, 10.0), 180.0);
        assert_relative_eq!(wind_from_direction(10.0, 0.0), 270.0);
    }

    #[test]
    fn test_direction_stays_in_range() {
        for (u, v) in [(1e-12, -5.0), (-1e-12, -5.0), (3.0, 4.0), (-3.0, -4.0)] {
            let d = wind_from_direction(u, v);
            assert!((0.0..360.0).contains(&d), "Direction out of range for ({u}, {v}): {d}");
        }
    }

    #[test]
    fn test_speed() {
        assert_relative_eq!(wind_speed(3.0, -4.0), 5.0);
        assert_eq!(wind_speed(0.0, 0.0), 0.0);
    }
}
