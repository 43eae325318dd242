//! Core types and utilities

pub mod geo;
pub mod period;
pub mod series;
pub mod stats;
pub mod wind;

pub use geo::GeoPoint;
pub use period::Period;
pub use series::{PollutantSeries, SeriesRecord};
pub use wind::{wind_from_direction, wind_speed, WindVector};
