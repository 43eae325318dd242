//! Wind-driven pollution attribution
//!
//! Attributes satellite-observed pollutant concentrations over a metropolitan region to
//! local emissions or to regional transport, using gridded reanalysis wind.
//!
//! ## Components
//!
//! - [`grid::WindFieldStore`] merges per-period wind grids into one [`WindField`]
//! - [`attribution::regime`] labels each observation period `local` or advected from
//!   one of four compass sectors
//! - [`attribution::trajectory`] integrates fixed-step backward trajectories
//! - [`attribution::EpisodeDetector`] flags extreme periods and traces where the air
//!   came from
//! - [`attribution::HotspotClusterer`] finds persistent high-concentration cells,
//!   clusters them and matches them to known emission sources
//! - [`attribution::seasonal`] computes seasonal mean and anomaly grids
//! - [`Pipeline`] runs all of the above per pollutant with isolated failures

// Core types and utilities
pub mod core_types;
pub mod error;

// Gridded inputs
pub mod grid;

// Analysis
pub mod attribution;
pub mod config;
pub mod pipeline;

// Re-export core types
pub use core_types::{GeoPoint, Period, PollutantSeries, SeriesRecord};
pub use error::{AttributionError, Result};

// Re-export main analysis types
pub use attribution::{
    EpisodeDetector, HotspotCell, HotspotClusterer, Regime, SevereEpisode, Trajectory,
};
pub use config::AnalysisConfig;
pub use grid::{SpatialField, WindField, WindFieldStore};
pub use pipeline::{Pipeline, PollutantReport, PollutantStatus, RunSummary};
