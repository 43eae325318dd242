//! Gridded inputs: the merged wind field and pollutant composites

pub mod spatial_field;
pub mod wind_field;
pub mod wind_store;

// Re-export main types
pub use spatial_field::{MeanGrid, SpatialField};
pub use wind_field::{WindField, WindFrame, WindSample};
pub use wind_store::{WindFieldStore, WindStoreOptions};
