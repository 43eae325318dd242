//! Error taxonomy for the attribution engine
//!
//! Three conditions come from the data itself:
//! - [`AttributionError::DataUnavailable`]: no usable wind or pollutant input.
//!   Fatal for the affected pollutant (or the whole run when it is the wind field).
//! - [`AttributionError::SamplingGap`]: wind missing at one trajectory step.
//!   The integrator recovers by truncating the path.
//! - [`AttributionError::EmptySeries`]: nothing to threshold. Detectors recover by
//!   returning an empty result set.
//!
//! The remaining variants wrap configuration, I/O and (de)serialization failures.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T, E = AttributionError> = std::result::Result<T, E>;

/// Errors raised by the attribution engine
#[derive(Debug, Error)]
pub enum AttributionError {
    /// No usable wind or pollutant input
    #[error("data unavailable: {0}")]
    DataUnavailable(String),

    /// Wind could not be sampled at the requested time/position
    #[error("no wind sample at {time} (lon {lon:.4}, lat {lat:.4}): {reason}")]
    SamplingGap {
        time: DateTime<Utc>,
        lon: f64,
        lat: f64,
        reason: &'static str,
    },

    /// Series has no present values to threshold
    #[error("series has no present values")]
    EmptySeries,

    /// Configuration value out of range
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Input file parsed but its contents are inconsistent
    #[error("malformed input {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },

    /// Filesystem access failed
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON input could not be parsed
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Output could not be serialized
    #[error("failed to serialize {what}: {source}")]
    Serialize {
        what: String,
        #[source]
        source: serde_json::Error,
    },
}

impl AttributionError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn parse(path: &Path, source: serde_json::Error) -> Self {
        Self::Parse {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn malformed(path: &Path, reason: impl Into<String>) -> Self {
        Self::Malformed {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    /// Create error for a configuration parameter outside its valid range
    ///
    /// # Arguments
    /// * `param_name` - The name of the invalid parameter (e.g., `"episode_percentile"`)
    /// * `message` - A description of the constraint that was violated
    pub fn invalid_parameter(param_name: &str, message: &str) -> Self {
        Self::InvalidConfig(format!("{param_name}: {message}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sampling_gap_message() {
        let err = AttributionError::SamplingGap {
            time: DateTime::<Utc>::UNIX_EPOCH,
            lon: 77.0,
            lat: 28.5,
            reason: "outside time coverage",
        };
        assert_eq!(
            err.to_string(),
            "no wind sample at 1970-01-01 00:00:00 UTC (lon 77.0000, lat 28.5000): outside time coverage"
        );
    }

    #[test]
    fn test_invalid_parameter_message() {
        let err = AttributionError::invalid_parameter("step_hours", "must be positive, got 0");
        assert_eq!(
            err.to_string(),
            "invalid configuration: step_hours: must be positive, got 0"
        );
    }
}
