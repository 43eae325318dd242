//! JSON input and output for the pipeline
//!
//! Inputs live in the processed-data directory as `<code>_timeseries.json` and
//! `<code>_composite.json`. Outputs are written to a temporary sibling first and
//! renamed into place, so a failed run never leaves a truncated file behind.

use crate::core_types::PollutantSeries;
use crate::error::{AttributionError, Result};
use crate::grid::spatial_field::{SpatialField, SpatialFieldFile};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

#[must_use]
pub fn timeseries_path(dir: &Path, code: &str) -> PathBuf {
    dir.join(format!("{code}_timeseries.json"))
}

#[must_use]
pub fn composite_path(dir: &Path, code: &str) -> PathBuf {
    dir.join(format!("{code}_composite.json"))
}

/// Output file `<code>_<kind>.json` in `dir`
#[must_use]
pub fn output_path(dir: &Path, code: &str, kind: &str) -> PathBuf {
    dir.join(format!("{code}_{kind}.json"))
}

/// Read and deserialize a JSON file
///
/// # Errors
/// [`AttributionError::DataUnavailable`] when the file does not exist, otherwise
/// [`AttributionError::Io`] or [`AttributionError::Parse`].
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(AttributionError::DataUnavailable(format!(
                "{} not found",
                path.display()
            )))
        }
        Err(e) => return Err(AttributionError::io(path, e)),
    };
    serde_json::from_str(&contents).map_err(|e| AttributionError::parse(path, e))
}

/// Serialize `value` as pretty JSON and move it into place at `path`
///
/// # Errors
/// [`AttributionError::Serialize`] or [`AttributionError::Io`]; the temporary file
/// is removed on failure.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let contents = serde_json::to_string_pretty(value).map_err(|e| AttributionError::Serialize {
        what: path.display().to_string(),
        source: e,
    })?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let result = fs::write(&tmp, contents).and_then(|()| fs::rename(&tmp, path));
    if let Err(e) = result {
        let _ = fs::remove_file(&tmp);
        return Err(AttributionError::io(path, e));
    }

    debug!("Wrote {}", path.display());
    Ok(())
}

/// Load a pollutant series (`[{"date": ..., "value": ...}]`)
///
/// # Errors
/// See [`read_json`].
pub fn load_series(path: &Path) -> Result<PollutantSeries> {
    read_json(path)
}

/// Load a gridded composite
///
/// # Errors
/// See [`read_json`]; [`AttributionError::Malformed`] when the value array does not
/// match the coordinate axes.
pub fn load_spatial_field(path: &Path) -> Result<SpatialField> {
    let file: SpatialFieldFile = read_json(path)?;
    SpatialField::from_file(path, file)
}
