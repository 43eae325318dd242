//! Loading per-period wind grids from disk
//!
//! Each period file is a JSON document with the reanalysis coordinates and flat
//! component arrays (`null` marks a missing sample):
//!
//! ```json
//! {
//!   "time": ["2023-01-01T00:00:00Z", "2023-01-02T00:00:00Z"],
//!   "latitude": [29.0, 28.75, 28.5],
//!   "longitude": [76.5, 76.75],
//!   "u": [/* n_time * n_lat * n_lon values, [time][lat][lon] order */],
//!   "v": [/* same layout */]
//! }
//! ```
//!
//! Files are visited in file-name order so that "first occurrence wins" for duplicated
//! timestamps is reproducible. A corrupt or incompatible file is skipped with a warning;
//! only a directory with no usable file at all is an error.

use crate::core_types::Period;
use crate::error::{AttributionError, Result};
use crate::grid::wind_field::{WindField, WindFrame};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Coordinates must agree to this many degrees to be considered the same mesh
const MESH_TOLERANCE: f64 = 1e-6;

/// On-disk layout of one period file
#[derive(Debug, Deserialize)]
struct WindPeriodFile {
    time: Vec<DateTime<Utc>>,
    latitude: Vec<f64>,
    longitude: Vec<f64>,
    u: Vec<Option<f64>>,
    v: Vec<Option<f64>>,
}

/// A parsed, shape-checked period
#[derive(Debug)]
struct WindPeriod {
    latitude: Vec<f64>,
    longitude: Vec<f64>,
    frames: Vec<WindFrame>,
}

/// Options controlling how period files are merged
#[derive(Debug, Clone, Default)]
pub struct WindStoreOptions {
    /// Average the merged field over calendar periods (e.g. hourly → daily)
    pub resample: Option<Period>,
}

/// Directory of per-period wind grids
#[derive(Debug, Clone)]
pub struct WindFieldStore {
    dir: PathBuf,
    options: WindStoreOptions,
}

impl WindFieldStore {
    pub fn new(dir: impl Into<PathBuf>, options: WindStoreOptions) -> Self {
        Self {
            dir: dir.into(),
            options,
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load and merge every period file in the directory
    ///
    /// # Errors
    /// [`AttributionError::DataUnavailable`] when the directory cannot be listed, holds
    /// no period files, or every file fails to parse.
    pub fn load(&self) -> Result<WindField> {
        let files = self.period_files()?;
        if files.is_empty() {
            return Err(AttributionError::DataUnavailable(format!(
                "no wind period files found in {}",
                self.dir.display()
            )));
        }
        info!("Found {} wind period files in {}", files.len(), self.dir.display());

        let mut mesh: Option<(Vec<f64>, Vec<f64>)> = None;
        let mut frames = Vec::new();
        let mut loaded = 0usize;

        for path in &files {
            let period = match read_period_file(path) {
                Ok(period) => period,
                Err(e) => {
                    warn!("Skipping wind file: {e}");
                    continue;
                }
            };

            if let Some((lat, lon)) = &mesh {
                if !same_axis(lat, &period.latitude) || !same_axis(lon, &period.longitude) {
                    warn!(
                        "Skipping wind file {}: latitude/longitude mesh differs from earlier files",
                        path.display()
                    );
                    continue;
                }
            } else {
                mesh = Some((period.latitude.clone(), period.longitude.clone()));
            }

            debug!("Loaded {} timestamps from {}", period.frames.len(), path.display());
            frames.extend(period.frames);
            loaded += 1;
        }

        let Some((latitude, longitude)) = mesh.filter(|_| loaded > 0) else {
            return Err(AttributionError::DataUnavailable(format!(
                "all {} wind files in {} failed to load",
                files.len(),
                self.dir.display()
            )));
        };

        let mut field = WindField::from_frames(latitude, longitude, frames)?;
        if let Some(period) = self.options.resample {
            field = field.resample(period)?;
            debug!("Resampled wind field to {:?} means", period);
        }

        let (nt, nlat, nlon) = field.shape();
        info!(
            "Loaded {} timestamps of wind data ({}x{} grid) from {}/{} files",
            nt,
            nlat,
            nlon,
            loaded,
            files.len()
        );
        Ok(field)
    }

    /// `*.json` files in the directory, sorted by name
    fn period_files(&self) -> Result<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.dir).map_err(|e| {
            AttributionError::DataUnavailable(format!(
                "cannot read wind directory {}: {e}",
                self.dir.display()
            ))
        })?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        files.sort();
        Ok(files)
    }
}

fn read_period_file(path: &Path) -> Result<WindPeriod> {
    let contents = fs::read_to_string(path).map_err(|e| AttributionError::io(path, e))?;
    let file: WindPeriodFile =
        serde_json::from_str(&contents).map_err(|e| AttributionError::parse(path, e))?;

    if file.time.is_empty() {
        return Err(AttributionError::malformed(path, "no timestamps"));
    }
    if file.latitude.is_empty() || file.longitude.is_empty() {
        return Err(AttributionError::malformed(path, "empty latitude/longitude axis"));
    }

    let cells = file.latitude.len() * file.longitude.len();
    let expected = file.time.len() * cells;
    if file.u.len() != expected || file.v.len() != expected {
        return Err(AttributionError::malformed(
            path,
            format!(
                "u/v hold {}/{} values, expected {expected} (time x lat x lon)",
                file.u.len(),
                file.v.len()
            ),
        ));
    }

    let to_f64 = |x: &Option<f64>| x.unwrap_or(f64::NAN);
    let frames = file
        .time
        .iter()
        .enumerate()
        .map(|(it, &time)| {
            let range = it * cells..(it + 1) * cells;
            WindFrame {
                time,
                u: file.u[range.clone()].iter().map(to_f64).collect(),
                v: file.v[range].iter().map(to_f64).collect(),
            }
        })
        .collect();

    Ok(WindPeriod {
        latitude: file.latitude,
        longitude: file.longitude,
        frames,
    })
}

fn same_axis(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() <= MESH_TOLERANCE)
}
