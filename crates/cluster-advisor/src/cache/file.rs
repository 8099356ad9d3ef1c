//! JSON file cache
//!
//! Layout: `written_at`, the shared `dates`, and one `{ticker, values}` row
//! per asset in matrix order. Floats round-trip exactly, so a reloaded
//! matrix clusters identically to the freshly built one.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{CachedMatrix, FeatureCache};
use crate::error::{ClusterError, Result};
use crate::model::FeatureMatrix;

#[derive(Serialize, Deserialize)]
struct CacheFile {
    written_at: DateTime<Utc>,
    dates: Vec<NaiveDate>,
    rows: Vec<CacheRow>,
}

#[derive(Serialize, Deserialize)]
struct CacheRow {
    ticker: String,
    values: Vec<f64>,
}

/// Feature matrix persisted to a single JSON file
pub struct FileFeatureCache {
    path: PathBuf,
}

impl FileFeatureCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write with an explicit timestamp
    pub fn write_at(&self, matrix: &FeatureMatrix, written_at: DateTime<Utc>) -> Result<()> {
        let file = CacheFile {
            written_at,
            dates: matrix.dates().to_vec(),
            rows: matrix
                .iter()
                .map(|(ticker, values)| CacheRow {
                    ticker: ticker.to_string(),
                    values: values.to_vec(),
                })
                .collect(),
        };
        let body = serde_json::to_vec_pretty(&file)?;

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }

        // never leave a half-written file behind
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, body)?;
        fs::rename(&tmp, &self.path)?;

        debug!(path = %self.path.display(), assets = matrix.n_assets(), "feature cache written");
        Ok(())
    }
}

impl FeatureCache for FileFeatureCache {
    fn read(&self) -> Result<Option<CachedMatrix>> {
        let body = match fs::read(&self.path) {
            Ok(body) => body,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let file: CacheFile = serde_json::from_slice(&body)?;
        let (tickers, rows): (Vec<String>, Vec<Vec<f64>>) = file.rows.into_iter().map(|r| (r.ticker, r.values)).unzip();
        let matrix = FeatureMatrix::new(tickers, file.dates, rows)
            .map_err(|e| ClusterError::Cache(format!("{}: {e}", self.path.display())))?;

        Ok(Some(CachedMatrix::new(matrix, file.written_at)))
    }

    fn write(&self, matrix: &FeatureMatrix) -> Result<()> {
        self.write_at(matrix, Utc::now())
    }
}
