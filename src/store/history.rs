//! JSON file store for historic probe data.

use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

use super::models::*;

/// Historic store error types.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed historic data in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to replace {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: tempfile::PersistError,
    },
}

/// Whole-file store: every save rewrites the complete series.
///
/// Single writer only. No locking is performed.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the series. A missing file is an empty store.
    pub fn load(&self) -> Result<HistoricSeries, StoreError> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!("No historic data at {}, starting empty", self.path.display());
                return Ok(HistoricSeries::new());
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let series: HistoricSeries =
            serde_json::from_reader(BufReader::new(file)).map_err(|source| StoreError::Json {
                path: self.path.clone(),
                source,
            })?;

        tracing::info!(
            "Loaded historic data for {} services from {}",
            series.len(),
            self.path.display()
        );
        Ok(series)
    }

    /// Overwrite the store with `series`.
    ///
    /// Writes to a temporary file next to the store and renames it into
    /// place, so a crash mid-write leaves the previous file intact.
    pub fn save(&self, series: &HistoricSeries) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        std::fs::create_dir_all(&dir).map_err(io_err)?;
        let tmp = NamedTempFile::new_in(&dir).map_err(io_err)?;

        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer_pretty(&mut writer, series).map_err(|source| StoreError::Json {
                path: self.path.clone(),
                source,
            })?;
            writer.flush().map_err(io_err)?;
        }
        tmp.as_file().sync_all().map_err(io_err)?;

        tmp.persist(&self.path).map_err(|source| StoreError::Persist {
            path: self.path.clone(),
            source,
        })?;

        tracing::debug!("Saved historic data for {} services to {}", series.len(), self.path.display());
        Ok(())
    }
}
