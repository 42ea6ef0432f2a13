//! Bar series stored as a JSON array on disk.

use std::path::{Path, PathBuf};

use crate::domain::market_data::Bar;

/// Failure loading a bar file.
#[derive(Debug, thiserror::Error)]
pub enum BarFileError {
    /// File could not be read.
    #[error("Failed to read bar file {path}: {source}")]
    Read {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Contents are not a valid bar array.
    #[error("Failed to parse bar file {path}: {source}")]
    Parse {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
}

/// Load every bar in `path`, in file order.
///
/// Each entry carries `symbol`, `timeframe`, `close_time`, `open`, `high`,
/// `low`, `close` and an optional `volume`.
///
/// # Errors
///
/// Returns [`BarFileError`] if the file is missing or a bar fails validation.
pub fn read_bars(path: impl AsRef<Path>) -> Result<Vec<Bar>, BarFileError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|source| BarFileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let bars: Vec<Bar> = serde_json::from_str(&raw).map_err(|source| BarFileError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), count = bars.len(), "Loaded bar file");
    Ok(bars)
}
