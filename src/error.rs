//! Error types for the overlay.
//!
//! Classification ambiguity and path conflicts are not errors: they are
//! reported as [`Diagnostic`](crate::overlay::Diagnostic)s and processing
//! continues. Everything here is a hard failure returned to the caller.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Overlay-related errors
#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("IO error when reading `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("archive error in `{0}`")]
    Zip(PathBuf, #[source] zip::result::ZipError),

    #[error("failed to watch `{0}`")]
    Watch(PathBuf, #[source] notify::Error),

    /// The file stayed locked by a writer for longer than the retry budget.
    #[error("`{path}` was not readable after {waited:?}")]
    ReadTimeout {
        path: PathBuf,
        waited: Duration,
        #[source]
        source: std::io::Error,
    },

    #[error("file `{entry}` not found in archive `{archive}`")]
    EntryNotFound { entry: String, archive: PathBuf },

    /// Operating on a source after it was disposed.
    #[error("source `{0}` has been disposed")]
    Disposed(String),

    #[error("no source registered with id {0}")]
    UnknownSource(u32),

    /// The descriptor has no backing content (synthesized directories).
    #[error("`{0}` has no readable content")]
    NotReadable(String),

    #[error("invalid ignore rules: {0}")]
    Ignore(#[from] ignore::Error),

    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),
}

pub type Result<T> = std::result::Result<T, OverlayError>;

impl OverlayError {
    /// Whether this error means the source itself is gone (as opposed to one asset failing).
    pub fn is_disposed(&self) -> bool {
        matches!(self, Self::Disposed(_))
    }
}
