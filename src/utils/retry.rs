//! Bounded retry for reading files that a writer may still hold open.

use std::fs::File;
use std::io;
use std::path::Path;
use std::time::{Duration, Instant};

use crate::error::{OverlayError, Result};

/// Pause between open attempts.
const RETRY_INTERVAL: Duration = Duration::from_millis(20);

/// Wait until `path` can be opened for reading, for at most `budget`.
///
/// A path that no longer exists is not an error: the caller will observe
/// the removal through its own existence check.
pub fn wait_until_readable(path: &Path, budget: Duration) -> Result<()> {
    retry_open(path, budget, |p| File::open(p).map(drop))
}

/// Retry `open` until it succeeds, the path disappears, or `budget` elapses.
pub(crate) fn retry_open<T>(
    path: &Path,
    budget: Duration,
    mut open: impl FnMut(&Path) -> io::Result<T>,
) -> Result<()> {
    let start = Instant::now();
    while path.exists() {
        match open(path) {
            Ok(_) => return Ok(()),
            Err(source) if start.elapsed() >= budget => {
                return Err(OverlayError::ReadTimeout {
                    path: path.to_path_buf(),
                    waited: start.elapsed(),
                    source,
                });
            }
            Err(_) => std::thread::sleep(RETRY_INTERVAL),
        }
    }
    Ok(())
}
