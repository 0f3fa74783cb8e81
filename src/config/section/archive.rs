//! `[archive]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [archive]
//! idle_close_secs = 10    # Close an unused zip handle after this long
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Archive handle settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArchiveConfig {
    pub idle_close_secs: u64,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self { idle_close_secs: 10 }
    }
}

impl ArchiveConfig {
    pub fn idle_close(&self) -> Duration {
        Duration::from_secs(self.idle_close_secs)
    }
}
