//! `[watch]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [watch]
//! enabled = true          # Watch mounted folders for changes
//! debounce_ms = 100       # Quiet period before a changed file is reloaded
//! read_retry_ms = 2000    # How long to wait for a writer to release a file
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::source::WatchOptions;

/// Folder watching settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatchConfig {
    pub enabled: bool,
    pub debounce_ms: u64,
    pub read_retry_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: 100,
            read_retry_ms: 2000,
        }
    }
}

impl WatchConfig {
    pub fn options(&self) -> WatchOptions {
        WatchOptions {
            enabled: self.enabled,
            debounce: Duration::from_millis(self.debounce_ms),
            read_retry: Duration::from_millis(self.read_retry_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::OverlayConfig;

    #[test]
    fn test_watch_config() {
        let config = OverlayConfig::parse("[watch]\nenabled = false\ndebounce_ms = 250").unwrap();
        assert!(!config.watch.enabled);

        let options = config.watch.options();
        assert_eq!(options.debounce.as_millis(), 250);
        assert_eq!(options.read_retry.as_millis(), 2000);
    }
}
