//! `[bundle]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [bundle]
//! root_prefix = "Content/"   # Embedded resources outside this prefix are skipped
//! ```

use serde::{Deserialize, Serialize};

use crate::source::BundleSource;

/// Embedded resource settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BundleConfig {
    pub root_prefix: String,
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            root_prefix: BundleSource::DEFAULT_ROOT_PREFIX.to_string(),
        }
    }
}
