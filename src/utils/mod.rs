//! Utility modules for the asset overlay.

pub mod path;
pub mod plural;
pub mod retry;

pub use plural::{plural_count, plural_s};
