//! Configuration section definitions.

mod archive;
mod bundle;
mod mount;
mod watch;

pub use archive::ArchiveConfig;
pub use bundle::BundleConfig;
pub use mount::MountConfig;
pub use watch::WatchConfig;
