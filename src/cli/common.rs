//! Mounting shared by the commands.

use std::path::PathBuf;

use anyhow::{Result, bail};
use asset_overlay::config::OverlayConfig;
use asset_overlay::utils::{path::normalize_fs_path, plural_count, plural_s};
use asset_overlay::{OverlayRegistry, debug, debug_do, log};

/// Mount `sources` (or `[mount] paths` when empty) into a fresh overlay.
///
/// Failing sources are logged and skipped; mounting nothing is an error.
/// `quiet` keeps diagnostics and the summary off stdout (JSON output).
pub fn mount(config: &OverlayConfig, sources: &[PathBuf], quiet: bool) -> Result<OverlayRegistry> {
    let sources = if sources.is_empty() {
        config.sources()
    } else {
        sources
            .iter()
            .map(|path| config.source_for(&normalize_fs_path(path)))
            .collect()
    };
    if sources.is_empty() {
        bail!(
            "nothing to mount: pass sources or set [mount] paths in {}",
            config.config_path.display()
        );
    }

    let requested = sources.len();
    let registry = if quiet { OverlayRegistry::silent() } else { OverlayRegistry::new() };
    let mounted = registry
        .register_sources(sources)
        .into_iter()
        .filter(|result| result.is_ok())
        .count();
    registry.finish_initial_load();

    if !quiet {
        log!("content"; "mounted {}/{} source{}, {}",
            mounted, requested, plural_s(requested), plural_count(registry.len(), "path"));
    }
    debug_do! {
        for source in registry.sources() {
            debug!("content"; "{} {}", source.id, source.name);
        }
    }
    Ok(registry)
}
