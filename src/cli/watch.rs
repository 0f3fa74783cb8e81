//! `watch` command: print overlay updates until Ctrl+C.

use std::sync::Arc;

use anyhow::Result;
use asset_overlay::logger;
use asset_overlay::{AssetDescriptor, OverlayRegistry, log};
use crossbeam::channel;

/// One line of `watch` output, `None` for updates not worth printing.
pub fn describe(prev: Option<&Arc<AssetDescriptor>>, next: Option<&Arc<AssetDescriptor>>) -> Option<String> {
    fn source(d: &AssetDescriptor) -> String {
        d.source().map_or_else(|| "-".to_string(), ToString::to_string)
    }

    match (prev, next) {
        (_, Some(next)) if next.is_directory() => None,
        (None, Some(next)) => Some(format!("added {} ({})", next.path(), source(next))),
        (Some(prev), Some(next)) if prev.path() != next.path() => Some(format!(
            "replaced {} with {} ({})",
            prev.path(),
            next.path(),
            source(next)
        )),
        (Some(_), Some(next)) => Some(format!("changed {} ({})", next.path(), source(next))),
        (Some(prev), None) if !prev.is_directory() => Some(format!("removed {}", prev.path())),
        _ => None,
    }
}

/// Block until Ctrl+C, printing every update of `registry`.
pub fn run_watch(registry: &OverlayRegistry) -> Result<()> {
    let hook = registry.on_update(Arc::new(
        |prev: Option<&Arc<AssetDescriptor>>, next: Option<&Arc<AssetDescriptor>>| {
            if let Some(line) = describe(prev, next) {
                log!("watch"; "{}", line);
            }
        },
    ));

    let (tx, rx) = channel::bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = tx.try_send(());
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))?;

    logger::set_timestamps(true);
    log!("watch"; "watching for changes, press Ctrl+C to stop");
    let _ = rx.recv();

    log!("watch"; "shutting down...");
    registry.off_update(hook);
    registry.dispose();
    Ok(())
}
