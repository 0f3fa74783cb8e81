//! `list` command: print the merged tree.

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::Result;
use asset_overlay::{AssetDescriptor, OverlayRegistry};
use owo_colors::OwoColorize;
use serde::Serialize;

/// One row of `list --json`.
#[derive(Debug, Serialize)]
pub struct ListEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub locator: String,
}

impl From<&Arc<AssetDescriptor>> for ListEntry {
    fn from(descriptor: &Arc<AssetDescriptor>) -> Self {
        Self {
            path: descriptor.path().to_string(),
            kind: descriptor.kind().to_string(),
            format: descriptor.format().to_string(),
            source: descriptor.source().map(ToString::to_string),
            locator: descriptor.locator().to_string(),
        }
    }
}

/// Descriptors under `prefix`, directories only when `dirs` is set.
pub fn collect(registry: &OverlayRegistry, prefix: Option<&str>, dirs: bool) -> Vec<ListEntry> {
    registry
        .snapshot()
        .iter()
        .filter(|d| dirs || !d.is_directory())
        .filter(|d| prefix.is_none_or(|p| d.path().starts_with(p)))
        .map(ListEntry::from)
        .collect()
}

pub fn run_list(registry: &OverlayRegistry, prefix: Option<&str>, dirs: bool, json: bool) -> Result<()> {
    let entries = collect(registry, prefix, dirs);
    let mut out = io::stdout().lock();

    if json {
        serde_json::to_writer_pretty(&mut out, &entries)?;
        writeln!(out)?;
        return Ok(());
    }

    for entry in &entries {
        let source = entry.source.as_deref().unwrap_or("-");
        writeln!(out, "{}  {}  {}", entry.path, entry.kind.dimmed(), source.cyan())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use asset_overlay::source::{ContentSource, DirectorySource, WatchOptions};
    use std::fs;

    fn registry_with(files: &[&str]) -> (tempfile::TempDir, OverlayRegistry) {
        let dir = tempfile::tempdir().unwrap();
        for file in files {
            let path = dir.path().join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, b"x").unwrap();
        }
        let source: Arc<dyn ContentSource> = Arc::new(DirectorySource::new(dir.path()).with_options(WatchOptions {
            enabled: false,
            ..Default::default()
        }));
        let registry = OverlayRegistry::silent();
        registry.register_source(source).unwrap();
        (dir, registry)
    }

    #[test]
    fn test_collect_filters() {
        let (_dir, registry) = registry_with(&["Graphics/a.png", "Maps/b.bin"]);

        let files: Vec<_> = collect(&registry, None, false).into_iter().map(|e| e.path).collect();
        assert_eq!(files, ["Graphics/a", "Maps/b"]);

        let graphics: Vec<_> = collect(&registry, Some("Graphics"), true)
            .into_iter()
            .map(|e| e.path)
            .collect();
        assert_eq!(graphics, ["Graphics", "Graphics/a"]);
    }

    #[test]
    fn test_entry_json() {
        let (_dir, registry) = registry_with(&["Graphics/a.png"]);
        let entries = collect(&registry, None, true);
        let json = serde_json::to_value(&entries).unwrap();

        assert_eq!(json[0]["path"], "Graphics");
        assert!(json[0].get("format").is_none());
        assert!(json[0].get("source").is_none());
        assert_eq!(json[1]["type"], "texture");
        assert_eq!(json[1]["format"], "png");
    }
}
