use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::*;
use crate::asset::{AssetDraft, AssetType, Locator};
use crate::error::OverlayError;
use crate::reload::LiveAsset;
use crate::source::{ContentSource, SourceContext, SourceKind};

// ============================================================================
// Fixtures
// ============================================================================

/// In-memory source. Locators carry the content.
#[derive(Default)]
struct MemSource {
    name: String,
    files: Vec<(String, AssetDraft)>,
    fail_crawl: bool,
    fail_attach: bool,
    disposed: AtomicUsize,
    ctx: Mutex<Option<SourceContext>>,
}

impl MemSource {
    fn new(name: &str, paths: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            files: paths
                .iter()
                .map(|p| (p.to_string(), draft(&format!("{name}:{p}"))))
                .collect(),
            ..Default::default()
        })
    }

    fn failing(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            fail_crawl: true,
            ..Default::default()
        })
    }

    fn ctx(&self) -> SourceContext {
        self.ctx.lock().clone().unwrap()
    }

    fn disposed(&self) -> usize {
        self.disposed.load(Ordering::SeqCst)
    }
}

impl ContentSource for MemSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Bundle
    }

    fn crawl(&self) -> crate::error::Result<Vec<(String, AssetDraft)>> {
        if self.fail_crawl {
            let err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
            return Err(OverlayError::Io(self.name.clone().into(), err));
        }
        Ok(self.files.clone())
    }

    fn read(&self, locator: &Locator) -> crate::error::Result<Vec<u8>> {
        match locator {
            Locator::Embedded(content) => Ok(content.as_bytes().to_vec()),
            other => Err(OverlayError::NotReadable(other.to_string())),
        }
    }

    fn attach(&self, ctx: SourceContext) -> crate::error::Result<()> {
        if self.fail_attach {
            return Err(OverlayError::Watch(
                self.name.clone().into(),
                notify::Error::generic("no watcher"),
            ));
        }
        *self.ctx.lock() = Some(ctx);
        Ok(())
    }

    fn dispose(&self) {
        self.disposed.fetch_add(1, Ordering::SeqCst);
    }
}

fn draft(content: &str) -> AssetDraft {
    AssetDraft::new(Locator::Embedded(content.to_string()))
}

fn diagnostics(registry: &OverlayRegistry) -> Arc<Mutex<Vec<Diagnostic>>> {
    let sink = Arc::new(Mutex::new(Vec::new()));
    let writer = Arc::clone(&sink);
    registry.on_diagnostic(Arc::new(move |d: &Diagnostic| writer.lock().push(d.clone())));
    sink
}

type UpdateLog = Arc<Mutex<Vec<(Option<String>, Option<String>)>>>;

/// Records `(prev, next)` as `"source:path"` strings.
fn updates(registry: &OverlayRegistry) -> UpdateLog {
    fn label(d: Option<&Arc<AssetDescriptor>>) -> Option<String> {
        d.map(|d| format!("{}:{}", d.source().map_or("-", |s| s.name.as_ref()), d.path()))
    }

    let log = Arc::new(Mutex::new(Vec::new()));
    let writer = Arc::clone(&log);
    registry.on_update(Arc::new(
        move |prev: Option<&Arc<AssetDescriptor>>, next: Option<&Arc<AssetDescriptor>>| {
            writer.lock().push((label(prev), label(next)));
        },
    ));
    log
}

fn entry(prev: Option<&str>, next: Option<&str>) -> (Option<String>, Option<String>) {
    (prev.map(String::from), next.map(String::from))
}

#[derive(Default)]
struct Live {
    seen: Mutex<Vec<String>>,
}

impl LiveAsset for Live {
    fn reingest(&self, asset: &Arc<AssetDescriptor>) {
        self.seen.lock().push(asset.path().to_string());
    }
}

fn live() -> (Arc<Live>, Weak<dyn LiveAsset>) {
    let object = Arc::new(Live::default());
    let as_dyn: Arc<dyn LiveAsset> = object.clone();
    let weak = Arc::downgrade(&as_dyn);
    (object, weak)
}

fn source_name(registry: &OverlayRegistry, path: &str) -> String {
    registry.get(path).unwrap().source().unwrap().name.to_string()
}

// ============================================================================
// Namespace structure
// ============================================================================

#[test]
fn test_prefix_directories_exist() {
    let registry = OverlayRegistry::silent();
    registry
        .register_source(MemSource::new("A", &["Graphics/Atlases/Gui/icon.png"]))
        .unwrap();

    for dir in ["Graphics", "Graphics/Atlases", "Graphics/Atlases/Gui"] {
        assert!(registry.get(dir).unwrap().is_directory(), "{dir} should be a directory");
    }
    let icon = registry.get("Graphics/Atlases/Gui/icon").unwrap();
    assert_eq!(icon.kind(), &AssetType::Texture);
    assert_eq!(icon.format(), "png");
    assert_eq!(registry.len(), 4);

    let root: Vec<_> = registry.children("").iter().map(|d| d.path().to_string()).collect();
    assert_eq!(root, vec!["Graphics"]);
    let gui = registry.children("Graphics/Atlases/Gui");
    assert!(Arc::ptr_eq(&gui[0], &icon));
}

#[test]
fn test_try_insert_cascade_removal() {
    let registry = OverlayRegistry::silent();
    let path = "Graphics/Atlases/Gui/icon";
    let icon = Arc::new(AssetDescriptor::new(path, AssetType::Texture, "png", None, Locator::Synthetic));

    assert!(registry.try_insert(path, Some(icon)));
    assert!(registry.contains("Graphics/Atlases"));

    assert!(registry.try_insert(path, None));
    assert!(!registry.contains("Graphics"));
    assert!(registry.is_empty());
    assert!(registry.children("").is_empty());
}

#[test]
fn test_removing_one_of_two_children_keeps_directory() {
    let registry = OverlayRegistry::silent();
    for name in ["a", "b"] {
        let path = format!("Graphics/{name}");
        let d = Arc::new(AssetDescriptor::new(&path, AssetType::Texture, "png", None, Locator::Synthetic));
        assert!(registry.try_insert(&path, Some(d)));
    }

    assert!(registry.try_insert("Graphics/a", None));
    let remaining: Vec<_> = registry
        .children("Graphics")
        .iter()
        .map(|d| d.path().to_string())
        .collect();
    assert_eq!(remaining, vec!["Graphics/b"]);
}

#[test]
fn test_try_insert_rejects() {
    let registry = OverlayRegistry::silent();
    let a = Arc::new(AssetDescriptor::new("Graphics/a", AssetType::Texture, "png", None, Locator::Synthetic));

    // Path must match the descriptor
    assert!(!registry.try_insert("Graphics/b", Some(Arc::clone(&a))));
    // Directories are synthesized, never inserted
    assert!(!registry.try_insert("Maps", Some(Arc::new(AssetDescriptor::directory("Maps")))));

    assert!(registry.try_insert("Graphics/a", Some(a)));
    // Directories only disappear with their last child
    assert!(!registry.try_insert("Graphics", None));
    assert!(!registry.try_insert("", None));
    assert!(!registry.try_insert("Nothing/here", None));
}

#[test]
fn test_shadowed_directory() {
    let registry = OverlayRegistry::silent();
    let sink = diagnostics(&registry);
    registry.register_source(MemSource::new("A", &["Graphics/a.png", "Maps/x"])).unwrap();
    registry
        .register_source(MemSource::new("B", &["Graphics", "Maps/x/y.bin"]))
        .unwrap();

    assert!(registry.get("Graphics").unwrap().is_directory());
    assert!(registry.contains("Graphics/a"));
    assert!(!registry.contains("Maps/x/y"));
    assert_eq!(registry.get("Maps/x").unwrap().kind(), &AssetType::Unknown);

    let shadowed: Vec<_> = sink
        .lock()
        .iter()
        .filter(|d| matches!(d, Diagnostic::ShadowedDirectory { .. }))
        .map(|d| d.path().to_string())
        .collect();
    assert_eq!(shadowed, vec!["Graphics", "Maps/x/y"]);
}

#[test]
fn test_denied_and_root_assets_are_skipped() {
    let registry = OverlayRegistry::silent();
    registry
        .register_source(MemSource::new(
            "A",
            &["README.md", "Code/Module.cs", ".overlayignore", "__MACOSX/a.png", "Graphics/a.png"],
        ))
        .unwrap();

    let paths: Vec<_> = registry.snapshot().iter().map(|d| d.path().to_string()).collect();
    assert_eq!(paths, vec!["Graphics", "Graphics/a"]);
}

#[test]
fn test_pre_typed_draft_keeps_path() {
    let registry = OverlayRegistry::silent();
    let shader = AssetType::custom("shader", false);
    let source = Arc::new(MemSource {
        name: "A".into(),
        files: vec![("Effects/glow.fx".into(), draft("fx").typed(shader.clone(), "fx"))],
        ..Default::default()
    });
    registry.register_source(source).unwrap();

    let glow = registry.get("Effects/glow.fx").unwrap();
    assert_eq!(glow.kind(), &shader);
    assert!(registry.get_typed("Effects/./glow.fx", &shader).is_some());
    assert!(registry.get_typed("Effects/glow.fx", &AssetType::Texture).is_none());
}

// ============================================================================
// Conflicts
// ============================================================================

#[test]
fn test_conflict_second_wins() {
    let registry = OverlayRegistry::silent();
    let sink = diagnostics(&registry);
    registry.register_source(MemSource::new("A", &["Graphics/a.png"])).unwrap();
    registry.register_source(MemSource::new("B", &["Graphics/a.png"])).unwrap();

    assert_eq!(source_name(&registry, "Graphics/a"), "B");

    let conflicts: Vec<_> = sink
        .lock()
        .iter()
        .filter_map(|d| match d {
            Diagnostic::Conflict(c) => Some(c.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].path, "Graphics/a");
    assert_eq!(conflicts[0].existing.as_ref().unwrap().name.as_ref(), "A");
    assert_eq!(conflicts[0].incoming.as_ref().unwrap().name.as_ref(), "B");
    assert_eq!(registry.conflicts(), conflicts);
}

#[test]
fn test_non_conflicting_types_merge_silently() {
    let registry = OverlayRegistry::silent();
    let sink = diagnostics(&registry);
    registry.register_source(MemSource::new("A", &["Dialog/English.txt"])).unwrap();
    registry.register_source(MemSource::new("B", &["Dialog/English.txt"])).unwrap();

    assert_eq!(source_name(&registry, "Dialog/English"), "B");
    assert!(sink.lock().is_empty());
    assert!(registry.conflicts().is_empty());
}

#[test]
fn test_ambiguity_reported_once() {
    let registry = OverlayRegistry::silent();
    let sink = diagnostics(&registry);
    registry.register_source(MemSource::new("A", &["Graphics/a.png.png"])).unwrap();
    registry.register_source(MemSource::new("B", &["Graphics/a.png.png"])).unwrap();

    let doubled = sink
        .lock()
        .iter()
        .filter(|d| matches!(d, Diagnostic::DoubledExtension { .. }))
        .count();
    assert_eq!(doubled, 1);
}

// ============================================================================
// Aliases and fallback
// ============================================================================

#[test]
fn test_aliases_reach_shadowed_assets() {
    let registry = OverlayRegistry::silent();
    registry.register_source(MemSource::new("A", &["Graphics/a.png"])).unwrap();
    registry.register_source(MemSource::new("B", &["Graphics/a.png"])).unwrap();

    let a = registry.get("A:/Graphics/a").unwrap();
    let b = registry.get("B:/Graphics/a").unwrap();
    assert_eq!(registry.read(&a).unwrap(), b"A:Graphics/a.png");
    assert_eq!(registry.read(&b).unwrap(), b"B:Graphics/a.png");
    assert!(Arc::ptr_eq(&b, &registry.get("Graphics/a").unwrap()));
    assert!(registry.get("C:/Graphics/a").is_none());
}

#[test]
fn test_unregister_falls_back_to_earlier_source() {
    let registry = OverlayRegistry::silent();
    registry.register_source(MemSource::new("A", &["Graphics/a.png"])).unwrap();
    let b = registry.register_source(MemSource::new("B", &["Graphics/a.png"])).unwrap();
    let log = updates(&registry);

    registry.unregister_source(b).unwrap();
    assert_eq!(source_name(&registry, "Graphics/a"), "A");
    assert!(registry.get("B:/Graphics/a").is_none());
    assert_eq!(
        *log.lock(),
        vec![
            entry(Some("B:Graphics/a"), None),
            entry(None, Some("A:Graphics/a")),
        ]
    );
}

#[test]
fn test_unregister_shadowed_source_is_silent() {
    let registry = OverlayRegistry::silent();
    let a = registry.register_source(MemSource::new("A", &["Graphics/a.png"])).unwrap();
    registry.register_source(MemSource::new("B", &["Graphics/a.png"])).unwrap();
    let log = updates(&registry);

    registry.unregister_source(a).unwrap();
    assert_eq!(source_name(&registry, "Graphics/a"), "B");
    assert!(registry.get("A:/Graphics/a").is_none());
    assert!(log.lock().is_empty());
}

// ============================================================================
// Registration
// ============================================================================

#[test]
fn test_initial_load_is_quiet() {
    let registry = OverlayRegistry::silent();
    let log = updates(&registry);
    registry.register_source(MemSource::new("A", &["Graphics/a.png"])).unwrap();
    assert!(log.lock().is_empty());
    assert!(!registry.is_loaded());
}

#[test]
fn test_late_registration_notifies_every_asset() {
    let registry = OverlayRegistry::silent();
    registry.register_source(MemSource::new("A", &["Graphics/a.png"])).unwrap();
    registry.finish_initial_load();

    let log = updates(&registry);
    let (graphics, weak) = live();
    registry.register_live("Graphics", weak);

    registry
        .register_source(MemSource::new(
            "B",
            &["Graphics/a.png", "Graphics/b.png", "Graphics/c.png", "Maps/1.bin"],
        ))
        .unwrap();

    // The override is reported against the asset it replaces
    assert_eq!(
        *log.lock(),
        vec![
            entry(Some("A:Graphics/a"), Some("B:Graphics/a")),
            entry(None, Some("B:Graphics/b")),
            entry(None, Some("B:Graphics/c")),
            entry(None, Some("B:Maps/1")),
        ]
    );
    assert_eq!(*graphics.seen.lock(), vec!["Graphics/a", "Graphics/b", "Graphics/c"]);
    assert_eq!(registry.conflicts().len(), 1);
}

#[test]
fn test_register_sources_keeps_going_after_failure() {
    let registry = OverlayRegistry::silent();
    let sources: Vec<Arc<dyn ContentSource>> = vec![
        MemSource::new("A", &["Graphics/a.png"]),
        MemSource::failing("Broken"),
        MemSource::new("B", &["Maps/1.bin"]),
    ];

    let results = registry.register_sources(sources);
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(OverlayError::Io(..))));
    assert!(results[2].is_ok());

    assert!(registry.contains("Graphics/a"));
    assert!(registry.contains("Maps/1"));
    let names: Vec<_> = registry.sources().iter().map(|s| s.name.to_string()).collect();
    assert_eq!(names, vec!["A", "B"]);
}

#[test]
fn test_attach_failure_unregisters() {
    let registry = OverlayRegistry::silent();
    let source = Arc::new(MemSource {
        name: "A".into(),
        files: vec![("Graphics/a.png".into(), draft("a"))],
        fail_attach: true,
        ..Default::default()
    });

    let result = registry.register_source(source.clone());
    assert!(matches!(result, Err(OverlayError::Watch(..))));
    assert!(registry.is_empty());
    assert!(registry.sources().is_empty());
    assert_eq!(source.disposed(), 1);
}

#[test]
fn test_source_assets_and_unknown_source() {
    let registry = OverlayRegistry::silent();
    let id = registry
        .register_source(MemSource::new("A", &["Graphics/a.png", "Maps/1.bin"]))
        .unwrap();

    let owned: Vec<_> = registry
        .source_assets(id)
        .unwrap()
        .iter()
        .map(|d| d.path().to_string())
        .collect();
    assert_eq!(owned, vec!["Graphics/a", "Maps/1"]);

    registry.unregister_source(id).unwrap();
    assert!(registry.is_empty());
    assert!(matches!(registry.unregister_source(id), Err(OverlayError::UnknownSource(_))));
    assert!(matches!(registry.source_assets(id), Err(OverlayError::UnknownSource(_))));
}

// ============================================================================
// Source updates
// ============================================================================

#[test]
fn test_replacement_keeps_identity_fields() {
    let registry = OverlayRegistry::silent();
    let source = MemSource::new("A", &["Dialog/English.txt"]);
    registry.register_source(source.clone()).unwrap();
    let before = registry.get("Dialog/English").unwrap();
    let log = updates(&registry);

    source
        .ctx()
        .update(Some("Dialog/English.txt"), Some(("Dialog/English.txt", draft("v2"))))
        .unwrap();

    let after = registry.get("Dialog/English").unwrap();
    assert!(!Arc::ptr_eq(&before, &after));
    assert_eq!(after.kind(), before.kind());
    assert_eq!(after.format(), before.format());
    assert_eq!(registry.read(&after).unwrap(), b"v2");
    assert_eq!(
        *log.lock(),
        vec![entry(Some("A:Dialog/English"), Some("A:Dialog/English"))]
    );
}

#[test]
fn test_rename_is_remove_plus_insert() {
    let registry = OverlayRegistry::silent();
    let source = MemSource::new("A", &["Graphics/a.png"]);
    registry.register_source(source.clone()).unwrap();
    let log = updates(&registry);

    source
        .ctx()
        .update(Some("Graphics/a.png"), Some(("Maps/a.bin", draft("moved"))))
        .unwrap();

    assert!(!registry.contains("Graphics/a"));
    assert!(!registry.contains("Graphics"));
    assert_eq!(registry.get("Maps/a").unwrap().kind(), &AssetType::Map);
    assert_eq!(
        *log.lock(),
        vec![
            entry(Some("A:Graphics/a"), None),
            entry(None, Some("A:Maps/a")),
        ]
    );
}

#[test]
fn test_retract_folder_cascades() {
    let registry = OverlayRegistry::silent();
    let source = MemSource::new(
        "A",
        &["Graphics/Gui/a.png", "Graphics/Gui/Deep/b.png", "Graphics/c.png"],
    );
    registry.register_source(source.clone()).unwrap();

    source.ctx().update(Some("Graphics/Gui"), None).unwrap();
    assert!(!registry.contains("Graphics/Gui"));
    assert!(!registry.contains("Graphics/Gui/Deep/b"));
    assert!(registry.contains("Graphics/c"));
    assert_eq!(registry.children("Graphics").len(), 1);
}

#[test]
fn test_add_all_and_unknown_paths() {
    let registry = OverlayRegistry::silent();
    let source = MemSource::new("A", &[]);
    registry.register_source(source.clone()).unwrap();

    let ctx = source.ctx();
    ctx.add_all(vec![
        ("Tutorials/a.bin".into(), draft("a")),
        ("Tutorials/b.bin".into(), draft("b")),
    ])
    .unwrap();
    assert_eq!(registry.children("Tutorials").len(), 2);

    // Removing something the source never had is a no-op
    ctx.update(Some("Nope/x.png"), None).unwrap();
    assert_eq!(registry.len(), 3);
}

#[test]
fn test_context_outlives_registry() {
    let source = MemSource::new("A", &["Graphics/a.png"]);
    let registry = OverlayRegistry::silent();
    registry.register_source(source.clone()).unwrap();
    let ctx = source.ctx();
    assert_eq!(ctx.id(), registry.sources()[0].id);

    drop(registry);
    assert_eq!(source.disposed(), 1);
    let err = ctx.update(Some("Graphics/a.png"), None).unwrap_err();
    assert!(err.is_disposed());
}

// ============================================================================
// Live objects
// ============================================================================

#[test]
fn test_check_out_delivers_immediately() {
    let registry = OverlayRegistry::silent();
    let source = MemSource::new("A", &["Graphics/a.png"]);
    registry.register_source(source.clone()).unwrap();
    registry.finish_initial_load();

    let loads = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&loads);
    registry.on_load(Arc::new(move |_: &str, found: Option<&Arc<AssetDescriptor>>| {
        assert!(found.is_some());
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    let (object, weak) = live();
    let found = registry.check_out("Graphics/./a", weak).unwrap();
    assert_eq!(found.path(), "Graphics/a");
    assert_eq!(*object.seen.lock(), vec!["Graphics/a"]);
    assert_eq!(loads.load(Ordering::SeqCst), 1);

    source
        .ctx()
        .update(Some("Graphics/a.png"), Some(("Graphics/a.png", draft("v2"))))
        .unwrap();
    assert_eq!(object.seen.lock().len(), 2);
}

#[test]
fn test_check_out_missing_still_registers() {
    let registry = OverlayRegistry::silent();
    registry.finish_initial_load();
    let loads = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&loads);
    registry.on_load(Arc::new(move |path: &str, found: Option<&Arc<AssetDescriptor>>| {
        seen.lock().push((path.to_string(), found.is_some()));
    }));

    let (object, weak) = live();
    assert!(registry.check_out("Graphics/later", weak).is_none());
    // Load observers see the request even though nothing is mapped
    assert_eq!(*loads.lock(), vec![("Graphics/later".to_string(), false)]);

    registry.register_source(MemSource::new("A", &["Graphics/later.png"])).unwrap();
    assert_eq!(*object.seen.lock(), vec!["Graphics/later"]);
}

#[test]
fn test_dropped_live_object_is_skipped() {
    let registry = OverlayRegistry::silent();
    registry.finish_initial_load();
    let (object, weak) = live();
    registry.register_live("Graphics", weak);
    drop(object);

    registry.register_source(MemSource::new("A", &["Graphics/a.png"])).unwrap();
    assert!(registry.broker().is_empty());
}

#[test]
fn test_removal_does_not_notify_live_objects() {
    let registry = OverlayRegistry::silent();
    let source = MemSource::new("A", &["Graphics/a.png"]);
    registry.register_source(source.clone()).unwrap();
    let (object, weak) = live();
    registry.register_live("Graphics/a", weak);

    source.ctx().update(Some("Graphics/a.png"), None).unwrap();
    assert!(object.seen.lock().is_empty());
}

// ============================================================================
// Observers and teardown
// ============================================================================

#[test]
fn test_observers_run_in_order_and_deregister() {
    let registry = OverlayRegistry::silent();
    registry.finish_initial_load();
    let order = Arc::new(Mutex::new(Vec::new()));

    let mut ids = Vec::new();
    for tag in ["first", "second"] {
        let order = Arc::clone(&order);
        ids.push(registry.on_update(Arc::new(
            move |_: Option<&Arc<AssetDescriptor>>, _: Option<&Arc<AssetDescriptor>>| {
                order.lock().push(tag);
            },
        )));
    }

    registry.register_source(MemSource::new("A", &["a.png"])).unwrap();
    assert_eq!(*order.lock(), vec!["first", "second"]);

    assert!(registry.off_update(ids[0]));
    assert!(!registry.off_update(ids[0]));
    registry.register_source(MemSource::new("B", &["b.png"])).unwrap();
    assert_eq!(*order.lock(), vec!["first", "second", "second"]);
}

#[test]
fn test_update_without_change_is_silent() {
    let registry = OverlayRegistry::silent();
    let log = updates(&registry);
    let ghost = Arc::new(AssetDescriptor::new("a", AssetType::Texture, "png", None, Locator::Synthetic));
    assert!(!registry.update(Some(ghost), None));
    assert!(!registry.update(None, None));
    assert!(log.lock().is_empty());
}

#[test]
fn test_read_directory_is_not_readable() {
    let registry = OverlayRegistry::silent();
    registry.register_source(MemSource::new("A", &["Graphics/a.png"])).unwrap();
    let dir = registry.get("Graphics").unwrap();
    assert!(matches!(registry.read(&dir), Err(OverlayError::NotReadable(_))));
}

#[test]
fn test_dispose_is_idempotent() {
    let registry = OverlayRegistry::silent();
    let a = MemSource::new("A", &["Graphics/a.png"]);
    let b = MemSource::new("B", &["Maps/1.bin"]);
    registry.register_source(a.clone()).unwrap();
    registry.register_source(b.clone()).unwrap();

    registry.dispose();
    registry.dispose();

    assert!(registry.is_disposed());
    assert_eq!(a.disposed(), 1);
    assert_eq!(b.disposed(), 1);
    assert!(registry.is_empty());
    assert!(registry.get("").unwrap().children().is_empty());
    assert!(registry.conflicts().is_empty());

    let late = registry.register_source(MemSource::new("C", &["c.png"]));
    assert!(late.unwrap_err().is_disposed());

    drop(registry);
    assert_eq!(a.disposed(), 1);
}
