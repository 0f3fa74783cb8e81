//! Non-fatal overlay diagnostics.
//!
//! Path conflicts and misnamed files never stop a load. They are collected
//! as [`Diagnostic`]s, handed to the registry's diagnostic observers and,
//! for conflicts, kept for [`OverlayRegistry::conflicts`](super::OverlayRegistry::conflicts).

use std::fmt;

use rustc_hash::FxHashMap;

use crate::asset::SourceRef;
use crate::classify::Ambiguity;
use crate::log;
use crate::utils::plural_s;

/// Two sources claim the same path and the type does not merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub path: String,
    /// Previous occupant's source (loses).
    pub existing: Option<SourceRef>,
    /// Incoming source (wins).
    pub incoming: Option<SourceRef>,
}

/// A non-fatal finding during classification or insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    Conflict(Conflict),
    /// A file was rejected because a directory already occupies its path,
    /// or because one of its ancestors is not a directory.
    ShadowedDirectory {
        path: String,
        source: Option<SourceRef>,
    },
    /// `foo.png.png`
    DoubledExtension { path: String },
    /// `foo.obj.txt`
    ExtraTextExtension { path: String },
}

impl Diagnostic {
    pub(crate) fn ambiguous(path: &str, ambiguity: Ambiguity) -> Self {
        let path = path.to_string();
        match ambiguity {
            Ambiguity::Doubled => Self::DoubledExtension { path },
            Ambiguity::ExtraText => Self::ExtraTextExtension { path },
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Self::Conflict(conflict) => &conflict.path,
            Self::ShadowedDirectory { path, .. }
            | Self::DoubledExtension { path }
            | Self::ExtraTextExtension { path } => path,
        }
    }

    /// Logger module used when reporting this diagnostic.
    pub fn module(&self) -> &'static str {
        match self {
            Self::Conflict(_) => "conflict",
            _ => "warning",
        }
    }
}

fn source_name(source: Option<&SourceRef>) -> &str {
    source.map_or("???", |s| &s.name)
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conflict(c) => write!(
                f,
                "asset path {} ({} vs {})",
                c.path,
                source_name(c.existing.as_ref()),
                source_name(c.incoming.as_ref())
            ),
            Self::ShadowedDirectory { path, source } => write!(
                f,
                "\"{path}\" from {} collides with a directory and was skipped",
                source_name(source.as_ref())
            ),
            Self::DoubledExtension { path } => {
                write!(f, "\"{path}\" has a doubled extension! It may not be handled correctly.")
            }
            Self::ExtraTextExtension { path } => write!(
                f,
                "\"{path}\" has an extra \".txt\" extension! It may not be handled correctly."
            ),
        }
    }
}

/// Default diagnostic observer.
pub fn log_diagnostic(diagnostic: &Diagnostic) {
    log!(diagnostic.module(); "{}", diagnostic);
}

/// Conflicts grouped by path, each with every source that claimed it in
/// claim order. Paths are sorted.
pub fn group_by_path(conflicts: &[Conflict]) -> Vec<(String, Vec<String>)> {
    let mut grouped: FxHashMap<&str, Vec<String>> = FxHashMap::default();
    for conflict in conflicts {
        let sources = grouped.entry(conflict.path.as_str()).or_default();
        for source in [&conflict.existing, &conflict.incoming] {
            let name = source_name(source.as_ref()).to_string();
            if !sources.contains(&name) {
                sources.push(name);
            }
        }
    }

    let mut grouped: Vec<_> = grouped
        .into_iter()
        .map(|(path, sources)| (path.to_string(), sources))
        .collect();
    grouped.sort_by(|a, b| a.0.cmp(&b.0));
    grouped
}

/// Print conflicts using the standard log format.
///
/// Output format:
/// ```text
/// [conflict] asset conflicts (1 path, 2 sources)
/// [path] Graphics/Atlases/Gui/icon (2 sources)
///   - ModA
///   - ModB
/// ```
pub fn print_conflicts(conflicts: &[Conflict]) {
    if conflicts.is_empty() {
        return;
    }

    let grouped = group_by_path(conflicts);
    let total_sources: usize = grouped.iter().map(|(_, s)| s.len()).sum();
    log!("conflict"; "asset conflicts ({} path{}, {} source{})",
        grouped.len(), plural_s(grouped.len()),
        total_sources, plural_s(total_sources));

    for (path, sources) in &grouped {
        println!();
        log!("path"; "{} ({} source{})", path, sources.len(), plural_s(sources.len()));
        for source in sources {
            println!("  - {source}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::SourceId;

    fn source(id: u32, name: &str) -> Option<SourceRef> {
        Some(SourceRef {
            id: SourceId(id),
            name: name.into(),
        })
    }

    #[test]
    fn test_conflict_display() {
        let diagnostic = Diagnostic::Conflict(Conflict {
            path: "Graphics/a".into(),
            existing: source(0, "ModA"),
            incoming: source(1, "ModB"),
        });
        assert_eq!(diagnostic.to_string(), "asset path Graphics/a (ModA vs ModB)");
        assert_eq!(diagnostic.module(), "conflict");
        assert_eq!(diagnostic.path(), "Graphics/a");
    }

    #[test]
    fn test_ambiguous_maps_kind() {
        assert!(matches!(
            Diagnostic::ambiguous("a.png.png", Ambiguity::Doubled),
            Diagnostic::DoubledExtension { .. }
        ));
        let extra = Diagnostic::ambiguous("a.obj.txt", Ambiguity::ExtraText);
        assert_eq!(extra.module(), "warning");
        assert!(extra.to_string().contains("extra \".txt\""));
    }

    #[test]
    fn test_group_by_path() {
        let conflicts = vec![
            Conflict {
                path: "b".into(),
                existing: source(0, "A"),
                incoming: source(1, "B"),
            },
            Conflict {
                path: "a".into(),
                existing: source(0, "A"),
                incoming: source(1, "B"),
            },
            Conflict {
                path: "b".into(),
                existing: source(1, "B"),
                incoming: source(2, "C"),
            },
        ];
        let grouped = group_by_path(&conflicts);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].0, "a");
        assert_eq!(grouped[1], ("b".to_string(), vec!["A".into(), "B".into(), "C".into()]));
    }
}
