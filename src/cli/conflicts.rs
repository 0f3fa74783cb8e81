//! `conflicts` command.

use anyhow::Result;
use asset_overlay::overlay::{Conflict, group_by_path, print_conflicts};
use asset_overlay::{OverlayRegistry, log};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ConflictGroup {
    pub path: String,
    /// Claimants in claim order; the last one wins.
    pub sources: Vec<String>,
}

pub fn groups(conflicts: &[Conflict]) -> Vec<ConflictGroup> {
    group_by_path(conflicts)
        .into_iter()
        .map(|(path, sources)| ConflictGroup { path, sources })
        .collect()
}

pub fn run_conflicts(registry: &OverlayRegistry, json: bool) -> Result<()> {
    let conflicts = registry.conflicts();

    if json {
        println!("{}", serde_json::to_string_pretty(&groups(&conflicts))?);
    } else if conflicts.is_empty() {
        log!("conflict"; "no conflicts");
    } else {
        print_conflicts(&conflicts);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use asset_overlay::{SourceId, SourceRef};

    fn claim(path: &str, existing: (u32, &str), incoming: (u32, &str)) -> Conflict {
        let source = |(id, name): (u32, &str)| {
            Some(SourceRef {
                id: SourceId(id),
                name: name.into(),
            })
        };
        Conflict {
            path: path.to_string(),
            existing: source(existing),
            incoming: source(incoming),
        }
    }

    #[test]
    fn test_groups_json() {
        let conflicts = [
            claim("Maps/a", (1, "ModA"), (2, "ModB")),
            claim("Graphics/icon", (0, "Content"), (1, "ModA")),
            claim("Maps/a", (2, "ModB"), (3, "ModC")),
        ];
        let json = serde_json::to_value(groups(&conflicts)).unwrap();

        assert_eq!(json[0]["path"], "Graphics/icon");
        assert_eq!(json[1]["path"], "Maps/a");
        assert_eq!(json[1]["sources"], serde_json::json!(["ModA", "ModB", "ModC"]));
    }
}
