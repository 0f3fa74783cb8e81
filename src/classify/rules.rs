//! Denylists and the built-in type table.

use std::sync::LazyLock;

use crate::asset::AssetType;
use crate::utils::path::{file_name, split_extension};

use super::extension::Matcher;

const DENIED_EXTENSIONS: &[&str] = &["cs", "csproj", "md", "pdb", "sln", "yaml-backup", "gitignore"];
const DENIED_ROOT_FILES: &[&str] = &["changelog", "credits", "documentation", "FAQ", "LICENSE", "README"];
const DENIED_FOLDERS: &[&str] = &["lib-stripped", "__MACOSX", "obj"];
const DENIED_ROOT_FOLDERS: &[&str] = &["Ahorn", "Loenn"];

#[inline]
fn contains_ignore_case(list: &[&str], needle: &str) -> bool {
    list.iter().any(|item| item.eq_ignore_ascii_case(needle))
}

/// Whether a virtual path is excluded from the overlay regardless of type.
///
/// Rejects hidden files and folders, build/VCS leftovers, root-level
/// documentation and editor plugin folders.
pub fn is_denied(path: &str) -> bool {
    let (stem, ext) = split_extension(file_name(path));
    if stem.starts_with('.') || ext.is_some_and(|e| contains_ignore_case(DENIED_EXTENSIONS, e)) {
        return true;
    }

    let segments: Vec<&str> = path.split('/').collect();
    if segments.len() == 1 && contains_ignore_case(DENIED_ROOT_FILES, stem) {
        return true;
    }

    let folders = &segments[..segments.len() - 1];
    folders.iter().enumerate().any(|(i, segment)| {
        segment.starts_with('.')
            || contains_ignore_case(DENIED_FOLDERS, segment)
            || (i == 0 && contains_ignore_case(DENIED_ROOT_FOLDERS, segment))
    })
}

/// Where a rule applies.
#[derive(Debug, Clone, Copy)]
enum Place {
    Anywhere,
    /// Root-level file whose stem is one of the names.
    RootNamed(&'static [&'static str]),
    /// File directly in the folder whose stem is one of the names.
    InFolderNamed(&'static str, &'static [&'static str]),
    /// Anywhere below the folder prefix.
    Under(&'static str),
}

/// How the canonical path is derived from the file path.
#[derive(Debug, Clone, Copy)]
pub(super) enum Canonical {
    /// Path unchanged.
    Keep,
    /// Strip the whole matched extension.
    StripMatched,
    /// Strip only the last extension component.
    StripLast,
    /// Strip the last component and lowercase the `GUIDs` part.
    StripLastLowercase,
    /// The source root itself.
    Root,
}

pub(super) struct Rule {
    pub ext: &'static str,
    text_based: bool,
    place: Place,
    pub kind: AssetType,
    pub canonical: Canonical,
    pub format: Option<&'static str>,
}

impl Rule {
    fn new(ext: &'static str, kind: AssetType) -> Self {
        Self {
            ext,
            text_based: false,
            place: Place::Anywhere,
            kind,
            canonical: Canonical::StripMatched,
            format: None,
        }
    }

    fn text(ext: &'static str, kind: AssetType) -> Self {
        Self {
            text_based: true,
            ..Self::new(ext, kind)
        }
    }

    fn place(mut self, place: Place) -> Self {
        self.place = place;
        self
    }

    fn canonical(mut self, canonical: Canonical) -> Self {
        self.canonical = canonical;
        self
    }

    fn format(mut self, format: &'static str) -> Self {
        self.format = Some(format);
        self
    }

    /// Try the rule against a file, recording any ambiguity in `matcher`.
    ///
    /// Folder-scoped rules check their folder first, so a misnamed file is
    /// only reported by rules that could apply to it. For the others the
    /// extension is matched before the name check, which lets
    /// `metadata.yaml.yaml` be noticed at the root.
    pub fn matches(&self, directory: &str, stem: &str, matcher: &mut Matcher<'_>) -> bool {
        self.folder_matches(directory)
            && matcher.multipart(self.ext, self.text_based)
            && self.place_matches(directory, stem)
    }

    fn folder_matches(&self, directory: &str) -> bool {
        match self.place {
            Place::InFolderNamed(folder, _) => directory.strip_suffix('/') == Some(folder),
            Place::Under(prefix) => directory.starts_with(prefix),
            Place::Anywhere | Place::RootNamed(_) => true,
        }
    }

    fn place_matches(&self, directory: &str, stem: &str) -> bool {
        match self.place {
            Place::Anywhere => true,
            Place::RootNamed(names) => directory.is_empty() && names.contains(&stem),
            Place::InFolderNamed(folder, names) => {
                directory.strip_suffix('/') == Some(folder) && names.contains(&stem)
            }
            Place::Under(prefix) => directory.starts_with(prefix),
        }
    }
}

/// Specific types, tried before type-guesser hooks.
pub(super) static BUILTIN: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        Rule::new("dll", AssetType::Assembly).canonical(Canonical::Keep),
        Rule::new("png", AssetType::Texture),
        Rule::text("obj", AssetType::ObjModel),
        Rule::new("obj.export", AssetType::ObjModelExport),
        Rule::text("yaml", AssetType::MetadataYaml)
            .place(Place::RootNamed(&["metadata", "multimetadata", "manifest"]))
            .format("yml"),
        Rule::text("yml", AssetType::MetadataYaml).place(Place::RootNamed(&["manifest"])),
        Rule::text("xml", AssetType::DecalRegistry).place(Place::RootNamed(&["DecalRegistry"])),
        Rule::text("xml", AssetType::SpriteBank).place(Place::InFolderNamed(
            "Graphics",
            &["Sprites", "SpritesGui", "Portraits"],
        )),
        Rule::text("overlayignore", AssetType::IgnoreList)
            .place(Place::RootNamed(&[""]))
            .canonical(Canonical::Root),
        Rule::text("txt", AssetType::Dialog).place(Place::Under("Dialog/")),
        Rule::new("txt.export", AssetType::DialogExport).place(Place::Under("Dialog/")),
        Rule::text("fnt", AssetType::Font).place(Place::Under("Dialog/")),
        Rule::new("bin", AssetType::Map).place(Place::Under("Maps/")),
        Rule::new("bin", AssetType::Tutorial).place(Place::Under("Tutorials/")),
        Rule::new("bank", AssetType::Bank).place(Place::Under("Audio/")),
        Rule::text("guids.txt", AssetType::Guids)
            .place(Place::Under("Audio/"))
            .canonical(Canonical::StripLast),
        // Default FMOD casing
        Rule::text("GUIDs.txt", AssetType::Guids)
            .place(Place::Under("Audio/"))
            .canonical(Canonical::StripLastLowercase),
    ]
});

/// Generic text types, tried after type-guesser hooks.
pub(super) static GENERIC: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        Rule::text("lua", AssetType::Lua),
        Rule::text("txt", AssetType::Text),
        Rule::text("xml", AssetType::Xml),
        Rule::text("yml", AssetType::Yaml),
        Rule::text("yaml", AssetType::Yaml).format("yml"),
    ]
});

/// Canonical path of `path` after `rule` matched.
pub(super) fn canonical_path(path: &str, rule: &Rule) -> String {
    let strip_last = |p: &str| p.rfind('.').map_or(p, |idx| &p[..idx]).to_string();
    match rule.canonical {
        Canonical::Keep => path.to_string(),
        Canonical::StripMatched => path[..path.len() - rule.ext.len() - 1].to_string(),
        Canonical::StripLast => strip_last(path),
        Canonical::StripLastLowercase => {
            let stripped = strip_last(path);
            match stripped.rfind('.') {
                Some(idx) => format!("{}{}", &stripped[..idx], stripped[idx..].to_ascii_lowercase()),
                None => stripped,
            }
        }
        Canonical::Root => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_denied_extensions() {
        assert!(is_denied("Code/Module.cs"));
        assert!(is_denied("Code/Module.CS"));
        assert!(is_denied("notes.md"));
        assert!(is_denied(".gitignore"));
        assert!(!is_denied("Graphics/a.png"));
    }

    #[test]
    fn test_denied_hidden() {
        assert!(is_denied(".hidden.png"));
        assert!(is_denied("Graphics/.cache/a.png"));
        assert!(!is_denied(".overlayignore"));
    }

    #[test]
    fn test_denied_root_files() {
        assert!(is_denied("README"));
        assert!(is_denied("license.txt"));
        assert!(is_denied("Changelog.txt"));
        // Only at the root
        assert!(!is_denied("Dialog/README.txt"));
    }

    #[test]
    fn test_denied_folders() {
        assert!(is_denied("obj/Debug/a.dll"));
        assert!(is_denied("Graphics/__MACOSX/a.png"));
        assert!(is_denied("Ahorn/entities/a.jl"));
        assert!(is_denied("loenn/lang/en.lang"));
        // Root-folder names are allowed deeper down
        assert!(!is_denied("Graphics/Ahorn/a.png"));
        // Folder names do not apply to the file itself
        assert!(!is_denied("Models/obj"));
    }

    #[test]
    fn test_canonical_lowercase_guids() {
        let rule = BUILTIN.iter().find(|r| r.ext == "GUIDs.txt").unwrap();
        assert_eq!(canonical_path("Audio/Foo.GUIDs.txt", rule), "Audio/Foo.guids");
    }
}
