//! Asset type tags.

use std::fmt;
use std::sync::Arc;

/// Semantic type of an asset.
///
/// Built-in variants cover the content the classifier knows about.
/// [`AssetType::Custom`] carries types contributed by type-guesser hooks.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AssetType {
    Assembly,
    Texture,
    ObjModel,
    ObjModelExport,
    MetadataYaml,
    DecalRegistry,
    SpriteBank,
    /// Gitignore-style rules for the source's own root.
    IgnoreList,
    Dialog,
    DialogExport,
    Font,
    Map,
    Tutorial,
    Bank,
    Guids,
    Lua,
    Text,
    Xml,
    Yaml,
    /// Synthesized by the overlay, never produced by a source.
    Directory,
    Unknown,
    Custom {
        name: Arc<str>,
        non_conflicting: bool,
    },
}

impl AssetType {
    /// Create a hook-defined type.
    pub fn custom(name: impl Into<Arc<str>>, non_conflicting: bool) -> Self {
        Self::Custom {
            name: name.into(),
            non_conflicting,
        }
    }

    /// Whether several sources may provide this type at one path without a
    /// conflict being reported. Such assets are merged by their consumers.
    pub fn is_non_conflicting(&self) -> bool {
        match self {
            Self::DecalRegistry
            | Self::Dialog
            | Self::DialogExport
            | Self::Font
            | Self::Directory
            | Self::MetadataYaml
            | Self::SpriteBank
            | Self::IgnoreList => true,
            Self::Custom {
                non_conflicting, ..
            } => *non_conflicting,
            _ => false,
        }
    }

    #[inline]
    pub fn is_directory(&self) -> bool {
        matches!(self, Self::Directory)
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Assembly => "assembly",
            Self::Texture => "texture",
            Self::ObjModel => "obj-model",
            Self::ObjModelExport => "obj-model-export",
            Self::MetadataYaml => "metadata-yaml",
            Self::DecalRegistry => "decal-registry",
            Self::SpriteBank => "sprite-bank",
            Self::IgnoreList => "ignore-list",
            Self::Dialog => "dialog",
            Self::DialogExport => "dialog-export",
            Self::Font => "font",
            Self::Map => "map",
            Self::Tutorial => "tutorial",
            Self::Bank => "bank",
            Self::Guids => "guids",
            Self::Lua => "lua",
            Self::Text => "text",
            Self::Xml => "xml",
            Self::Yaml => "yaml",
            Self::Directory => "directory",
            Self::Unknown => "unknown",
            Self::Custom { name, .. } => name,
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_conflicting_flags() {
        assert!(AssetType::Dialog.is_non_conflicting());
        assert!(AssetType::Directory.is_non_conflicting());
        assert!(!AssetType::Texture.is_non_conflicting());
        assert!(!AssetType::Map.is_non_conflicting());
        assert!(AssetType::custom("atlas-meta", true).is_non_conflicting());
        assert!(!AssetType::custom("atlas-meta", false).is_non_conflicting());
    }

    #[test]
    fn test_display() {
        assert_eq!(AssetType::ObjModelExport.to_string(), "obj-model-export");
        assert_eq!(AssetType::custom("lut", false).to_string(), "lut");
    }
}
