//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Asset overlay inspector
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Enable verbose output for debugging
    #[arg(short = 'V', long, global = true)]
    pub verbose: bool,

    /// Config file path (default: overlay.toml)
    #[arg(short = 'C', long, global = true, default_value = "overlay.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List the merged asset tree
    #[command(visible_alias = "ls")]
    List {
        #[command(flatten)]
        mount: MountArgs,

        /// Only list virtual paths starting with this prefix
        #[arg(short, long)]
        prefix: Option<String>,

        /// Include synthesized directories
        #[arg(short, long)]
        dirs: bool,

        /// Print JSON instead of text
        #[arg(short, long)]
        json: bool,
    },

    /// Report paths claimed by more than one source
    #[command(visible_alias = "c")]
    Conflicts {
        #[command(flatten)]
        mount: MountArgs,

        /// Print JSON instead of text
        #[arg(short, long)]
        json: bool,
    },

    /// Show how relative paths would be classified
    Classify {
        /// Relative paths, e.g. `Graphics/Atlases/Gui/icon.png`
        #[arg(required = true)]
        paths: Vec<String>,

        /// Print JSON instead of text
        #[arg(short, long)]
        json: bool,
    },

    /// Mount sources and print changes until Ctrl+C
    #[command(visible_alias = "w")]
    Watch {
        #[command(flatten)]
        mount: MountArgs,
    },
}

/// Sources to mount, overriding `[mount] paths`.
#[derive(clap::Args, Debug, Clone)]
pub struct MountArgs {
    /// Folders or `.zip` files, lowest priority first
    #[arg(value_name = "SOURCE", value_hint = clap::ValueHint::AnyPath)]
    pub sources: Vec<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list() {
        let cli = Cli::try_parse_from(["overlay", "list", "Content", "ModA.zip", "--prefix", "Graphics"]).unwrap();
        let Commands::List { mount, prefix, dirs, json } = cli.command else {
            panic!("expected list");
        };
        assert_eq!(mount.sources, vec![PathBuf::from("Content"), PathBuf::from("ModA.zip")]);
        assert_eq!(prefix.as_deref(), Some("Graphics"));
        assert!(!dirs);
        assert!(!json);
        assert_eq!(cli.config, PathBuf::from("overlay.toml"));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["overlay", "watch", "-V", "-C", "game/overlay.toml"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, PathBuf::from("game/overlay.toml"));
        assert!(matches!(cli.command, Commands::Watch { .. }));
    }

    #[test]
    fn test_classify_requires_paths() {
        assert!(Cli::try_parse_from(["overlay", "classify"]).is_err());
    }
}
