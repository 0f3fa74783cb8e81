//! overlay - inspect a virtual asset overlay from the command line.

mod cli;

use anyhow::{Context, Result};
use asset_overlay::config::OverlayConfig;
use asset_overlay::logger;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let mut config = OverlayConfig::load(&cli.config)
        .with_context(|| format!("failed to load config `{}`", cli.config.display()))?;

    match &cli.command {
        Commands::List { mount, prefix, dirs, json } => {
            config.watch.enabled = false;
            let registry = cli::common::mount(&config, &mount.sources, *json)?;
            cli::list::run_list(&registry, prefix.as_deref(), *dirs, *json)
        }
        Commands::Conflicts { mount, json } => {
            config.watch.enabled = false;
            let registry = cli::common::mount(&config, &mount.sources, *json)?;
            cli::conflicts::run_conflicts(&registry, *json)
        }
        Commands::Classify { paths, json } => cli::classify::run_classify(paths, *json),
        Commands::Watch { mount } => {
            config.watch.enabled = true;
            let registry = cli::common::mount(&config, &mount.sources, false)?;
            cli::watch::run_watch(&registry)
        }
    }
}
