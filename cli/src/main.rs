// Good defaults
#![forbid(unused_must_use)]
#![deny(unsafe_code)]

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use hhfab_core::stage::Bundle;
use hhfab_core::Manager;

/// Build presets recognized by this binary. Concrete component sets are
/// registered by deployment-specific tooling; this CLI only drives the
/// generic init/build lifecycle.
const PRESETS: &[&str] = &["default"];
const FABRIC_MODES: &[&str] = &["spine-leaf", "collapsed-core"];
const MAX_STAGE: u32 = 4;

#[derive(Parser)]
#[command(name = "hhfab", about = "Bootstrap and lifecycle control-plane for a SONiC/Kubernetes fabric")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a new basedir from a wiring diagram and configuration.
    Init {
        #[arg(long)]
        basedir: Utf8PathBuf,
        #[arg(long, default_value = "default")]
        preset: String,
        #[arg(long, default_value = "spine-leaf")]
        fabric_mode: String,
        /// One or more wiring YAML files, merged in order.
        #[arg(long = "wiring", required = true)]
        wiring_paths: Vec<Utf8PathBuf>,
        /// Allow hydrating an un-hydrated wiring dataset in place.
        #[arg(long)]
        allow_hydrate_wiring: bool,
        /// Seed component configs from a previously-saved `config.yaml`.
        #[arg(long)]
        existing_config: Option<Utf8PathBuf>,
    },
    /// Load an existing basedir and build all bundles.
    Build {
        #[arg(long)]
        basedir: Utf8PathBuf,
        /// Path to the built `hhfab-recipe` binary, embedded into each
        /// installer bundle.
        #[arg(long)]
        recipe_binary: Utf8PathBuf,
        /// Invoke external packing after artifacts are written.
        #[arg(long)]
        pack: bool,
    },
}

fn bundles() -> Vec<Bundle> {
    vec![Bundle::new("control", true), Bundle::new("switch", true)]
}

fn manager(basedir: Utf8PathBuf, preset: String, fabric_mode: String) -> Manager {
    Manager::new(
        basedir,
        preset,
        fabric_mode,
        Vec::new(),
        PRESETS.iter().map(|s| s.to_string()).collect(),
        FABRIC_MODES.iter().map(|s| s.to_string()).collect(),
        bundles(),
        MAX_STAGE,
    )
}

async fn run() -> Result<()> {
    hhfab_utils::initialize_tracing(false);
    let cli = Cli::parse();
    match cli.command {
        Command::Init {
            basedir,
            preset,
            fabric_mode,
            wiring_paths,
            allow_hydrate_wiring,
            existing_config,
        } => {
            let m = manager(basedir, preset, fabric_mode)
                .init(&wiring_paths, allow_hydrate_wiring, existing_config.as_deref())
                .context("initializing basedir")?;
            m.save().context("saving manager state")?;
            tracing::info!(basedir = %m.basedir, "initialized");
        }
        Command::Build {
            basedir,
            recipe_binary,
            pack,
        } => {
            let m = manager(basedir, "default".to_string(), "spine-leaf".to_string())
                .load()
                .context("loading basedir")?;
            let recipe_binary = std::fs::read(&recipe_binary)
                .with_context(|| format!("reading recipe binary {recipe_binary}"))?;
            m.build(&recipe_binary, pack).await.context("building bundles")?;
            tracing::info!(basedir = %m.basedir, "build complete");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}
