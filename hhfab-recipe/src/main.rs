// Good defaults
#![forbid(unused_must_use)]
#![deny(unsafe_code)]

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

/// The embedded runner: reads `recipe.yaml` from its working directory
/// and replays the Run-Ops it lists, in order.
#[derive(Parser)]
#[command(name = "hhfab-recipe")]
struct Cli {
    /// Directory containing `recipe.yaml`. Defaults to the current directory.
    #[arg(long, env = "HHFAB_WORK_DIR")]
    work_dir: Option<Utf8PathBuf>,
    #[arg(long, env = "HHFAB_VERBOSE")]
    verbose: bool,
    #[arg(long, env = "HHFAB_BRIEF")]
    brief: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run every action in the recipe.
    Install {
        #[arg(long, env = "HHFAB_YES")]
        yes: bool,
    },
    /// Re-run the recipe idempotently against an already-installed node.
    Upgrade {
        #[arg(long, env = "HHFAB_SKIP_CHECKS")]
        skip_checks: bool,
        #[arg(long, env = "HHFAB_YES")]
        yes: bool,
    },
}

/// Reads a `y`/`yes` confirmation line from stdin. Anything else (including
/// EOF) is treated as a decline.
fn confirm(prompt: &str) -> Result<bool> {
    use std::io::Write;
    eprint!("{prompt} [y/N] ");
    std::io::stderr().flush().ok();
    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("reading confirmation from stdin")?;
    Ok(matches!(line.trim().to_lowercase().as_str(), "y" | "yes"))
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    hhfab_utils::initialize_tracing(cli.verbose);
    let work_dir = match cli.work_dir {
        Some(dir) => dir,
        None => Utf8PathBuf::from_path_buf(std::env::current_dir().context("resolving current directory")?)
            .map_err(|p| anyhow::anyhow!("current directory {p:?} is not valid UTF-8"))?,
    };
    let brief = cli.brief;

    match cli.command {
        Command::Install { yes } => {
            if !yes && !confirm("install recipe.yaml onto this node?")? {
                anyhow::bail!("install aborted: not confirmed");
            }
            hhfab_core::runner::run_recipe(&work_dir, &[], false, brief).await?;
        }
        Command::Upgrade { skip_checks, yes } => {
            if !yes && !confirm("upgrade recipe.yaml on this node?")? {
                anyhow::bail!("upgrade aborted: not confirmed");
            }
            if skip_checks {
                tracing::warn!("running upgrade with checks skipped");
            } else {
                hhfab_core::runner::run_recipe(&work_dir, &[], true, brief)
                    .await
                    .context("pre-upgrade dry-run check failed")?;
            }
            hhfab_core::runner::run_recipe(&work_dir, &[], false, brief).await?;
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
