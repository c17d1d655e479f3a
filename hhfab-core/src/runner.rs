//! The recipe runner: reads `recipe.yaml` from a bundle's basedir and
//! executes its Run-Ops sequentially. This is what the embedded
//! `hhfab-recipe` binary calls into on the target node.

use crate::recipe::Recipe;
use anyhow::{Context, Result};
use camino::Utf8Path;
use std::time::Instant;

/// Runs every action in `basedir/recipe.yaml`, in order.
///
/// `steps` restricts execution to named actions; an empty slice or a
/// slice equal to `["all"]` runs everything. `dry_run` logs each action
/// instead of executing it. `brief` drops the per-action progress lines,
/// keeping only the final summary. Aborts on the first failing action.
pub async fn run_recipe(basedir: &Utf8Path, steps: &[String], dry_run: bool, brief: bool) -> Result<()> {
    let recipe = Recipe::load(&basedir.join("recipe.yaml"))?;
    if !brief {
        tracing::info!(actions = recipe.entries.len(), "loaded recipe");
    }

    let run_all = steps.is_empty() || steps == ["all"];
    let start = Instant::now();
    let mut ran = 0usize;
    for entry in &recipe.entries {
        if !run_all && !steps.iter().any(|s| s == &entry.name) {
            continue;
        }
        let step_start = Instant::now();
        if dry_run {
            tracing::info!(action = %entry.name, summary = %entry.op.summary(), "would run (dry-run)");
            continue;
        }
        if brief {
            tracing::debug!(action = %entry.name, summary = %entry.op.summary(), "running");
        } else {
            tracing::info!(action = %entry.name, summary = %entry.op.summary(), "running");
        }
        entry
            .op
            .run(basedir)
            .await
            .with_context(|| format!("action {:?} failed", entry.name))?;
        ran += 1;
        if brief {
            tracing::debug!(action = %entry.name, elapsed_ms = step_start.elapsed().as_millis(), "completed");
        } else {
            tracing::info!(action = %entry.name, elapsed_ms = step_start.elapsed().as_millis(), "completed");
        }
    }
    tracing::info!(ran, elapsed_ms = start.elapsed().as_millis(), "recipe finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::run::ExecCommand;
    use tempfile::TempDir;

    #[tokio::test]
    async fn runs_selected_steps_in_order() {
        let dir = TempDir::new().unwrap();
        let basedir = Utf8Path::from_path(dir.path()).unwrap();

        let mut recipe = Recipe::new();
        recipe.push(
            "a".into(),
            Box::new(ExecCommand {
                name: "true".into(),
                ..Default::default()
            }),
        );
        recipe.push(
            "b".into(),
            Box::new(ExecCommand {
                name: "false".into(),
                ..Default::default()
            }),
        );
        recipe.save(&basedir.join("recipe.yaml")).unwrap();

        run_recipe(basedir, &["a".to_string()], false, false).await.unwrap();
    }

    #[tokio::test]
    async fn aborts_on_first_failure() {
        let dir = TempDir::new().unwrap();
        let basedir = Utf8Path::from_path(dir.path()).unwrap();

        let mut recipe = Recipe::new();
        recipe.push(
            "bad".into(),
            Box::new(ExecCommand {
                name: "false".into(),
                ..Default::default()
            }),
        );
        recipe.save(&basedir.join("recipe.yaml")).unwrap();

        let err = run_recipe(basedir, &[], false, false).await.unwrap_err();
        assert!(err.to_string().contains("bad"));
    }

    #[tokio::test]
    async fn dry_run_does_not_execute() {
        let dir = TempDir::new().unwrap();
        let basedir = Utf8Path::from_path(dir.path()).unwrap();

        let mut recipe = Recipe::new();
        recipe.push(
            "would-fail".into(),
            Box::new(ExecCommand {
                name: "false".into(),
                ..Default::default()
            }),
        );
        recipe.save(&basedir.join("recipe.yaml")).unwrap();

        run_recipe(basedir, &[], true, false).await.unwrap();
    }
}
