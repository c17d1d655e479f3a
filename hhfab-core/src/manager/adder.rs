//! The strict `addBuildOp`/`addRunOp` sequence components call into
//! during [`super::Manager::build`]: name validation, hydration,
//! execution, then staged Run-Op collection — short-circuiting on the
//! first error.

use crate::error::ManagerError;
use crate::ops::{BuildOp, RunOp};
use crate::stage::{Bundle, Stage};
use anyhow::{ensure, Context, Result};
use camino::Utf8Path;
use hhfab_utils::is_valid_op_name;
use std::collections::{HashMap, HashSet};

pub struct StagedRunOp {
    pub stage: Stage,
    pub order: usize,
    pub name: String,
    pub op: Box<dyn RunOp>,
}

/// Accumulates ops for one [`super::Manager::build`] call across all
/// components, enforcing the naming/staging/installer-bundle invariants.
/// Captures the first error; every call after that is a no-op.
pub struct Adder<'a> {
    basedir: &'a Utf8Path,
    bundles: &'a HashMap<String, Bundle>,
    max_stage: Stage,
    seen_names: HashMap<(String, &'static str), HashSet<String>>,
    run_ops: HashMap<String, Vec<StagedRunOp>>,
    next_order: usize,
    error: Option<anyhow::Error>,
}

impl<'a> Adder<'a> {
    pub fn new(basedir: &'a Utf8Path, bundles: &'a HashMap<String, Bundle>, max_stage: Stage) -> Self {
        Self {
            basedir,
            bundles,
            max_stage,
            seen_names: HashMap::new(),
            run_ops: HashMap::new(),
            next_order: 0,
            error: None,
        }
    }

    /// Consumes the adder, returning the collected per-bundle Run-Ops or
    /// the first error captured along the way.
    pub fn into_result(self) -> Result<HashMap<String, Vec<StagedRunOp>>> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.run_ops),
        }
    }

    fn validate(&mut self, bundle: &str, stage: Stage, name: &str, kind: &'static str) -> Result<bool> {
        let b = self
            .bundles
            .get(bundle)
            .ok_or_else(|| ManagerError::UnknownBundle(bundle.to_string()))?;
        ensure!(
            stage < self.max_stage,
            "stage {stage} exceeds max_stage {}",
            self.max_stage
        );
        ensure!(is_valid_op_name(name), "invalid op name {name:?}");
        let seen = self.seen_names.entry((bundle.to_string(), kind)).or_default();
        ensure!(
            seen.insert(name.to_string()),
            "duplicate {kind} name {name:?} in bundle {bundle:?}"
        );
        Ok(b.is_installer)
    }

    fn push_run_op(&mut self, bundle: &str, stage: Stage, name: String, op: Box<dyn RunOp>) {
        let order = self.next_order;
        self.next_order += 1;
        self.run_ops
            .entry(bundle.to_string())
            .or_default()
            .push(StagedRunOp { stage, order, name, op });
    }

    /// `validate → op.hydrate() → op.build() → collect run_ops()`.
    pub async fn add_build_op(&mut self, bundle: &str, stage: Stage, name: &str, op: Box<dyn BuildOp>) {
        if self.error.is_some() {
            return;
        }
        if let Err(e) = self.try_add_build_op(bundle, stage, name, op).await {
            self.error = Some(e.context(format!("adding build-op {name:?} to bundle {bundle:?}")));
        }
    }

    async fn try_add_build_op(
        &mut self,
        bundle: &str,
        stage: Stage,
        name: &str,
        mut op: Box<dyn BuildOp>,
    ) -> Result<()> {
        let is_installer = self.validate(bundle, stage, name, "build-op")?;
        op.hydrate()?;
        op.build(&self.basedir.join(bundle))
            .await
            .with_context(|| format!("building {name:?}"))?;
        let run_ops = op.run_ops();
        if !run_ops.is_empty() {
            ensure!(
                is_installer,
                "build-op {name:?} emitted run-ops but bundle {bundle:?} is not an installer bundle"
            );
            for (i, run_op) in run_ops.into_iter().enumerate() {
                self.push_run_op(bundle, stage, format!("{name}-{i}"), run_op);
            }
        }
        Ok(())
    }

    /// `validate (installer bundle required) → op.hydrate() → collect`.
    pub fn add_run_op(&mut self, bundle: &str, stage: Stage, name: &str, mut op: Box<dyn RunOp>) {
        if self.error.is_some() {
            return;
        }
        let result = (|| -> Result<()> {
            let is_installer = self.validate(bundle, stage, name, "run-op")?;
            ensure!(
                is_installer,
                "run-op {name:?} added to non-installer bundle {bundle:?}"
            );
            op.hydrate()
        })();
        match result {
            Ok(()) => self.push_run_op(bundle, stage, name.to_string(), op),
            Err(e) => {
                self.error = Some(e.context(format!("adding run-op {name:?} to bundle {bundle:?}")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::run::ExecCommand;
    use camino::Utf8PathBuf;
    use tempfile::TempDir;

    fn bundles(installer: bool) -> HashMap<String, Bundle> {
        let mut m = HashMap::new();
        m.insert("control".to_string(), Bundle::new("control", installer));
        m
    }

    #[test]
    fn rejects_invalid_name() {
        let dir = TempDir::new().unwrap();
        let basedir = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let bundles = bundles(true);
        let mut adder = Adder::new(&basedir, &bundles, 4);
        adder.add_run_op(
            "control",
            0,
            "bad name",
            Box::new(ExecCommand {
                name: "true".into(),
                ..Default::default()
            }),
        );
        assert!(adder.into_result().is_err());
    }

    #[test]
    fn rejects_duplicate_names_within_kind() {
        let dir = TempDir::new().unwrap();
        let basedir = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let bundles = bundles(true);
        let mut adder = Adder::new(&basedir, &bundles, 4);
        adder.add_run_op(
            "control",
            0,
            "start",
            Box::new(ExecCommand {
                name: "true".into(),
                ..Default::default()
            }),
        );
        adder.add_run_op(
            "control",
            1,
            "start",
            Box::new(ExecCommand {
                name: "true".into(),
                ..Default::default()
            }),
        );
        assert!(adder.into_result().is_err());
    }

    #[test]
    fn rejects_run_op_on_non_installer_bundle() {
        let dir = TempDir::new().unwrap();
        let basedir = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let bundles = bundles(false);
        let mut adder = Adder::new(&basedir, &bundles, 4);
        adder.add_run_op(
            "control",
            0,
            "start",
            Box::new(ExecCommand {
                name: "true".into(),
                ..Default::default()
            }),
        );
        assert!(adder.into_result().is_err());
    }

    #[test]
    fn accepts_staged_run_ops_in_order() {
        let dir = TempDir::new().unwrap();
        let basedir = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let bundles = bundles(true);
        let mut adder = Adder::new(&basedir, &bundles, 4);
        adder.add_run_op(
            "control",
            1,
            "second",
            Box::new(ExecCommand {
                name: "true".into(),
                ..Default::default()
            }),
        );
        adder.add_run_op(
            "control",
            0,
            "first",
            Box::new(ExecCommand {
                name: "true".into(),
                ..Default::default()
            }),
        );
        let result = adder.into_result().unwrap();
        let ops = &result["control"];
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].name, "second");
        assert_eq!(ops[1].name, "first");
    }
}
