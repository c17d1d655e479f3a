//! The two operation kinds: [`RunOp`] (idempotent install primitives
//! executed on the target by the runner) and [`BuildOp`] (producer
//! primitives executed once, at build time, on the host).
//!
//! `RunOp`s additionally need to round-trip through YAML via a closed
//! registry of type tags — no open-world reflection on persisted types —
//! since a recipe is replayed by a binary embedded in the bundle that
//! only knows the Run-Op kinds that existed when it was built.

pub mod build;
pub mod run;

use anyhow::Result;
use async_trait::async_trait;
use camino::Utf8Path;
use std::fmt::Debug;

/// An idempotent install primitive, executed on the target node.
#[async_trait]
pub trait RunOp: Debug + Send + Sync {
    /// The short type tag this op is persisted under, e.g. `"InstallFile"`.
    fn type_tag(&self) -> &'static str;
    /// Validate and fill in defaults. Called once, right after construction.
    fn hydrate(&mut self) -> Result<()>;
    /// A human one-liner describing the action, for logging.
    fn summary(&self) -> String;
    /// Execute the action against `basedir`, idempotently.
    async fn run(&self, basedir: &Utf8Path) -> Result<()>;
    /// Erase to a JSON value for persistence.
    fn to_json(&self) -> Result<serde_json::Value>;
}

/// A producer primitive, executed once at build time.
#[async_trait]
pub trait BuildOp: Debug + Send + Sync {
    /// Validate and fill in defaults.
    fn hydrate(&mut self) -> Result<()>;
    /// Produce the artifact(s) under `basedir`.
    async fn build(&self, basedir: &Utf8Path) -> Result<()>;
    /// Run-Ops this Build-Op wants appended to the owning bundle's recipe.
    /// Only installer bundles may accept a non-empty result (enforced by
    /// the manager's action adder, not here).
    fn run_ops(&self) -> Vec<Box<dyn RunOp>>;
}

/// Factory function reconstructing a boxed [`RunOp`] from its persisted
/// JSON `params`.
pub type RunOpFactory = fn(serde_json::Value) -> Result<Box<dyn RunOp>>;

/// The closed registry of Run-Op type tags. Extending the set of supported
/// Run-Ops means adding an entry here; an unrecognized tag encountered on
/// [`crate::recipe::Recipe::load`] is a fatal error, not a silent skip.
pub fn run_op_registry() -> Vec<(&'static str, RunOpFactory)> {
    vec![
        ("InstallFile", |v| {
            Ok(Box::new(serde_json::from_value::<run::InstallFile>(v)?))
        }),
        ("ExecCommand", |v| {
            Ok(Box::new(serde_json::from_value::<run::ExecCommand>(v)?))
        }),
        ("WaitURL", |v| {
            Ok(Box::new(serde_json::from_value::<run::WaitUrl>(v)?))
        }),
        ("PushOCI", |v| {
            Ok(Box::new(serde_json::from_value::<run::PushOci>(v)?))
        }),
        ("WaitKube", |v| {
            Ok(Box::new(serde_json::from_value::<run::WaitKube>(v)?))
        }),
    ]
}
