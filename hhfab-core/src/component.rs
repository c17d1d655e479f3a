//! The component plug-in contract: a unit declaring its own configuration
//! surface, hydrating defaults deterministically, and contributing
//! Build-Ops/Run-Ops into the bundles the manager assembles.

use crate::manager::adder::Adder;
use crate::wiring::Wiring;
use anyhow::Result;
use async_trait::async_trait;
use std::fmt::Debug;

/// Looks up a sibling component by name, limited to those enabled for
/// this build. Passed into [`Component::build`] instead of relying on
/// process-wide mutable state.
pub trait Resolver: Send + Sync {
    fn get(&self, name: &str) -> Option<&dyn Component>;
}

/// A pluggable unit of the fabricator: declares its config, hydrates
/// defaults, and contributes ops into one or more bundles.
#[async_trait]
pub trait Component: Debug + Send + Sync {
    /// Identity within the manager. Stable across hydrate/load cycles.
    fn name(&self) -> &str;

    /// Whether this component participates in a build with this preset
    /// and fabric mode.
    fn is_enabled(&self, preset: &str, mode: &str) -> bool;

    /// Fills defaults and validates. Called on every init and load; must
    /// be idempotent — a value generated on first hydration (a key, a
    /// serial number) must be preserved, not regenerated, on the next
    /// call.
    fn hydrate(&mut self, preset: &str, mode: &str) -> Result<()>;

    /// Contributes Build-Ops/Run-Ops for this build via `adder`.
    async fn build(
        &self,
        preset: &str,
        mode: &str,
        resolver: &dyn Resolver,
        wiring: &Wiring,
        adder: &mut Adder<'_>,
    ) -> Result<()>;

    /// Encodes this component's current configuration for persistence
    /// under `config.yaml`.
    fn to_config(&self) -> Result<serde_json::Value>;

    /// Restores configuration previously produced by [`Component::to_config`].
    /// Called before [`Component::hydrate`] on [`crate::manager::Manager::load`].
    fn load_config(&mut self, value: serde_json::Value) -> Result<()>;
}
