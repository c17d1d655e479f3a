//! Bundles and stages: the two axes actions are scheduled along.

use serde::{Deserialize, Serialize};

/// A stage number. Actions are sorted `(stage asc, emission order)` within
/// a bundle; `stage` must be less than the manager's configured `max_stage`.
pub type Stage = u32;

/// A named group of artifacts built together.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Bundle {
    pub name: String,
    /// Installer bundles additionally receive the embedded runner binary
    /// and a `recipe.yaml` at the end of the build; only installer bundles
    /// may accept Run-Ops.
    pub is_installer: bool,
}

impl Bundle {
    pub fn new(name: impl Into<String>, is_installer: bool) -> Self {
        Self {
            name: name.into(),
            is_installer,
        }
    }
}
