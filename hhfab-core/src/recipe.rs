//! Recipe persistence: an ordered list of named Run-Ops, saved/loaded as
//! YAML with a closed registry of type tags so a persisted action can be
//! reconstructed without open-world reflection.

use crate::ops::{run_op_registry, RunOp};
use anyhow::{anyhow, Context, Result};
use camino::Utf8Path;
use serde::{Deserialize, Serialize};

pub struct RecipeEntry {
    pub name: String,
    pub op: Box<dyn RunOp>,
}

/// An ordered list of Run-Ops for one installer bundle.
#[derive(Default)]
pub struct Recipe {
    pub entries: Vec<RecipeEntry>,
}

#[derive(Serialize, Deserialize)]
struct PersistedEntry {
    name: String,
    action: String,
    params: serde_json::Value,
}

#[derive(Serialize, Deserialize)]
struct PersistedRecipe {
    recipe: Vec<PersistedEntry>,
}

impl Recipe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: String, op: Box<dyn RunOp>) {
        self.entries.push(RecipeEntry { name, op });
    }

    pub fn save(&self, path: &Utf8Path) -> Result<()> {
        let recipe = self
            .entries
            .iter()
            .map(|e| {
                Ok(PersistedEntry {
                    name: e.name.clone(),
                    action: e.op.type_tag().to_string(),
                    params: e.op.to_json()?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let yaml = serde_yaml::to_string(&PersistedRecipe { recipe }).context("marshaling recipe")?;
        crate::fsutil::atomic_write(path, yaml.as_bytes())
    }

    pub fn load(path: &Utf8Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading recipe {path}"))?;
        let persisted: PersistedRecipe =
            serde_yaml::from_str(&text).with_context(|| format!("parsing recipe {path}"))?;
        let registry = run_op_registry();
        let mut entries = Vec::with_capacity(persisted.recipe.len());
        for item in persisted.recipe {
            let factory = registry
                .iter()
                .find(|(tag, _)| *tag == item.action)
                .map(|(_, f)| *f)
                .ok_or_else(|| anyhow!("unregistered recipe action tag {:?}", item.action))?;
            let mut op = factory(item.params).with_context(|| format!("decoding action {:?}", item.name))?;
            op.hydrate()
                .with_context(|| format!("hydrating loaded action {:?}", item.name))?;
            entries.push(RecipeEntry { name: item.name, op });
        }
        Ok(Self { entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::run::{ExecCommand, InstallFile};
    use tempfile::TempDir;

    #[test]
    fn save_load_round_trips_order_and_fields() {
        let dir = TempDir::new().unwrap();
        let path = camino::Utf8PathBuf::from_path_buf(dir.path().join("recipe.yaml")).unwrap();

        let mut recipe = Recipe::new();
        recipe.push(
            "install-control".into(),
            Box::new(InstallFile {
                name: "control.tar".into(),
                target: "/opt".into(),
                ..Default::default()
            }),
        );
        recipe.push(
            "start-agent".into(),
            Box::new(ExecCommand {
                name: "systemctl".into(),
                args: vec!["start".into(), "agent".into()],
                ..Default::default()
            }),
        );
        recipe.save(&path).unwrap();

        let loaded = Recipe::load(&path).unwrap();
        assert_eq!(loaded.entries.len(), 2);
        assert_eq!(loaded.entries[0].name, "install-control");
        assert_eq!(loaded.entries[0].op.type_tag(), "InstallFile");
        assert_eq!(loaded.entries[1].name, "start-agent");
        assert_eq!(loaded.entries[1].op.type_tag(), "ExecCommand");
    }

    #[test]
    fn load_rejects_unregistered_tag() {
        let dir = TempDir::new().unwrap();
        let path = camino::Utf8PathBuf::from_path_buf(dir.path().join("recipe.yaml")).unwrap();
        std::fs::write(
            &path,
            "recipe:\n  - name: mystery\n    action: DoesNotExist\n    params: {}\n",
        )
        .unwrap();
        let err = Recipe::load(&path).unwrap_err();
        assert!(err.to_string().contains("DoesNotExist"));
    }
}
