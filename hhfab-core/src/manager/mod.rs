//! The manager: owns a basedir for the lifetime of one build, hydrates
//! components, and drives them through the adder to produce artifacts and
//! a per-bundle recipe.

pub mod adder;

use self::adder::{Adder, StagedRunOp};
use crate::cache::ArtifactCache;
use crate::component::{Component, Resolver};
use crate::error::ManagerError;
use crate::fsutil::{atomic_write, mkdir_p_mode};
use crate::recipe::Recipe;
use crate::stage::{Bundle, Stage};
use crate::wiring::Wiring;
use anyhow::{ensure, Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Mode used for the embedded runner binary written into installer bundles.
const RECIPE_BINARY_MODE: u32 = 0o755;
const BASEDIR_MODE: u32 = 0o755;

#[derive(Serialize, Deserialize)]
struct PersistedConfig {
    preset: String,
    #[serde(rename = "fabricMode")]
    fabric_mode: String,
    config: HashMap<String, serde_json::Value>,
}

/// Owns a set of components for the lifetime of one basedir, driving them
/// through init/load/save/build.
pub struct Manager {
    pub basedir: Utf8PathBuf,
    pub preset: String,
    pub fabric_mode: String,
    pub wiring: Wiring,
    pub components: Vec<Box<dyn Component>>,
    presets: Vec<String>,
    fabric_modes: Vec<String>,
    bundles: HashMap<String, Bundle>,
    max_stage: Stage,
}

/// Looks up components by name among those currently enabled for
/// `(preset, fabric_mode)`.
struct ComponentResolver<'a> {
    components: &'a [Box<dyn Component>],
    preset: &'a str,
    fabric_mode: &'a str,
}

impl Resolver for ComponentResolver<'_> {
    fn get(&self, name: &str) -> Option<&dyn Component> {
        self.components
            .iter()
            .find(|c| c.name() == name && c.is_enabled(self.preset, self.fabric_mode))
            .map(|c| c.as_ref())
    }
}

impl Manager {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        basedir: impl Into<Utf8PathBuf>,
        preset: impl Into<String>,
        fabric_mode: impl Into<String>,
        components: Vec<Box<dyn Component>>,
        presets: Vec<String>,
        fabric_modes: Vec<String>,
        bundles: Vec<Bundle>,
        max_stage: Stage,
    ) -> Self {
        Self {
            basedir: basedir.into(),
            preset: preset.into(),
            fabric_mode: fabric_mode.into(),
            wiring: Wiring::empty(),
            components,
            presets,
            fabric_modes,
            bundles: bundles.into_iter().map(|b| (b.name.clone(), b)).collect(),
            max_stage,
        }
    }

    fn validate_preset_and_mode(&self) -> Result<(), ManagerError> {
        if !self.presets.contains(&self.preset) {
            return Err(ManagerError::UnknownPreset(self.preset.clone()));
        }
        if !self.fabric_modes.contains(&self.fabric_mode) {
            return Err(ManagerError::UnknownFabricMode(self.fabric_mode.clone()));
        }
        Ok(())
    }

    /// Creates a brand-new basedir. `wiring_paths` are merged in order;
    /// `allow_hydrate_wiring` permits hydrating an un-hydrated wiring
    /// dataset in place (otherwise that's an error). `existing_config`, if
    /// given, seeds component configs from a previously-saved
    /// `config.yaml` (e.g. reusing a sibling build's CA); its preset must
    /// match the one requested here.
    pub fn init(
        mut self,
        wiring_paths: &[Utf8PathBuf],
        allow_hydrate_wiring: bool,
        existing_config: Option<&Utf8Path>,
    ) -> Result<Self> {
        ensure!(
            !self.basedir.exists(),
            "{}",
            ManagerError::BasedirExists(self.basedir.to_string())
        );
        self.validate_preset_and_mode()?;

        self.wiring = Wiring::load_paths(wiring_paths).context("loading wiring dataset")?;
        if !self.wiring.is_hydrated() {
            ensure!(allow_hydrate_wiring, "{}", ManagerError::WiringNotHydrated);
        }

        let starting_config = existing_config
            .map(|path| -> Result<PersistedConfig> {
                let text = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
                let persisted: PersistedConfig =
                    serde_yaml::from_str(&text).with_context(|| format!("parsing {path}"))?;
                ensure!(
                    persisted.preset == self.preset,
                    "{}",
                    ManagerError::PresetMismatch {
                        found: persisted.preset.clone(),
                        requested: self.preset.clone(),
                    }
                );
                Ok(persisted)
            })
            .transpose()?;

        for c in &mut self.components {
            if let Some(cfg) = starting_config.as_ref().and_then(|p| p.config.get(c.name())) {
                c.load_config(cfg.clone())
                    .with_context(|| format!("loading starting config for component {:?}", c.name()))?;
            }
            c.hydrate(&self.preset, &self.fabric_mode)
                .with_context(|| format!("hydrating component {:?}", c.name()))?;
        }
        Ok(self)
    }

    /// Loads an existing basedir's `config.yaml`/`wiring.yaml` and
    /// re-hydrates every component.
    pub fn load(mut self) -> Result<Self> {
        let config_path = self.basedir.join("config.yaml");
        let text = std::fs::read_to_string(&config_path)
            .with_context(|| format!("reading {config_path}"))?;
        let persisted: PersistedConfig =
            serde_yaml::from_str(&text).with_context(|| format!("parsing {config_path}"))?;
        self.preset = persisted.preset;
        self.fabric_mode = persisted.fabric_mode;
        self.validate_preset_and_mode()?;

        self.wiring = Wiring::load(&self.basedir.join("wiring.yaml")).context("loading wiring dataset")?;

        for c in &mut self.components {
            if let Some(value) = persisted.config.get(c.name()) {
                c.load_config(value.clone())
                    .with_context(|| format!("loading config for component {:?}", c.name()))?;
            }
            c.hydrate(&self.preset, &self.fabric_mode)
                .with_context(|| format!("hydrating component {:?}", c.name()))?;
        }
        Ok(self)
    }

    /// Writes `config.yaml` and `wiring.yaml` atomically, creating the
    /// basedir first if needed.
    pub fn save(&self) -> Result<()> {
        mkdir_p_mode(&self.basedir, BASEDIR_MODE)?;

        let config = self
            .components
            .iter()
            .map(|c| Ok((c.name().to_string(), c.to_config()?)))
            .collect::<Result<HashMap<_, _>>>()
            .context("encoding component configs")?;
        let persisted = PersistedConfig {
            preset: self.preset.clone(),
            fabric_mode: self.fabric_mode.clone(),
            config,
        };
        let yaml = serde_yaml::to_string(&persisted).context("marshaling manager config")?;
        atomic_write(&self.basedir.join("config.yaml"), yaml.as_bytes())?;

        self.wiring.save(&self.basedir.join("wiring.yaml"))?;
        Ok(())
    }

    /// Builds every enabled component into its bundles, writing the
    /// embedded runner binary and `recipe.yaml` into each installer
    /// bundle. If `pack` is set, invokes external packing after the
    /// artifacts are written (left to the caller — packing is an external
    /// collaborator this crate does not implement).
    pub async fn build(&self, recipe_binary: &[u8], pack: bool) -> Result<bool> {
        for bundle in self.bundles.values() {
            let dir = self.basedir.join(&bundle.name);
            mkdir_p_mode(&dir, BASEDIR_MODE)?;
            if bundle.is_installer {
                atomic_write(&dir.join("hhfab-recipe"), recipe_binary)?;
                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    std::fs::set_permissions(
                        dir.join("hhfab-recipe"),
                        std::fs::Permissions::from_mode(RECIPE_BINARY_MODE),
                    )
                    .context("setting hhfab-recipe mode")?;
                }
            }
        }

        let resolver = ComponentResolver {
            components: &self.components,
            preset: &self.preset,
            fabric_mode: &self.fabric_mode,
        };

        let mut collected: HashMap<String, Vec<StagedRunOp>> = HashMap::new();
        for component in &self.components {
            if !component.is_enabled(&self.preset, &self.fabric_mode) {
                continue;
            }
            let mut adder = Adder::new(&self.basedir, &self.bundles, self.max_stage);
            component
                .build(&self.preset, &self.fabric_mode, &resolver, &self.wiring, &mut adder)
                .await
                .with_context(|| format!("building component {:?}", component.name()))?;
            for (bundle, ops) in adder.into_result()? {
                collected.entry(bundle).or_default().extend(ops);
            }
        }

        for bundle in self.bundles.values().filter(|b| b.is_installer) {
            let mut ops = collected.remove(&bundle.name).unwrap_or_default();
            ops.sort_by_key(|o| (o.stage, o.order));

            let mut recipe = Recipe::new();
            for staged in ops {
                recipe.push(staged.name, staged.op);
            }
            recipe.save(&self.basedir.join(&bundle.name).join("recipe.yaml"))?;
        }

        Ok(pack)
    }

    pub fn cache_path(&self) -> Utf8PathBuf {
        self.basedir.join("cache.yaml")
    }

    pub fn load_cache(&self) -> Result<ArtifactCache> {
        ArtifactCache::load(&self.cache_path())
    }
}

impl std::fmt::Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("basedir", &self.basedir)
            .field("preset", &self.preset)
            .field("fabric_mode", &self.fabric_mode)
            .field("components", &self.components.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tempfile::TempDir;

    #[derive(Debug)]
    struct StubComponent {
        name: &'static str,
        hydrated: u32,
    }

    #[async_trait]
    impl Component for StubComponent {
        fn name(&self) -> &str {
            self.name
        }
        fn is_enabled(&self, _preset: &str, _mode: &str) -> bool {
            true
        }
        fn hydrate(&mut self, _preset: &str, _mode: &str) -> Result<()> {
            self.hydrated += 1;
            Ok(())
        }
        async fn build(
            &self,
            _preset: &str,
            _mode: &str,
            _resolver: &dyn Resolver,
            _wiring: &Wiring,
            adder: &mut Adder<'_>,
        ) -> Result<()> {
            adder.add_run_op(
                "control",
                0,
                "exec-true",
                Box::new(crate::ops::run::ExecCommand {
                    name: "true".into(),
                    ..Default::default()
                }),
            );
            Ok(())
        }
        fn to_config(&self) -> Result<serde_json::Value> {
            Ok(serde_json::json!({"hydrated": self.hydrated}))
        }
        fn load_config(&mut self, value: serde_json::Value) -> Result<()> {
            self.hydrated = value["hydrated"].as_u64().unwrap_or(0) as u32;
            Ok(())
        }
    }

    fn manager(basedir: Utf8PathBuf) -> Manager {
        Manager::new(
            basedir,
            "default",
            "collapsed-core",
            vec![Box::new(StubComponent {
                name: "control",
                hydrated: 0,
            })],
            vec!["default".to_string()],
            vec!["collapsed-core".to_string()],
            vec![Bundle::new("control", true)],
            4,
        )
    }

    #[test]
    fn init_rejects_existing_basedir() {
        let dir = TempDir::new().unwrap();
        let basedir = Utf8PathBuf::from_path_buf(dir.path().join("existing")).unwrap();
        std::fs::create_dir(&basedir).unwrap();
        let err = manager(basedir).init(&[], true, None).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn init_rejects_unknown_preset() {
        let dir = TempDir::new().unwrap();
        let basedir = Utf8PathBuf::from_path_buf(dir.path().join("fresh")).unwrap();
        let mut m = manager(basedir);
        m.preset = "nonexistent".into();
        assert!(m.init(&[], true, None).is_err());
    }

    #[test]
    fn init_hydrates_components() {
        let dir = TempDir::new().unwrap();
        let basedir = Utf8PathBuf::from_path_buf(dir.path().join("fresh")).unwrap();
        let m = manager(basedir).init(&[], true, None).unwrap();
        assert_eq!(m.components[0].to_config().unwrap()["hydrated"], 1);
    }

    #[tokio::test]
    async fn save_then_load_round_trips_config_and_rehydrates() {
        let dir = TempDir::new().unwrap();
        let basedir = Utf8PathBuf::from_path_buf(dir.path().join("fresh")).unwrap();
        let m = manager(basedir.clone()).init(&[], true, None).unwrap();
        m.save().unwrap();

        assert!(basedir.join("config.yaml").exists());
        assert!(basedir.join("wiring.yaml").exists());

        let loaded = manager(basedir).load().unwrap();
        // hydrated once by init+save, once more by load
        assert_eq!(loaded.components[0].to_config().unwrap()["hydrated"], 2);
    }

    #[tokio::test]
    async fn build_writes_runner_binary_and_recipe_for_installer_bundle() {
        let dir = TempDir::new().unwrap();
        let basedir = Utf8PathBuf::from_path_buf(dir.path().join("fresh")).unwrap();
        let m = manager(basedir.clone()).init(&[], true, None).unwrap();
        m.build(b"#!/bin/sh\necho stub\n", false).await.unwrap();

        let bundle_dir = basedir.join("control");
        assert!(bundle_dir.join("hhfab-recipe").exists());
        assert!(bundle_dir.join("recipe.yaml").exists());

        let recipe = Recipe::load(&bundle_dir.join("recipe.yaml")).unwrap();
        assert_eq!(recipe.entries.len(), 1);
        assert_eq!(recipe.entries[0].name, "exec-true");
    }

    #[tokio::test]
    async fn rebuilding_into_same_basedir_is_allowed_via_load() {
        let dir = TempDir::new().unwrap();
        let basedir = Utf8PathBuf::from_path_buf(dir.path().join("fresh")).unwrap();
        let m = manager(basedir.clone()).init(&[], true, None).unwrap();
        m.save().unwrap();
        m.build(b"stub", false).await.unwrap();

        assert!(manager(basedir.clone()).init(&[], true, None).is_err());

        let reloaded = manager(basedir).load().unwrap();
        reloaded.build(b"stub", false).await.unwrap();
    }
}
