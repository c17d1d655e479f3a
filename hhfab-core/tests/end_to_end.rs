//! End-to-end coverage of a full init → build cycle: a component that
//! both generates a file via a Build-Op and emits a Run-Op, producing an
//! installer bundle with a runner binary, a recipe, and generated content.

use async_trait::async_trait;
use camino::Utf8PathBuf;
use hhfab_core::component::{Component, Resolver};
use hhfab_core::content::FromValue;
use hhfab_core::file::FileDescriptor;
use hhfab_core::manager::adder::Adder;
use hhfab_core::ops::build::FileGenerate;
use hhfab_core::ops::run::ExecCommand;
use hhfab_core::ops::RunOp as _;
use hhfab_core::stage::Bundle;
use hhfab_core::wiring::Wiring;
use hhfab_core::Manager;
use tempfile::TempDir;

#[derive(Debug)]
struct ControlComponent;

#[async_trait]
impl Component for ControlComponent {
    fn name(&self) -> &str {
        "control"
    }
    fn is_enabled(&self, _preset: &str, _mode: &str) -> bool {
        true
    }
    fn hydrate(&mut self, _preset: &str, _mode: &str) -> anyhow::Result<()> {
        Ok(())
    }
    async fn build(
        &self,
        _preset: &str,
        _mode: &str,
        _resolver: &dyn Resolver,
        _wiring: &Wiring,
        adder: &mut Adder<'_>,
    ) -> anyhow::Result<()> {
        adder
            .add_build_op(
                "control",
                0,
                "motd",
                Box::new(FileGenerate {
                    file: FileDescriptor {
                        name: "motd.txt".into(),
                        install_target_dir: "/etc".into(),
                        ..Default::default()
                    },
                    content: Box::new(FromValue("welcome to the fabric\n".to_string())),
                }),
            )
            .await;
        adder.add_run_op(
            "control",
            1,
            "start-agent",
            Box::new(ExecCommand {
                name: "true".into(),
                ..Default::default()
            }),
        );
        Ok(())
    }
    fn to_config(&self) -> anyhow::Result<serde_json::Value> {
        Ok(serde_json::json!({}))
    }
    fn load_config(&mut self, _value: serde_json::Value) -> anyhow::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn fresh_build_writes_runner_recipe_and_generated_file_in_stage_order() {
    let dir = TempDir::new().unwrap();
    let basedir = Utf8PathBuf::from_path_buf(dir.path().join("basedir")).unwrap();

    let manager = Manager::new(
        basedir.clone(),
        "default",
        "spine-leaf",
        vec![Box::new(ControlComponent)],
        vec!["default".to_string()],
        vec!["spine-leaf".to_string()],
        vec![Bundle::new("control", true)],
        4,
    )
    .init(&[], true, None)
    .unwrap();
    manager.save().unwrap();
    manager.build(b"#!/bin/sh\necho stub runner\n", false).await.unwrap();

    let bundle_dir = basedir.join("control");
    assert!(bundle_dir.join("hhfab-recipe").exists());
    assert_eq!(
        std::fs::read_to_string(bundle_dir.join("motd.txt")).unwrap(),
        "welcome to the fabric\n"
    );

    let recipe = hhfab_core::recipe::Recipe::load(&bundle_dir.join("recipe.yaml")).unwrap();
    // The build-op's install-file run-op (stage 0) precedes the
    // component's directly-emitted run-op (stage 1).
    assert_eq!(recipe.entries.len(), 2);
    assert_eq!(recipe.entries[0].name, "motd-0");
    assert_eq!(recipe.entries[0].op.type_tag(), "InstallFile");
    assert_eq!(recipe.entries[1].name, "start-agent");
    assert_eq!(recipe.entries[1].op.type_tag(), "ExecCommand");

    // Rebuilding into the same basedir is rejected by Init...
    let reinit = Manager::new(
        basedir.clone(),
        "default",
        "spine-leaf",
        vec![Box::new(ControlComponent)],
        vec!["default".to_string()],
        vec!["spine-leaf".to_string()],
        vec![Bundle::new("control", true)],
        4,
    )
    .init(&[], true, None);
    assert!(reinit.is_err());

    // ...but allowed via Load + Build.
    let reloaded = Manager::new(
        basedir.clone(),
        "default",
        "spine-leaf",
        vec![Box::new(ControlComponent)],
        vec!["default".to_string()],
        vec!["spine-leaf".to_string()],
        vec![Bundle::new("control", true)],
        4,
    )
    .load()
    .unwrap();
    reloaded.build(b"stub", false).await.unwrap();
}
