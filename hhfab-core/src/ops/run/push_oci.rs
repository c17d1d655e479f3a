use crate::ops::RunOp;
use crate::oci;
use crate::refs::ArtifactRef;
use anyhow::{ensure, Result};
use async_trait::async_trait;
use camino::Utf8Path;
use serde::{Deserialize, Serialize};

/// Pushes the OCI Image Layout previously materialized at
/// `basedir/<name>.oci` (see [`crate::ops::build::SyncOci`]) to `target`,
/// using the same `skopeo copy --all` semantics as the build-time sync.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PushOci {
    pub name: String,
    pub target: ArtifactRef,
}

impl PushOci {
    fn layout_dir(&self, basedir: &Utf8Path) -> camino::Utf8PathBuf {
        basedir.join(format!("{}.oci", self.name))
    }
}

#[async_trait]
impl RunOp for PushOci {
    fn type_tag(&self) -> &'static str {
        "PushOCI"
    }

    fn hydrate(&mut self) -> Result<()> {
        ensure!(!self.name.is_empty(), "push-oci missing name");
        self.target.strict_validate()
    }

    fn summary(&self) -> String {
        format!("push {}.oci to {}", self.name, self.target)
    }

    async fn run(&self, basedir: &Utf8Path) -> Result<()> {
        let dir = self.layout_dir(basedir);
        ensure!(
            dir.join("index.json").is_file(),
            "push-oci source layout {dir} not found"
        );
        oci::push_from_layout(&dir, &self.target.tag, &self.target).await
    }

    fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hydrate_requires_name_and_valid_target() {
        let mut op = PushOci::default();
        assert!(op.hydrate().is_err());

        let mut op = PushOci {
            name: "control".into(),
            target: ArtifactRef::new("registry.local", "control", "v1"),
        };
        op.hydrate().unwrap();
    }

    #[tokio::test]
    async fn run_fails_without_layout() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut op = PushOci {
            name: "control".into(),
            target: ArtifactRef::new("registry.local", "control", "v1"),
        };
        op.hydrate().unwrap();
        assert!(op
            .run(Utf8Path::from_path(dir.path()).unwrap())
            .await
            .is_err());
    }
}
