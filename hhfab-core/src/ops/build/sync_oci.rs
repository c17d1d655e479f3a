use crate::oci;
use crate::ops::run::PushOci;
use crate::ops::{BuildOp, RunOp};
use crate::refs::ArtifactRef;
use anyhow::Result;
use async_trait::async_trait;
use camino::Utf8Path;

/// Materializes `refr` at `basedir/<sanitized(ref@tag)>.oci` as an OCI
/// Image Layout (all architectures of a multi-arch image list included),
/// then emits a `push-oci` Run-Op targeting `target`.
#[derive(Debug, Clone)]
pub struct SyncOci {
    pub refr: ArtifactRef,
    pub target: ArtifactRef,
}

impl SyncOci {
    fn layout_name(&self) -> String {
        self.refr.sanitized_name()
    }

    fn layout_dir(&self, basedir: &Utf8Path) -> camino::Utf8PathBuf {
        basedir.join(format!("{}.oci", self.layout_name()))
    }
}

#[async_trait]
impl BuildOp for SyncOci {
    fn hydrate(&mut self) -> Result<()> {
        self.refr.strict_validate()?;
        self.target.strict_validate()
    }

    async fn build(&self, basedir: &Utf8Path) -> Result<()> {
        let dir = self.layout_dir(basedir);
        oci::sync_to_layout(&self.refr, &dir, &self.refr.tag).await
    }

    fn run_ops(&self) -> Vec<Box<dyn RunOp>> {
        vec![Box::new(PushOci {
            name: self.layout_name(),
            target: self.target.clone(),
        })]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hydrate_requires_both_refs_valid() {
        let mut op = SyncOci {
            refr: ArtifactRef::default(),
            target: ArtifactRef::new("repo", "name", "tag"),
        };
        assert!(op.hydrate().is_err());
    }

    #[test]
    fn run_ops_targets_requested_destination() {
        let op = SyncOci {
            refr: ArtifactRef::new("upstream", "control", "v1"),
            target: ArtifactRef::new("registry.local", "control", "v1"),
        };
        let ops = op.run_ops();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].type_tag(), "PushOCI");
    }

    #[tokio::test]
    async fn build_skips_when_layout_already_present() {
        let dir = tempfile::TempDir::new().unwrap();
        let basedir = camino::Utf8Path::from_path(dir.path()).unwrap();
        let op = SyncOci {
            refr: ArtifactRef::new("upstream", "control", "v1"),
            target: ArtifactRef::new("registry.local", "control", "v1"),
        };
        let layout = op.layout_dir(basedir);
        std::fs::create_dir_all(&layout).unwrap();
        std::fs::write(layout.join("index.json"), b"{}").unwrap();
        op.build(basedir).await.unwrap();
    }
}
