use crate::file::FileDescriptor;
use crate::oci::{self, PullProgress};
use crate::ops::run::InstallFile;
use crate::ops::{BuildOp, RunOp};
use crate::refs::ArtifactRef;
use anyhow::{Context, Result};
use async_trait::async_trait;
use bzip2::read::BzDecoder;
use camino::Utf8Path;
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::Read;
use std::os::unix::fs::PermissionsExt;
use xz2::read::XzDecoder;

/// Pulls an OCI artifact's content blobs into `basedir`, unpacks the names
/// listed in `unpack` (decompressing by extension, stripping it, then
/// removing the packed file), chmods every [`FileDescriptor`] in `files`
/// with a non-zero local mode, and emits one `install-file` Run-Op per
/// file that wants installing.
///
/// Skips the pull entirely when every `files[].name` already exists under
/// `basedir` as a regular file — see the module-level note on why content
/// is never re-verified in that case.
#[derive(Debug, Clone)]
pub struct FilesOras {
    pub refr: ArtifactRef,
    pub unpack: Vec<String>,
    pub files: Vec<FileDescriptor>,
}

impl FilesOras {
    fn all_present(&self, basedir: &Utf8Path) -> bool {
        self.files
            .iter()
            .all(|f| basedir.join(&f.name).is_file())
    }

    fn unpack_one(basedir: &Utf8Path, name: &str) -> Result<()> {
        let packed = basedir.join(name);
        let Some(stripped) = strip_known_extension(name) else {
            return Ok(());
        };
        let dest = basedir.join(stripped);
        let input = File::open(&packed).with_context(|| format!("opening {packed}"))?;
        let mut decoder: Box<dyn Read> = if name.ends_with(".xz") {
            Box::new(XzDecoder::new(input))
        } else if name.ends_with(".gz") {
            Box::new(GzDecoder::new(input))
        } else if name.ends_with(".bz2") {
            Box::new(BzDecoder::new(input))
        } else {
            return Ok(());
        };
        let mut out = File::create(&dest).with_context(|| format!("creating {dest}"))?;
        std::io::copy(&mut decoder, &mut out).with_context(|| format!("decompressing {packed}"))?;
        drop(decoder);
        std::fs::remove_file(&packed).with_context(|| format!("removing packed file {packed}"))?;
        Ok(())
    }
}

fn strip_known_extension(name: &str) -> Option<&str> {
    for ext in [".xz", ".gz", ".bz2"] {
        if let Some(stripped) = name.strip_suffix(ext) {
            return Some(stripped);
        }
    }
    None
}

#[async_trait]
impl BuildOp for FilesOras {
    fn hydrate(&mut self) -> Result<()> {
        self.refr.strict_validate()?;
        for file in &mut self.files {
            file.hydrate()?;
        }
        Ok(())
    }

    async fn build(&self, basedir: &Utf8Path) -> Result<()> {
        if self.all_present(basedir) {
            return Ok(());
        }

        let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<PullProgress>();
        let progress_task = tokio::spawn(oci::drain_progress(rx));
        let blobs = oci::pull_artifact_blobs(&self.refr, Some(tx)).await?;
        progress_task.await.context("joining progress task")?;

        crate::fsutil::mkdir_p_mode(basedir, crate::file::DEFAULT_DIR_MODE)?;
        for blob in &blobs {
            let dest = basedir.join(&blob.name);
            crate::fsutil::atomic_write(&dest, &blob.bytes)
                .with_context(|| format!("writing pulled blob to {dest}"))?;
        }

        for name in &self.unpack {
            Self::unpack_one(basedir, name)?;
        }

        for file in &self.files {
            if let Some(mode) = file.local_mode.filter(|m| *m != 0) {
                let path = basedir.join(&file.name);
                std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode))
                    .with_context(|| format!("chmod {path}"))?;
            }
        }
        Ok(())
    }

    fn run_ops(&self) -> Vec<Box<dyn RunOp>> {
        self.files
            .iter()
            .filter(|f| f.wants_install())
            .map(|f| {
                Box::new(InstallFile {
                    name: f.name.clone(),
                    target: f.install_target_dir.clone(),
                    target_name: f.install_name.clone(),
                    mode: f.install_mode,
                    mkdir_mode: f.install_mkdir_mode,
                }) as Box<dyn RunOp>
            })
            .collect()
    }
}
