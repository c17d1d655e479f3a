use crate::content::ContentGenerator;
use crate::file::FileDescriptor;
use crate::ops::run::InstallFile;
use crate::ops::{BuildOp, RunOp};
use anyhow::{Context, Result};
use async_trait::async_trait;
use camino::Utf8Path;
use std::fmt;

/// Calls `content`, writes the result to `basedir/<file.name>` (truncate +
/// create, mode 0644), and emits an `install-file` Run-Op if the
/// descriptor asks to be installed.
pub struct FileGenerate {
    pub file: FileDescriptor,
    pub content: Box<dyn ContentGenerator>,
}

impl fmt::Debug for FileGenerate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileGenerate").field("file", &self.file).finish()
    }
}

#[async_trait]
impl BuildOp for FileGenerate {
    fn hydrate(&mut self) -> Result<()> {
        self.file.hydrate()
    }

    async fn build(&self, basedir: &Utf8Path) -> Result<()> {
        let dest = basedir.join(&self.file.name);
        let content = self.content.generate()?;
        crate::fsutil::atomic_write(&dest, content.as_bytes())
            .with_context(|| format!("writing generated file {dest}"))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&dest, std::fs::Permissions::from_mode(crate::file::DEFAULT_FILE_MODE))
                .with_context(|| format!("setting mode on {dest}"))?;
        }
        Ok(())
    }

    fn run_ops(&self) -> Vec<Box<dyn RunOp>> {
        if !self.file.wants_install() {
            return Vec::new();
        }
        vec![Box::new(InstallFile {
            name: self.file.name.clone(),
            target: self.file.install_target_dir.clone(),
            target_name: self.file.install_name.clone(),
            mode: self.file.install_mode,
            mkdir_mode: self.file.install_mkdir_mode,
        })]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::FromValue;
    use tempfile::TempDir;

    #[tokio::test]
    async fn writes_generated_content() {
        let dir = TempDir::new().unwrap();
        let mut op = FileGenerate {
            file: FileDescriptor {
                name: "motd".into(),
                ..Default::default()
            },
            content: Box::new(FromValue("welcome\n".into())),
        };
        op.hydrate().unwrap();
        let basedir = Utf8Path::from_path(dir.path()).unwrap();
        op.build(basedir).await.unwrap();
        assert_eq!(std::fs::read_to_string(basedir.join("motd")).unwrap(), "welcome\n");
    }

    #[test]
    fn emits_install_op_only_when_requested() {
        let op = FileGenerate {
            file: FileDescriptor {
                name: "motd".into(),
                ..Default::default()
            },
            content: Box::new(FromValue("x".into())),
        };
        assert!(op.run_ops().is_empty());

        let op = FileGenerate {
            file: FileDescriptor {
                name: "motd".into(),
                install_target_dir: "/etc".into(),
                ..Default::default()
            },
            content: Box::new(FromValue("x".into())),
        };
        assert_eq!(op.run_ops().len(), 1);
    }
}
