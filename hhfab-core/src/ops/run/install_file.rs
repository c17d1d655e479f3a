use crate::file::{DEFAULT_DIR_MODE, DEFAULT_FILE_MODE};
use crate::fsutil::mkdir_p_mode;
use crate::ops::RunOp;
use anyhow::{ensure, Context, Result};
use async_trait::async_trait;
use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use std::os::unix::fs::PermissionsExt;

/// Copies `basedir/<name>` to `<target>/<target_name>`, creating `target`
/// with `mkdir_mode` if needed. Safe to re-run: the destination is written
/// via a temp file + rename so a crash mid-copy never leaves a partial file
/// in place of a good one.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstallFile {
    pub name: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mkdir_mode: Option<u32>,
}

#[async_trait]
impl RunOp for InstallFile {
    fn type_tag(&self) -> &'static str {
        "InstallFile"
    }

    fn hydrate(&mut self) -> Result<()> {
        ensure!(!self.name.is_empty(), "install-file missing name");
        ensure!(!self.target.is_empty(), "install-file missing target");
        if self.target_name.is_none() {
            self.target_name = Some(self.name.clone());
        }
        if self.mode.is_none() {
            self.mode = Some(DEFAULT_FILE_MODE);
        }
        if self.mkdir_mode.is_none() {
            self.mkdir_mode = Some(DEFAULT_DIR_MODE);
        }
        Ok(())
    }

    fn summary(&self) -> String {
        format!(
            "install {} to {}/{}",
            self.name,
            self.target,
            self.target_name.as_deref().unwrap_or(&self.name)
        )
    }

    async fn run(&self, basedir: &Utf8Path) -> Result<()> {
        let src = basedir.join(&self.name);
        ensure!(src.is_file(), "install-file source {src} does not exist");

        let target_dir = Utf8Path::new(&self.target);
        mkdir_p_mode(target_dir, self.mkdir_mode.unwrap_or(DEFAULT_DIR_MODE))?;

        let target_name = self.target_name.as_deref().unwrap_or(&self.name);
        let dest = target_dir.join(target_name);
        let mut tmp = tempfile::NamedTempFile::new_in(target_dir)
            .with_context(|| format!("creating temp file in {target_dir}"))?;
        std::io::copy(
            &mut std::fs::File::open(&src).with_context(|| format!("opening {src}"))?,
            tmp.as_file_mut(),
        )
        .with_context(|| format!("copying {src} to {dest}"))?;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(
                self.mode.unwrap_or(DEFAULT_FILE_MODE),
            ))
            .with_context(|| format!("setting mode on {dest}"))?;
        tmp.persist(&dest)
            .with_context(|| format!("installing {dest}"))?;
        Ok(())
    }

    fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}
