//! File descriptors: the shared shape for "a file that lives under a
//! bundle's basedir and should also be installed onto the target node".

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

/// Default mode for an installed regular file.
pub const DEFAULT_FILE_MODE: u32 = 0o644;
/// Default mode for a created directory.
pub const DEFAULT_DIR_MODE: u32 = 0o755;

/// Describes a file produced under a bundle's basedir, and optionally how it
/// should be installed onto the target node by an `install-file` Run-Op.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileDescriptor {
    /// Name of the file under the bundle's basedir. Required.
    pub name: String,
    /// Mode of the file as produced locally (informational; not enforced
    /// here, since the producing Build-Op controls the actual write).
    #[serde(rename = "local-mode", default, skip_serializing_if = "Option::is_none")]
    pub local_mode: Option<u32>,
    /// Directory on the target node this file installs into. Empty means
    /// "do not install this file" (no Run-Op is emitted for it).
    #[serde(rename = "install-target-dir", default, skip_serializing_if = "String::is_empty")]
    pub install_target_dir: String,
    /// Name of the file once installed. Defaults to `name`.
    #[serde(rename = "install-name", default, skip_serializing_if = "Option::is_none")]
    pub install_name: Option<String>,
    /// Mode of the installed file. Defaults to 0644.
    #[serde(rename = "install-mode", default, skip_serializing_if = "Option::is_none")]
    pub install_mode: Option<u32>,
    /// Mode used when creating `install_target_dir`. Defaults to 0755.
    #[serde(rename = "install-mkdir-mode", default, skip_serializing_if = "Option::is_none")]
    pub install_mkdir_mode: Option<u32>,
}

impl FileDescriptor {
    /// Validate and fill in defaults. Idempotent.
    pub fn hydrate(&mut self) -> Result<()> {
        ensure!(!self.name.is_empty(), "file descriptor missing name");
        if self.install_name.is_none() {
            self.install_name = Some(self.name.clone());
        }
        if self.install_mode.is_none() {
            self.install_mode = Some(DEFAULT_FILE_MODE);
        }
        if self.install_mkdir_mode.is_none() {
            self.install_mkdir_mode = Some(DEFAULT_DIR_MODE);
        }
        Ok(())
    }

    /// Whether this descriptor should be installed on the target node.
    pub fn wants_install(&self) -> bool {
        !self.install_target_dir.is_empty()
    }

    /// The name the file will have once installed, defaulting to `name`.
    pub fn install_name_or_default(&self) -> &str {
        self.install_name.as_deref().unwrap_or(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hydrate_requires_name() {
        let mut f = FileDescriptor::default();
        assert!(f.hydrate().is_err());
    }

    #[test]
    fn hydrate_fills_defaults() {
        let mut f = FileDescriptor {
            name: "control.tar".into(),
            ..Default::default()
        };
        f.hydrate().unwrap();
        assert_eq!(f.install_name.as_deref(), Some("control.tar"));
        assert_eq!(f.install_mode, Some(DEFAULT_FILE_MODE));
        assert_eq!(f.install_mkdir_mode, Some(DEFAULT_DIR_MODE));
    }

    #[test]
    fn hydrate_is_idempotent() {
        let mut f = FileDescriptor {
            name: "x".into(),
            install_name: Some("y".into()),
            install_mode: Some(0o600),
            ..Default::default()
        };
        f.hydrate().unwrap();
        assert_eq!(f.install_name.as_deref(), Some("y"));
        assert_eq!(f.install_mode, Some(0o600));
    }
}
