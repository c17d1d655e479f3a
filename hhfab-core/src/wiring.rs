//! The wiring dataset: a description of the physical fabric (switches,
//! links, VLANs, …) whose schema is external to this crate. The core
//! only needs to load, merge, persist, and check whether it has already
//! been hydrated by its own (external) tooling.

use anyhow::{Context, Result};
use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An opaque, externally-schemed wiring dataset. Stored as a raw JSON
/// object so this crate never needs to know its shape, only whether it
/// carries the `hydrated` marker its own validation sets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Wiring {
    #[serde(flatten)]
    raw: Map<String, Value>,
}

impl Wiring {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether this dataset has already been validated/hydrated by its
    /// own (external) tooling.
    pub fn is_hydrated(&self) -> bool {
        self.raw.get("hydrated").and_then(Value::as_bool).unwrap_or(false)
    }

    /// Loads and merges one or more wiring YAML documents; later paths'
    /// top-level keys win on conflict.
    pub fn load_paths(paths: &[impl AsRef<Utf8Path>]) -> Result<Self> {
        let mut merged = Map::new();
        for path in paths {
            let path = path.as_ref();
            let text = std::fs::read_to_string(path).with_context(|| format!("reading wiring file {path}"))?;
            let doc: Value = serde_yaml::from_str(&text).with_context(|| format!("parsing wiring file {path}"))?;
            let Value::Object(obj) = doc else {
                anyhow::bail!("wiring file {path} is not a YAML mapping");
            };
            merged.extend(obj);
        }
        Ok(Self { raw: merged })
    }

    pub fn load(path: &Utf8Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
        serde_yaml::from_str(&text).with_context(|| format!("parsing {path}"))
    }

    pub fn save(&self, path: &Utf8Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self).context("marshaling wiring dataset")?;
        crate::fsutil::atomic_write(path, yaml.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn is_hydrated_reads_marker() {
        let mut w = Wiring::empty();
        assert!(!w.is_hydrated());
        w.raw.insert("hydrated".into(), Value::Bool(true));
        assert!(w.is_hydrated());
    }

    #[test]
    fn load_paths_merges_later_over_earlier() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.yaml");
        let b = dir.path().join("b.yaml");
        std::fs::write(&a, "hydrated: false\nswitches: []\n").unwrap();
        std::fs::write(&b, "hydrated: true\n").unwrap();
        let paths = [
            camino::Utf8PathBuf::from_path_buf(a).unwrap(),
            camino::Utf8PathBuf::from_path_buf(b).unwrap(),
        ];
        let w = Wiring::load_paths(&paths).unwrap();
        assert!(w.is_hydrated());
        assert!(w.raw.contains_key("switches"));
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = camino::Utf8PathBuf::from_path_buf(dir.path().join("wiring.yaml")).unwrap();
        let mut w = Wiring::empty();
        w.raw.insert("hydrated".into(), Value::Bool(true));
        w.save(&path).unwrap();
        let loaded = Wiring::load(&path).unwrap();
        assert!(loaded.is_hydrated());
    }
}
