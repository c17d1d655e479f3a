//! The artifact cache: `basedir/cache.yaml`, mapping artifact names to a
//! structural fingerprint of the inputs that produced them, so repeat
//! builds can skip redundant work.

use crate::fsutil::atomic_write;
use anyhow::{Context, Result};
use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `basedir/cache.yaml`'s mapping of artifact name to FNV-64 fingerprint.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtifactCache {
    #[serde(default)]
    hashes: BTreeMap<String, u64>,
}

impl ArtifactCache {
    /// Load from `path`, or return an empty cache if it doesn't exist yet.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading artifact cache {path}"))?;
        serde_yaml::from_str(&data).with_context(|| format!("parsing artifact cache {path}"))
    }

    /// Write the cache to `path` atomically.
    pub fn save(&self, path: &Utf8Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        atomic_write(path, data.as_bytes())
    }

    /// `true` iff a previous [`ArtifactCache::add`] call for `name` recorded
    /// exactly this structural fingerprint of `values`.
    pub fn is_actual<T: Serialize>(&self, name: &str, values: &[T]) -> Result<bool> {
        let fp = structural_fingerprint(values)?;
        Ok(self.hashes.get(name) == Some(&fp))
    }

    /// Record the structural fingerprint of `values` as the current state
    /// of the artifact named `name`.
    pub fn add<T: Serialize>(&mut self, name: &str, values: &[T]) -> Result<()> {
        let fp = structural_fingerprint(values)?;
        self.hashes.insert(name.to_string(), fp);
        Ok(())
    }
}

/// Structural fingerprint over canonical (sorted-key) JSON encodings of
/// `values`, hashed with FNV-64. `serde_json`'s default map representation
/// is a `BTreeMap`, so field order never affects the fingerprint, but list
/// order does (per the design note: callers must use deterministic
/// orderings for slice-valued inputs).
fn structural_fingerprint<T: Serialize>(values: &[T]) -> Result<u64> {
    let mut encoded = Vec::with_capacity(values.len());
    for v in values {
        encoded.push(serde_json::to_vec(v).context("encoding cache input")?);
    }
    Ok(hhfab_utils::fnv64_hash_all(
        encoded.iter().map(|v| v.as_slice()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use tempfile::TempDir;

    #[test]
    fn is_actual_matches_previous_add() {
        let mut cache = ArtifactCache::default();
        assert!(!cache.is_actual("control-image", &["v1"]).unwrap());
        cache.add("control-image", &["v1"]).unwrap();
        assert!(cache.is_actual("control-image", &["v1"]).unwrap());
    }

    #[test]
    fn changing_a_recorded_value_flips_is_actual() {
        let mut cache = ArtifactCache::default();
        cache.add("control-image", &["v1"]).unwrap();
        assert!(!cache.is_actual("control-image", &["v2"]).unwrap());
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("cache.yaml")).unwrap();

        let mut cache = ArtifactCache::default();
        cache.add("a", &["x"]).unwrap();
        cache.save(&path).unwrap();

        let loaded = ArtifactCache::load(&path).unwrap();
        assert_eq!(loaded, cache);
    }

    #[test]
    fn load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("nope.yaml")).unwrap();
        assert_eq!(ArtifactCache::load(&path).unwrap(), ArtifactCache::default());
    }
}
