//! Artifact references: `repo/name:tag` locations for OCI content.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A reference to an OCI artifact, e.g. `registry.local:5000/fabric/control:v1.2.3`.
///
/// Any of the three fields may be empty; [`ArtifactRef::fallback`] is used to
/// fill empty fields from a priority list of defaults, and
/// [`ArtifactRef::strict_validate`] rejects any reference with an empty field.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    #[serde(default)]
    pub repo: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tag: String,
}

impl ArtifactRef {
    /// Construct a fully-populated reference.
    pub fn new(repo: impl Into<String>, name: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            name: name.into(),
            tag: tag.into(),
        }
    }

    /// Parse a canonical `repo/name:tag` string.
    ///
    /// The repo may itself contain `/` (e.g. a registry host plus path), so
    /// splitting proceeds from the right: the tag is everything after the
    /// last `:` that doesn't belong to a host:port prefix, and the name is
    /// the last `/`-separated path component before the tag.
    pub fn parse(s: &str) -> Result<Self> {
        let (repo_and_name, tag) = match s.rsplit_once(':') {
            // A ':' inside a host:port prefix (e.g. "localhost:5000/foo") is not
            // a tag separator if there's a '/' after it.
            Some((head, tail)) if !tail.contains('/') => (head, tail),
            _ => (s, ""),
        };
        let (repo, name) = match repo_and_name.rsplit_once('/') {
            Some((repo, name)) => (repo, name),
            None => ("", repo_and_name),
        };
        Ok(Self::new(repo, name, tag))
    }

    /// Returns `true` if `repo` is empty.
    pub fn repo_is_empty(&self) -> bool {
        self.repo.is_empty()
    }

    /// `repo/name`, without the tag.
    pub fn repo_name(&self) -> String {
        format!("{}/{}", self.repo, self.name)
    }

    /// Reject the reference if any of `repo`, `name`, `tag` is empty, naming
    /// the first missing field.
    pub fn strict_validate(&self) -> Result<()> {
        if self.repo.is_empty() {
            bail!("artifact reference missing repo: {self}");
        }
        if self.name.is_empty() {
            bail!("artifact reference missing name: {self}");
        }
        if self.tag.is_empty() {
            bail!("artifact reference missing tag: {self}");
        }
        Ok(())
    }

    /// Fill empty fields of `self` from the first ref in `defaults` that has
    /// that field populated, in argument order. Already-populated fields on
    /// `self` are never overwritten.
    pub fn fallback(&self, defaults: &[&ArtifactRef]) -> Self {
        let mut out = self.clone();
        for default in defaults {
            if out.repo.is_empty() && !default.repo.is_empty() {
                out.repo = default.repo.clone();
            }
            if out.name.is_empty() && !default.name.is_empty() {
                out.name = default.name.clone();
            }
            if out.tag.is_empty() && !default.tag.is_empty() {
                out.tag = default.tag.clone();
            }
        }
        out
    }

    /// A filesystem-safe rendering of `repo/name@tag`, for use as a
    /// directory name (e.g. `basedir/<sanitized>.oci`).
    pub fn sanitized_name(&self) -> String {
        format!("{}@{}", self.repo_name(), self.tag)
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
            .collect()
    }

    /// Returns `true` if `repo`'s host part parses as localhost (`localhost`,
    /// `127.0.0.1`, `::1`, or anything ending `.localhost`), in which case
    /// plain-HTTP should be used instead of HTTPS.
    pub fn is_localhost(&self) -> bool {
        let host = self
            .repo
            .split('/')
            .next()
            .unwrap_or("")
            .rsplit_once(':')
            .map(|(host, _port)| host)
            .unwrap_or(self.repo.split('/').next().unwrap_or(""));
        matches!(host, "localhost" | "127.0.0.1" | "::1") || host.ends_with(".localhost")
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.repo, self.name, self.tag)
    }
}
