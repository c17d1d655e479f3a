//! Version strings as used by component configs: semver with a mandatory
//! leading `v` (e.g. `v1.0.0`, `v1.0.0-alpha.1.2+metadata`), following the
//! convention used for fabric software and switch agent release tags.

use thiserror::Error;

/// A parsed `vMAJOR.MINOR.PATCH[-PRERELEASE][+METADATA]` version string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub prerelease: Option<String>,
    pub metadata: Option<String>,
}

/// Errors parsing a [`Version`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VersionError {
    #[error("version {0:?} must start with 'v'")]
    MissingLeadingV(String),
    #[error("version {0:?} is not a valid MAJOR.MINOR.PATCH triple")]
    MalformedCore(String),
    #[error("version {0:?} has a non-numeric component")]
    NonNumeric(String),
}

impl Version {
    /// Parse a version string, requiring a leading `v`.
    pub fn parse(s: &str) -> Result<Self, VersionError> {
        let rest = s
            .strip_prefix('v')
            .ok_or_else(|| VersionError::MissingLeadingV(s.to_string()))?;

        // Split off build metadata first (everything after the first '+'),
        // then prerelease (everything after the first '-' in what remains).
        let (rest, metadata) = match rest.split_once('+') {
            Some((head, meta)) => (head, Some(meta.to_string())),
            None => (rest, None),
        };
        let (core, prerelease) = match rest.split_once('-') {
            Some((head, pre)) => (head, Some(pre.to_string())),
            None => (rest, None),
        };

        let mut parts = core.split('.');
        let (Some(major), Some(minor), Some(patch), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(VersionError::MalformedCore(s.to_string()));
        };
        let parse_component = |c: &str| {
            c.parse::<u64>()
                .map_err(|_| VersionError::NonNumeric(s.to_string()))
        };
        Ok(Self {
            major: parse_component(major)?,
            minor: parse_component(minor)?,
            patch: parse_component(patch)?,
            prerelease,
            metadata,
        })
    }
}
