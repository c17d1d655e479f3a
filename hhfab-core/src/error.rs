//! Structured errors a caller of [`crate::manager::Manager`] may want to
//! match on, rather than pattern-match the message text of an `anyhow`
//! chain.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("basedir {0} already exists")]
    BasedirExists(String),
    #[error("unknown preset {0:?}")]
    UnknownPreset(String),
    #[error("unknown fabric mode {0:?}")]
    UnknownFabricMode(String),
    #[error("config preset {found:?} does not match requested preset {requested:?}")]
    PresetMismatch { found: String, requested: String },
    #[error("wiring dataset is not hydrated")]
    WiringNotHydrated,
    #[error("unknown bundle {0:?}")]
    UnknownBundle(String),
}
