//! Build-and-recipe engine for the fabricator control-plane bootstrap
//! tool: Component/Op plug-in model, content-addressed artifact caching,
//! OCI/file pull-and-sync, certificate generation, and the recipe
//! runner with its install-action primitives.

pub mod addr;
pub mod cache;
pub mod component;
pub mod content;
pub mod error;
pub mod file;
pub mod fsutil;
pub mod keypair;
pub mod manager;
pub mod oci;
pub mod ops;
pub mod recipe;
pub mod refs;
pub mod runner;
pub mod semver;
pub mod stage;
pub mod task;
pub mod wait;
pub mod wiring;

pub use component::{Component, Resolver};
pub use error::ManagerError;
pub use file::FileDescriptor;
pub use manager::Manager;
pub use recipe::Recipe;
pub use refs::ArtifactRef;
pub use stage::{Bundle, Stage};
pub use wiring::Wiring;
