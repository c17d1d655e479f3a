//! The three Build-Op kinds, each a producer primitive executed once at
//! build time, optionally emitting Run-Ops for the recipe.

mod fetch_oras;
mod generate_file;
mod sync_oci;

pub use fetch_oras::FilesOras;
pub use generate_file::FileGenerate;
pub use sync_oci::SyncOci;
