//! The inevitable catchall "utils" crate. Generally only add
//! things here that only depend on the standard library and
//! "core" crates.
mod fnvhash;
mod name;
mod tracing_util;

pub use fnvhash::*;
pub use name::*;
pub use tracing_util::*;
