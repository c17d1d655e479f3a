use fnv::FnvHasher;
use std::hash::Hasher;

/// Compute the 64-bit FNV-1a hash of a sequence of byte chunks, hashed in
/// order with a NUL separator between each chunk so that `["ab", "c"]` and
/// `["a", "bc"]` never collide.
pub fn fnv64_hash_all<'a>(chunks: impl IntoIterator<Item = &'a [u8]>) -> u64 {
    let mut hasher = FnvHasher::default();
    for chunk in chunks {
        hasher.write(chunk);
        hasher.write_u8(0);
    }
    hasher.finish()
}
