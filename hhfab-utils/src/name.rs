/// Minimum length of a valid op name.
pub const OP_NAME_MIN: usize = 3;
/// Maximum length of a valid op name.
pub const OP_NAME_MAX: usize = 64;

/// Returns `true` if `name` matches `[A-Za-z0-9_-]{3,64}`.
///
/// Used to validate the names given to Build-Ops and Run-Ops when they're
/// added to a bundle's staged action list.
pub fn is_valid_op_name(name: &str) -> bool {
    let len = name.chars().count();
    if !(OP_NAME_MIN..=OP_NAME_MAX).contains(&len) {
        return false;
    }
    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
