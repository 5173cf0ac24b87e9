//! Redemption-code generation and validation.
//!
//! Codes are `{PREFIX}{SUFFIX}`: a fixed brand prefix followed by an
//! uppercase alphanumeric suffix. Random suffixes are drawn from a charset
//! that excludes the easily-confused characters 0/O and 1/I, since codes are
//! read aloud and typed by hand. Custom suffixes (admin-chosen) may use any
//! uppercase letter or digit.

use rand::Rng;

/// Brand prefix shared by every redemption code.
pub const CODE_PREFIX: &str = "KL";

/// Length of randomly generated suffixes.
pub const RANDOM_SUFFIX_LEN: usize = 8;

/// Charset for random suffixes (no 0/O/1/I).
const SUFFIX_CHARSET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

/// Generate a new redemption code with a random suffix.
pub fn new_code() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..RANDOM_SUFFIX_LEN)
        .map(|_| SUFFIX_CHARSET[rng.gen_range(0..SUFFIX_CHARSET.len())] as char)
        .collect();
    format!("{}{}", CODE_PREFIX, suffix)
}

/// Build a code from an admin-supplied suffix.
///
/// The suffix is uppercased and must be 4..=24 uppercase alphanumeric
/// characters after trimming.
pub fn code_from_suffix(suffix: &str) -> Option<String> {
    let suffix = suffix.trim().to_uppercase();
    if !(4..=24).contains(&suffix.len()) {
        return None;
    }
    if !suffix.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()) {
        return None;
    }
    Some(format!("{}{}", CODE_PREFIX, suffix))
}

/// Cheap format check to reject garbage before hitting the store.
pub fn is_valid_code(s: &str) -> bool {
    let Some(suffix) = s.strip_prefix(CODE_PREFIX) else {
        return false;
    };
    (4..=24).contains(&suffix.len())
        && suffix.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}
