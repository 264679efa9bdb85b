//! Short identifier generation.
//!
//! Identifiers are drawn uniformly from a URL-safe 64 character alphabet,
//! so a 10 character id carries 60 bits of randomness.

use rand::Rng;

/// URL-safe alphabet used for short identifiers.
const SHORT_ID_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";

/// Default short identifier length.
pub const DEFAULT_SHORT_ID_LENGTH: usize = 10;

/// Accepted identifier lengths on lookup.
const MIN_LENGTH: usize = 6;
const MAX_LENGTH: usize = 32;

/// Generate a random short identifier of the given length.
pub fn generate_short_id(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| {
            let idx = rng.random_range(0..SHORT_ID_CHARS.len());
            SHORT_ID_CHARS[idx] as char
        })
        .collect()
}

/// Check whether a string could be a short identifier.
///
/// Used to reject garbage path segments before touching the database.
pub fn is_valid_short_id(s: &str) -> bool {
    (MIN_LENGTH..=MAX_LENGTH).contains(&s.len())
        && s.bytes().all(|b| SHORT_ID_CHARS.contains(&b))
}
