//! FNV-1 32-bit hash oracle
//!
//! This module provides the forward hash used to derive event identifiers,
//! the continuation hash used to extend a cached prefix state, the exact
//! algebraic inverse, and the truncated "fuzzy" step used for early rejection.
//!
//! All arithmetic is unsigned 32-bit with wraparound. Input is lower-cased
//! before hashing; the `*_bytes` variants are total over any byte sequence,
//! while the `&str` variants reject non-ASCII input.

use crate::constants::{FNV_OFFSET, FNV_PRIME, FNV_PRIME_INVERSE, FUZZY_MASK, HASH30_MASK};
use crate::error::{Result, SearchError};

/// One forward step: multiply then XOR the (already lower-cased) byte
#[inline(always)]
pub fn fnv1_step(state: u32, byte: u8) -> u32 {
    state.wrapping_mul(FNV_PRIME) ^ byte as u32
}

/// One inverse step: undo `fnv1_step(_, byte)`
#[inline(always)]
pub fn fnv1_unstep(state: u32, byte: u8) -> u32 {
    (state ^ byte as u32).wrapping_mul(FNV_PRIME_INVERSE)
}

/// Forward hash of a byte sequence (ASCII letters are lower-cased)
#[inline]
pub fn fnv1_hash_bytes(bytes: &[u8]) -> u32 {
    fnv1_continue_bytes(FNV_OFFSET, bytes)
}

/// Continue hashing `suffix` from a prior state
#[inline]
pub fn fnv1_continue_bytes(state: u32, suffix: &[u8]) -> u32 {
    suffix
        .iter()
        .fold(state, |h, &b| fnv1_step(h, b.to_ascii_lowercase()))
}

/// State that must have existed before `suffix` was hashed to reach `target`
#[inline]
pub fn fnv1_inverse_bytes(target: u32, suffix: &[u8]) -> u32 {
    suffix
        .iter()
        .rev()
        .fold(target, |h, &b| fnv1_unstep(h, b.to_ascii_lowercase()))
}

/// Ensure the string only contains ASCII
pub fn check_ascii(s: &str) -> Result<()> {
    match s.char_indices().find(|(_, c)| !c.is_ascii()) {
        Some((position, found)) => Err(SearchError::InvalidCharacter { position, found }),
        None => Ok(()),
    }
}

/// Forward FNV-1 hash of a string
///
/// # Returns
/// `InvalidCharacter` if `s` contains a non-ASCII character
pub fn fnv1_hash(s: &str) -> Result<u32> {
    check_ascii(s)?;
    Ok(fnv1_hash_bytes(s.as_bytes()))
}

/// Continuation hash: `fnv1_continue(fnv1_hash(p), s) == fnv1_hash(p + s)`
pub fn fnv1_continue(state: u32, suffix: &str) -> Result<u32> {
    check_ascii(suffix)?;
    Ok(fnv1_continue_bytes(state, suffix.as_bytes()))
}

/// Algebraic inverse: `fnv1_inverse(fnv1_hash(p + s), s) == fnv1_hash(p)`
pub fn fnv1_inverse(target: u32, suffix: &str) -> Result<u32> {
    check_ascii(suffix)?;
    Ok(fnv1_inverse_bytes(target, suffix.as_bytes()))
}

/// High 24 bits of the next multiply step
///
/// The final XOR only touches the low byte, so every one-character extension
/// of `state` hashes to a value whose high 24 bits equal this mask.
#[inline(always)]
pub fn fuzzy_mask(state: u32) -> u32 {
    state.wrapping_mul(FNV_PRIME) & FUZZY_MASK
}

/// Fuzzy bucket of a target hash (comparable with `fuzzy_mask`)
#[inline(always)]
pub fn fuzzy_bucket(target: u32) -> u32 {
    target & FUZZY_MASK
}

/// Fold a 32-bit hash into the 30-bit identifier space
#[inline]
pub fn fold30(h: u32) -> u32 {
    (h >> 30) ^ (h & HASH30_MASK)
}

/// 30-bit folded hash of a string
pub fn hash30(s: &str) -> Result<u32> {
    fnv1_hash(s).map(fold30)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_vectors() {
        assert_eq!(fnv1_hash("").unwrap(), 0x811c9dc5);
        assert_eq!(fnv1_hash("a").unwrap(), 0x050c5d7e);
        assert_eq!(fnv1_hash("foobar").unwrap(), 0x31f0b262);
    }

    #[test]
    fn test_hash_is_case_insensitive() {
        assert_eq!(
            fnv1_hash("Play_Music").unwrap(),
            fnv1_hash("play_music").unwrap()
        );
    }

    #[test]
    fn test_known_event_name() {
        assert_eq!(
            fnv1_hash("play_vo_trn_keepfighting_remind_02").unwrap(),
            0xEA28F201
        );
    }

    #[test]
    fn test_prime_inverse() {
        assert_eq!(FNV_PRIME.wrapping_mul(FNV_PRIME_INVERSE), 1);
    }

    #[test]
    fn test_continue_matches_forward() {
        let prefix = fnv1_hash("play_").unwrap();
        assert_eq!(
            fnv1_continue(prefix, "music").unwrap(),
            fnv1_hash("play_music").unwrap()
        );
    }

    #[test]
    fn test_inverse_round_trip() {
        let full = fnv1_hash("hero_attack_01").unwrap();
        assert_eq!(
            fnv1_inverse(full, "_01").unwrap(),
            fnv1_hash("hero_attack").unwrap()
        );
        assert_eq!(fnv1_inverse(full, "hero_attack_01").unwrap(), FNV_OFFSET);
    }

    #[test]
    fn test_unstep_inverts_step() {
        for byte in [b'a', b'z', b'_', b'0', 0u8, 255u8] {
            let state = 0xDEADBEEF;
            assert_eq!(fnv1_unstep(fnv1_step(state, byte), byte), state);
        }
    }

    #[test]
    fn test_fuzzy_mask_covers_all_last_chars() {
        let state = fnv1_hash("weapo").unwrap();
        let mask = fuzzy_mask(state);
        for &c in crate::constants::CHARSET_REST {
            assert_eq!(fuzzy_bucket(fnv1_step(state, c)), mask);
        }
    }

    #[test]
    fn test_non_ascii_rejected() {
        let err = fnv1_hash("caf\u{e9}").unwrap_err();
        assert!(matches!(
            err,
            SearchError::InvalidCharacter { position: 3, .. }
        ));
    }

    #[test]
    fn test_fold30() {
        assert_eq!(fold30(0xFFFF_FFFF), 0x3FFF_FFFC);
        assert_eq!(fold30(0x0000_0001), 1);
        assert!(hash30("play_music").unwrap() <= HASH30_MASK);
    }
}
