//! Identifier charset policy
//!
//! First character: `[a-z]`. Remaining characters: `[a-z0-9_]`.
//! Generators draw from these alphabets directly, so a non-conforming
//! candidate is never produced in the first place.

use crate::constants::{CHARSET_FIRST, CHARSET_REST};

/// Legal alphabet per position
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CharsetPolicy;

impl CharsetPolicy {
    /// Alphabet for position 0
    #[inline]
    pub fn first_charset(&self) -> &'static [u8] {
        CHARSET_FIRST
    }

    /// Alphabet for positions 1..
    #[inline]
    pub fn rest_charset(&self) -> &'static [u8] {
        CHARSET_REST
    }

    /// Alphabet for a given position
    #[inline]
    pub fn alphabet_at(&self, position: usize) -> &'static [u8] {
        if position == 0 {
            CHARSET_FIRST
        } else {
            CHARSET_REST
        }
    }

    /// Check full conformance of a candidate
    pub fn is_valid(&self, candidate: &[u8]) -> bool {
        match candidate.split_first() {
            None => false,
            Some((first, rest)) => {
                first.is_ascii_lowercase() && rest.iter().all(|&c| is_rest_char(c))
            }
        }
    }

    /// Check that `candidate` can appear after position 0 (suffix rules only)
    pub fn is_valid_tail(&self, tail: &[u8]) -> bool {
        tail.iter().all(|&c| is_rest_char(c))
    }

    /// Number of strings of exactly `len` characters
    pub fn count_of_length(&self, len: usize) -> u128 {
        if len == 0 {
            return 0;
        }
        CHARSET_FIRST.len() as u128 * (CHARSET_REST.len() as u128).pow(len as u32 - 1)
    }
}

#[inline]
fn is_rest_char(c: u8) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || c == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_charset_sizes() {
        let policy = CharsetPolicy;
        assert_eq!(policy.first_charset().len(), 26);
        assert_eq!(policy.rest_charset().len(), 37);
    }

    #[test]
    fn test_is_valid() {
        let policy = CharsetPolicy;
        assert!(policy.is_valid(b"play_music_01"));
        assert!(policy.is_valid(b"a"));
        assert!(!policy.is_valid(b""));
        assert!(!policy.is_valid(b"_play"));
        assert!(!policy.is_valid(b"1abc"));
        assert!(!policy.is_valid(b"Play"));
        assert!(!policy.is_valid(b"play-music"));
    }

    #[test]
    fn test_alphabet_at() {
        let policy = CharsetPolicy;
        assert_eq!(policy.alphabet_at(0), CHARSET_FIRST);
        assert_eq!(policy.alphabet_at(5), CHARSET_REST);
    }

    #[test]
    fn test_count_of_length() {
        let policy = CharsetPolicy;
        assert_eq!(policy.count_of_length(0), 0);
        assert_eq!(policy.count_of_length(1), 26);
        assert_eq!(policy.count_of_length(3), 26 * 37 * 37);
    }

    #[test]
    fn test_rest_charset_is_all_valid_tail() {
        let policy = CharsetPolicy;
        assert!(policy.is_valid_tail(policy.rest_charset()));
        assert!(!policy.is_valid_tail(b"a.b"));
    }
}
