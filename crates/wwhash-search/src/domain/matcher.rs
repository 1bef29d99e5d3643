//! Candidate testing and match records

use super::FastSet;
use crate::domain::hash::fnv1_hash_bytes;
use crate::domain::target::TargetSet;
use std::sync::Arc;

/// A recovered name for a target hash
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Match {
    pub name: String,
    pub hash: u32,
    pub label: Arc<str>,
}

impl Match {
    /// Canonical ordering used to pick one match per hash: shortest name, then lexicographic
    pub fn is_preferred_over(&self, other: &Match) -> bool {
        (self.name.len(), self.name.as_str()) < (other.name.len(), other.name.as_str())
    }
}

/// Tests candidates against a shared, read-only target set
#[derive(Clone, Copy, Debug)]
pub struct MatchTester<'a> {
    targets: &'a TargetSet,
}

impl<'a> MatchTester<'a> {
    pub fn new(targets: &'a TargetSet) -> Self {
        Self { targets }
    }

    pub fn targets(&self) -> &'a TargetSet {
        self.targets
    }

    /// Hash a candidate and emit a match on hit
    #[inline]
    pub fn test(&self, candidate: &[u8]) -> Option<Match> {
        self.test_hashed(candidate, fnv1_hash_bytes(candidate))
    }

    /// Check an already computed hash for a candidate
    #[inline]
    pub fn test_hashed(&self, candidate: &[u8], hash: u32) -> Option<Match> {
        let label = self.targets.label(hash)?;
        Some(Match {
            name: String::from_utf8_lossy(candidate).to_ascii_lowercase(),
            hash,
            label: label.clone(),
        })
    }

    /// Accept an algebraically derived candidate only if forward hashing agrees
    ///
    /// Returns `None` both on a miss and on a failed re-verification.
    #[inline]
    pub fn verify(&self, candidate: &[u8], expected: u32) -> Option<Match> {
        let hash = fnv1_hash_bytes(candidate);
        if hash != expected {
            return None;
        }
        self.test_hashed(candidate, hash)
    }
}

/// Names and hashes resolved by earlier runs
#[derive(Clone, Debug, Default)]
pub struct KnownMatches {
    names: FastSet<String>,
    hashes: FastSet<u32>,
}

impl KnownMatches {
    /// Remember a resolved hash and its name
    pub fn insert(&mut self, hash: u32, name: &str) {
        self.hashes.insert(hash);
        self.insert_name(name);
    }

    /// Remember a name whose hash is not known
    pub fn insert_name(&mut self, name: &str) {
        self.names.insert(name.to_ascii_lowercase());
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.names.contains(&name.to_ascii_lowercase())
    }

    pub fn is_resolved(&self, hash: u32) -> bool {
        self.hashes.contains(&hash)
    }

    /// A match is new iff neither its name nor its hash is already known
    pub fn is_new(&self, m: &Match) -> bool {
        !self.is_resolved(m.hash) && !self.contains_name(&m.name)
    }

    /// Number of known names
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && self.hashes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::hash::fnv1_hash;

    #[test]
    fn test_hit_and_miss() {
        let h = fnv1_hash("play_music").unwrap();
        let targets = TargetSet::from_hashes([h], "Music_Bank");
        let tester = MatchTester::new(&targets);

        let m = tester.test(b"play_music").unwrap();
        assert_eq!(m.hash, h);
        assert_eq!(m.name, "play_music");
        assert_eq!(&*m.label, "Music_Bank");

        assert!(tester.test(b"stop_music").is_none());
    }

    #[test]
    fn test_name_is_lowercased() {
        let h = fnv1_hash("play_music").unwrap();
        let targets = TargetSet::from_hashes([h], "b");
        let m = MatchTester::new(&targets).test(b"Play_Music").unwrap();
        assert_eq!(m.name, "play_music");
    }

    #[test]
    fn test_verify_rejects_wrong_expectation() {
        let h = fnv1_hash("abc").unwrap();
        let targets = TargetSet::from_hashes([h], "b");
        let tester = MatchTester::new(&targets);
        assert!(tester.verify(b"abc", h).is_some());
        assert!(tester.verify(b"abd", h).is_none());
    }

    #[test]
    fn test_preferred_ordering() {
        let label: Arc<str> = Arc::from("b");
        let short = Match {
            name: "ab".into(),
            hash: 1,
            label: label.clone(),
        };
        let long = Match {
            name: "aaa".into(),
            hash: 1,
            label: label.clone(),
        };
        let other = Match {
            name: "aa".into(),
            hash: 1,
            label,
        };
        assert!(short.is_preferred_over(&long));
        assert!(other.is_preferred_over(&short));
        assert!(!short.is_preferred_over(&short));
    }

    #[test]
    fn test_known_matches_filter() {
        let mut known = KnownMatches::default();
        known.insert(7, "Play_Music");
        known.insert_name("stop_music");

        let label: Arc<str> = Arc::from("b");
        let make = |name: &str, hash: u32| Match {
            name: name.into(),
            hash,
            label: label.clone(),
        };

        assert!(!known.is_new(&make("other", 7)));
        assert!(!known.is_new(&make("play_music", 8)));
        assert!(!known.is_new(&make("stop_music", 9)));
        assert!(known.is_new(&make("pause_music", 10)));
        assert_eq!(known.len(), 2);
    }
}
