//! Meet-in-the-middle and bidirectional search
//!
//! FNV-1 is invertible: for a fixed suffix, `fnv1_inverse(t, suffix)` is the
//! unique state a prefix must hash to. A table of every prefix hash up to
//! length k is built once; each suffix is then inverted against every target
//! and looked up, so a name of length L costs about `37^(L/2)` work instead
//! of `37^L`.
//!
//! The prefix table holds `26 * 37^(k-1)` entries for its longest length and
//! dominates memory. Callers pick L so that it fits; nothing here enforces a
//! limit.
//!
//! Every candidate produced by inversion is re-hashed forward before it is
//! accepted. A disagreement is counted as a verification failure and dropped.

use super::FastMap;
use crate::constants::CHARSET_REST;
use crate::domain::candidate::BruteForce;
use crate::domain::hash::{fnv1_hash_bytes, fnv1_inverse_bytes, fnv1_unstep};
use crate::domain::matcher::{Match, MatchTester};
use crate::domain::target::TargetSet;
use std::collections::hash_map::Entry;
use std::ops::RangeInclusive;
use tracing::debug;

/// Length of the fixed tail that identifies a suffix shard
const SHARD_TAIL_LEN: usize = 2;

// =============================================================================
// Prefix table
// =============================================================================

#[derive(Clone, Debug)]
enum PrefixEntry {
    One(Box<str>),
    Many(Vec<Box<str>>),
}

/// Prefix hash state -> every prefix producing it
#[derive(Clone, Debug, Default)]
pub struct PrefixTable {
    map: FastMap<u32, PrefixEntry>,
    entries: usize,
    max_len: usize,
}

impl PrefixTable {
    /// Hash every charset-conforming string of length `1..=max_len`
    pub fn build(max_len: usize) -> Self {
        let mut table = Self {
            max_len,
            ..Self::default()
        };
        let mut prefixes = BruteForce::new(b"", 1, max_len);
        while let Some((prefix, hash)) = prefixes.next_candidate() {
            table.insert(hash, prefix);
        }
        debug!(
            max_len,
            entries = table.entries,
            states = table.map.len(),
            "prefix table built"
        );
        table
    }

    fn insert(&mut self, hash: u32, prefix: &[u8]) {
        let prefix: Box<str> = String::from_utf8_lossy(prefix).into();
        self.entries += 1;
        match self.map.entry(hash) {
            Entry::Vacant(slot) => {
                slot.insert(PrefixEntry::One(prefix));
            }
            Entry::Occupied(mut slot) => {
                let entry = slot.get_mut();
                match entry {
                    PrefixEntry::Many(list) => list.push(prefix),
                    PrefixEntry::One(first) => {
                        let first = std::mem::take(first);
                        *entry = PrefixEntry::Many(vec![first, prefix]);
                    }
                }
            }
        }
    }

    /// Prefixes hashing to `state`, in insertion order
    pub fn get(&self, state: u32) -> &[Box<str>] {
        match self.map.get(&state) {
            None => &[],
            Some(PrefixEntry::One(p)) => std::slice::from_ref(p),
            Some(PrefixEntry::Many(list)) => list,
        }
    }

    /// Number of prefixes stored
    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Number of distinct hash states
    pub fn distinct_states(&self) -> usize {
        self.map.len()
    }

    /// Longest prefix length covered
    pub fn max_len(&self) -> usize {
        self.max_len
    }
}

// =============================================================================
// Suffix shards
// =============================================================================

/// A slice of the suffix space: every suffix of `len` characters ending in `tail`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SuffixShard {
    pub len: usize,
    pub tail: Vec<u8>,
}

/// Counters of one suffix search
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MitmStats {
    /// Suffixes inverted
    pub suffixes: u64,
    /// Prefix-table lookups that hit
    pub hits: u64,
    /// Hits rejected by forward re-verification
    pub verification_failures: u64,
}

impl MitmStats {
    pub fn merge(&mut self, other: MitmStats) {
        self.suffixes += other.suffixes;
        self.hits += other.hits;
        self.verification_failures += other.verification_failures;
    }
}

/// Call `f` with every string of `len` characters from the rest charset
fn for_each_rest_string(len: usize, mut f: impl FnMut(&[u8])) {
    let alphabet = CHARSET_REST;
    let mut digits = vec![0usize; len];
    let mut buf: Vec<u8> = vec![alphabet[0]; len];
    loop {
        f(&buf);
        let mut pos = len;
        loop {
            if pos == 0 {
                return;
            }
            pos -= 1;
            digits[pos] += 1;
            if digits[pos] < alphabet.len() {
                buf[pos] = alphabet[digits[pos]];
                break;
            }
            digits[pos] = 0;
            buf[pos] = alphabet[0];
        }
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Meet-in-the-middle engine over a prebuilt prefix table
#[derive(Clone, Debug)]
pub struct MeetInMiddle {
    table: PrefixTable,
    suffix_lens: RangeInclusive<usize>,
    total_len: usize,
}

impl MeetInMiddle {
    /// Fixed split: prefixes `1..=L/2`, suffixes of exactly `L - L/2`
    pub fn new(total_len: usize) -> Self {
        let prefix_len = total_len / 2;
        let suffix_len = total_len - prefix_len;
        Self::with_table(PrefixTable::build(prefix_len), suffix_len..=suffix_len, total_len)
    }

    /// Bidirectional: prefixes `1..=L/2`, suffixes of every length `1..=L - L/2`
    ///
    /// Covers every name of length 2..=L in one attack.
    pub fn bidirectional(total_len: usize) -> Self {
        let prefix_len = total_len / 2;
        let suffix_len = total_len - prefix_len;
        Self::with_table(PrefixTable::build(prefix_len), 1..=suffix_len, total_len)
    }

    /// Use an existing prefix table
    pub fn with_table(
        table: PrefixTable,
        suffix_lens: RangeInclusive<usize>,
        total_len: usize,
    ) -> Self {
        Self {
            table,
            suffix_lens,
            total_len,
        }
    }

    pub fn table(&self) -> &PrefixTable {
        &self.table
    }

    pub fn total_len(&self) -> usize {
        self.total_len
    }

    /// Suffix shards in a stable order (by length, then tail)
    pub fn shards(&self) -> Vec<SuffixShard> {
        let mut shards = Vec::new();
        for len in self.suffix_lens.clone() {
            if len == 0 {
                continue;
            }
            for_each_rest_string(len.min(SHARD_TAIL_LEN), |tail| {
                shards.push(SuffixShard {
                    len,
                    tail: tail.to_vec(),
                });
            });
        }
        shards
    }

    /// Search every suffix of one shard against all targets
    pub fn search_shard(
        &self,
        shard: &SuffixShard,
        tester: &MatchTester<'_>,
        stats: &mut MitmStats,
    ) -> Vec<Match> {
        let targets: Vec<u32> = tester.targets().hashes();
        // state each target needs before the tail
        let before_tail: Vec<u32> = targets
            .iter()
            .map(|&t| fnv1_inverse_bytes(t, &shard.tail))
            .collect();

        let head_len = shard.len - shard.tail.len();
        let mut matches = Vec::new();
        let mut candidate = Vec::with_capacity(self.table.max_len() + shard.len);

        for_each_rest_string(head_len, |head| {
            stats.suffixes += 1;
            for (i, &state) in before_tail.iter().enumerate() {
                let needed = head.iter().rev().fold(state, |h, &b| fnv1_unstep(h, b));
                let prefixes = self.table.get(needed);
                if prefixes.is_empty() {
                    continue;
                }
                for prefix in prefixes {
                    stats.hits += 1;
                    candidate.clear();
                    candidate.extend_from_slice(prefix.as_bytes());
                    candidate.extend_from_slice(head);
                    candidate.extend_from_slice(&shard.tail);
                    match tester.verify(&candidate, targets[i]) {
                        Some(m) => matches.push(m),
                        None => stats.verification_failures += 1,
                    }
                }
            }
        });

        matches
    }

    /// Run every shard sequentially
    pub fn attack(&self, targets: &TargetSet) -> (Vec<Match>, MitmStats) {
        let tester = MatchTester::new(targets);
        let mut stats = MitmStats::default();
        let mut matches = Vec::new();
        for shard in self.shards() {
            matches.extend(self.search_shard(&shard, &tester, &mut stats));
        }
        (matches, stats)
    }
}

// =============================================================================
// Known-suffix attack
// =============================================================================

/// Per-suffix maps from required prefix state to target
#[derive(Clone, Debug, Default)]
pub struct SuffixTable {
    entries: Vec<(Box<str>, FastMap<u32, u32>)>,
}

impl SuffixTable {
    /// Invert every target through every suffix
    pub fn build<S: AsRef<str>>(suffixes: &[S], targets: &TargetSet) -> Self {
        let hashes = targets.hashes();
        let entries = suffixes
            .iter()
            .map(|suffix| {
                let suffix = suffix.as_ref().to_ascii_lowercase();
                let needed: FastMap<u32, u32> = hashes
                    .iter()
                    .map(|&t| (fnv1_inverse_bytes(t, suffix.as_bytes()), t))
                    .collect();
                (suffix.into_boxed_str(), needed)
            })
            .collect();
        Self { entries }
    }

    /// Number of suffixes
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hash `prefix` once and check it against every suffix
    pub fn search_prefix(
        &self,
        prefix: &[u8],
        tester: &MatchTester<'_>,
        stats: &mut MitmStats,
    ) -> Vec<Match> {
        let state = fnv1_hash_bytes(prefix);
        let mut matches = Vec::new();
        for (suffix, needed) in &self.entries {
            let Some(&target) = needed.get(&state) else {
                continue;
            };
            stats.hits += 1;
            let mut candidate = prefix.to_vec();
            candidate.extend_from_slice(suffix.as_bytes());
            match tester.verify(&candidate, target) {
                Some(m) => matches.push(m),
                None => stats.verification_failures += 1,
            }
        }
        stats.suffixes += self.entries.len() as u64;
        matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::hash::fnv1_hash;

    fn names(matches: &[Match]) -> Vec<String> {
        let mut v: Vec<String> = matches.iter().map(|m| m.name.clone()).collect();
        v.sort();
        v.dedup();
        v
    }

    #[test]
    fn test_prefix_table_size() {
        let table = PrefixTable::build(2);
        assert_eq!(table.len(), 26 + 26 * 37);
        assert_eq!(table.get(fnv1_hash("q_").unwrap())[0].as_ref(), "q_");
        assert!(table.get(fnv1_hash("_q").unwrap()).is_empty());
    }

    #[test]
    fn test_prefix_table_keeps_collisions() {
        let mut table = PrefixTable::default();
        table.insert(42, b"abc");
        table.insert(42, b"xyz");
        table.insert(7, b"q");
        let both: Vec<&str> = table.get(42).iter().map(|p| p.as_ref()).collect();
        assert_eq!(both, vec!["abc", "xyz"]);
        assert_eq!(table.len(), 3);
        assert_eq!(table.distinct_states(), 2);
    }

    #[test]
    fn test_for_each_rest_string() {
        let mut count = 0;
        let mut first = Vec::new();
        for_each_rest_string(2, |s| {
            if count == 0 {
                first = s.to_vec();
            }
            count += 1;
        });
        assert_eq!(count, 37 * 37);
        assert_eq!(first, b"aa");

        let mut empty = 0;
        for_each_rest_string(0, |s| {
            assert!(s.is_empty());
            empty += 1;
        });
        assert_eq!(empty, 1);
    }

    #[test]
    fn test_mitm_length_four() {
        let target = fnv1_hash("ab_9").unwrap();
        let targets = TargetSet::from_hashes([target], "t");
        let (matches, stats) = MeetInMiddle::new(4).attack(&targets);
        assert!(names(&matches).contains(&"ab_9".to_string()));
        assert_eq!(stats.verification_failures, 0);
    }

    #[test]
    fn test_bidirectional_covers_shorter_names() {
        let short = fnv1_hash("ox").unwrap();
        let full = fnv1_hash("gate1").unwrap();
        let targets = TargetSet::from_hashes([short, full], "t");
        let (matches, _) = MeetInMiddle::bidirectional(5).attack(&targets);
        let found = names(&matches);
        assert!(found.contains(&"ox".to_string()));
        assert!(found.contains(&"gate1".to_string()));
    }

    #[test]
    fn test_fixed_split_shards() {
        let engine = MeetInMiddle::with_table(PrefixTable::default(), 3..=3, 6);
        let shards = engine.shards();
        assert_eq!(shards.len(), 37 * 37);
        assert!(shards.iter().all(|s| s.len == 3 && s.tail.len() == 2));

        let bidir = MeetInMiddle::with_table(PrefixTable::default(), 1..=2, 4);
        assert_eq!(bidir.shards().len(), 37 + 37 * 37);
    }

    #[test]
    fn test_suffix_table() {
        let target = fnv1_hash("hero_attack_loop").unwrap();
        let targets = TargetSet::from_hashes([target], "bank");
        let table = SuffixTable::build(&["_start", "_loop"], &targets);
        let tester = MatchTester::new(&targets);
        let mut stats = MitmStats::default();

        let found = table.search_prefix(b"hero_attack", &tester, &mut stats);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "hero_attack_loop");
        assert!(table.search_prefix(b"hero_block", &tester, &mut stats).is_empty());
        assert_eq!(stats.suffixes, 4);
    }
}
