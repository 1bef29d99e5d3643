//! Brute-force candidate enumeration
//!
//! Enumerates every string with a fixed prefix whose length lies in a range,
//! in lexicographic alphabet order per length. The running hash of each
//! position is cached, so advancing the odometer costs one multiply per
//! changed character.
//!
//! Two optional pruning layers:
//! - n-gram: a branch is dropped as soon as the window it completes is rejected
//! - fuzzy: before trying the last character, the high 24 bits of the next
//!   multiply are compared with the target buckets; on a miss the whole
//!   last-character loop is skipped

use crate::domain::charset::CharsetPolicy;
use crate::domain::hash::{fnv1_hash_bytes, fnv1_step, fuzzy_bucket, fuzzy_mask};
use crate::domain::ngram::NgramFilter;
use crate::domain::target::TargetSet;

/// Pruning counters of one enumeration
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BruteStats {
    /// Candidates produced
    pub emitted: u64,
    /// Last-character candidates skipped by the fuzzy check
    pub fuzzy_pruned: u64,
    /// Branches cut by the n-gram filter
    pub ngram_pruned: u64,
}

/// Lazy, restartable odometer over charset-conforming strings
pub struct BruteForce<'a> {
    policy: CharsetPolicy,
    ngram: Option<&'a NgramFilter>,
    fuzzy: Option<&'a TargetSet>,
    prefix: Vec<u8>,
    min_len: usize,
    max_len: usize,
    // enumeration state
    target_len: usize,
    length_active: bool,
    done: bool,
    buf: Vec<u8>,
    states: Vec<u32>,
    cursor: Vec<usize>,
    stats: BruteStats,
}

impl<'a> BruteForce<'a> {
    /// Enumerate strings of length `min_len..=max_len` starting with `prefix`
    pub fn new(prefix: &[u8], min_len: usize, max_len: usize) -> Self {
        let mut brute = Self {
            policy: CharsetPolicy,
            ngram: None,
            fuzzy: None,
            prefix: prefix.to_ascii_lowercase(),
            min_len,
            max_len,
            target_len: 0,
            length_active: false,
            done: false,
            buf: Vec::with_capacity(max_len),
            states: Vec::with_capacity(max_len + 1),
            cursor: vec![0; max_len + 1],
            stats: BruteStats::default(),
        };
        brute.restart();
        brute
    }

    /// Enable incremental n-gram pruning
    pub fn with_ngram(mut self, filter: &'a NgramFilter) -> Self {
        self.ngram = Some(filter);
        self.restart();
        self
    }

    /// Enable fuzzy last-character pruning against a target set
    ///
    /// With this enabled, only candidates whose final hash shares its high
    /// 24 bits with some target are produced.
    pub fn with_fuzzy(mut self, targets: &'a TargetSet) -> Self {
        self.fuzzy = Some(targets);
        self.restart();
        self
    }

    /// Rewind to the first candidate
    pub fn restart(&mut self) {
        self.stats = BruteStats::default();
        self.buf.clear();
        self.buf.extend_from_slice(&self.prefix);
        self.states.clear();
        self.states.push(fnv1_hash_bytes(&[]));
        for i in 0..self.prefix.len() {
            let next = fnv1_step(self.states[i], self.prefix[i]);
            self.states.push(next);
        }
        self.target_len = self.min_len.max(self.prefix.len()).max(1);
        self.length_active = false;
        self.done = !self.prefix_is_valid();
    }

    fn prefix_is_valid(&self) -> bool {
        if self.prefix.is_empty() {
            return true;
        }
        if self.prefix.len() > self.max_len || !self.policy.is_valid(&self.prefix) {
            return false;
        }
        self.ngram.is_none_or(|f| f.is_valid(&self.prefix))
    }

    /// Counters since the last restart
    pub fn stats(&self) -> BruteStats {
        self.stats
    }

    /// Size of the unpruned space covered by this enumeration
    pub fn space_size(&self) -> u128 {
        let base = self.prefix.len();
        let rest = self.policy.rest_charset().len() as u128;
        let first = self.policy.first_charset().len() as u128;
        let lo = self.min_len.max(base).max(1);
        (lo..=self.max_len)
            .map(|len| {
                if base == 0 {
                    first * rest.pow(len as u32 - 1)
                } else {
                    rest.pow((len - base) as u32)
                }
            })
            .sum()
    }

    /// Advance to the next candidate; returns the candidate and its hash
    pub fn next_candidate(&mut self) -> Option<(&[u8], u32)> {
        if !self.advance() {
            return None;
        }
        self.stats.emitted += 1;
        let hash = self.states[self.buf.len()];
        Some((&self.buf, hash))
    }

    fn begin_length(&mut self) {
        let base = self.prefix.len();
        self.buf.truncate(base);
        self.states.truncate(base + 1);
        self.cursor[base] = 0;
        self.length_active = true;
    }

    fn pop(&mut self) {
        self.buf.pop();
        self.states.pop();
    }

    fn advance(&mut self) -> bool {
        let base = self.prefix.len();
        loop {
            if self.done {
                return false;
            }
            if !self.length_active {
                if self.target_len > self.max_len {
                    self.done = true;
                    return false;
                }
                self.begin_length();
                if self.target_len == base {
                    // the prefix itself is the only candidate of this length
                    self.length_active = false;
                    self.target_len += 1;
                    let hash = self.states[base];
                    let hit = self
                        .fuzzy
                        .is_none_or(|t| t.contains_fuzzy(fuzzy_bucket(hash)));
                    if hit {
                        return true;
                    }
                    continue;
                }
            }

            let depth = self.buf.len();
            if depth == self.target_len {
                self.pop();
                continue;
            }

            let alphabet = self.policy.alphabet_at(depth);
            let i = self.cursor[depth];
            if i >= alphabet.len() {
                if depth == base {
                    self.length_active = false;
                    self.target_len += 1;
                } else {
                    self.pop();
                }
                continue;
            }
            self.cursor[depth] = i + 1;

            if i == 0
                && depth + 1 == self.target_len
                && let Some(targets) = self.fuzzy
                && !targets.contains_fuzzy(fuzzy_mask(self.states[depth]))
            {
                self.cursor[depth] = alphabet.len();
                self.stats.fuzzy_pruned += alphabet.len() as u64;
                continue;
            }

            let c = alphabet[i];
            if let Some(filter) = self.ngram
                && !filter.is_valid_extension(&self.buf, c)
            {
                self.stats.ngram_pruned += 1;
                continue;
            }

            let next = fnv1_step(self.states[depth], c);
            self.buf.push(c);
            self.states.push(next);
            if self.buf.len() == self.target_len {
                return true;
            }
            self.cursor[depth + 1] = 0;
        }
    }

    /// Owned-string iterator over the remaining candidates
    pub fn strings(self) -> BruteForceStrings<'a> {
        BruteForceStrings { inner: self }
    }
}

/// Iterator adapter yielding owned candidates
pub struct BruteForceStrings<'a> {
    inner: BruteForce<'a>,
}

impl Iterator for BruteForceStrings<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.inner
            .next_candidate()
            .map(|(bytes, _)| String::from_utf8_lossy(bytes).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::hash::fnv1_hash;
    use crate::domain::ngram::{NgramMode, NgramPosition};

    fn collect(brute: BruteForce<'_>) -> Vec<String> {
        brute.strings().collect()
    }

    #[test]
    fn test_length_one() {
        let all = collect(BruteForce::new(b"", 1, 1));
        assert_eq!(all.len(), 26);
        assert_eq!(all.first().map(String::as_str), Some("a"));
        assert_eq!(all.last().map(String::as_str), Some("z"));
    }

    #[test]
    fn test_counts_per_length() {
        let all = collect(BruteForce::new(b"", 1, 3));
        assert_eq!(all.len(), 26 + 26 * 37 + 26 * 37 * 37);
        assert_eq!(
            BruteForce::new(b"", 1, 3).space_size(),
            (26 + 26 * 37 + 26 * 37 * 37) as u128
        );
    }

    #[test]
    fn test_order_and_charset() {
        let all = collect(BruteForce::new(b"", 2, 2));
        assert_eq!(all[0], "aa");
        assert_eq!(all[26], "a_");
        assert_eq!(all[27], "a0");
        assert_eq!(all[37], "ba");
        let policy = CharsetPolicy;
        assert!(all.iter().all(|s| policy.is_valid(s.as_bytes())));
    }

    #[test]
    fn test_hash_matches_forward() {
        let mut brute = BruteForce::new(b"", 1, 3);
        while let Some((candidate, hash)) = brute.next_candidate() {
            assert_eq!(hash, fnv1_hash_bytes(candidate));
        }
    }

    #[test]
    fn test_fixed_prefix() {
        let all = collect(BruteForce::new(b"ab", 2, 3));
        assert_eq!(all.len(), 1 + 37);
        assert_eq!(all[0], "ab");
        assert!(all[1..].iter().all(|s| s.starts_with("ab") && s.len() == 3));
    }

    #[test]
    fn test_invalid_prefix_yields_nothing() {
        assert_eq!(collect(BruteForce::new(b"_a", 2, 4)).len(), 0);
        assert_eq!(collect(BruteForce::new(b"abcde", 1, 4)).len(), 0);
    }

    #[test]
    fn test_restart_is_identical() {
        let mut brute = BruteForce::new(b"q", 1, 3);
        let mut first = Vec::new();
        while let Some((c, _)) = brute.next_candidate() {
            first.push(c.to_vec());
        }
        brute.restart();
        let mut second = Vec::new();
        while let Some((c, _)) = brute.next_candidate() {
            second.push(c.to_vec());
        }
        assert_eq!(first, second);
    }

    #[test]
    fn test_ngram_pruning() {
        let mut filter = NgramFilter::new(NgramMode::Banlist);
        filter.set(NgramPosition::Middle, *b"qxz", false);
        filter.set(NgramPosition::Start, *b"aaa", false);

        let brute = BruteForce::new(b"", 1, 5).with_ngram(&filter);
        let all = collect(brute);
        assert!(all.iter().all(|s| filter.is_valid(s.as_bytes())));
        assert!(!all.iter().any(|s| s.starts_with("aaa")));
        assert!(!all.contains(&"aqxz".to_string()));
        assert!(all.contains(&"qxza".to_string()));
    }

    #[test]
    fn test_fuzzy_keeps_every_target() {
        let names = ["ab", "zz9", "q_1", "me"];
        let hashes: Vec<u32> = names.iter().map(|n| fnv1_hash(n).unwrap()).collect();
        let targets = TargetSet::from_hashes(hashes.iter().copied(), "t");

        let mut brute = BruteForce::new(b"", 1, 3).with_fuzzy(&targets);
        let mut found = Vec::new();
        while let Some((c, h)) = brute.next_candidate() {
            if targets.contains(h) {
                found.push(String::from_utf8_lossy(c).into_owned());
            }
        }
        for name in names {
            assert!(found.contains(&name.to_string()), "missing {}", name);
        }
        let stats = brute.stats();
        assert!(stats.fuzzy_pruned > 0);
        assert!(stats.emitted < BruteForce::new(b"", 1, 3).space_size() as u64);
    }
}
