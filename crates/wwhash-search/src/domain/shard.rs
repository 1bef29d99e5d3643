//! Brute-force shard planning
//!
//! The search space is split by fixed-length prefix. Shard 0 covers every
//! candidate shorter than the prefix length (when the length range reaches
//! below it); every later shard owns one prefix and all its extensions up to
//! the maximum length. Ids follow the enumeration order of the prefixes, so
//! the same parameters always produce the same plan.

use crate::domain::candidate::BruteForce;
use crate::domain::charset::CharsetPolicy;

/// One disjoint unit of brute-force work
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BruteShard {
    pub id: u32,
    pub prefix: String,
    pub min_len: usize,
    pub max_len: usize,
}

impl BruteShard {
    /// Candidate enumerator for this shard
    pub fn enumerate<'a>(&self) -> BruteForce<'a> {
        BruteForce::new(self.prefix.as_bytes(), self.min_len, self.max_len)
    }

    /// Unpruned number of candidates in this shard
    pub fn space_size(&self) -> u128 {
        self.enumerate().space_size()
    }
}

/// Plan shards for lengths `min_len..=max_len` split at `depth` characters
pub fn plan_brute_force(min_len: usize, max_len: usize, depth: usize) -> Vec<BruteShard> {
    let min_len = min_len.max(1);
    if min_len > max_len {
        return Vec::new();
    }
    let depth = depth.clamp(1, max_len);
    let mut shards = Vec::new();

    if min_len < depth {
        shards.push(BruteShard {
            id: 0,
            prefix: String::new(),
            min_len,
            max_len: depth - 1,
        });
    }

    let mut prefixes = BruteForce::new(b"", depth, depth);
    while let Some((prefix, _)) = prefixes.next_candidate() {
        shards.push(BruteShard {
            id: shards.len() as u32,
            prefix: String::from_utf8_lossy(prefix).into_owned(),
            min_len: min_len.max(depth),
            max_len,
        });
    }

    shards
}

/// Number of shards `plan_brute_force` produces, without building them
pub fn brute_force_shard_count(min_len: usize, max_len: usize, depth: usize) -> usize {
    let min_len = min_len.max(1);
    if min_len > max_len {
        return 0;
    }
    let depth = depth.clamp(1, max_len);
    let short = usize::from(min_len < depth);
    short + CharsetPolicy.count_of_length(depth) as usize
}
