//! Target hash set
//!
//! A `TargetSet` is built once per run and shared read-only by every worker.
//! Provenance labels are carried for reporting only and never take part in
//! matching.

use super::{FastMap, FastSet};
use crate::domain::hash::fuzzy_bucket;
use crate::error::{Result, SearchError};
use std::sync::Arc;

/// One target: hash value plus provenance label
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetHash {
    pub hash: u32,
    pub label: Arc<str>,
}

impl TargetHash {
    pub fn new(hash: u32, label: impl Into<Arc<str>>) -> Self {
        Self {
            hash,
            label: label.into(),
        }
    }
}

/// Parse a target identifier written in decimal or `0x` hexadecimal
pub fn parse_hash_id(text: &str) -> Result<u32> {
    let text = text.trim();
    let parsed = match text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => text.parse::<u32>(),
    };
    parsed.map_err(|e| SearchError::Parse {
        line: 0,
        message: format!("invalid hash id {:?}: {}", text, e),
    })
}

/// Unique target hashes with O(1) membership and fuzzy buckets
#[derive(Clone, Debug, Default)]
pub struct TargetSet {
    labels: FastMap<u32, Arc<str>>,
    fuzzy: FastSet<u32>,
}

impl TargetSet {
    /// Build from (hash, label) pairs; the first label seen for a hash wins
    pub fn from_targets(targets: impl IntoIterator<Item = TargetHash>) -> Self {
        let mut set = Self::default();
        for target in targets {
            set.insert(target);
        }
        set
    }

    /// Build from bare hashes with a shared label
    pub fn from_hashes(hashes: impl IntoIterator<Item = u32>, label: &str) -> Self {
        let label: Arc<str> = Arc::from(label);
        Self::from_targets(hashes.into_iter().map(|h| TargetHash {
            hash: h,
            label: label.clone(),
        }))
    }

    /// Insert one target; returns false when the hash was already present
    pub fn insert(&mut self, target: TargetHash) -> bool {
        if self.labels.contains_key(&target.hash) {
            return false;
        }
        self.fuzzy.insert(fuzzy_bucket(target.hash));
        self.labels.insert(target.hash, target.label);
        true
    }

    /// Remove hashes that are already resolved
    pub fn without(&self, resolved: impl Fn(u32) -> bool) -> Self {
        Self::from_targets(
            self.iter()
                .filter(|t| !resolved(t.hash))
                .collect::<Vec<_>>(),
        )
    }

    #[inline]
    pub fn contains(&self, hash: u32) -> bool {
        self.labels.contains_key(&hash)
    }

    /// Whether any target shares the high 24 bits given by `fuzzy_mask`
    #[inline]
    pub fn contains_fuzzy(&self, mask: u32) -> bool {
        self.fuzzy.contains(&mask)
    }

    /// Provenance label of a target
    pub fn label(&self, hash: u32) -> Option<&Arc<str>> {
        self.labels.get(&hash)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Number of distinct fuzzy buckets
    pub fn fuzzy_len(&self) -> usize {
        self.fuzzy.len()
    }

    /// Iterate targets in ascending hash order
    pub fn iter(&self) -> impl Iterator<Item = TargetHash> + '_ {
        let mut hashes: Vec<u32> = self.labels.keys().copied().collect();
        hashes.sort_unstable();
        hashes
            .into_iter()
            .map(move |h| TargetHash::new(h, self.labels[&h].clone()))
    }

    /// Hash values in ascending order
    pub fn hashes(&self) -> Vec<u32> {
        let mut hashes: Vec<u32> = self.labels.keys().copied().collect();
        hashes.sort_unstable();
        hashes
    }
}
