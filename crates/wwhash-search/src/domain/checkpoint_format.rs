//! Checkpoint file format definitions
//!
//! A checkpoint is a 64-byte header followed by the completed shard ids
//! (u32 each) and the accumulated match records. All integers are little
//! endian.
//!
//! ```text
//! 0..8    magic "WWHCKPT1"
//! 8..10   version (u16)
//! 10..12  reserved
//! 12..16  total shards (u32)
//! 16..24  job fingerprint (u64)
//! 24..28  completed shard count (u32)
//! 28..32  match count (u32)
//! 32..40  candidates tested (u64)
//! 40..48  candidates pruned (u64)
//! 48..56  saved at (Unix epoch seconds)
//! 56..60  verification failures (u32, saturating)
//! 60..64  skipped input records (u32, saturating)
//! ```
//!
//! Match record: hash (u32), name length (u16), name bytes, label length
//! (u16), label bytes.

use crate::constants::{CHECKPOINT_HEADER_SIZE, CHECKPOINT_MAGIC, CHECKPOINT_VERSION};
use crate::domain::matcher::Match;
use std::collections::{BTreeMap, BTreeSet};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

const FNV64_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
const FNV64_PRIME: u64 = 0x100000001b3;

/// Fingerprint of a job description (FNV-1a, 64-bit)
///
/// Two runs may share a checkpoint only if their fingerprints agree.
pub fn job_fingerprint(description: &str) -> u64 {
    fingerprint_bytes(description.bytes())
}

/// FNV-1a 64 over an arbitrary byte stream
pub fn fingerprint_bytes(bytes: impl IntoIterator<Item = u8>) -> u64 {
    bytes.into_iter().fold(FNV64_OFFSET_BASIS, |h, b| {
        (h ^ b as u64).wrapping_mul(FNV64_PRIME)
    })
}

/// Checkpoint format errors
#[derive(Debug, Error)]
pub enum CheckpointFormatError {
    #[error("invalid file format: not a checkpoint file")]
    InvalidMagic,
    #[error("unsupported checkpoint version: {0}")]
    UnsupportedVersion(u16),
    #[error("checkpoint belongs to a different job (fingerprint {found:016x}, expected {expected:016x})")]
    JobMismatch { expected: u64, found: u64 },
    #[error("checkpoint shard total {found} does not match plan of {expected} shards")]
    ShardCountMismatch { expected: u32, found: u32 },
    #[error("checkpoint is truncated or corrupt: {0}")]
    Truncated(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Checkpoint header
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CheckpointHeader {
    pub version: u16,
    pub total_shards: u32,
    pub fingerprint: u64,
    pub completed_count: u32,
    pub match_count: u32,
    pub tested: u64,
    pub pruned: u64,
    pub saved_at: u64,
    pub verification_failures: u32,
    pub skipped_records: u32,
}

impl CheckpointHeader {
    /// Serialize header to bytes (64 bytes)
    pub fn to_bytes(&self) -> [u8; CHECKPOINT_HEADER_SIZE] {
        let mut buf = [0u8; CHECKPOINT_HEADER_SIZE];

        buf[0..8].copy_from_slice(&CHECKPOINT_MAGIC);
        buf[8..10].copy_from_slice(&self.version.to_le_bytes());
        // 10..12 reserved
        buf[12..16].copy_from_slice(&self.total_shards.to_le_bytes());
        buf[16..24].copy_from_slice(&self.fingerprint.to_le_bytes());
        buf[24..28].copy_from_slice(&self.completed_count.to_le_bytes());
        buf[28..32].copy_from_slice(&self.match_count.to_le_bytes());
        buf[32..40].copy_from_slice(&self.tested.to_le_bytes());
        buf[40..48].copy_from_slice(&self.pruned.to_le_bytes());
        buf[48..56].copy_from_slice(&self.saved_at.to_le_bytes());
        buf[56..60].copy_from_slice(&self.verification_failures.to_le_bytes());
        buf[60..64].copy_from_slice(&self.skipped_records.to_le_bytes());

        buf
    }

    /// Deserialize header from bytes
    pub fn from_bytes(buf: &[u8; CHECKPOINT_HEADER_SIZE]) -> Result<Self, CheckpointFormatError> {
        if buf[0..8] != CHECKPOINT_MAGIC {
            return Err(CheckpointFormatError::InvalidMagic);
        }

        let version = u16::from_le_bytes([buf[8], buf[9]]);
        if version != CHECKPOINT_VERSION {
            return Err(CheckpointFormatError::UnsupportedVersion(version));
        }

        let u32_at = |i: usize| u32::from_le_bytes([buf[i], buf[i + 1], buf[i + 2], buf[i + 3]]);
        let u64_at = |i: usize| {
            u64::from_le_bytes([
                buf[i],
                buf[i + 1],
                buf[i + 2],
                buf[i + 3],
                buf[i + 4],
                buf[i + 5],
                buf[i + 6],
                buf[i + 7],
            ])
        };

        Ok(Self {
            version,
            total_shards: u32_at(12),
            fingerprint: u64_at(16),
            completed_count: u32_at(24),
            match_count: u32_at(28),
            tested: u64_at(32),
            pruned: u64_at(40),
            saved_at: u64_at(48),
            verification_failures: u32_at(56),
            skipped_records: u32_at(60),
        })
    }

    /// Check that this checkpoint belongs to the given job
    pub fn validate_job(&self, fingerprint: u64, total_shards: u32) -> Result<(), CheckpointFormatError> {
        if self.fingerprint != fingerprint {
            return Err(CheckpointFormatError::JobMismatch {
                expected: fingerprint,
                found: self.fingerprint,
            });
        }
        if self.total_shards != total_shards {
            return Err(CheckpointFormatError::ShardCountMismatch {
                expected: total_shards,
                found: self.total_shards,
            });
        }
        Ok(())
    }
}

/// Durable search state: completed shards, matches and counters
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchCheckpoint {
    pub fingerprint: u64,
    pub total_shards: u32,
    pub completed: BTreeSet<u32>,
    /// One canonical match per hash
    pub matches: BTreeMap<u32, Match>,
    pub tested: u64,
    pub pruned: u64,
    pub verification_failures: u64,
    /// Malformed input records skipped while loading this run's inputs
    pub skipped_records: u64,
}

impl SearchCheckpoint {
    pub fn new(fingerprint: u64, total_shards: u32) -> Self {
        Self {
            fingerprint,
            total_shards,
            ..Self::default()
        }
    }

    pub fn is_complete(&self, shard: u32) -> bool {
        self.completed.contains(&shard)
    }

    pub fn mark_complete(&mut self, shard: u32) {
        self.completed.insert(shard);
    }

    /// Record a match; keeps the canonical one when the hash is already resolved
    pub fn add_match(&mut self, m: Match) -> bool {
        match self.matches.get(&m.hash) {
            Some(existing) if !m.is_preferred_over(existing) => false,
            _ => {
                self.matches.insert(m.hash, m);
                true
            }
        }
    }

    /// Whether every planned shard is done
    pub fn is_finished(&self) -> bool {
        self.completed.len() as u64 >= self.total_shards as u64
    }

    /// Header describing the current state
    pub fn header(&self) -> CheckpointHeader {
        let saved_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        CheckpointHeader {
            version: CHECKPOINT_VERSION,
            total_shards: self.total_shards,
            fingerprint: self.fingerprint,
            completed_count: self.completed.len() as u32,
            match_count: self.matches.len() as u32,
            tested: self.tested,
            pruned: self.pruned,
            saved_at,
            verification_failures: saturate(self.verification_failures),
            skipped_records: saturate(self.skipped_records),
        }
    }
}

fn saturate(n: u64) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
