//! Search engine constants
//!
//! Note: the built-in pattern menus (prefixes, suffixes, vocabulary) live in
//! domain/candidate/pattern.rs next to the generator that consumes them.

// =============================================================================
// FNV-1 32-bit parameters
// =============================================================================

/// Offset basis (hash of the empty string)
pub const FNV_OFFSET: u32 = 0x811c_9dc5; // 2166136261

/// FNV prime
pub const FNV_PRIME: u32 = 0x0100_0193; // 16777619

/// Multiplicative inverse of FNV_PRIME modulo 2^32
pub const FNV_PRIME_INVERSE: u32 = 0x359c_449b; // 899433627

/// Mask keeping the bits a final XOR with one byte cannot change
pub const FUZZY_MASK: u32 = 0xFFFF_FF00;

/// Mask for the low 30 bits used by the folded 30-bit hash
pub const HASH30_MASK: u32 = 0x3FFF_FFFF;

// =============================================================================
// Charset
// =============================================================================

/// Characters allowed at position 0
pub const CHARSET_FIRST: &[u8] = b"abcdefghijklmnopqrstuvwxyz";

/// Characters allowed at every later position
pub const CHARSET_REST: &[u8] = b"abcdefghijklmnopqrstuvwxyz_0123456789";

// =============================================================================
// Search defaults
// =============================================================================

/// Default shard prefix length for brute force (26 * 37 * 37 = 35,594 shards)
#[cfg(not(test))]
pub const DEFAULT_SHARD_DEPTH: usize = 3;

/// Default shard prefix length - reduced for faster unit tests
#[cfg(test)]
pub const DEFAULT_SHARD_DEPTH: usize = 2;

/// Default minimum brute-force length
pub const DEFAULT_MIN_LEN: usize = 1;

/// Default maximum brute-force length
pub const DEFAULT_MAX_LEN: usize = 6;

/// Default total length for meet-in-the-middle and bidirectional attacks
pub const DEFAULT_MITM_LENGTH: usize = 8;

/// Shards completed between two checkpoint saves
pub const DEFAULT_CHECKPOINT_EVERY: u32 = 100;

/// Candidates processed between two throttle checks
pub const THROTTLE_BATCH: u64 = 1 << 16;

/// Sleep inserted between batches while throttled (milliseconds)
pub const THROTTLE_SLEEP_MS: u64 = 50;

/// Candidates hashed per backend batch in dictionary/pattern searches
pub const HASH_BATCH_SIZE: usize = 4096;

/// Number of lanes hashed together by the lane backend
pub const LANES: usize = 16;

// =============================================================================
// Pattern generator caps
// =============================================================================

/// Maximum words taken for multi-word combinations
pub const DEFAULT_MAX_WORDS: usize = 200;

/// Maximum combination depth (words joined per candidate)
pub const MAX_COMBO_DEPTH: usize = 2;

/// Maximum priority words expanded with every pattern
pub const MAX_PRIORITY_WORDS: usize = 2000;

/// Largest number appended by number/roman expansions in the default pattern run
pub const DEFAULT_MAX_NUMBER: u32 = 5;

/// Minimum word length accepted from a word list
pub const MIN_WORD_LEN: usize = 2;

// =============================================================================
// Resource monitor
// =============================================================================

/// Default RAM usage (percent) above which workers are throttled
pub const DEFAULT_MAX_RAM_PERCENT: f32 = 70.0;

/// Default CPU usage (percent) above which workers are throttled
pub const DEFAULT_MAX_CPU_PERCENT: f32 = 95.0;

/// Interval between two resource samples (milliseconds)
pub const MONITOR_INTERVAL_MS: u64 = 2000;

// =============================================================================
// File format
// =============================================================================

/// Checkpoint magic number
pub const CHECKPOINT_MAGIC: [u8; 8] = *b"WWHCKPT1";

/// Checkpoint format version
pub const CHECKPOINT_VERSION: u16 = 2;

/// Checkpoint header size in bytes
pub const CHECKPOINT_HEADER_SIZE: usize = 64;

/// Default checkpoint file name
pub const DEFAULT_CHECKPOINT_FILE: &str = "wwhash_checkpoint.bin";

/// Default results file name
pub const DEFAULT_RESULTS_FILE: &str = "new_matches.txt";
