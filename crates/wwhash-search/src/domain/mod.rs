//! Domain layer - Pure computational logic
//!
//! This module contains pure functions and algorithms without I/O dependencies.

pub mod backend;
pub mod candidate;
pub mod charset;
pub mod checkpoint_format;
pub mod hash;
pub mod matcher;
pub mod mitm;
pub mod ngram;
pub mod shard;
pub mod target;

/// Hash map used on hot lookup paths
#[cfg(feature = "hashmap-search")]
pub type FastMap<K, V> = rustc_hash::FxHashMap<K, V>;
/// Hash set used on hot lookup paths
#[cfg(feature = "hashmap-search")]
pub type FastSet<T> = rustc_hash::FxHashSet<T>;

#[cfg(not(feature = "hashmap-search"))]
pub type FastMap<K, V> = std::collections::HashMap<K, V>;
#[cfg(not(feature = "hashmap-search"))]
pub type FastSet<T> = std::collections::HashSet<T>;
