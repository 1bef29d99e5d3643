//! wwhash-search - FNV-1 32-bit preimage search for audio event identifiers
//!
//! This crate provides functionality to:
//! - Hash, continue and algebraically invert FNV-1 32-bit states
//! - Enumerate charset-constrained candidates with n-gram and fuzzy pruning
//! - Expand vocabularies with prefix/suffix/numeral patterns
//! - Recover long names with meet-in-the-middle and known-suffix attacks
//! - Run sharded, resumable searches across worker threads

pub mod constants;
pub mod error;
pub mod domain;
pub mod infra;
pub mod app;

// Re-export commonly used types
pub use constants::*;
pub use domain::hash::{fnv1_continue, fnv1_hash, fnv1_inverse, fuzzy_mask, hash30};
pub use domain::matcher::Match;
pub use domain::target::{TargetHash, TargetSet};
pub use error::{LoadReport, Result, SearchError};
