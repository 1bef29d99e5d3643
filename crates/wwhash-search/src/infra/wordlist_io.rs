//! Word list loading
//!
//! One word per line; blank lines and `#` comments are ignored. With the
//! `mmap` feature the file is memory-mapped instead of read into a buffer.

use crate::error::{Result, SearchError};
use std::path::Path;
use tracing::info;

#[cfg(feature = "mmap")]
use memmap2::Mmap;

/// Split word-list bytes into trimmed, non-empty, non-comment lines
pub fn parse_wordlist(bytes: &[u8]) -> Vec<String> {
    bytes
        .split(|&b| b == b'\n')
        .map(|line| String::from_utf8_lossy(line).trim().to_string())
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .collect()
}

/// Load a word list from disk
pub fn load_wordlist(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let words = read_words(path).map_err(|e| {
        SearchError::config(format!("cannot read word list {}: {}", path.display(), e))
    })?;
    info!("Loaded {} words from {}", words.len(), path.display());
    Ok(words)
}

#[cfg(not(feature = "mmap"))]
fn read_words(path: &Path) -> std::io::Result<Vec<String>> {
    let bytes = std::fs::read(path)?;
    Ok(parse_wordlist(&bytes))
}

#[cfg(feature = "mmap")]
fn read_words(path: &Path) -> std::io::Result<Vec<String>> {
    let file = std::fs::File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Ok(Vec::new());
    }
    // Safety: the mapping is read-only and dropped before returning.
    let mmap = unsafe { Mmap::map(&file)? };
    Ok(parse_wordlist(&mmap))
}
