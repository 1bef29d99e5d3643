//! Match report appending
//!
//! Each run appends one block:
//!
//! ```text
//!
//! # <mode> run: <RFC3339 timestamp>
//! # <parameters>
//! 0xHHHHHHHH,name,label
//! ```
//!
//! Records are sorted by (label, name). Nothing is written when a run found
//! no new matches, so prior results are never touched.

use crate::domain::matcher::Match;
use crate::infra::checkpoint_io::ensure_parent_dir;
use chrono::Local;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

/// Format one match record (no trailing newline)
pub fn format_match(m: &Match) -> String {
    format!("0x{:08X},{},{}", m.hash, m.name, m.label)
}

/// Format a complete report block
pub fn format_report(mode: &str, parameters: &str, timestamp: &str, matches: &[Match]) -> String {
    let mut sorted: Vec<&Match> = matches.iter().collect();
    sorted.sort_by(|a, b| (&a.label, &a.name).cmp(&(&b.label, &b.name)));

    let mut out = format!("\n# {} run: {}\n# {}\n", mode, timestamp, parameters);
    for m in sorted {
        out.push_str(&format_match(m));
        out.push('\n');
    }
    out
}

/// Append new matches to the results file; returns the number written
pub fn append_report(
    path: impl AsRef<Path>,
    mode: &str,
    parameters: &str,
    matches: &[Match],
) -> io::Result<usize> {
    if matches.is_empty() {
        return Ok(0);
    }
    let path = path.as_ref();
    ensure_parent_dir(path)?;

    let timestamp = Local::now().to_rfc3339();
    let block = format_report(mode, parameters, &timestamp, matches);

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(block.as_bytes())?;
    file.flush()?;
    Ok(matches.len())
}
