//! Target and existing-match loading
//!
//! Two target layouts are accepted:
//! - events file: `{"events": {"<id>": {"bank": "<label>"}}}`
//! - ID table: top-level lists of `{"key": "0x…", "val": n}` entries, nested
//!   lists of the form `[header, [entries]]`, or bare `"0x…"` strings
//!
//! Malformed records are skipped and counted; only an unreadable or
//! undecodable file is an error.

use crate::domain::matcher::KnownMatches;
use crate::domain::target::{TargetHash, parse_hash_id};
use crate::error::{LoadReport, Result, SearchError};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Label used when an events entry carries no bank
const UNKNOWN_LABEL: &str = "unknown";

/// Contents of a target file
#[derive(Clone, Debug, Default)]
pub struct TargetFile {
    pub targets: Vec<TargetHash>,
    /// Names an ID table already carries in clear text
    pub known_names: Vec<String>,
    pub report: LoadReport,
}

/// One events entry; decoded per record so a bad entry only skips itself
#[derive(Deserialize)]
struct EventInfo {
    #[serde(default)]
    bank: Option<String>,
}

/// One ID table entry
#[derive(Deserialize)]
struct IdEntry {
    key: String,
    #[serde(default)]
    val: i64,
}

/// Decode a target file from JSON text
pub fn parse_targets_json(text: &str) -> Result<TargetFile> {
    let value: Value = serde_json::from_str(text)?;
    match value.get("events").and_then(Value::as_object) {
        Some(events) => Ok(parse_events(events)),
        None => Ok(parse_id_table(&value)),
    }
}

fn parse_events(events: &Map<String, Value>) -> TargetFile {
    let mut out = TargetFile::default();
    for (id, info) in events {
        let hash = match parse_hash_id(id) {
            Ok(hash) => hash,
            Err(e) => {
                debug!("Skipping event id: {}", e);
                out.report.skipped += 1;
                continue;
            }
        };
        let info = match EventInfo::deserialize(info) {
            Ok(info) => info,
            Err(e) => {
                debug!("Skipping event {}: {}", id, e);
                out.report.skipped += 1;
                continue;
            }
        };
        let label = info.bank.unwrap_or_else(|| UNKNOWN_LABEL.to_string());
        out.targets.push(TargetHash::new(hash, label));
        out.report.loaded += 1;
    }
    out
}

fn parse_id_table(value: &Value) -> TargetFile {
    let mut out = TargetFile::default();
    let Some(lists) = value.as_object() else {
        return out;
    };

    for (name, list) in lists {
        let Some(items) = list.as_array() else {
            continue;
        };
        for item in items {
            match item {
                Value::String(key) if name == "extra" => id_table_key(key, 0, &mut out),
                Value::Object(_) => id_table_entry(item, &mut out),
                Value::Array(nested) => {
                    if let Some(entries) = nested.get(1).and_then(Value::as_array) {
                        for entry in entries {
                            id_table_entry(entry, &mut out);
                        }
                    }
                }
                _ => out.report.skipped += 1,
            }
        }
    }
    out
}

fn id_table_entry(entry: &Value, out: &mut TargetFile) {
    match IdEntry::deserialize(entry) {
        Ok(entry) => id_table_key(&entry.key, entry.val, out),
        Err(_) => out.report.skipped += 1,
    }
}

fn id_table_key(key: &str, val: i64, out: &mut TargetFile) {
    let key = key.trim();
    if key.starts_with("0x") || key.starts_with("0X") {
        match parse_hash_id(key) {
            Ok(hash) => {
                out.targets.push(TargetHash::new(hash, format!("val:{}", val)));
                out.report.loaded += 1;
            }
            Err(_) => out.report.skipped += 1,
        }
    } else if !key.is_empty() && key != "NONE" {
        out.known_names.push(key.to_ascii_lowercase());
    }
}

/// Load a target file
pub fn load_targets(path: impl AsRef<Path>) -> Result<TargetFile> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| {
        SearchError::config(format!("cannot read targets {}: {}", path.display(), e))
    })?;
    let file = parse_targets_json(&text)?;
    if file.report.skipped > 0 {
        warn!(
            "Skipped {} malformed target records in {}",
            file.report.skipped,
            path.display()
        );
    }
    Ok(file)
}

/// Parse `0xHHHHHHHH,name[,label]` lines; other lines are ignored
pub fn parse_existing_matches(text: &str) -> (KnownMatches, LoadReport) {
    let mut known = KnownMatches::default();
    let mut report = LoadReport::default();

    for line in text.lines() {
        let line = line.trim();
        if !line.starts_with("0x") && !line.starts_with("0X") {
            continue;
        }
        let mut parts = line.split(',');
        let (Some(hash), Some(name)) = (parts.next(), parts.next()) else {
            report.skipped += 1;
            continue;
        };
        match parse_hash_id(hash) {
            Ok(hash) if !name.trim().is_empty() => {
                known.insert(hash, name.trim());
                report.loaded += 1;
            }
            _ => report.skipped += 1,
        }
    }

    (known, report)
}

/// Load an existing-matches file; a missing file yields an empty set
pub fn load_existing_matches(path: impl AsRef<Path>) -> Result<(KnownMatches, LoadReport)> {
    let path = path.as_ref();
    match fs::read_to_string(path) {
        Ok(text) => Ok(parse_existing_matches(&text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("No existing matches at {}", path.display());
            Ok((KnownMatches::default(), LoadReport::default()))
        }
        Err(e) => Err(e.into()),
    }
}
