//! N-gram rule file loading

use crate::domain::ngram::{NgramFilter, NgramMode};
use crate::error::{LoadReport, Result, SearchError};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Load a rule file in the format of `mode`
///
/// `threshold` only applies to allow lists.
pub fn load_ngram_filter(
    path: impl AsRef<Path>,
    mode: NgramMode,
    threshold: u32,
) -> Result<(NgramFilter, LoadReport)> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| {
        SearchError::config(format!("cannot read n-gram rules {}: {}", path.display(), e))
    })?;

    let (filter, report) = match mode {
        NgramMode::Banlist => NgramFilter::parse_banlist(&text),
        NgramMode::Oklist => NgramFilter::parse_oklist(&text, threshold),
    };

    if report.loaded == 0 {
        return Err(SearchError::config(format!(
            "n-gram rules {} contain no usable entries",
            path.display()
        )));
    }
    if report.skipped > 0 {
        warn!("Skipped {} malformed n-gram rules", report.skipped);
    }

    let stats = filter.stats();
    info!(
        "Loaded n-gram {} ({} start, {} middle windows)",
        stats.mode, stats.start_trigrams, stats.middle_trigrams
    );
    Ok((filter, report))
}
