//! Search configuration

use crate::app::coordinator::CoordinatorOptions;
use crate::constants::{
    DEFAULT_CHECKPOINT_EVERY, DEFAULT_MAX_LEN, DEFAULT_MIN_LEN, DEFAULT_MITM_LENGTH,
    DEFAULT_SHARD_DEPTH,
};
use crate::domain::backend::BackendPreference;
use crate::domain::candidate::PatternOptions;
use crate::domain::target::TargetSet;
use crate::error::{Result, SearchError};
use crate::infra::resource_monitor::MonitorOptions;
use std::fmt;
use std::path::PathBuf;

/// Search strategy
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SearchMode {
    #[default]
    BruteForce,
    Pattern,
    Dictionary,
    Mitm,
    Bidirectional,
    Suffix,
}

impl SearchMode {
    pub fn name(&self) -> &'static str {
        match self {
            Self::BruteForce => "brute",
            Self::Pattern => "pattern",
            Self::Dictionary => "dictionary",
            Self::Mitm => "mitm",
            Self::Bidirectional => "bidir",
            Self::Suffix => "suffix",
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Brute-force parameters
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BruteForceOptions {
    pub min_len: usize,
    pub max_len: usize,
    /// Prefix length used to split the space into shards
    pub shard_depth: usize,
    /// Skip last-character loops whose high 24 bits hit no target
    pub fuzzy: bool,
}

impl Default for BruteForceOptions {
    fn default() -> Self {
        Self {
            min_len: DEFAULT_MIN_LEN,
            max_len: DEFAULT_MAX_LEN,
            shard_depth: DEFAULT_SHARD_DEPTH,
            fuzzy: true,
        }
    }
}

impl BruteForceOptions {
    pub fn with_length_range(mut self, min_len: usize, max_len: usize) -> Self {
        self.min_len = min_len;
        self.max_len = max_len;
        self
    }

    pub fn with_shard_depth(mut self, depth: usize) -> Self {
        self.shard_depth = depth;
        self
    }

    pub fn with_fuzzy(mut self, fuzzy: bool) -> Self {
        self.fuzzy = fuzzy;
        self
    }
}

/// Complete run configuration
#[derive(Clone, Debug, PartialEq)]
pub struct SearchConfig {
    pub mode: SearchMode,
    pub brute: BruteForceOptions,
    pub pattern: PatternOptions,
    /// Total name length for mitm / bidir
    pub mitm_length: usize,
    pub workers: usize,
    pub checkpoint: Option<PathBuf>,
    pub resume: bool,
    pub checkpoint_every: u32,
    /// Resource monitor thresholds; `None` disables throttling
    pub monitor: Option<MonitorOptions>,
    pub backend: BackendPreference,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            mode: SearchMode::default(),
            brute: BruteForceOptions::default(),
            pattern: PatternOptions::default(),
            mitm_length: DEFAULT_MITM_LENGTH,
            workers: CoordinatorOptions::default().workers,
            checkpoint: None,
            resume: false,
            checkpoint_every: DEFAULT_CHECKPOINT_EVERY,
            monitor: None,
            backend: BackendPreference::default(),
        }
    }
}

impl SearchConfig {
    pub fn new(mode: SearchMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn with_brute(mut self, brute: BruteForceOptions) -> Self {
        self.brute = brute;
        self
    }

    pub fn with_pattern(mut self, pattern: PatternOptions) -> Self {
        self.pattern = pattern;
        self
    }

    pub fn with_mitm_length(mut self, length: usize) -> Self {
        self.mitm_length = length;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_checkpoint(mut self, path: impl Into<PathBuf>, resume: bool) -> Self {
        self.checkpoint = Some(path.into());
        self.resume = resume;
        self
    }

    pub fn with_checkpoint_every(mut self, shards: u32) -> Self {
        self.checkpoint_every = shards;
        self
    }

    pub fn with_monitor(mut self, monitor: MonitorOptions) -> Self {
        self.monitor = Some(monitor);
        self
    }

    pub fn with_backend(mut self, backend: BackendPreference) -> Self {
        self.backend = backend;
        self
    }

    /// Reject configurations that cannot run; called before any work starts
    pub fn validate(&self, targets: &TargetSet) -> Result<()> {
        if targets.is_empty() {
            return Err(SearchError::config("target set is empty"));
        }
        if self.workers == 0 {
            return Err(SearchError::config("worker count must be at least 1"));
        }
        if self.checkpoint_every == 0 {
            return Err(SearchError::config("checkpoint interval must be at least 1 shard"));
        }
        if self.resume && self.checkpoint.is_none() {
            return Err(SearchError::config("resume requires a checkpoint path"));
        }

        match self.mode {
            SearchMode::BruteForce => {
                let brute = &self.brute;
                if brute.min_len == 0 {
                    return Err(SearchError::config("min_len must be at least 1"));
                }
                if brute.min_len > brute.max_len {
                    return Err(SearchError::config(format!(
                        "min_len {} exceeds max_len {}",
                        brute.min_len, brute.max_len
                    )));
                }
                if brute.shard_depth == 0 {
                    return Err(SearchError::config("shard depth must be at least 1"));
                }
            }
            SearchMode::Mitm | SearchMode::Bidirectional => {
                if self.mitm_length < 2 {
                    return Err(SearchError::config(format!(
                        "{} length must be at least 2 (got {})",
                        self.mode, self.mitm_length
                    )));
                }
            }
            SearchMode::Pattern | SearchMode::Dictionary | SearchMode::Suffix => {
                if self.pattern.max_words == 0 {
                    return Err(SearchError::config("max_words must be at least 1"));
                }
            }
        }

        Ok(())
    }

    /// Coordinator options derived from this configuration
    pub fn coordinator_options(&self) -> CoordinatorOptions {
        CoordinatorOptions {
            workers: self.workers,
            checkpoint: self.checkpoint.clone(),
            resume: self.resume,
            checkpoint_every: self.checkpoint_every,
            skipped_records: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets() -> TargetSet {
        TargetSet::from_hashes([1, 2, 3], "t")
    }

    #[test]
    fn test_default_is_valid() {
        assert!(SearchConfig::default().validate(&targets()).is_ok());
    }

    #[test]
    fn test_empty_targets_rejected() {
        let err = SearchConfig::default()
            .validate(&TargetSet::default())
            .unwrap_err();
        assert!(matches!(err, SearchError::Config(_)));
    }

    #[test]
    fn test_length_bounds() {
        let zero = SearchConfig::default().with_brute(BruteForceOptions::default().with_length_range(0, 4));
        assert!(zero.validate(&targets()).is_err());

        let inverted =
            SearchConfig::default().with_brute(BruteForceOptions::default().with_length_range(5, 4));
        assert!(inverted.validate(&targets()).is_err());
    }

    #[test]
    fn test_mitm_length() {
        let config = SearchConfig::new(SearchMode::Mitm).with_mitm_length(1);
        assert!(config.validate(&targets()).is_err());
        let config = SearchConfig::new(SearchMode::Bidirectional).with_mitm_length(2);
        assert!(config.validate(&targets()).is_ok());
    }

    #[test]
    fn test_worker_count_and_resume() {
        assert!(SearchConfig::default().with_workers(0).validate(&targets()).is_err());

        let mut config = SearchConfig::default();
        config.resume = true;
        assert!(config.validate(&targets()).is_err());
        assert!(
            SearchConfig::default()
                .with_checkpoint("ckpt.bin", true)
                .validate(&targets())
                .is_ok()
        );
    }

    #[test]
    fn test_mode_names() {
        assert_eq!(SearchMode::BruteForce.to_string(), "brute");
        assert_eq!(SearchMode::Bidirectional.name(), "bidir");
    }
}
