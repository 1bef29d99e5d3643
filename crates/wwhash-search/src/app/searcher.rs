//! Search workflow
//!
//! Builds the job for the configured mode, runs it through the coordinator
//! and separates genuinely new matches from ones already known.

use crate::app::config::{SearchConfig, SearchMode};
use crate::app::coordinator::{
    RunSummary, SearchCoordinator, SearchJob, SearchProgress, WorkerContext,
};
use crate::app::jobs::{BruteForceJob, CandidateJob, MitmJob, SuffixJob, wordlist_description};
use crate::domain::backend::select_backend;
use crate::domain::candidate::pattern::DEFAULT_VOCABULARY;
use crate::domain::candidate::{DictionaryGenerator, PatternGenerator};
use crate::domain::matcher::{KnownMatches, Match};
use crate::domain::ngram::NgramFilter;
use crate::domain::target::TargetSet;
use crate::error::{LoadReport, Result, SearchError};
use crate::infra::resource_monitor::ResourceMonitor;
use tracing::{info, warn};

/// Read-only inputs shared by every worker
#[derive(Clone, Copy, Debug)]
pub struct SearchInputs<'a> {
    pub targets: &'a TargetSet,
    /// Brute-force pruning rules
    pub ngram: Option<&'a NgramFilter>,
    /// Word list for pattern, dictionary and suffix modes
    pub words: Option<&'a [String]>,
    /// Combined report of the loaders that produced these inputs
    pub load_report: LoadReport,
}

impl<'a> SearchInputs<'a> {
    pub fn new(targets: &'a TargetSet) -> Self {
        Self {
            targets,
            ngram: None,
            words: None,
            load_report: LoadReport::default(),
        }
    }

    pub fn with_ngram(mut self, filter: &'a NgramFilter) -> Self {
        self.ngram = Some(filter);
        self
    }

    pub fn with_words(mut self, words: &'a [String]) -> Self {
        self.words = Some(words);
        self
    }

    pub fn with_load_report(mut self, report: LoadReport) -> Self {
        self.load_report = report;
        self
    }
}

/// Run summary plus the matches not known before this run
#[derive(Clone, Debug)]
pub struct SearchOutcome {
    pub summary: RunSummary,
    /// New matches sorted by (label, name)
    pub new_matches: Vec<Match>,
}

/// Keep matches whose name and hash are both unknown
pub fn filter_new_matches(matches: &[Match], known: &KnownMatches) -> Vec<Match> {
    let mut new: Vec<Match> = matches.iter().filter(|m| known.is_new(m)).cloned().collect();
    new.sort_by(|a, b| (&a.label, &a.name).cmp(&(&b.label, &b.name)));
    new
}

fn default_words() -> Vec<String> {
    DEFAULT_VOCABULARY.iter().map(|w| w.to_string()).collect()
}

/// Build the job for the configured mode
pub fn build_job<'a>(
    config: &SearchConfig,
    inputs: SearchInputs<'a>,
) -> Result<Box<dyn SearchJob + 'a>> {
    let targets = inputs.targets;
    let job: Box<dyn SearchJob + 'a> = match config.mode {
        SearchMode::BruteForce => Box::new(BruteForceJob::new(targets, inputs.ngram, config.brute)),
        SearchMode::Pattern => {
            let words = inputs.words.map_or_else(default_words, <[String]>::to_vec);
            let description = format!(
                "{}, max words {}, combo depth {}",
                wordlist_description(&words),
                config.pattern.max_words,
                config.pattern.combo_depth
            );
            let generator = PatternGenerator::new(&words, config.pattern.clone());
            Box::new(CandidateJob::new(
                "pattern",
                description,
                Box::new(generator),
                targets,
                select_backend(config.backend),
            ))
        }
        SearchMode::Dictionary => {
            let words = inputs
                .words
                .ok_or_else(|| SearchError::config("dictionary mode requires a word list"))?;
            let description = format!(
                "{}, max words {}, combo depth {}",
                wordlist_description(words),
                config.pattern.max_words,
                config.pattern.combo_depth
            );
            let generator = DictionaryGenerator::new(words, config.pattern.clone());
            Box::new(CandidateJob::new(
                "dictionary",
                description,
                Box::new(generator),
                targets,
                select_backend(config.backend),
            ))
        }
        SearchMode::Mitm => Box::new(MitmJob::new(targets, config.mitm_length)),
        SearchMode::Bidirectional => Box::new(MitmJob::bidirectional(targets, config.mitm_length)),
        SearchMode::Suffix => {
            let words = inputs.words.map_or_else(default_words, <[String]>::to_vec);
            Box::new(SuffixJob::new(targets, &words))
        }
    };
    Ok(job)
}

/// Validate, run and filter a complete search
pub fn run_search<F>(
    config: &SearchConfig,
    inputs: SearchInputs<'_>,
    known: &KnownMatches,
    ctx: WorkerContext,
    on_progress: F,
) -> Result<SearchOutcome>
where
    F: FnMut(SearchProgress),
{
    config.validate(inputs.targets)?;

    let job = build_job(config, inputs)?;

    let mut ctx = ctx;
    let _monitor = match config.monitor {
        Some(options) => match ResourceMonitor::spawn(options) {
            Ok(monitor) => {
                info!(
                    "Resource monitor on (RAM > {:.0}%, CPU > {:.0}%)",
                    options.max_ram_percent, options.max_cpu_percent
                );
                ctx = ctx.with_throttle(monitor.throttle_flag());
                Some(monitor)
            }
            Err(e) => {
                warn!("Resource monitor unavailable: {}", e);
                None
            }
        },
        None => None,
    };

    let options = config
        .coordinator_options()
        .with_skipped_records(inputs.load_report.skipped as u64);
    let coordinator = SearchCoordinator::new(options);
    let summary = coordinator.run_with_progress(job.as_ref(), &ctx, on_progress)?;
    let new_matches = filter_new_matches(&summary.matches, known);

    info!(
        "{} run finished: {} matches, {} new",
        summary.mode,
        summary.matches.len(),
        new_matches.len()
    );
    Ok(SearchOutcome {
        summary,
        new_matches,
    })
}
