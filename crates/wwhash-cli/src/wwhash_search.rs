//! Event name search CLI
//!
//! Usage: wwhash_search --targets <PATH> [options]
//!
//! Modes:
//!   brute       Exhaustive enumeration of every valid name in a length range
//!   pattern     Word-list expansion (prefixes, suffixes, numbers, combinations)
//!   dictionary  Verbatim and combined words from --wordlist
//!   mitm        Meet-in-the-middle over names of exactly --length characters
//!   bidir       Meet-in-the-middle covering every length up to --length
//!   suffix      Known-suffix attack over vocabulary prefixes
//!
//! Example: wwhash_search --targets events.json --mode mitm --length 8 --checkpoint run.ckpt

use clap::{Parser, ValueEnum};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use wwhash_search::app::config::{BruteForceOptions, SearchConfig, SearchMode};
use wwhash_search::app::coordinator::{SearchProgress, WorkerContext};
use wwhash_search::app::searcher::{SearchInputs, run_search};
use wwhash_search::constants::{
    DEFAULT_CHECKPOINT_EVERY, DEFAULT_MAX_CPU_PERCENT, DEFAULT_MAX_LEN, DEFAULT_MAX_RAM_PERCENT,
    DEFAULT_MAX_WORDS, DEFAULT_MIN_LEN, DEFAULT_MITM_LENGTH, DEFAULT_RESULTS_FILE,
    DEFAULT_SHARD_DEPTH, MAX_COMBO_DEPTH,
};
use wwhash_search::domain::backend::BackendPreference;
use wwhash_search::domain::candidate::PatternOptions;
use wwhash_search::domain::checkpoint_format::CheckpointFormatError;
use wwhash_search::domain::matcher::KnownMatches;
use wwhash_search::domain::ngram::{NgramFilter, NgramMode};
use wwhash_search::domain::target::TargetSet;
use wwhash_search::error::SearchError;
use wwhash_search::infra::ngram_io::load_ngram_filter;
use wwhash_search::infra::process_setup::raise_priority;
use wwhash_search::infra::report_io::append_report;
use wwhash_search::infra::resource_monitor::MonitorOptions;
use wwhash_search::infra::targets_io::{load_existing_matches, load_targets};
use wwhash_search::infra::wordlist_io::load_wordlist;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeArg {
    Brute,
    Pattern,
    Dictionary,
    Mitm,
    Bidir,
    Suffix,
}

impl From<ModeArg> for SearchMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Brute => SearchMode::BruteForce,
            ModeArg::Pattern => SearchMode::Pattern,
            ModeArg::Dictionary => SearchMode::Dictionary,
            ModeArg::Mitm => SearchMode::Mitm,
            ModeArg::Bidir => SearchMode::Bidirectional,
            ModeArg::Suffix => SearchMode::Suffix,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum NgramModeArg {
    Ban,
    Ok,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BackendArg {
    Auto,
    Scalar,
    Lanes,
}

impl From<BackendArg> for BackendPreference {
    fn from(backend: BackendArg) -> Self {
        match backend {
            BackendArg::Auto => BackendPreference::Auto,
            BackendArg::Scalar => BackendPreference::Scalar,
            BackendArg::Lanes => BackendPreference::Lanes,
        }
    }
}

/// Recover audio event names from their FNV-1 32-bit hashes
#[derive(Parser, Debug)]
#[command(name = "wwhash_search", version, long_about = None)]
struct Args {
    /// Search strategy
    #[arg(long, value_enum, default_value = "brute")]
    mode: ModeArg,

    /// JSON target file (events file or ID table)
    #[arg(long, value_name = "PATH")]
    targets: PathBuf,

    /// Matches found by earlier runs (0xHHHHHHHH,name[,label] per line)
    #[arg(long, value_name = "PATH")]
    existing: Option<PathBuf>,

    /// Append-only results file
    #[arg(long, value_name = "PATH", default_value = DEFAULT_RESULTS_FILE)]
    results: PathBuf,

    /// Shortest brute-force name
    #[arg(long, default_value_t = DEFAULT_MIN_LEN)]
    min_len: usize,

    /// Longest brute-force name
    #[arg(long, default_value_t = DEFAULT_MAX_LEN)]
    max_len: usize,

    /// Total name length for mitm / bidir
    #[arg(long, default_value_t = DEFAULT_MITM_LENGTH)]
    length: usize,

    /// Worker threads (default: available parallelism)
    #[arg(long)]
    workers: Option<usize>,

    /// Brute-force shard prefix length
    #[arg(long, default_value_t = DEFAULT_SHARD_DEPTH)]
    shard_depth: usize,

    /// Trigram rule file (default: built-in ban list)
    #[arg(long, value_name = "PATH")]
    ngram_file: Option<PathBuf>,

    /// Rule file format
    #[arg(long, value_enum, default_value = "ban")]
    ngram_mode: NgramModeArg,

    /// Minimum count for allow-list windows
    #[arg(long, default_value_t = 0)]
    ngram_threshold: u32,

    /// Disable trigram pruning
    #[arg(long, conflicts_with = "ngram_file")]
    no_ngram: bool,

    /// Disable fuzzy last-character pruning
    #[arg(long)]
    no_fuzzy: bool,

    /// Word list for pattern, dictionary and suffix modes
    #[arg(long, value_name = "PATH")]
    wordlist: Option<PathBuf>,

    /// Words used for combinations
    #[arg(long, default_value_t = DEFAULT_MAX_WORDS)]
    max_words: usize,

    /// Words joined per combination
    #[arg(long, default_value_t = MAX_COMBO_DEPTH)]
    combo_depth: usize,

    /// Checkpoint file
    #[arg(long, value_name = "PATH")]
    checkpoint: Option<PathBuf>,

    /// Continue from the checkpoint file
    #[arg(long, requires = "checkpoint")]
    resume: bool,

    /// Shards completed between checkpoint saves
    #[arg(long, default_value_t = DEFAULT_CHECKPOINT_EVERY)]
    checkpoint_every: u32,

    /// Slow workers down while RAM or CPU usage is high
    #[arg(long)]
    throttle: bool,

    /// RAM usage (percent) above which workers are throttled
    #[arg(long, default_value_t = DEFAULT_MAX_RAM_PERCENT)]
    max_ram_percent: f32,

    /// CPU usage (percent) above which workers are throttled
    #[arg(long, default_value_t = DEFAULT_MAX_CPU_PERCENT)]
    max_cpu_percent: f32,

    /// Raise the process scheduling priority before searching
    #[arg(long)]
    high_priority: bool,

    /// Hash backend for dictionary and pattern searches
    #[arg(long, value_enum, default_value = "auto")]
    backend: BackendArg,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn search_config(&self) -> SearchConfig {
        let brute = BruteForceOptions::default()
            .with_length_range(self.min_len, self.max_len)
            .with_shard_depth(self.shard_depth)
            .with_fuzzy(!self.no_fuzzy);
        let pattern = PatternOptions::default()
            .with_max_words(self.max_words)
            .with_combo_depth(self.combo_depth);

        let mut config = SearchConfig::new(self.mode.into())
            .with_brute(brute)
            .with_pattern(pattern)
            .with_mitm_length(self.length)
            .with_checkpoint_every(self.checkpoint_every)
            .with_backend(self.backend.into());
        if let Some(workers) = self.workers {
            config = config.with_workers(workers);
        }
        if let Some(path) = &self.checkpoint {
            config = config.with_checkpoint(path, self.resume);
        }
        if self.throttle {
            config = config.with_monitor(
                MonitorOptions::default()
                    .with_max_ram_percent(self.max_ram_percent)
                    .with_max_cpu_percent(self.max_cpu_percent),
            );
        }
        config
    }

    fn ngram_mode(&self) -> NgramMode {
        match self.ngram_mode {
            NgramModeArg::Ban => NgramMode::Banlist,
            NgramModeArg::Ok => NgramMode::Oklist,
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

/// Format a search error with a hint for the common cases
fn format_search_error(e: &SearchError) -> String {
    match e {
        SearchError::Checkpoint(CheckpointFormatError::JobMismatch { .. }) => format!(
            "{}\nThe checkpoint was written by a run with different parameters. \
             Rerun with the same options or drop --resume.",
            e
        ),
        SearchError::Checkpoint(CheckpointFormatError::ShardCountMismatch { .. }) => format!(
            "{}\nThe shard plan changed since the checkpoint was written (check --shard-depth).",
            e
        ),
        SearchError::Checkpoint(CheckpointFormatError::InvalidMagic)
        | SearchError::Checkpoint(CheckpointFormatError::UnsupportedVersion(_)) => {
            format!("{}\nRemove the checkpoint file to start a fresh run.", e)
        }
        SearchError::Checkpoint(CheckpointFormatError::Io(io)) => {
            format!("Failed to access checkpoint: {}", io)
        }
        _ => e.to_string(),
    }
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", message);
    std::process::exit(1);
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = args.search_config();

    // Targets and the names already resolved by earlier runs
    let target_file = match load_targets(&args.targets) {
        Ok(t) => t,
        Err(e) => fail(format_search_error(&e)),
    };
    let mut load_report = target_file.report;
    let mut known = match &args.existing {
        Some(path) => match load_existing_matches(path) {
            Ok((known, report)) => {
                info!(
                    "Loaded {} existing matches ({} records skipped)",
                    report.loaded, report.skipped
                );
                load_report = load_report.merge(report);
                known
            }
            Err(e) => fail(format_search_error(&e)),
        },
        None => KnownMatches::default(),
    };
    for name in &target_file.known_names {
        known.insert_name(name);
    }

    let all_targets = TargetSet::from_targets(target_file.targets);
    let targets = all_targets.without(|h| known.is_resolved(h));
    println!(
        "Loaded {} target hashes ({} already resolved, {} records skipped)",
        all_targets.len(),
        all_targets.len() - targets.len(),
        target_file.report.skipped
    );

    let ngram: Option<NgramFilter> = if args.no_ngram {
        None
    } else if let Some(path) = &args.ngram_file {
        match load_ngram_filter(path, args.ngram_mode(), args.ngram_threshold) {
            Ok((filter, report)) => {
                load_report = load_report.merge(report);
                Some(filter)
            }
            Err(e) => fail(format_search_error(&e)),
        }
    } else {
        Some(NgramFilter::default_banlist())
    };

    let words: Option<Vec<String>> = match &args.wordlist {
        Some(path) => match load_wordlist(path) {
            Ok(words) => Some(words),
            Err(e) => fail(format_search_error(&e)),
        },
        None => None,
    };

    if args.high_priority {
        raise_priority();
    }

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        if ctrlc::set_handler(move || stop.store(true, Ordering::SeqCst)).is_err() {
            warn!("Could not install Ctrl+C handler; interrupting will lose progress");
        }
    }

    let mut inputs = SearchInputs::new(&targets).with_load_report(load_report);
    if let Some(filter) = &ngram {
        inputs = inputs.with_ngram(filter);
    }
    if let Some(words) = &words {
        inputs = inputs.with_words(words);
    }

    println!(
        "Searching {} targets in {} mode with {} workers.",
        targets.len(),
        config.mode,
        config.workers
    );
    println!("Press Ctrl+C to stop; progress is saved when --checkpoint is set.");

    let start = Instant::now();
    let progress_callback = |p: SearchProgress| {
        let secs = start.elapsed().as_secs_f64();
        let rate = if secs > 0.0 { p.tested as f64 / secs } else { 0.0 };
        print!(
            "\r[Search] Progress: {:.2}% ({}/{} shards, {:.2} M hashes/s)",
            p.percent(),
            p.completed,
            p.total,
            rate / 1_000_000.0
        );
        let _ = io::stdout().flush();
    };

    let outcome = match run_search(
        &config,
        inputs,
        &known,
        WorkerContext::new(stop),
        progress_callback,
    ) {
        Ok(o) => o,
        Err(e) => {
            println!();
            fail(format_search_error(&e));
        }
    };
    println!();

    let summary = &outcome.summary;
    println!();
    println!("=== Results ({} mode) ===", summary.mode);
    println!("Parameters: {}", summary.parameters);
    println!(
        "Shards: {}/{} complete ({} resumed, {} failed)",
        summary.shards_completed, summary.shards_total, summary.shards_resumed, summary.shards_failed
    );
    println!(
        "Candidates: {} tested, {} pruned, {} verification failures",
        summary.tested, summary.pruned, summary.verification_failures
    );
    println!("Input records skipped: {}", summary.skipped_records);
    println!(
        "Elapsed: {:.2} seconds ({:.0} candidates/s)",
        summary.elapsed.as_secs_f64(),
        summary.hash_rate()
    );
    println!(
        "Matches: {} total, {} new",
        summary.matches.len(),
        outcome.new_matches.len()
    );
    for m in &outcome.new_matches {
        println!("  0x{:08X}  {:<32} [{}]", m.hash, m.name, m.label);
    }

    match append_report(
        &args.results,
        summary.mode,
        &summary.parameters,
        &outcome.new_matches,
    ) {
        Ok(0) => {}
        Ok(n) => println!("Appended {} new matches to {}", n, args.results.display()),
        Err(e) => fail(format!(
            "Failed to write results to {}: {}",
            args.results.display(),
            e
        )),
    }

    if summary.interrupted {
        match &args.checkpoint {
            Some(path) => println!(
                "Interrupted. Resume with --checkpoint {} --resume",
                path.display()
            ),
            None => println!("Interrupted. Progress was not saved (no --checkpoint)."),
        }
    } else if summary.shards_failed > 0 {
        fail(format!(
            "{} shards failed; rerun with --resume to retry them",
            summary.shards_failed
        ));
    }
}
