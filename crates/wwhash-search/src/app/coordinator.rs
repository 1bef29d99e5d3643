//! Sharded, resumable search execution
//!
//! Shards run on a dedicated rayon pool. Each worker sends its
//! `ShardOutcome` back over a channel; the coordinator thread alone owns the
//! accumulated matches, counters and checkpoint. Workers read two flags and
//! nothing else: `stop` (checked before a shard starts) and `throttle`
//! (checked between candidate batches).

use crate::constants::{DEFAULT_CHECKPOINT_EVERY, THROTTLE_SLEEP_MS};
use crate::domain::checkpoint_format::{SearchCheckpoint, job_fingerprint};
use crate::domain::matcher::Match;
use crate::error::{Result, SearchError};
use crate::infra::checkpoint_io::{load_checkpoint, remove_checkpoint, save_checkpoint};
use rayon::prelude::*;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

// =============================================================================
// Job interface
// =============================================================================

/// A search split into independently executable shards
pub trait SearchJob: Sync {
    /// Mode name used in reports
    fn name(&self) -> &'static str;

    /// Parameters that determine the shard plan and candidate space
    ///
    /// Two jobs with equal name and description must produce identical shards.
    fn describe(&self) -> String;

    fn shard_count(&self) -> u32;

    /// Execute one shard to completion
    fn run_shard(&self, shard: u32, ctx: &WorkerContext) -> Result<ShardOutcome>;

    /// Checkpoint fingerprint of this job
    fn fingerprint(&self) -> u64 {
        job_fingerprint(&format!("{}|{}", self.name(), self.describe()))
    }
}

/// Result of one shard
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ShardOutcome {
    pub matches: Vec<Match>,
    pub tested: u64,
    pub pruned: u64,
    pub verification_failures: u64,
}

/// Flags a worker observes
#[derive(Clone, Debug, Default)]
pub struct WorkerContext {
    stop: Arc<AtomicBool>,
    throttle: Arc<AtomicBool>,
}

impl WorkerContext {
    pub fn new(stop: Arc<AtomicBool>) -> Self {
        Self {
            stop,
            throttle: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Use a throttle flag owned by a resource monitor
    pub fn with_throttle(mut self, throttle: Arc<AtomicBool>) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn should_stop(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    pub fn is_throttled(&self) -> bool {
        self.throttle.load(Ordering::Relaxed)
    }

    /// Sleep briefly when throttled; called between candidate batches
    #[inline]
    pub fn pace(&self) {
        if self.is_throttled() {
            thread::sleep(Duration::from_millis(THROTTLE_SLEEP_MS));
        }
    }
}

// =============================================================================
// Coordinator
// =============================================================================

/// Execution options
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoordinatorOptions {
    pub workers: usize,
    pub checkpoint: Option<PathBuf>,
    pub resume: bool,
    /// Shards completed between two checkpoint saves
    pub checkpoint_every: u32,
    /// Malformed input records the loaders skipped before the run
    pub skipped_records: u64,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            workers: thread::available_parallelism().map_or(1, |n| n.get()),
            checkpoint: None,
            resume: false,
            checkpoint_every: DEFAULT_CHECKPOINT_EVERY,
            skipped_records: 0,
        }
    }
}

impl CoordinatorOptions {
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

    pub fn with_skipped_records(mut self, skipped: u64) -> Self {
        self.skipped_records = skipped;
        self
    }
}

/// Snapshot passed to the progress callback after every shard
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchProgress {
    pub completed: u32,
    pub total: u32,
    /// Candidates tested during this session
    pub tested: u64,
}

impl SearchProgress {
    pub fn percent(&self) -> f64 {
        if self.total > 0 {
            self.completed as f64 / self.total as f64 * 100.0
        } else {
            100.0
        }
    }
}

/// Final state of a run
#[derive(Clone, Debug)]
pub struct RunSummary {
    pub mode: &'static str,
    pub parameters: String,
    pub shards_total: u32,
    pub shards_completed: u32,
    /// Shards already complete in the resumed checkpoint
    pub shards_resumed: u32,
    pub shards_failed: u32,
    /// Candidates tested, including resumed work
    pub tested: u64,
    /// Candidates tested during this session
    pub tested_this_run: u64,
    pub pruned: u64,
    pub verification_failures: u64,
    /// Malformed input records skipped by the loaders
    pub skipped_records: u64,
    pub elapsed: Duration,
    pub interrupted: bool,
    /// One canonical match per hash, ordered by hash
    pub matches: Vec<Match>,
}

impl RunSummary {
    /// Candidates per second during this session
    pub fn hash_rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.tested_this_run as f64 / secs
        } else {
            0.0
        }
    }

    pub fn is_complete(&self) -> bool {
        self.shards_completed == self.shards_total
    }
}

/// Runs a job's shards across workers and owns all mutable run state
pub struct SearchCoordinator {
    options: CoordinatorOptions,
}

impl SearchCoordinator {
    pub fn new(options: CoordinatorOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CoordinatorOptions {
        &self.options
    }

    /// Run without progress reporting
    pub fn run(&self, job: &dyn SearchJob, ctx: &WorkerContext) -> Result<RunSummary> {
        self.run_with_progress(job, ctx, |_| {})
    }

    /// Run every pending shard, calling `on_progress` after each
    pub fn run_with_progress<F>(
        &self,
        job: &dyn SearchJob,
        ctx: &WorkerContext,
        mut on_progress: F,
    ) -> Result<RunSummary>
    where
        F: FnMut(SearchProgress),
    {
        if self.options.workers == 0 {
            return Err(SearchError::config("worker count must be at least 1"));
        }

        let start = Instant::now();
        let total = job.shard_count();
        let parameters = job.describe();
        let mut state = self.initial_state(job, total)?;
        state.skipped_records = self.options.skipped_records;
        let resumed = state.completed.len() as u32;

        let pending: Vec<u32> = (0..total).filter(|&id| !state.is_complete(id)).collect();
        info!(
            "{} search: {} shards ({} pending, {} workers)",
            job.name(),
            total,
            pending.len(),
            self.options.workers
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.workers)
            .thread_name(|i| format!("search-worker-{}", i))
            .build()
            .map_err(|e| SearchError::config(format!("cannot start worker pool: {}", e)))?;

        let mut failed = 0u32;
        let mut tested_this_run = 0u64;
        let mut since_save = 0u32;
        on_progress(SearchProgress {
            completed: resumed,
            total,
            tested: 0,
        });

        thread::scope(|scope| {
            let (tx, rx) = mpsc::channel::<(u32, Result<ShardOutcome>)>();

            scope.spawn(move || {
                pool.install(|| {
                    pending.par_iter().for_each_with(tx, |tx, &id| {
                        if ctx.should_stop() {
                            return;
                        }
                        let outcome = panic::catch_unwind(AssertUnwindSafe(|| job.run_shard(id, ctx)))
                            .unwrap_or_else(|_| {
                                Err(SearchError::Worker {
                                    shard: id,
                                    message: "worker panicked".into(),
                                })
                            });
                        // receiver lives until every sender is dropped
                        let _ = tx.send((id, outcome));
                    });
                });
            });

            for (id, outcome) in rx {
                match outcome {
                    Ok(outcome) => {
                        tested_this_run += outcome.tested;
                        apply_outcome(&mut state, id, outcome);
                        since_save += 1;
                    }
                    Err(e) => {
                        failed += 1;
                        warn!("Shard {} failed: {}", id, e);
                    }
                }
                on_progress(SearchProgress {
                    completed: state.completed.len() as u32,
                    total,
                    tested: tested_this_run,
                });

                if since_save >= self.options.checkpoint_every {
                    since_save = 0;
                    self.save(&state);
                }
            }
        });

        let finished = state.is_finished();
        if let Some(path) = &self.options.checkpoint {
            if finished {
                remove_checkpoint(path)?;
                debug!("Run complete, checkpoint removed");
            } else {
                save_checkpoint(path, &state)?;
                info!(
                    "Checkpoint saved to {} ({}/{} shards)",
                    path.display(),
                    state.completed.len(),
                    total
                );
            }
        }

        Ok(RunSummary {
            mode: job.name(),
            parameters,
            shards_total: total,
            shards_completed: state.completed.len() as u32,
            shards_resumed: resumed,
            shards_failed: failed,
            tested: state.tested,
            tested_this_run,
            pruned: state.pruned,
            verification_failures: state.verification_failures,
            skipped_records: state.skipped_records,
            elapsed: start.elapsed(),
            interrupted: ctx.should_stop() && !finished,
            matches: state.matches.into_values().collect(),
        })
    }

    fn initial_state(&self, job: &dyn SearchJob, total: u32) -> Result<SearchCheckpoint> {
        let fingerprint = job.fingerprint();
        if let Some(path) = &self.options.checkpoint
            && self.options.resume
            && path.exists()
        {
            let state = load_checkpoint(path, Some((fingerprint, total)))?;
            info!(
                "Resuming from {}: {}/{} shards complete, {} matches",
                path.display(),
                state.completed.len(),
                total,
                state.matches.len()
            );
            return Ok(state);
        }
        Ok(SearchCheckpoint::new(fingerprint, total))
    }

    fn save(&self, state: &SearchCheckpoint) {
        if let Some(path) = &self.options.checkpoint
            && let Err(e) = save_checkpoint(path, state)
        {
            warn!("Checkpoint save failed: {}", e);
        }
    }
}

fn apply_outcome(state: &mut SearchCheckpoint, shard: u32, outcome: ShardOutcome) {
    state.mark_complete(shard);
    state.tested += outcome.tested;
    state.pruned += outcome.pruned;
    state.verification_failures += outcome.verification_failures;
    for m in outcome.matches {
        state.add_match(m);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::hash::fnv1_hash;
    use std::sync::Mutex;

    /// Shard `i` "finds" name `names[i]`
    struct ListJob {
        names: Vec<&'static str>,
        fail: Option<u32>,
        runs: Mutex<Vec<u32>>,
    }

    impl ListJob {
        fn new(names: Vec<&'static str>) -> Self {
            Self {
                names,
                fail: None,
                runs: Mutex::new(Vec::new()),
            }
        }
    }

    impl SearchJob for ListJob {
        fn name(&self) -> &'static str {
            "list"
        }

        fn describe(&self) -> String {
            self.names.join(",")
        }

        fn shard_count(&self) -> u32 {
            self.names.len() as u32
        }

        fn run_shard(&self, shard: u32, _ctx: &WorkerContext) -> Result<ShardOutcome> {
            self.runs.lock().unwrap().push(shard);
            if self.fail == Some(shard) {
                return Err(SearchError::Worker {
                    shard,
                    message: "boom".into(),
                });
            }
            let name = self.names[shard as usize];
            Ok(ShardOutcome {
                matches: vec![Match {
                    name: name.to_string(),
                    hash: fnv1_hash(name).unwrap(),
                    label: Arc::from("t"),
                }],
                tested: 1,
                pruned: 2,
                verification_failures: 0,
            })
        }
    }

    #[test]
    fn test_run_collects_every_shard() {
        let job = ListJob::new(vec!["ab", "cd", "ef", "gh"]);
        let coordinator = SearchCoordinator::new(CoordinatorOptions::default().with_workers(2));
        let summary = coordinator.run(&job, &WorkerContext::default()).unwrap();

        assert!(summary.is_complete());
        assert_eq!(summary.tested, 4);
        assert_eq!(summary.pruned, 8);
        assert_eq!(summary.matches.len(), 4);
        assert!(!summary.interrupted);
    }

    #[test]
    fn test_failed_shard_not_completed() {
        let mut job = ListJob::new(vec!["ab", "cd", "ef"]);
        job.fail = Some(1);
        let coordinator = SearchCoordinator::new(CoordinatorOptions::default().with_workers(1));
        let summary = coordinator.run(&job, &WorkerContext::default()).unwrap();

        assert_eq!(summary.shards_failed, 1);
        assert_eq!(summary.shards_completed, 2);
        assert!(!summary.is_complete());
    }

    /// Panics on shard 0
    struct PanicJob;

    impl SearchJob for PanicJob {
        fn name(&self) -> &'static str {
            "panic"
        }

        fn describe(&self) -> String {
            String::new()
        }

        fn shard_count(&self) -> u32 {
            2
        }

        fn run_shard(&self, shard: u32, _ctx: &WorkerContext) -> Result<ShardOutcome> {
            if shard == 0 {
                panic!("shard {} exploded", shard);
            }
            Ok(ShardOutcome::default())
        }
    }

    #[test]
    fn test_panicking_shard_counts_as_failed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("panic.ckpt");
        let summary = SearchCoordinator::new(
            CoordinatorOptions::default()
                .with_workers(2)
                .with_checkpoint(&path, false),
        )
        .run(&PanicJob, &WorkerContext::default())
        .unwrap();

        assert_eq!(summary.shards_failed, 1);
        assert_eq!(summary.shards_completed, 1);
        assert!(path.exists());
    }

    #[test]
    fn test_stop_before_start_runs_nothing() {
        let job = ListJob::new(vec!["ab", "cd"]);
        let ctx = WorkerContext::new(Arc::new(AtomicBool::new(true)));
        let summary = SearchCoordinator::new(CoordinatorOptions::default())
            .run(&job, &ctx)
            .unwrap();

        assert!(job.runs.lock().unwrap().is_empty());
        assert!(summary.interrupted);
        assert_eq!(summary.shards_completed, 0);
    }

    #[test]
    fn test_duplicate_hash_collapses() {
        let job = ListJob::new(vec!["ab", "ab", "ab"]);
        let summary = SearchCoordinator::new(CoordinatorOptions::default().with_workers(3))
            .run(&job, &WorkerContext::default())
            .unwrap();
        assert_eq!(summary.matches.len(), 1);
    }

    #[test]
    fn test_zero_workers_rejected() {
        let job = ListJob::new(vec!["ab"]);
        let result = SearchCoordinator::new(CoordinatorOptions::default().with_workers(0))
            .run(&job, &WorkerContext::default());
        assert!(matches!(result, Err(SearchError::Config(_))));
    }

    #[test]
    fn test_pace_without_throttle_returns_immediately() {
        let ctx = WorkerContext::default();
        let start = Instant::now();
        ctx.pace();
        assert!(start.elapsed() < Duration::from_millis(THROTTLE_SLEEP_MS));
    }

    #[test]
    fn test_throttled_worker_sleeps_and_still_finishes_shard() {
        use crate::app::config::BruteForceOptions;
        use crate::app::jobs::BruteForceJob;
        use crate::domain::target::TargetSet;

        let throttled = WorkerContext::default().with_throttle(Arc::new(AtomicBool::new(true)));
        assert!(throttled.is_throttled());
        let start = Instant::now();
        throttled.pace();
        assert!(start.elapsed() >= Duration::from_millis(THROTTLE_SLEEP_MS));

        let targets = TargetSet::from_hashes(["ab", "zz"].iter().map(|n| fnv1_hash(n).unwrap()), "t");
        let options = BruteForceOptions::default()
            .with_length_range(1, 2)
            .with_shard_depth(1);
        let job = BruteForceJob::new(&targets, None, options);
        for shard in [0, job.shard_count() - 1] {
            let expected = job.run_shard(shard, &WorkerContext::default()).unwrap();
            let outcome = job.run_shard(shard, &throttled).unwrap();
            assert_eq!(outcome, expected);
        }

        let summary = SearchCoordinator::new(CoordinatorOptions::default().with_workers(2))
            .run(&job, &throttled)
            .unwrap();
        assert!(summary.is_complete());
        assert_eq!(summary.matches.len(), 2);
    }

    #[test]
    fn test_progress_reports_tested_and_skipped_records() {
        let job = ListJob::new(vec!["ab", "cd", "ef"]);
        let coordinator = SearchCoordinator::new(
            CoordinatorOptions::default()
                .with_workers(1)
                .with_skipped_records(5),
        );
        let mut seen = Vec::new();
        let summary = coordinator
            .run_with_progress(&job, &WorkerContext::default(), |p| seen.push(p))
            .unwrap();

        assert_eq!(summary.skipped_records, 5);
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[0].completed, 0);
        let last = seen[3];
        assert_eq!((last.completed, last.total, last.tested), (3, 3, 3));
        assert_eq!(last.percent(), 100.0);
    }
}
