//! Per-mode search jobs
//!
//! Each job maps shard ids to a disjoint slice of its candidate space:
//! - `BruteForceJob`: one fixed-length prefix per shard
//! - `CandidateJob`: one pattern/dictionary unit per shard
//! - `MitmJob`: one (suffix length, 2-character tail) slice per shard
//! - `SuffixJob`: one chunk of candidate prefixes per shard

use crate::app::config::BruteForceOptions;
use crate::app::coordinator::{SearchJob, ShardOutcome, WorkerContext};
use crate::constants::{HASH_BATCH_SIZE, THROTTLE_BATCH};
use crate::domain::backend::HashBackend;
use crate::domain::candidate::pattern::{PREFIXES, SUFFIXES};
use crate::domain::candidate::{CandidateSource, PatternGenerator};
use crate::domain::charset::CharsetPolicy;
use crate::domain::checkpoint_format::job_fingerprint;
use crate::domain::matcher::MatchTester;
use crate::domain::mitm::{MeetInMiddle, MitmStats, SuffixShard, SuffixTable};
use crate::domain::ngram::NgramFilter;
use crate::domain::shard::{BruteShard, plan_brute_force};
use crate::domain::FastSet;
use crate::domain::target::TargetSet;
use crate::error::{Result, SearchError};
use std::sync::Arc;
use tracing::info;

/// Prefixes per suffix-attack shard
const SUFFIX_PREFIX_CHUNK: usize = 256;

fn missing_shard(shard: u32) -> SearchError {
    SearchError::Worker {
        shard,
        message: "shard id outside the plan".into(),
    }
}

fn ngram_description(ngram: Option<&NgramFilter>) -> String {
    match ngram {
        Some(filter) => {
            let stats = filter.stats();
            format!(
                "{}:{}/{}@{}#{:016x}",
                stats.mode,
                stats.start_trigrams,
                stats.middle_trigrams,
                stats.threshold,
                filter.digest()
            )
        }
        None => "off".to_string(),
    }
}

// =============================================================================
// Brute force
// =============================================================================

/// Exhaustive enumeration split by prefix
pub struct BruteForceJob<'a> {
    targets: &'a TargetSet,
    ngram: Option<&'a NgramFilter>,
    options: BruteForceOptions,
    shards: Vec<BruteShard>,
}

impl<'a> BruteForceJob<'a> {
    pub fn new(
        targets: &'a TargetSet,
        ngram: Option<&'a NgramFilter>,
        options: BruteForceOptions,
    ) -> Self {
        let shards = plan_brute_force(options.min_len, options.max_len, options.shard_depth);
        let space: u128 = shards.iter().map(BruteShard::space_size).sum();
        info!(
            "Brute force over lengths {}-{}: {} candidates in {} shards",
            options.min_len,
            options.max_len,
            space,
            shards.len()
        );
        Self {
            targets,
            ngram,
            options,
            shards,
        }
    }

    pub fn shards(&self) -> &[BruteShard] {
        &self.shards
    }
}

impl SearchJob for BruteForceJob<'_> {
    fn name(&self) -> &'static str {
        "brute"
    }

    fn describe(&self) -> String {
        format!(
            "Length: {}-{}, shard depth {}, fuzzy {}, ngram {}",
            self.options.min_len,
            self.options.max_len,
            self.options.shard_depth,
            if self.options.fuzzy { "on" } else { "off" },
            ngram_description(self.ngram)
        )
    }

    fn shard_count(&self) -> u32 {
        self.shards.len() as u32
    }

    fn run_shard(&self, shard: u32, ctx: &WorkerContext) -> Result<ShardOutcome> {
        let plan = self.shards.get(shard as usize).ok_or_else(|| missing_shard(shard))?;

        let mut brute = plan.enumerate();
        if let Some(filter) = self.ngram {
            brute = brute.with_ngram(filter);
        }
        if self.options.fuzzy {
            brute = brute.with_fuzzy(self.targets);
        }

        let tester = MatchTester::new(self.targets);
        let mut outcome = ShardOutcome::default();
        while let Some((candidate, hash)) = brute.next_candidate() {
            outcome.tested += 1;
            if let Some(m) = tester.test_hashed(candidate, hash) {
                outcome.matches.push(m);
            }
            if outcome.tested % THROTTLE_BATCH == 0 {
                ctx.pace();
            }
        }

        let stats = brute.stats();
        outcome.pruned = stats.fuzzy_pruned + stats.ngram_pruned;
        Ok(outcome)
    }
}

// =============================================================================
// Pattern / dictionary
// =============================================================================

/// Generated candidates hashed in batches through a hash backend
pub struct CandidateJob<'a> {
    name: &'static str,
    description: String,
    source: Box<dyn CandidateSource + 'a>,
    targets: &'a TargetSet,
    backend: Arc<dyn HashBackend>,
}

impl<'a> CandidateJob<'a> {
    /// `description` must identify the source's candidate space
    pub fn new(
        name: &'static str,
        description: String,
        source: Box<dyn CandidateSource + 'a>,
        targets: &'a TargetSet,
        backend: Arc<dyn HashBackend>,
    ) -> Self {
        info!(
            "{} search: {} units, backend {}",
            name,
            source.unit_count(),
            backend.name()
        );
        Self {
            name,
            description,
            source,
            targets,
            backend,
        }
    }
}

impl SearchJob for CandidateJob<'_> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn describe(&self) -> String {
        self.description.clone()
    }

    fn shard_count(&self) -> u32 {
        self.source.unit_count() as u32
    }

    fn run_shard(&self, shard: u32, ctx: &WorkerContext) -> Result<ShardOutcome> {
        if shard as usize >= self.source.unit_count() {
            return Err(missing_shard(shard));
        }
        let unit = self.source.unit(shard as usize);
        let tester = MatchTester::new(self.targets);
        let mut outcome = ShardOutcome::default();
        let mut hashes = vec![0u32; HASH_BATCH_SIZE];

        for batch in unit.chunks(HASH_BATCH_SIZE) {
            let inputs: Vec<&[u8]> = batch.iter().map(|c| c.as_bytes()).collect();
            self.backend.hash_batch(&inputs, &mut hashes);
            for (candidate, &hash) in inputs.iter().zip(&hashes) {
                if let Some(m) = tester.test_hashed(candidate, hash) {
                    outcome.matches.push(m);
                }
            }
            outcome.tested += inputs.len() as u64;
            ctx.pace();
        }

        Ok(outcome)
    }
}

/// Identify a word list by count and content hash
pub fn wordlist_description(words: &[String]) -> String {
    format!(
        "{} words #{:016x}",
        words.len(),
        job_fingerprint(&words.join("\n"))
    )
}

// =============================================================================
// Meet-in-the-middle / bidirectional
// =============================================================================

/// Algebraic attack over a prebuilt prefix table
pub struct MitmJob<'a> {
    engine: MeetInMiddle,
    shards: Vec<SuffixShard>,
    targets: &'a TargetSet,
    bidirectional: bool,
}

impl<'a> MitmJob<'a> {
    /// Fixed split at `total_len / 2`
    ///
    /// The prefix table holds every string of length 1..=total_len/2; the
    /// caller is responsible for choosing a length whose table fits in memory.
    pub fn new(targets: &'a TargetSet, total_len: usize) -> Self {
        Self::with_engine(targets, MeetInMiddle::new(total_len), false)
    }

    /// Suffixes of every length, covering names of length 2..=total_len
    pub fn bidirectional(targets: &'a TargetSet, total_len: usize) -> Self {
        Self::with_engine(targets, MeetInMiddle::bidirectional(total_len), true)
    }

    fn with_engine(targets: &'a TargetSet, engine: MeetInMiddle, bidirectional: bool) -> Self {
        let shards = engine.shards();
        info!(
            "Prefix table: {} prefixes, {} distinct states (length <= {}); {} suffix shards",
            engine.table().len(),
            engine.table().distinct_states(),
            engine.table().max_len(),
            shards.len()
        );
        Self {
            engine,
            shards,
            targets,
            bidirectional,
        }
    }
}

impl SearchJob for MitmJob<'_> {
    fn name(&self) -> &'static str {
        if self.bidirectional { "bidir" } else { "mitm" }
    }

    fn describe(&self) -> String {
        format!(
            "Length: {}, prefix <= {}",
            self.engine.total_len(),
            self.engine.table().max_len()
        )
    }

    fn shard_count(&self) -> u32 {
        self.shards.len() as u32
    }

    fn run_shard(&self, shard: u32, ctx: &WorkerContext) -> Result<ShardOutcome> {
        let plan = self.shards.get(shard as usize).ok_or_else(|| missing_shard(shard))?;
        ctx.pace();

        let tester = MatchTester::new(self.targets);
        let mut stats = MitmStats::default();
        let matches = self.engine.search_shard(plan, &tester, &mut stats);
        Ok(ShardOutcome {
            matches,
            tested: stats.suffixes,
            pruned: 0,
            verification_failures: stats.verification_failures,
        })
    }
}

// =============================================================================
// Known-suffix attack
// =============================================================================

/// Candidate prefixes checked against every suffix of the built-in menu
pub struct SuffixJob<'a> {
    table: SuffixTable,
    prefixes: Vec<String>,
    description: String,
    targets: &'a TargetSet,
}

impl<'a> SuffixJob<'a> {
    /// Prefixes are the words themselves plus every prefix-menu variant
    pub fn new(targets: &'a TargetSet, words: &[String]) -> Self {
        let policy = CharsetPolicy;
        let generator = PatternGenerator::new(words, Default::default());
        let mut seen = FastSet::default();
        let prefixes: Vec<String> = generator
            .priority_words()
            .iter()
            .flat_map(|w| std::iter::once(w.clone()).chain(PatternGenerator::with_prefixes(w)))
            .filter(|p| policy.is_valid(p.as_bytes()))
            .filter(|p| seen.insert(p.clone()))
            .collect();

        let table = SuffixTable::build(SUFFIXES, targets);
        info!(
            "Suffix attack: {} prefixes x {} suffixes ({} prefix menu entries)",
            prefixes.len(),
            table.len(),
            PREFIXES.len()
        );
        Self {
            table,
            description: wordlist_description(&prefixes),
            prefixes,
            targets,
        }
    }
}

impl SearchJob for SuffixJob<'_> {
    fn name(&self) -> &'static str {
        "suffix"
    }

    fn describe(&self) -> String {
        self.description.clone()
    }

    fn shard_count(&self) -> u32 {
        self.prefixes.len().div_ceil(SUFFIX_PREFIX_CHUNK) as u32
    }

    fn run_shard(&self, shard: u32, ctx: &WorkerContext) -> Result<ShardOutcome> {
        let chunk = self
            .prefixes
            .chunks(SUFFIX_PREFIX_CHUNK)
            .nth(shard as usize)
            .ok_or_else(|| missing_shard(shard))?;
        ctx.pace();

        let tester = MatchTester::new(self.targets);
        let mut stats = MitmStats::default();
        let mut matches = Vec::new();
        for prefix in chunk {
            matches.extend(self.table.search_prefix(prefix.as_bytes(), &tester, &mut stats));
        }
        Ok(ShardOutcome {
            matches,
            tested: stats.suffixes,
            pruned: 0,
            verification_failures: stats.verification_failures,
        })
    }
}
