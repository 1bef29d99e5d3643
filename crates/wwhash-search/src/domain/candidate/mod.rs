//! Candidate generators
//!
//! - `brute`: exhaustive enumeration under the charset policy
//! - `pattern`: prefix/suffix/numeral/combination expansion of a vocabulary
//! - `dictionary`: word-list replay, verbatim and through pattern expansion
//!
//! Pattern and dictionary generators implement `CandidateSource`: their
//! output is a fixed sequence of units, each unit a deterministic list of
//! candidates. Units are the shard granularity for the coordinator; the
//! flattened, de-duplicated sequence is available through `candidates()`.

pub mod brute;
pub mod dictionary;
pub mod pattern;

pub use brute::{BruteForce, BruteStats};
pub use dictionary::DictionaryGenerator;
pub use pattern::{PatternGenerator, PatternOptions};

use super::FastSet;

/// A finite, restartable candidate sequence split into units
pub trait CandidateSource: Send + Sync {
    /// Number of units
    fn unit_count(&self) -> usize;

    /// Candidates of one unit (empty for an out-of-range index)
    fn unit(&self, index: usize) -> Vec<String>;

    /// Every candidate once, in unit order
    fn candidates(&self) -> Box<dyn Iterator<Item = String> + '_> {
        let mut seen = FastSet::default();
        Box::new(
            (0..self.unit_count())
                .flat_map(move |i| self.unit(i))
                .filter(move |c| seen.insert(c.clone())),
        )
    }
}
