//! Dictionary replay
//!
//! Every word of an external list is tried verbatim first, then the whole
//! list goes through the same pattern expansion as `PatternGenerator`.

use super::CandidateSource;
use super::pattern::{PatternGenerator, PatternOptions, normalize_words};
use crate::domain::charset::CharsetPolicy;

/// Words per verbatim unit
const VERBATIM_CHUNK: usize = 4096;

/// Word list replayed verbatim and with pattern expansion
#[derive(Clone, Debug)]
pub struct DictionaryGenerator {
    words: Vec<String>,
    patterns: PatternGenerator,
    policy: CharsetPolicy,
}

impl DictionaryGenerator {
    pub fn new<I, S>(words: I, options: PatternOptions) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words = normalize_words(words);
        let patterns = PatternGenerator::new(&words, options);
        Self {
            words,
            patterns,
            policy: CharsetPolicy,
        }
    }

    /// Normalized word list
    pub fn words(&self) -> &[String] {
        &self.words
    }

    fn verbatim_units(&self) -> usize {
        self.words.len().div_ceil(VERBATIM_CHUNK)
    }
}

impl CandidateSource for DictionaryGenerator {
    fn unit_count(&self) -> usize {
        self.verbatim_units() + self.patterns.unit_count()
    }

    fn unit(&self, index: usize) -> Vec<String> {
        let verbatim = self.verbatim_units();
        if index >= verbatim {
            return self.patterns.unit(index - verbatim);
        }
        let start = index * VERBATIM_CHUNK;
        let end = (start + VERBATIM_CHUNK).min(self.words.len());
        self.words[start..end]
            .iter()
            .filter(|w| self.policy.is_valid(w.as_bytes()))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbatim_words_first() {
        let generator = DictionaryGenerator::new(
            ["Gate_Open", "ab", "portcullis_close_very_long_name"],
            PatternOptions::default(),
        );
        let first = generator.unit(0);
        assert_eq!(
            first,
            vec!["gate_open", "ab", "portcullis_close_very_long_name"]
        );
    }

    #[test]
    fn test_long_words_replayed_but_not_expanded() {
        let generator = DictionaryGenerator::new(
            ["portcullis_close_very_long_name", "gate"],
            PatternOptions::default(),
        );
        let all: Vec<String> = generator.candidates().collect();
        assert!(all.contains(&"portcullis_close_very_long_name".to_string()));
        assert!(!all.contains(&"play_portcullis_close_very_long_name".to_string()));
        assert!(all.contains(&"play_gate".to_string()));
    }

    #[test]
    fn test_unit_count() {
        let words: Vec<String> = (0..5000).map(|i| format!("w{}", i)).collect();
        let generator = DictionaryGenerator::new(&words, PatternOptions::default());
        assert_eq!(generator.verbatim_units(), 2);
        assert!(generator.unit_count() > 2);
        assert!(generator.unit(generator.unit_count()).is_empty());
    }
}
