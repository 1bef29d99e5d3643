//! Pattern-based candidate generation
//!
//! Expands a base vocabulary with the naming conventions audio event names
//! usually follow: action prefixes (`play_`, `stop_`), state and numeric
//! suffixes (`_loop`, `_01`, `_ii`), and two-word combinations.
//!
//! Output is split into units so a coordinator can hand them out as shards.
//! Units are ordered: one per priority word (word + prefix/suffix/number/roman
//! variants), then one per leading word of the combination phase, then one
//! per framed word (`prefix + word + suffix`).

use super::CandidateSource;
use crate::constants::{
    DEFAULT_MAX_NUMBER, DEFAULT_MAX_WORDS, MAX_COMBO_DEPTH, MAX_PRIORITY_WORDS, MIN_WORD_LEN,
};
use crate::domain::charset::CharsetPolicy;
use crate::domain::FastSet;

/// Action prefixes
pub const PREFIXES: &[&str] = &[
    "play_", "stop_", "pause_", "resume_", "set_", "music_", "sfx_", "vo_", "amb_", "ui_",
    "hero_", "npc_", "weapon_", "vehicle_", "creature_",
];

/// Numeric, ordinal, roman-numeral and state-word suffixes
pub const SUFFIXES: &[&str] = &[
    "_lp", "_loop", "_01", "_02", "_03", "_04", "_05", "_06", "_07", "_08", "_09", "_10",
    "_start", "_stop", "_end", "_hit", "_miss", "_death", "_spawn", "_idle", "_a", "_b", "_c",
    "_d", "_attack", "_swing", "_block", "_parry", "_footstep", "_run", "_walk", "_jump",
    "_land", "_fall", "_i", "_ii", "_iii", "_iv", "_v", "_vi", "_vii", "_viii", "_ix", "_x",
    "_pain", "_grunt", "_vocal", "_voice", "_vo", "_sfx", "_amb", "_mus", "_fire", "_impact",
    "_explode", "_charge", "_release", "_throw", "_catch", "_win", "_lose", "_good", "_evil",
    "_hero", "_enemy", "_ally", "_neutral", "_melee", "_ranged", "_magic", "_ability",
    "_special", "_ultimate", "_taunt", "_cheer", "_roar", "_scream", "_yell", "_cry", "_slice",
    "_slash", "_stab", "_crush", "_smash", "_bash", "_pound", "_kill", "_die", "_hurt", "_heal",
    "_revive", "_resurrect", "_atmo", "_intro", "_outro", "_activate", "_deactivate", "_cast",
    "_channel", "_combo", "_primary", "_secondary", "_alt", "_left", "_right", "_light",
    "_heavy", "_quick", "_slow", "_chain",
];

/// Vocabulary used when no word list is supplied
pub const DEFAULT_VOCABULARY: &[&str] = &[
    "music", "ambience", "ambient", "footstep", "foley", "impact", "explosion", "weapon",
    "sword", "bow", "arrow", "shield", "axe", "hammer", "spear", "magic", "spell", "fire",
    "ice", "lightning", "wind", "rain", "water", "thunder", "menu", "button", "click", "hover",
    "select", "confirm", "cancel", "hero", "enemy", "creature", "horse", "troll", "orc",
    "dragon", "wolf", "crowd", "battle", "combat", "victory", "defeat", "intro", "outro",
    "level", "mission", "objective", "ability", "attack", "block", "dodge", "charge", "death",
    "spawn", "voice", "dialog", "narrator", "cinematic", "gate", "door", "wall", "tower",
    "catapult", "siege", "ballista", "boulder", "banner", "horn", "drum", "bell",
];

const ROMAN: [&str; 21] = [
    "", "i", "ii", "iii", "iv", "v", "vi", "vii", "viii", "ix", "x", "xi", "xii", "xiii", "xiv",
    "xv", "xvi", "xvii", "xviii", "xix", "xx",
];

/// Lowercase roman numeral for 1..=20; other values render as decimal
pub fn to_roman(n: u32) -> String {
    match ROMAN.get(n as usize) {
        Some(numeral) if n >= 1 => numeral.to_string(),
        _ => n.to_string(),
    }
}

/// Size-capping knobs
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatternOptions {
    /// Words considered for combinations
    pub max_words: usize,
    /// Words joined per combination (capped at 2)
    pub combo_depth: usize,
    /// Words expanded with every single-word pattern
    pub max_priority_words: usize,
    /// Largest number / roman numeral appended
    pub max_number: u32,
    /// Words wrapped with every prefix and suffix
    pub framed_words: usize,
    /// Priority word length bounds
    pub min_priority_len: usize,
    pub max_priority_len: usize,
}

impl Default for PatternOptions {
    fn default() -> Self {
        Self {
            max_words: DEFAULT_MAX_WORDS,
            combo_depth: MAX_COMBO_DEPTH,
            max_priority_words: MAX_PRIORITY_WORDS,
            max_number: DEFAULT_MAX_NUMBER,
            framed_words: DEFAULT_MAX_WORDS,
            min_priority_len: 3,
            max_priority_len: 15,
        }
    }
}

impl PatternOptions {
    pub fn with_max_words(mut self, max_words: usize) -> Self {
        self.max_words = max_words;
        self.framed_words = max_words;
        self
    }

    pub fn with_combo_depth(mut self, depth: usize) -> Self {
        self.combo_depth = depth.min(MAX_COMBO_DEPTH);
        self
    }

    pub fn with_max_number(mut self, max_number: u32) -> Self {
        self.max_number = max_number;
        self
    }
}

/// Normalize a vocabulary: lowercase, trim, drop short words and duplicates (first wins)
pub fn normalize_words<I, S>(words: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = FastSet::default();
    words
        .into_iter()
        .map(|w| w.as_ref().trim().to_ascii_lowercase())
        .filter(|w| w.len() >= MIN_WORD_LEN && w.is_ascii())
        .filter(|w| seen.insert(w.clone()))
        .collect()
}

/// Pattern expansion over a base vocabulary
#[derive(Clone, Debug)]
pub struct PatternGenerator {
    priority: Vec<String>,
    combo_words: Vec<String>,
    options: PatternOptions,
    policy: CharsetPolicy,
}

impl PatternGenerator {
    pub fn new<I, S>(words: I, options: PatternOptions) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let base = normalize_words(words);

        let mut priority: Vec<String> = base
            .iter()
            .filter(|w| (options.min_priority_len..=options.max_priority_len).contains(&w.len()))
            .cloned()
            .collect();
        priority.sort_by_key(|w| w.len());
        priority.truncate(options.max_priority_words);

        let mut combo_words = base;
        combo_words.sort_by_key(|w| w.len());
        combo_words.truncate(options.max_words);

        Self {
            priority,
            combo_words,
            options,
            policy: CharsetPolicy,
        }
    }

    /// Generator over the built-in vocabulary
    pub fn with_default_vocabulary(options: PatternOptions) -> Self {
        Self::new(DEFAULT_VOCABULARY.iter().copied(), options)
    }

    /// Priority words in expansion order
    pub fn priority_words(&self) -> &[String] {
        &self.priority
    }

    /// `prefix + word` for every prefix
    pub fn with_prefixes(word: &str) -> impl Iterator<Item = String> + '_ {
        PREFIXES.iter().map(move |p| format!("{}{}", p, word))
    }

    /// `word + suffix` for every suffix
    pub fn with_suffixes(word: &str) -> impl Iterator<Item = String> + '_ {
        SUFFIXES.iter().map(move |s| format!("{}{}", word, s))
    }

    /// `word_N`, `word_0N`, `wordN` for N in 0..=max_n
    pub fn with_numbers(word: &str, max_n: u32) -> impl Iterator<Item = String> + '_ {
        (0..=max_n).flat_map(move |i| {
            [
                format!("{}_{}", word, i),
                format!("{}_{:02}", word, i),
                format!("{}{}", word, i),
            ]
        })
    }

    /// `word_R`, `wordR` for roman numerals 1..=max_n
    pub fn with_roman(word: &str, max_n: u32) -> impl Iterator<Item = String> + '_ {
        (1..=max_n).flat_map(move |i| {
            let roman = to_roman(i);
            [format!("{}_{}", word, roman), format!("{}{}", word, roman)]
        })
    }

    fn combo_units(&self) -> usize {
        if self.options.combo_depth >= 2 {
            self.combo_words.len()
        } else {
            0
        }
    }

    fn framed_units(&self) -> usize {
        self.priority.len().min(self.options.framed_words)
    }

    fn word_unit(&self, word: &str) -> Vec<String> {
        let max_n = self.options.max_number;
        std::iter::once(word.to_string())
            .chain(Self::with_prefixes(word))
            .chain(Self::with_suffixes(word))
            .chain(Self::with_numbers(word, max_n))
            .chain(Self::with_roman(word, max_n))
            .collect()
    }

    fn combo_unit(&self, first: usize) -> Vec<String> {
        let a = &self.combo_words[first];
        self.combo_words[first + 1..]
            .iter()
            .flat_map(|b| [format!("{}_{}", a, b), format!("{}_{}", b, a)])
            .collect()
    }

    fn framed_unit(&self, word: &str) -> Vec<String> {
        PREFIXES
            .iter()
            .flat_map(|p| SUFFIXES.iter().map(move |s| format!("{}{}{}", p, word, s)))
            .collect()
    }
}

impl CandidateSource for PatternGenerator {
    fn unit_count(&self) -> usize {
        self.priority.len() + self.combo_units() + self.framed_units()
    }

    fn unit(&self, index: usize) -> Vec<String> {
        let words = self.priority.len();
        let combos = self.combo_units();
        let raw = if index < words {
            self.word_unit(&self.priority[index])
        } else if index < words + combos {
            self.combo_unit(index - words)
        } else if index < self.unit_count() {
            self.framed_unit(&self.priority[index - words - combos])
        } else {
            Vec::new()
        };
        raw.into_iter()
            .filter(|c| self.policy.is_valid(c.as_bytes()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_roman() {
        assert_eq!(to_roman(1), "i");
        assert_eq!(to_roman(4), "iv");
        assert_eq!(to_roman(20), "xx");
        assert_eq!(to_roman(0), "0");
        assert_eq!(to_roman(21), "21");
    }

    #[test]
    fn test_numbers() {
        let v: Vec<String> = PatternGenerator::with_numbers("hit", 1).collect();
        assert_eq!(v, vec!["hit_0", "hit_00", "hit0", "hit_1", "hit_01", "hit1"]);
    }

    #[test]
    fn test_roman_variants() {
        let v: Vec<String> = PatternGenerator::with_roman("act", 2).collect();
        assert_eq!(v, vec!["act_i", "acti", "act_ii", "actii"]);
    }

    #[test]
    fn test_normalize_words() {
        let words = normalize_words(["  Sword ", "a", "sword", "Bow", "caf\u{e9}"]);
        assert_eq!(words, vec!["sword", "bow"]);
    }

    #[test]
    fn test_priority_sorted_and_capped() {
        let options = PatternOptions {
            max_priority_words: 2,
            ..PatternOptions::default()
        };
        let generator = PatternGenerator::new(["thunder", "ab", "axe", "horn"], options);
        assert_eq!(generator.priority_words(), &["axe", "horn"]);
    }

    #[test]
    fn test_units_cover_patterns() {
        let generator =
            PatternGenerator::new(["sword", "fire"], PatternOptions::default());
        let all: Vec<String> = generator.candidates().collect();

        for expected in [
            "fire",
            "play_sword",
            "sword_loop",
            "fire_03",
            "sword_iv",
            "fire_sword",
            "sword_fire",
            "play_fire_loop",
            "creature_sword_chain",
        ] {
            assert!(all.contains(&expected.to_string()), "missing {}", expected);
        }
    }

    #[test]
    fn test_combo_depth_one_disables_pairs() {
        let options = PatternOptions::default().with_combo_depth(1);
        let generator = PatternGenerator::new(["sword", "fire"], options);
        let all: Vec<String> = generator.candidates().collect();
        assert!(!all.contains(&"fire_sword".to_string()));
    }

    #[test]
    fn test_candidates_respect_charset() {
        let generator = PatternGenerator::new(["9lives", "_x_", "ok"], PatternOptions::default());
        let policy = CharsetPolicy;
        assert!(generator.candidates().all(|c| policy.is_valid(c.as_bytes())));
    }

    #[test]
    fn test_candidates_unique_and_restartable() {
        let generator = PatternGenerator::with_default_vocabulary(
            PatternOptions::default().with_max_words(10),
        );
        let first: Vec<String> = generator.candidates().collect();
        let second: Vec<String> = generator.candidates().collect();
        assert_eq!(first, second);

        let unique: FastSet<&String> = first.iter().collect();
        assert_eq!(unique.len(), first.len());
    }
}
