//! Trigram (3-character window) filter
//!
//! Two position classes are tracked: the window at the start of a name and
//! every later window. In ban-list mode an unlisted window is allowed; in
//! allow-list mode an unlisted window is rejected.
//!
//! ## Rule file formats
//!
//! Ban list (one rule per line, `#` comments):
//! - `^ab` / `ab` - ban every window starting with `ab` (start / middle)
//! - `^abc` / `abc` - ban exactly that window
//! - `a[bcd]` - shorthand for `ab`, `ac`, `ad`
//!
//! Allow list with frequency (`abc: 123`, optional `^`): the window is
//! allowed only when its count is at least the configured threshold.

use super::FastMap;
use crate::constants::CHARSET_REST;
use crate::domain::checkpoint_format::fingerprint_bytes;
use crate::error::LoadReport;

/// Trigram key
pub type Trigram = [u8; 3];

/// Position class of a window
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NgramPosition {
    /// First window of a name
    Start,
    /// Any later window
    Middle,
}

/// How unlisted windows are treated
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NgramMode {
    /// Unlisted windows are allowed
    #[default]
    Banlist,
    /// Unlisted windows are rejected
    Oklist,
}

impl std::fmt::Display for NgramMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Banlist => write!(f, "banlist"),
            Self::Oklist => write!(f, "oklist"),
        }
    }
}

/// Summary of a loaded filter
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NgramStats {
    pub mode: NgramMode,
    pub start_trigrams: usize,
    pub middle_trigrams: usize,
    pub threshold: u32,
}

/// Position-aware trigram table
#[derive(Clone, Debug, Default)]
pub struct NgramFilter {
    start: FastMap<Trigram, bool>,
    middle: FastMap<Trigram, bool>,
    mode: NgramMode,
    threshold: u32,
}

/// Windows banned when no rule file is supplied
const DEFAULT_BANNED: [&[u8; 3]; 13] = [
    b"qxz", b"qzx", b"xqz", b"xzq", b"zqx", b"zxq", b"jjj", b"kkk", b"qqq", b"vvv", b"www",
    b"xxx", b"zzz",
];

impl NgramFilter {
    /// Empty filter in the given mode
    pub fn new(mode: NgramMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Minimal built-in ban list
    pub fn default_banlist() -> Self {
        let mut filter = Self::new(NgramMode::Banlist);
        for trigram in DEFAULT_BANNED {
            filter.set(NgramPosition::Middle, *trigram, false);
        }
        filter
    }

    /// Parse the ban-list format
    pub fn parse_banlist(text: &str) -> (Self, LoadReport) {
        let mut filter = Self::new(NgramMode::Banlist);
        let mut report = LoadReport::default();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (position, rule) = split_position(line);
            let patterns = expand_brackets(&rule.to_ascii_lowercase());
            if patterns.is_empty() {
                report.skipped += 1;
                continue;
            }

            let mut accepted = false;
            for pattern in patterns {
                match pattern.as_bytes() {
                    [a, b] => {
                        for &c in CHARSET_REST {
                            filter.set(position, [*a, *b, c], false);
                        }
                        accepted = true;
                    }
                    [a, b, c] => {
                        filter.set(position, [*a, *b, *c], false);
                        accepted = true;
                    }
                    _ => {}
                }
            }
            if accepted {
                report.loaded += 1;
            } else {
                report.skipped += 1;
            }
        }

        (filter, report)
    }

    /// Parse the allow-list-with-frequency format
    pub fn parse_oklist(text: &str, threshold: u32) -> (Self, LoadReport) {
        let mut filter = Self::new(NgramMode::Oklist);
        filter.threshold = threshold;
        let mut report = LoadReport::default();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (position, rule) = split_position(line);
            let Some((window, count)) = rule.split_once(':') else {
                report.skipped += 1;
                continue;
            };
            let window = window.trim().to_ascii_lowercase();
            let (Ok(count), Some(trigram)) = (count.trim().parse::<u64>(), trigram_of(&window))
            else {
                report.skipped += 1;
                continue;
            };
            filter.set(position, trigram, count >= threshold as u64);
            report.loaded += 1;
        }

        (filter, report)
    }

    /// Set the allow flag of one window
    pub fn set(&mut self, position: NgramPosition, trigram: Trigram, allowed: bool) {
        self.table_mut(position).insert(trigram, allowed);
    }

    /// Filter mode
    pub fn mode(&self) -> NgramMode {
        self.mode
    }

    /// Statistics about the loaded tables
    pub fn stats(&self) -> NgramStats {
        NgramStats {
            mode: self.mode,
            start_trigrams: self.start.len(),
            middle_trigrams: self.middle.len(),
            threshold: self.threshold,
        }
    }

    /// Fingerprint of the table contents, independent of insertion order
    pub fn digest(&self) -> u64 {
        let mut entries: Vec<(u8, Trigram, bool)> = self
            .start
            .iter()
            .map(|(t, &ok)| (0, *t, ok))
            .chain(self.middle.iter().map(|(t, &ok)| (1, *t, ok)))
            .collect();
        entries.sort_unstable();

        let mode = match self.mode {
            NgramMode::Banlist => 0u8,
            NgramMode::Oklist => 1u8,
        };
        let head = [mode].into_iter().chain(self.threshold.to_le_bytes());
        fingerprint_bytes(head.chain(entries.into_iter().flat_map(|(pos, t, ok)| {
            [pos, t[0], t[1], t[2], ok as u8]
        })))
    }

    /// Whether a single window is allowed at a position
    #[inline]
    pub fn allows(&self, position: NgramPosition, trigram: &Trigram) -> bool {
        let table = match position {
            NgramPosition::Start => &self.start,
            NgramPosition::Middle => &self.middle,
        };
        match table.get(trigram) {
            Some(&allowed) => allowed,
            None => self.mode == NgramMode::Banlist,
        }
    }

    /// Scan every window of a candidate
    pub fn is_valid(&self, candidate: &[u8]) -> bool {
        if candidate.len() < 3 {
            return true;
        }
        let lower: Vec<u8> = candidate.iter().map(u8::to_ascii_lowercase).collect();

        lower.windows(3).enumerate().all(|(i, window)| {
            let position = if i == 0 {
                NgramPosition::Start
            } else {
                NgramPosition::Middle
            };
            self.allows(position, &[window[0], window[1], window[2]])
        })
    }

    /// Check only the window completed by appending `next` to `prefix`
    #[inline]
    pub fn is_valid_extension(&self, prefix: &[u8], next: u8) -> bool {
        let len = prefix.len();
        if len < 2 {
            return true;
        }
        let trigram = [
            prefix[len - 2].to_ascii_lowercase(),
            prefix[len - 1].to_ascii_lowercase(),
            next.to_ascii_lowercase(),
        ];
        let position = if len == 2 {
            NgramPosition::Start
        } else {
            NgramPosition::Middle
        };
        self.allows(position, &trigram)
    }

    fn table_mut(&mut self, position: NgramPosition) -> &mut FastMap<Trigram, bool> {
        match position {
            NgramPosition::Start => &mut self.start,
            NgramPosition::Middle => &mut self.middle,
        }
    }
}

fn split_position(line: &str) -> (NgramPosition, &str) {
    match line.strip_prefix('^') {
        Some(rest) => (NgramPosition::Start, rest),
        None => (NgramPosition::Middle, line),
    }
}

fn trigram_of(window: &str) -> Option<Trigram> {
    match window.as_bytes() {
        [a, b, c, ..] => Some([*a, *b, *c]),
        _ => None,
    }
}

/// Expand one `[...]` group: `a[bcd]` -> `ab`, `ac`, `ad`
fn expand_brackets(rule: &str) -> Vec<String> {
    let (Some(open), Some(close)) = (rule.find('['), rule.find(']')) else {
        return if rule.is_empty() {
            Vec::new()
        } else {
            vec![rule.to_string()]
        };
    };
    if close < open {
        return Vec::new();
    }
    let head = &rule[..open];
    let tail = &rule[close + 1..];
    rule[open + 1..close]
        .chars()
        .map(|c| format!("{}{}{}", head, c, tail))
        .collect()
}
