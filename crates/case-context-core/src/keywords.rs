//! Bilingual keyword extraction.
//!
//! Documents and queries go through the same [`KeywordExtractor`] so that
//! their keyword sets are directly comparable by the scorer.
//!
//! # Algorithm
//!
//! 1. Split text into maximal runs of CJK characters and runs of other
//!    alphanumeric characters. Punctuation, symbols and whitespace delimit
//!    runs.
//! 2. CJK runs emit overlapping character bigrams (no dictionary segmenter
//!    is assumed). Latin/digit runs emit the lower-cased word.
//! 3. Tokens found in the [`StopWords`] table, and tokens shorter than
//!    [`MIN_TOKEN_CHARS`] characters, are dropped.
//! 4. The weight of a token is its frequency, capped at `weight_cap`.
//!
//! # Example
//!
//! ```rust
//! use case_context_core::keywords::KeywordExtractor;
//!
//! let extractor = KeywordExtractor::default();
//! let keywords = extractor.extract("数据库 timeout, Timeout!");
//! assert_eq!(keywords.weight("数据"), 1);
//! assert_eq!(keywords.weight("据库"), 1);
//! assert_eq!(keywords.weight("timeout"), 2);
//! ```

use std::collections::{BTreeMap, HashSet};

/// Tokens shorter than this many characters are discarded.
pub const MIN_TOKEN_CHARS: usize = 2;

/// Default per-token weight ceiling.
pub const DEFAULT_WEIGHT_CAP: u32 = 10;

const BUILTIN_STOPWORDS: &str = include_str!("../data/stopwords.txt");

/// Stop-word table loaded from a line-oriented text resource.
///
/// One word per line, compared after lower-casing. Blank lines and lines
/// beginning with `#` are ignored.
#[derive(Debug, Clone, Default)]
pub struct StopWords {
    words: HashSet<String>,
}

impl StopWords {
    /// The bilingual (Chinese + English) table shipped with the crate.
    pub fn builtin() -> Self {
        Self::parse(BUILTIN_STOPWORDS)
    }

    /// Parse a table from its text form.
    pub fn parse(table: &str) -> Self {
        let mut words = Self::default();
        words.extend_from_table(table);
        words
    }

    /// Add every entry of another table.
    pub fn extend_from_table(&mut self, table: &str) {
        for line in table.lines() {
            let word = line.trim();
            if word.is_empty() || word.starts_with('#') {
                continue;
            }
            self.words.insert(word.to_lowercase());
        }
    }

    pub fn contains(&self, token: &str) -> bool {
        self.words.contains(token)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Weighted keyword set: token → capped frequency.
///
/// Backed by an ordered map so that iteration, and therefore every score
/// computed from it, is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordSet {
    weights: BTreeMap<String, u32>,
}

impl KeywordSet {
    /// Weight of `token`, or 0 when absent.
    pub fn weight(&self, token: &str) -> u32 {
        self.weights.get(token).copied().unwrap_or(0)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.weights.contains_key(token)
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Tokens and weights in lexical token order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.weights.iter().map(|(t, w)| (t.as_str(), *w))
    }

    /// Sum of all weights.
    pub fn total_weight(&self) -> u64 {
        self.weights.values().map(|w| u64::from(*w)).sum()
    }
}

impl FromIterator<(String, u32)> for KeywordSet {
    fn from_iter<I: IntoIterator<Item = (String, u32)>>(iter: I) -> Self {
        Self {
            weights: iter.into_iter().collect(),
        }
    }
}

/// Turns text into a [`KeywordSet`].
#[derive(Debug, Clone)]
pub struct KeywordExtractor {
    stopwords: StopWords,
    weight_cap: u32,
}

impl Default for KeywordExtractor {
    fn default() -> Self {
        Self::new(StopWords::builtin(), DEFAULT_WEIGHT_CAP)
    }
}

impl KeywordExtractor {
    /// A `weight_cap` of 0 is treated as 1.
    pub fn new(stopwords: StopWords, weight_cap: u32) -> Self {
        Self {
            stopwords,
            weight_cap: weight_cap.max(1),
        }
    }

    pub fn stopwords(&self) -> &StopWords {
        &self.stopwords
    }

    pub fn weight_cap(&self) -> u32 {
        self.weight_cap
    }

    /// Extract the weighted keyword set of `text`.
    pub fn extract(&self, text: &str) -> KeywordSet {
        let mut counts: BTreeMap<String, u32> = BTreeMap::new();
        for token in tokenize(text) {
            if token.chars().count() < MIN_TOKEN_CHARS || self.stopwords.contains(&token) {
                continue;
            }
            let count = counts.entry(token).or_insert(0);
            *count = count.saturating_add(1);
        }
        for weight in counts.values_mut() {
            *weight = (*weight).min(self.weight_cap);
        }
        KeywordSet { weights: counts }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Script {
    Cjk,
    Word,
}

fn classify(c: char) -> Option<Script> {
    if is_cjk(c) {
        Some(Script::Cjk)
    } else if c.is_alphanumeric() {
        Some(Script::Word)
    } else {
        None
    }
}

/// Whether `c` belongs to the CJK scripts handled with bigrams.
pub fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{3040}'..='\u{30FF}'     // Hiragana, Katakana
        | '\u{3400}'..='\u{4DBF}'   // CJK Extension A
        | '\u{4E00}'..='\u{9FFF}'   // CJK Unified Ideographs
        | '\u{AC00}'..='\u{D7AF}'   // Hangul syllables
        | '\u{F900}'..='\u{FAFF}'   // CJK Compatibility Ideographs
        | '\u{20000}'..='\u{2A6DF}' // CJK Extension B
    )
}

/// Raw tokens of `text` before stop-word and length filtering.
///
/// CJK runs yield overlapping bigrams (a lone CJK character yields itself);
/// word runs yield one lower-cased token each.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut run: Vec<char> = Vec::new();
    let mut run_script: Option<Script> = None;

    for c in text.chars() {
        let script = classify(c);
        if script != run_script && !run.is_empty() {
            flush_run(&run, run_script, &mut tokens);
            run.clear();
        }
        run_script = script;
        if script.is_some() {
            run.push(c);
        }
    }
    if !run.is_empty() {
        flush_run(&run, run_script, &mut tokens);
    }

    tokens
}

fn flush_run(run: &[char], script: Option<Script>, tokens: &mut Vec<String>) {
    match script {
        Some(Script::Cjk) if run.len() == 1 => tokens.push(run[0].to_string()),
        Some(Script::Cjk) => {
            tokens.extend(run.windows(2).map(|pair| pair.iter().collect::<String>()));
        }
        Some(Script::Word) => tokens.push(run.iter().collect::<String>().to_lowercase()),
        None => {}
    }
}
