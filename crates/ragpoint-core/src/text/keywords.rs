// crates/ragpoint-core/src/text/keywords.rs
// ============================================================================
// Module: Ragpoint Keyword Extraction
// Description: Statistical, unsupervised keyword extraction (YAKE-style).
// Purpose: Enrich chunk metadata with the most characteristic key phrases.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! The extractor scores single terms by casing, position, normalised
//! frequency, context relatedness, and sentence spread, then scores n-gram
//! candidates as `prod(H) / (TF * (1 + sum(H)))`. Lower scores are more
//! relevant. Near-duplicate candidates are dropped with a normalised edit
//! distance similarity.
//!
//! Invariants:
//! - Candidates never start or end with a stop word, a short word, or a number.
//! - Output is deterministic for a given input.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde_json::Value;

use crate::core::document::Document;
use crate::core::document::KEYWORDS_KEY;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default maximum n-gram size.
pub const DEFAULT_MAX_NGRAM: usize = 4;
/// Default number of returned keywords.
pub const DEFAULT_TOP: usize = 15;
/// Default similarity above which candidates count as duplicates.
pub const DEFAULT_DEDUP_THRESHOLD: f64 = 0.9;
/// Words shorter than this are treated like stop words.
const MIN_WORD_CHARS: usize = 3;

/// English stop words.
const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and", "any",
    "are", "as", "at", "be", "because", "been", "before", "being", "below", "between", "both",
    "but", "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "either",
    "else", "ever", "every", "few", "for", "from", "further", "had", "has", "have", "having", "he",
    "her", "here", "hers", "herself", "him", "himself", "his", "how", "however", "i", "if", "in",
    "into", "is", "it", "its", "itself", "just", "may", "me", "might", "more", "most", "must",
    "my", "myself", "neither", "no", "nor", "not", "now", "of", "off", "on", "once", "only", "or",
    "other", "ought", "our", "ours", "ourselves", "out", "over", "own", "same", "shall", "she",
    "should", "since", "so", "some", "such", "than", "that", "the", "their", "theirs", "them",
    "themselves", "then", "there", "these", "they", "this", "those", "though", "through", "thus",
    "to", "too", "under", "until", "up", "upon", "us", "very", "was", "we", "were", "what", "when",
    "where", "whether", "which", "while", "who", "whom", "whose", "why", "will", "with", "within",
    "without", "would", "yet", "you", "your", "yours", "yourself", "yourselves",
];

// ============================================================================
// SECTION: Types
// ============================================================================

/// Extracted keyword with its relevance score (lower is better).
#[derive(Debug, Clone, PartialEq)]
pub struct Keyword {
    /// Keyword text, as first seen in the input.
    pub text: String,
    /// Candidate score.
    pub score: f64,
}

/// Keyword extraction settings.
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordExtractor {
    /// Maximum n-gram size.
    pub max_ngram: usize,
    /// Number of keywords returned.
    pub top: usize,
    /// Similarity above which a candidate is dropped as a duplicate.
    pub dedup_threshold: f64,
}

impl Default for KeywordExtractor {
    fn default() -> Self {
        Self {
            max_ngram: DEFAULT_MAX_NGRAM,
            top: DEFAULT_TOP,
            dedup_threshold: DEFAULT_DEDUP_THRESHOLD,
        }
    }
}

/// A word occurrence inside a phrase.
#[derive(Debug, Clone)]
struct Token {
    /// Surface form.
    surface: String,
    /// Lowercased form.
    key: String,
    /// Whether the token opens its sentence.
    sentence_start: bool,
}

/// Per-term occurrence statistics.
#[derive(Debug, Default)]
struct TermStats {
    /// Total occurrences.
    tf: usize,
    /// Capitalised occurrences not at a sentence start.
    tf_upper: usize,
    /// All-caps occurrences.
    tf_acronym: usize,
    /// Sentence index of every occurrence.
    sentences: Vec<usize>,
    /// Left neighbour counts.
    left: BTreeMap<String, usize>,
    /// Right neighbour counts.
    right: BTreeMap<String, usize>,
}

/// An n-gram candidate.
#[derive(Debug)]
struct Candidate {
    /// Surface form of the first occurrence.
    surface: String,
    /// Lowercased words.
    words: Vec<String>,
    /// Occurrence count.
    tf: usize,
}

// ============================================================================
// SECTION: Extraction
// ============================================================================

impl KeywordExtractor {
    /// Extracts the top keywords of `text`, most relevant first.
    #[must_use]
    pub fn extract(&self, text: &str) -> Vec<Keyword> {
        if self.top == 0 || self.max_ngram == 0 {
            return Vec::new();
        }
        let sentences = tokenize(text);
        let stats = collect_stats(&sentences);
        if stats.is_empty() {
            return Vec::new();
        }
        let weights = term_weights(&stats, sentences.len());
        let candidates = self.candidates(&sentences);

        let mut scored: Vec<(String, Keyword)> = candidates
            .into_iter()
            .filter_map(|(key, candidate)| {
                score_candidate(&candidate, &weights).map(|score| {
                    (
                        key,
                        Keyword {
                            text: candidate.surface,
                            score,
                        },
                    )
                })
            })
            .collect();
        scored.sort_by(|a, b| a.1.score.total_cmp(&b.1.score).then_with(|| a.0.cmp(&b.0)));

        let mut kept: Vec<(String, Keyword)> = Vec::new();
        for (key, keyword) in scored {
            if kept.len() >= self.top {
                break;
            }
            if kept.iter().any(|(other, _)| similarity(&key, other) > self.dedup_threshold) {
                continue;
            }
            kept.push((key, keyword));
        }
        kept.into_iter().map(|(_, keyword)| keyword).collect()
    }

    /// Collects n-gram candidates keyed by their lowercased form.
    fn candidates(&self, sentences: &[Vec<Vec<Token>>]) -> BTreeMap<String, Candidate> {
        let mut candidates: BTreeMap<String, Candidate> = BTreeMap::new();
        for phrase in sentences.iter().flatten() {
            for start in 0 .. phrase.len() {
                if !is_candidate_boundary(&phrase[start].key) {
                    continue;
                }
                let longest = self.max_ngram.min(phrase.len() - start);
                for len in 1 ..= longest {
                    let window = &phrase[start .. start + len];
                    let last = &window[len - 1];
                    if !is_candidate_boundary(&last.key) {
                        continue;
                    }
                    let words: Vec<String> = window.iter().map(|token| token.key.clone()).collect();
                    let key = words.join(" ");
                    candidates
                        .entry(key)
                        .and_modify(|candidate| candidate.tf += 1)
                        .or_insert_with(|| Candidate {
                            surface: window
                                .iter()
                                .map(|token| token.surface.as_str())
                                .collect::<Vec<_>>()
                                .join(" "),
                            words,
                            tf: 1,
                        });
                }
            }
        }
        candidates
    }
}

/// Returns keywords joined as `"kw1, kw2, ..., "`.
#[must_use]
pub fn keywords_metadata(keywords: &[Keyword]) -> String {
    keywords.iter().fold(String::new(), |mut out, keyword| {
        out.push_str(&keyword.text);
        out.push_str(", ");
        out
    })
}

/// Stores extracted keywords in each document's `keywords` metadata.
pub fn extract_keywords_for_metadata(documents: &mut [Document], extractor: &KeywordExtractor) {
    for document in documents {
        let keywords = extractor.extract(&document.content);
        document
            .metadata
            .insert(KEYWORDS_KEY.to_string(), Value::String(keywords_metadata(&keywords)));
    }
}

// ============================================================================
// SECTION: Tokenization
// ============================================================================

/// Splits text into sentences of phrases of tokens.
fn tokenize(text: &str) -> Vec<Vec<Vec<Token>>> {
    let mut sentences: Vec<Vec<Vec<Token>>> = Vec::new();
    let mut sentence: Vec<Vec<Token>> = Vec::new();
    let mut phrase: Vec<Token> = Vec::new();
    let mut word = String::new();

    for ch in text.chars() {
        if ch.is_alphanumeric() || (matches!(ch, '-' | '\'') && !word.is_empty()) {
            word.push(ch);
            continue;
        }
        flush_word(&mut word, &mut phrase, sentence.is_empty());
        if ch.is_whitespace() && ch != '\n' {
            continue;
        }
        flush_phrase(&mut phrase, &mut sentence);
        if matches!(ch, '.' | '!' | '?' | '\n') {
            flush_sentence(&mut sentence, &mut sentences);
        }
    }
    flush_word(&mut word, &mut phrase, sentence.is_empty());
    flush_phrase(&mut phrase, &mut sentence);
    flush_sentence(&mut sentence, &mut sentences);
    sentences
}

/// Moves the pending word into the phrase.
fn flush_word(word: &mut String, phrase: &mut Vec<Token>, sentence_empty: bool) {
    let surface = word.trim_end_matches(['-', '\'']).to_string();
    word.clear();
    if surface.is_empty() {
        return;
    }
    let key = surface.to_lowercase();
    phrase.push(Token {
        surface,
        key,
        sentence_start: sentence_empty && phrase.is_empty(),
    });
}

/// Moves the pending phrase into the sentence.
fn flush_phrase(phrase: &mut Vec<Token>, sentence: &mut Vec<Vec<Token>>) {
    if !phrase.is_empty() {
        sentence.push(std::mem::take(phrase));
    }
}

/// Moves the pending sentence into the sentence list.
fn flush_sentence(sentence: &mut Vec<Vec<Token>>, sentences: &mut Vec<Vec<Vec<Token>>>) {
    if !sentence.is_empty() {
        sentences.push(std::mem::take(sentence));
    }
}

// ============================================================================
// SECTION: Term Scoring
// ============================================================================

/// Returns true when `key` is a stop word or too short to carry meaning.
fn is_stop_word(key: &str) -> bool {
    key.chars().count() < MIN_WORD_CHARS || STOP_WORDS.binary_search(&key).is_ok()
}

/// Returns true when `key` consists of digits and numeric punctuation only.
fn is_numeric(key: &str) -> bool {
    key.chars().all(|ch| ch.is_ascii_digit() || matches!(ch, '-' | '\''))
}

/// Returns true when `key` may open or close a candidate.
fn is_candidate_boundary(key: &str) -> bool {
    !is_stop_word(key) && !is_numeric(key)
}

/// Gathers occurrence statistics for every token.
fn collect_stats(sentences: &[Vec<Vec<Token>>]) -> BTreeMap<String, TermStats> {
    let mut stats: BTreeMap<String, TermStats> = BTreeMap::new();
    for (index, sentence) in sentences.iter().enumerate() {
        for phrase in sentence {
            for (position, token) in phrase.iter().enumerate() {
                let entry = stats.entry(token.key.clone()).or_default();
                entry.tf += 1;
                entry.sentences.push(index);
                let first_upper = token.surface.chars().next().is_some_and(char::is_uppercase);
                let letters: Vec<char> =
                    token.surface.chars().filter(|ch| ch.is_alphabetic()).collect();
                if letters.len() > 1 && letters.iter().all(|ch| ch.is_uppercase()) {
                    entry.tf_acronym += 1;
                } else if first_upper && !token.sentence_start {
                    entry.tf_upper += 1;
                }
                if position > 0 {
                    *entry.left.entry(phrase[position - 1].key.clone()).or_default() += 1;
                }
                if let Some(next) = phrase.get(position + 1) {
                    *entry.right.entry(next.key.clone()).or_default() += 1;
                }
            }
        }
    }
    stats
}

/// Computes the `H` weight of every non-stop term.
#[allow(clippy::cast_precision_loss, reason = "Term counts are far below f64 precision limits.")]
fn term_weights(stats: &BTreeMap<String, TermStats>, sentence_count: usize) -> BTreeMap<String, f64> {
    let content: Vec<(&String, &TermStats)> =
        stats.iter().filter(|(key, _)| !is_stop_word(key) && !is_numeric(key)).collect();
    if content.is_empty() {
        return BTreeMap::new();
    }
    let frequencies: Vec<f64> = content.iter().map(|(_, term)| term.tf as f64).collect();
    let mean = frequencies.iter().sum::<f64>() / frequencies.len() as f64;
    let variance = frequencies.iter().map(|tf| (tf - mean).powi(2)).sum::<f64>()
        / frequencies.len() as f64;
    let spread = mean + variance.sqrt();
    let max_tf = frequencies.iter().copied().fold(1.0_f64, f64::max);
    let sentence_count = sentence_count.max(1) as f64;

    content
        .into_iter()
        .map(|(key, term)| {
            let tf = term.tf as f64;
            let casing = term.tf_upper.max(term.tf_acronym) as f64 / (1.0 + tf.ln());
            let position = (3.0 + median(&term.sentences)).ln().ln().max(f64::EPSILON);
            let frequency = tf / spread;
            let relatedness = 1.0 + (dispersion(&term.left) + dispersion(&term.right)) * (tf / max_tf);
            let distinct: BTreeSet<usize> = term.sentences.iter().copied().collect();
            let spread_sentences = distinct.len() as f64 / sentence_count;
            let weight = (relatedness * position)
                / (casing + frequency / relatedness + spread_sentences / relatedness);
            (key.clone(), weight)
        })
        .collect()
}

/// Distinct neighbour ratio of a co-occurrence map.
#[allow(clippy::cast_precision_loss, reason = "Neighbour counts are far below f64 precision limits.")]
fn dispersion(neighbours: &BTreeMap<String, usize>) -> f64 {
    let total: usize = neighbours.values().sum();
    if total == 0 { 0.0 } else { neighbours.len() as f64 / total as f64 }
}

/// Median of sentence indexes.
#[allow(clippy::cast_precision_loss, reason = "Sentence indexes are far below f64 precision limits.")]
fn median(values: &[usize]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    match sorted.len() {
        0 => 0.0,
        len if len % 2 == 1 => sorted[len / 2] as f64,
        len => (sorted[len / 2 - 1] + sorted[len / 2]) as f64 / 2.0,
    }
}

/// Scores a candidate from its content-word weights.
#[allow(clippy::cast_precision_loss, reason = "Candidate counts are far below f64 precision limits.")]
fn score_candidate(candidate: &Candidate, weights: &BTreeMap<String, f64>) -> Option<f64> {
    let mut product = 1.0;
    let mut sum = 0.0;
    let mut seen = false;
    for word in &candidate.words {
        if let Some(weight) = weights.get(word) {
            product *= weight;
            sum += weight;
            seen = true;
        }
    }
    seen.then(|| product / (candidate.tf as f64 * (1.0 + sum)))
}

// ============================================================================
// SECTION: Deduplication
// ============================================================================

/// Normalised edit-distance similarity in `[0, 1]`.
#[allow(clippy::cast_precision_loss, reason = "Keyword lengths are far below f64 precision limits.")]
fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let longest = a.len().max(b.len());
    if longest == 0 {
        return 1.0;
    }
    let mut previous: Vec<usize> = (0 ..= b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    1.0 - previous[b.len()] as f64 / longest as f64
}

// ============================================================================
// SECTION: Tests
// ============================================================================
