//! Best-match lookup of clipboard text against the corpus
//!
//! Scoring runs in three tiers, from strongest to weakest:
//!
//! 1. **Exact** - normalized query equals the normalized question (1.0)
//! 2. **Substring** - one normalized string contains the other (1.0)
//! 3. **Fuzzy** - the better of a token Dice coefficient and a character
//!    Levenshtein ratio, capped below 1.0
//!
//! The highest score wins, then the stronger tier, then the earlier corpus
//! entry. Lookups are a linear scan; callers depend only on [`QuestionIndex`]
//! so a different index structure can replace [`Matcher`] later.

use std::collections::HashSet;

use crate::corpus::{Corpus, QAEntry};
use crate::normalize::normalize;

/// Default minimum score for a result to count as a match
pub const DEFAULT_THRESHOLD: f32 = 0.6;

/// Fuzzy scores never reach the ceiling reserved for exact and substring hits
const FUZZY_CEILING: f32 = 0.99;

/// Longest query (in chars) considered by the fuzzy tier
const MAX_FUZZY_QUERY_CHARS: usize = 1000;

/// How a match was found, ordered weakest to strongest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchKind {
    Fuzzy,
    Substring,
    Exact,
}

/// Outcome of a successful lookup
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    /// The query as given (not normalized)
    pub query: String,
    pub entry: QAEntry,
    /// Similarity in `0.0..=1.0`
    pub score: f32,
    pub kind: MatchKind,
    /// Position of the entry in the corpus
    pub index: usize,
}

/// Anything that can answer "best match for this text"
pub trait QuestionIndex {
    fn best_match(&self, query: &str) -> Option<MatchResult>;
}

/// Corpus entry with its comparison forms precomputed
#[derive(Debug, Clone)]
struct IndexedEntry {
    entry: QAEntry,
    normalized: String,
    chars: Vec<char>,
    word_set: HashSet<String>,
}

impl IndexedEntry {
    fn new(entry: QAEntry) -> Self {
        let normalized = normalize(&entry.question);
        Self {
            chars: normalized.chars().collect(),
            word_set: words(&normalized),
            normalized,
            entry,
        }
    }
}

/// Flat linear-scan index over a corpus
#[derive(Debug, Clone)]
pub struct Matcher {
    entries: Vec<IndexedEntry>,
    threshold: f32,
}

impl Matcher {
    pub fn new(corpus: Corpus) -> Self {
        Self::with_threshold(corpus, DEFAULT_THRESHOLD)
    }

    pub fn with_threshold(corpus: Corpus, threshold: f32) -> Self {
        let entries = corpus
            .entries()
            .iter()
            .cloned()
            .map(IndexedEntry::new)
            .filter(|e| !e.normalized.is_empty())
            .collect();
        Self {
            entries,
            threshold: threshold.clamp(0.0, 1.0),
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Score one entry against an already-prepared query
    fn score(query: &PreparedQuery, entry: &IndexedEntry) -> (f32, MatchKind) {
        if query.normalized == entry.normalized {
            return (1.0, MatchKind::Exact);
        }

        if query.normalized.contains(&entry.normalized)
            || entry.normalized.contains(&query.normalized)
        {
            return (1.0, MatchKind::Substring);
        }

        let dice = dice_coefficient(&query.word_set, &entry.word_set);
        let ratio = levenshtein_ratio(&query.fuzzy_chars, &entry.chars);
        (dice.max(ratio).min(FUZZY_CEILING), MatchKind::Fuzzy)
    }
}

impl QuestionIndex for Matcher {
    fn best_match(&self, query: &str) -> Option<MatchResult> {
        let prepared = PreparedQuery::new(query)?;

        let mut best: Option<(usize, f32, MatchKind)> = None;
        for (index, entry) in self.entries.iter().enumerate() {
            let (score, kind) = Self::score(&prepared, entry);
            let better = match best {
                None => true,
                Some((_, best_score, best_kind)) => {
                    score > best_score || (score == best_score && kind > best_kind)
                }
            };
            if better {
                best = Some((index, score, kind));
            }
            // Nothing later can beat an exact hit, and earlier entries win ties
            if kind == MatchKind::Exact {
                break;
            }
        }

        let (index, score, kind) = best?;
        if score < self.threshold {
            return None;
        }

        Some(MatchResult {
            query: query.to_string(),
            entry: self.entries[index].entry.clone(),
            score,
            kind,
            index,
        })
    }
}

/// Query in every form the tiers need
struct PreparedQuery {
    normalized: String,
    fuzzy_chars: Vec<char>,
    word_set: HashSet<String>,
}

impl PreparedQuery {
    fn new(query: &str) -> Option<Self> {
        let normalized = normalize(query);
        if normalized.is_empty() {
            return None;
        }
        Some(Self {
            fuzzy_chars: normalized.chars().take(MAX_FUZZY_QUERY_CHARS).collect(),
            word_set: words(&normalized),
            normalized,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Similarity primitives
// ─────────────────────────────────────────────────────────────────────────────

/// Distinct alphanumeric words of already-normalized text
fn words(normalized: &str) -> HashSet<String> {
    normalized
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Sørensen-Dice coefficient over word sets
fn dice_coefficient(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let shared = a.intersection(b).count();
    (2 * shared) as f32 / (a.len() + b.len()) as f32
}

/// `1 - distance / longer_len`, over chars
fn levenshtein_ratio(a: &[char], b: &[char]) -> f32 {
    let longest = a.len().max(b.len());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein(a, b) as f32 / longest as f32
}

fn levenshtein(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}
