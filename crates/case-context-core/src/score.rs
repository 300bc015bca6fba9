//! Relevance scoring.
//!
//! The base score is a weighted Jaccard overlap between the query's and the
//! document's keyword sets:
//!
//! ```text
//!            Σ min(wq[t], wd[t])   over tokens in both sets
//! score = ---------------------------------------------------
//!            Σ max(wq[t], wd[t])   over tokens in either set
//! ```
//!
//! An empty union scores `0.0`. Documents whose category label appears in
//! the query receive a fixed bonus, so topically-labelled folders can win
//! even with weak textual overlap. The result is clamped to `[0.0, 1.0]`.
//!
//! All sums are integer, so identical inputs give bit-identical scores.

use std::sync::Arc;

use crate::keywords::KeywordSet;
use crate::models::{CorpusSnapshot, Query, ReferenceDocument, ScoredDocument, UNCATEGORIZED};

/// Default bonus for a category match.
pub const DEFAULT_CATEGORY_BONUS: f64 = 0.1;

#[derive(Debug, Clone, Copy)]
pub struct ScoringOptions {
    /// Added to the base score when the category matches the query.
    pub category_bonus: f64,
}

impl Default for ScoringOptions {
    fn default() -> Self {
        Self {
            category_bonus: DEFAULT_CATEGORY_BONUS,
        }
    }
}

/// Weighted Jaccard overlap of two keyword sets, in `[0.0, 1.0]`.
pub fn keyword_overlap(query: &KeywordSet, doc: &KeywordSet) -> f64 {
    let mut shared: u64 = 0;
    let mut union: u64 = 0;

    for (token, wq) in query.iter() {
        let wd = doc.weight(token);
        shared += u64::from(wq.min(wd));
        union += u64::from(wq.max(wd));
    }
    for (token, wd) in doc.iter() {
        if !query.contains(token) {
            union += u64::from(wd);
        }
    }

    if union == 0 {
        0.0
    } else {
        shared as f64 / union as f64
    }
}

/// Whether `category` appears in the query text (case-insensitive).
///
/// The [`UNCATEGORIZED`] sentinel never matches.
pub fn category_matches(category: &str, query: &Query) -> bool {
    let category = category.trim().to_lowercase();
    if category.is_empty() || category == UNCATEGORIZED {
        return false;
    }
    query.keywords.contains(&category) || query.text.to_lowercase().contains(&category)
}

/// Score one document against a query.
pub fn score_document(query: &Query, doc: &ReferenceDocument, options: &ScoringOptions) -> f64 {
    let mut score = keyword_overlap(&query.keywords, &doc.keywords);
    if category_matches(&doc.category, query) {
        score += options.category_bonus;
    }
    score.clamp(0.0, 1.0)
}

/// Score every document of a snapshot, preserving snapshot order.
pub fn score_snapshot(
    query: &Query,
    snapshot: &CorpusSnapshot,
    options: &ScoringOptions,
) -> Vec<ScoredDocument> {
    snapshot
        .documents
        .iter()
        .map(|doc| ScoredDocument {
            document: Arc::clone(doc),
            score: score_document(query, doc, options),
        })
        .collect()
}
