//! Core data models for the retrieval pipeline.
//!
//! Documents are immutable once built and shared behind [`Arc`], so a
//! [`CorpusSnapshot`] can be handed to many concurrent queries while a new
//! snapshot is being built elsewhere.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::RetrievalError;
use crate::keywords::{KeywordExtractor, KeywordSet};

/// Category assigned to files that sit directly in the corpus root.
pub const UNCATEGORIZED: &str = "uncategorized";

/// One decoded reference file.
#[derive(Debug, Clone, Serialize)]
pub struct ReferenceDocument {
    /// Root-relative path with `/` separators. Unique within a snapshot.
    pub path: String,
    /// Name of the immediate parent directory, or [`UNCATEGORIZED`].
    pub category: String,
    /// Decoded content.
    pub text: String,
    /// Encoding that decoded the file.
    pub encoding: &'static str,
    #[serde(skip)]
    pub keywords: KeywordSet,
    /// Byte length of `text`.
    pub size: usize,
    /// Byte length of the file on disk.
    pub source_len: u64,
    pub modified_at: DateTime<Utc>,
}

impl ReferenceDocument {
    /// Build a document, extracting its keywords once.
    pub fn new(
        path: impl Into<String>,
        category: impl Into<String>,
        text: String,
        encoding: &'static str,
        source_len: u64,
        modified_at: DateTime<Utc>,
        extractor: &KeywordExtractor,
    ) -> Self {
        let keywords = extractor.extract(&text);
        Self {
            path: path.into(),
            category: category.into(),
            size: text.len(),
            text,
            encoding,
            keywords,
            source_len,
            modified_at,
        }
    }

    /// True when the decoded text is empty after trimming whitespace.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// A file that was discovered but left out of the corpus.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedFile {
    pub path: String,
    pub reason: String,
}

/// All documents of one root at one point in time.
#[derive(Debug, Clone)]
pub struct CorpusSnapshot {
    pub root: PathBuf,
    pub scanned_at: DateTime<Utc>,
    /// Sorted by `path`.
    pub documents: Vec<Arc<ReferenceDocument>>,
    pub skipped: Vec<SkippedFile>,
}

impl CorpusSnapshot {
    pub fn empty(root: impl Into<PathBuf>, scanned_at: DateTime<Utc>) -> Self {
        Self {
            root: root.into(),
            scanned_at,
            documents: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Look up a document by its root-relative path.
    pub fn get(&self, path: &str) -> Option<&Arc<ReferenceDocument>> {
        self.documents
            .binary_search_by(|d| d.path.as_str().cmp(path))
            .ok()
            .map(|i| &self.documents[i])
    }

    /// Time elapsed since the scan. Negative when the clock moved backwards.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.scanned_at
    }
}

/// A validated query and its keywords.
#[derive(Debug, Clone)]
pub struct Query {
    pub text: String,
    pub keywords: KeywordSet,
}

impl Query {
    /// Fails with [`RetrievalError::EmptyQuery`] when `text` has no
    /// non-whitespace character.
    pub fn new(text: &str, extractor: &KeywordExtractor) -> Result<Self, RetrievalError> {
        if text.trim().is_empty() {
            return Err(RetrievalError::EmptyQuery);
        }
        Ok(Self {
            text: text.to_string(),
            keywords: extractor.extract(text),
        })
    }
}

/// A document paired with its relevance to one query.
#[derive(Debug, Clone)]
pub struct ScoredDocument {
    pub document: Arc<ReferenceDocument>,
    /// In `[0.0, 1.0]`.
    pub score: f64,
}

/// One block of an [`AssembledContext`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextEntry {
    pub path: String,
    pub category: String,
    pub score: f64,
    /// The rendered block as it appears in the context (possibly truncated).
    pub text: String,
    pub truncated: bool,
}

/// The packed context handed to the prompt composer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssembledContext {
    pub entries: Vec<ContextEntry>,
    /// Entries joined by the block delimiter.
    pub text: String,
    /// Length of `text` in characters. Never exceeds `budget`.
    pub total_length: usize,
    pub budget: usize,
}

impl AssembledContext {
    pub fn empty(budget: usize) -> Self {
        Self {
            entries: Vec::new(),
            text: String::new(),
            total_length: 0,
            budget,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
