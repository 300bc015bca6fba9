//! Error types shared by the core pipeline.

use thiserror::Error;

/// Raised when no decoder in the chain accepts a file's bytes.
///
/// Callers treat this as a per-file condition: the file is skipped and the
/// scan continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("content could not be decoded (tried {})", .tried.join(", "))]
    Undecodable { tried: Vec<&'static str> },
}

/// Rejected inputs to the retrieval engine itself.
///
/// Corpus problems (missing root, unreadable files, nothing relevant) never
/// produce one of these; they degrade to an empty or partial context.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RetrievalError {
    #[error("invalid budget: context budget must be >= 1, got {0}")]
    InvalidBudget(usize),

    #[error("invalid query: query must not be empty")]
    EmptyQuery,
}
