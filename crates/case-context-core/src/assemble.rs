//! Budget-bounded context assembly.
//!
//! Packs the most relevant documents into a single context string whose
//! length, counted in characters, never exceeds the caller's budget.
//!
//! # Algorithm
//!
//! 1. Sort by score (desc), then path (asc).
//! 2. Drop documents scoring at or below `min_score`.
//! 3. Keep at most `max_documents` candidates, when set.
//! 4. Render each candidate as `[<category>] <content>`, with content lines
//!    trimmed and blank-line runs collapsed.
//! 5. Append blocks, separated by [`ENTRY_DELIMITER`], while they fit.
//! 6. The first block that does not fit is cut to the remaining room and
//!    marked truncated; assembly stops there. A first block larger than the
//!    whole budget is therefore truncated alone rather than dropped.
//!    When the room is no larger than the `[<category>] ` header, the header
//!    is dropped and the room is filled with content instead.
//!
//! Selection is greedy by score, not a knapsack optimum.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use chrono::Utc;
//! use case_context_core::assemble::{assemble, AssemblyOptions};
//! use case_context_core::keywords::KeywordExtractor;
//! use case_context_core::models::{ReferenceDocument, ScoredDocument};
//!
//! let doc = ReferenceDocument::new(
//!     "guides/a.md", "guides", "解决方案详情".to_string(), "UTF-8", 18, Utc::now(),
//!     &KeywordExtractor::default(),
//! );
//! let scored = vec![ScoredDocument { document: Arc::new(doc), score: 0.5 }];
//! let ctx = assemble(scored, 5, &AssemblyOptions::default()).unwrap();
//! assert_eq!(ctx.text, "解决方案详");
//! assert!(ctx.entries[0].truncated);
//! ```

use std::cmp::Ordering;

use crate::error::RetrievalError;
use crate::models::{AssembledContext, ContextEntry, ScoredDocument};

/// Separator placed between rendered blocks.
pub const ENTRY_DELIMITER: &str = "\n\n";

#[derive(Debug, Clone, Copy)]
pub struct AssemblyOptions {
    /// Documents scoring at or below this value are never included.
    pub min_score: f64,
    /// Upper bound on the number of blocks, if any.
    pub max_documents: Option<usize>,
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        Self {
            min_score: 0.0,
            max_documents: None,
        }
    }
}

/// Order by score descending, then path ascending.
pub fn rank(mut scored: Vec<ScoredDocument>) -> Vec<ScoredDocument> {
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.document.path.cmp(&b.document.path))
    });
    scored
}

/// Trim every line and collapse runs of blank lines to a single one.
///
/// Leading and trailing blank lines are removed.
pub fn normalize_content(text: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            if matches!(lines.last(), Some(prev) if !prev.is_empty()) {
                lines.push("");
            }
        } else {
            lines.push(line);
        }
    }
    while lines.last() == Some(&"") {
        lines.pop();
    }
    lines.join("\n")
}

/// Render one context block.
pub fn format_entry(category: &str, text: &str) -> String {
    render_block(category, &normalize_content(text))
}

fn render_block(category: &str, content: &str) -> String {
    format!("[{}] {}", category, content)
}

/// Cut a block to `room` characters, keeping the header only if some
/// content fits after it.
fn truncate_block(category: &str, content: &str, room: usize) -> String {
    // "[" + category + "] "
    let header_len = category.chars().count() + 3;
    if room <= header_len && !content.is_empty() {
        content.chars().take(room).collect()
    } else {
        render_block(category, content).chars().take(room).collect()
    }
}

/// Assemble a context no longer than `budget` characters.
pub fn assemble(
    scored: Vec<ScoredDocument>,
    budget: usize,
    options: &AssemblyOptions,
) -> Result<AssembledContext, RetrievalError> {
    if budget == 0 {
        return Err(RetrievalError::InvalidBudget(budget));
    }

    let limit = options.max_documents.unwrap_or(usize::MAX);
    let candidates = rank(scored)
        .into_iter()
        .filter(|s| s.score > options.min_score)
        .take(limit);

    let delimiter_len = ENTRY_DELIMITER.chars().count();
    let mut context = AssembledContext::empty(budget);

    for candidate in candidates {
        let category = &candidate.document.category;
        let content = normalize_content(&candidate.document.text);
        let block = render_block(category, &content);
        let block_len = block.chars().count();
        let separator = if context.entries.is_empty() {
            0
        } else {
            delimiter_len
        };

        let (text, truncated) = if context.total_length + separator + block_len <= budget {
            (block, false)
        } else {
            let room = budget.saturating_sub(context.total_length + separator);
            if room == 0 {
                break;
            }
            (truncate_block(category, &content, room), true)
        };

        if separator > 0 {
            context.text.push_str(ENTRY_DELIMITER);
        }
        context.text.push_str(&text);
        context.total_length += separator + text.chars().count();
        context.entries.push(ContextEntry {
            path: candidate.document.path.clone(),
            category: candidate.document.category.clone(),
            score: candidate.score,
            text,
            truncated,
        });

        if truncated {
            break;
        }
    }

    Ok(context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keywords::KeywordExtractor;
    use crate::models::ReferenceDocument;
    use chrono::Utc;
    use std::sync::Arc;

    fn scored(path: &str, category: &str, text: &str, score: f64) -> ScoredDocument {
        ScoredDocument {
            document: Arc::new(ReferenceDocument::new(
                path,
                category,
                text.to_string(),
                "UTF-8",
                text.len() as u64,
                Utc::now(),
                &KeywordExtractor::default(),
            )),
            score,
        }
    }

    #[test]
    fn test_zero_budget_rejected() {
        let err = assemble(Vec::new(), 0, &AssemblyOptions::default()).unwrap_err();
        assert_eq!(err, RetrievalError::InvalidBudget(0));
    }

    #[test]
    fn test_empty_candidates_empty_context() {
        let ctx = assemble(Vec::new(), 100, &AssemblyOptions::default()).unwrap();
        assert!(ctx.is_empty());
        assert_eq!(ctx.total_length, 0);
        assert_eq!(ctx.text, "");
    }

    #[test]
    fn test_zero_scores_filtered() {
        let docs = vec![scored("a.txt", "x", "alpha", 0.0), scored("b.txt", "x", "beta", 0.0)];
        let ctx = assemble(docs, 1000, &AssemblyOptions::default()).unwrap();
        assert!(ctx.is_empty());
    }

    #[test]
    fn test_min_score_threshold_exclusive() {
        let docs = vec![scored("a.txt", "x", "alpha", 0.3), scored("b.txt", "x", "beta", 0.31)];
        let opts = AssemblyOptions {
            min_score: 0.3,
            max_documents: None,
        };
        let ctx = assemble(docs, 1000, &opts).unwrap();
        assert_eq!(ctx.entries.len(), 1);
        assert_eq!(ctx.entries[0].path, "b.txt");
    }

    #[test]
    fn test_order_by_score_then_path() {
        let docs = vec![
            scored("c.txt", "x", "c", 0.5),
            scored("a.txt", "x", "a", 0.5),
            scored("b.txt", "x", "b", 0.9),
        ];
        let ctx = assemble(docs, 1000, &AssemblyOptions::default()).unwrap();
        let paths: Vec<&str> = ctx.entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["b.txt", "a.txt", "c.txt"]);
        assert_eq!(ctx.text, "[x] b\n\n[x] a\n\n[x] c");
        assert_eq!(ctx.total_length, ctx.text.chars().count());
    }

    #[test]
    fn test_single_oversized_document_truncated_to_budget() {
        let docs = vec![scored("a.txt", "guides", "解决方案详情", 0.4)];
        let ctx = assemble(docs, 5, &AssemblyOptions::default()).unwrap();
        assert_eq!(ctx.entries.len(), 1);
        assert!(ctx.entries[0].truncated);
        assert_eq!(ctx.total_length, 5);
        assert_eq!(ctx.text.chars().count(), 5);
        assert_eq!(ctx.text, "解决方案详");
    }

    #[test]
    fn test_truncation_keeps_header_when_content_fits_after_it() {
        let docs = vec![scored("a.txt", "ops", "重启 服务 检查 日志", 0.4)];
        let ctx = assemble(docs, 8, &AssemblyOptions::default()).unwrap();
        assert_eq!(ctx.text, "[ops] 重启");
        assert!(ctx.entries[0].truncated);
    }

    #[test]
    fn test_truncation_falls_back_to_header_for_blank_content() {
        let docs = vec![scored("a.txt", "guides", "   ", 0.4)];
        let ctx = assemble(docs, 3, &AssemblyOptions::default()).unwrap();
        assert_eq!(ctx.text, "[gu");
        assert!(ctx.entries[0].truncated);
    }

    #[test]
    fn test_second_entry_truncated_to_remaining_room() {
        // "[x] aaaa" = 8 chars, delimiter = 2, leaves 4: only the header would fit
        let docs = vec![scored("a.txt", "x", "aaaa", 0.9), scored("b.txt", "x", "bbbbbbbb", 0.8)];
        let ctx = assemble(docs, 14, &AssemblyOptions::default()).unwrap();
        assert_eq!(ctx.entries.len(), 2);
        assert!(!ctx.entries[0].truncated);
        assert!(ctx.entries[1].truncated);
        assert_eq!(ctx.entries[1].text, "bbbb");
        assert_eq!(ctx.total_length, 14);
    }

    #[test]
    fn test_no_room_after_delimiter_stops_cleanly() {
        let docs = vec![scored("a.txt", "x", "aaaa", 0.9), scored("b.txt", "x", "bbbb", 0.8)];
        let ctx = assemble(docs, 9, &AssemblyOptions::default()).unwrap();
        assert_eq!(ctx.entries.len(), 1);
        assert!(!ctx.entries[0].truncated);
        assert_eq!(ctx.text, "[x] aaaa");
        assert_eq!(ctx.total_length, 8);
    }

    #[test]
    fn test_max_documents_cap() {
        let docs = vec![
            scored("a.txt", "x", "a", 0.9),
            scored("b.txt", "x", "b", 0.8),
            scored("c.txt", "x", "c", 0.7),
        ];
        let opts = AssemblyOptions {
            min_score: 0.0,
            max_documents: Some(2),
        };
        let ctx = assemble(docs, 1000, &opts).unwrap();
        assert_eq!(ctx.entries.len(), 2);
    }

    #[test]
    fn test_budget_invariant_across_budgets() {
        let docs = || {
            vec![
                scored("a/1.txt", "a", "数据库 性能 问题 排查\n\n\n详细步骤", 0.7),
                scored("b/2.md", "b", "connection pool exhausted under load", 0.5),
                scored("c/3.txt", "c", "回滚 部署", 0.2),
            ]
        };
        for budget in 1..120 {
            let ctx = assemble(docs(), budget, &AssemblyOptions::default()).unwrap();
            assert!(ctx.total_length <= budget, "budget {} exceeded", budget);
            assert_eq!(ctx.total_length, ctx.text.chars().count());
            assert!(!ctx.is_empty());
        }
    }

    #[test]
    fn test_normalize_content_collapses_blank_lines() {
        let raw = "\n\n  line one  \n\n\n\n line two\n   \n";
        assert_eq!(normalize_content(raw), "line one\n\nline two");
        assert_eq!(normalize_content("   "), "");
    }

    #[test]
    fn test_format_entry() {
        assert_eq!(format_entry("ops", "  restart\n\n\nservice "), "[ops] restart\n\nservice");
    }
}
