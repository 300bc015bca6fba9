//! Corpus statistics.
//!
//! A quick summary of what a root folder contributes: document counts per
//! category, which encodings were needed to read them, and which files were
//! skipped. Used by `casectx stats` to check a reference folder before
//! pointing the prompt composer at it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use case_context_core::models::CorpusSnapshot;

/// Per-category breakdown.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryStats {
    pub documents: usize,
    pub bytes: u64,
    pub keywords: usize,
    pub last_modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CorpusStats {
    pub documents: usize,
    pub skipped: usize,
    pub blank: usize,
    pub bytes: u64,
    pub distinct_keywords: usize,
    pub categories: BTreeMap<String, CategoryStats>,
    pub encodings: BTreeMap<String, usize>,
}

impl CorpusStats {
    pub fn from_snapshot(snapshot: &CorpusSnapshot) -> Self {
        let mut stats = CorpusStats {
            documents: snapshot.documents.len(),
            skipped: snapshot.skipped.len(),
            ..Default::default()
        };
        let mut vocabulary = std::collections::BTreeSet::new();

        for doc in &snapshot.documents {
            stats.bytes += doc.size as u64;
            if doc.is_blank() {
                stats.blank += 1;
            }
            *stats.encodings.entry(doc.encoding.to_string()).or_default() += 1;
            vocabulary.extend(doc.keywords.iter().map(|(token, _)| token));

            let category = stats.categories.entry(doc.category.clone()).or_default();
            category.documents += 1;
            category.bytes += doc.size as u64;
            category.keywords += doc.keywords.len();
            category.last_modified = category.last_modified.max(Some(doc.modified_at));
        }

        stats.distinct_keywords = vocabulary.len();
        stats
    }
}

/// Print a stats report for `snapshot` to stdout.
pub fn print_stats(snapshot: &CorpusSnapshot) {
    let stats = CorpusStats::from_snapshot(snapshot);

    println!("Case Context — Corpus Stats");
    println!("===========================");
    println!();
    println!("  Root:        {}", snapshot.root.display());
    println!("  Scanned:     {}", snapshot.scanned_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!();
    println!("  Documents:   {}", stats.documents);
    println!("  Blank:       {}", stats.blank);
    println!("  Skipped:     {}", stats.skipped);
    println!("  Text size:   {}", format_bytes(stats.bytes));
    println!("  Vocabulary:  {} keywords", stats.distinct_keywords);

    if !stats.categories.is_empty() {
        println!();
        println!("  By category:");
        println!(
            "  {:<24} {:>6} {:>10} {:>9}   {}",
            "CATEGORY", "DOCS", "SIZE", "KEYWORDS", "LAST MODIFIED"
        );
        println!("  {}", "-".repeat(76));

        for (name, c) in &stats.categories {
            let modified = match c.last_modified {
                Some(ts) => format_ts_relative(ts),
                None => "unknown".to_string(),
            };
            println!(
                "  {:<24} {:>6} {:>10} {:>9}   {}",
                name,
                c.documents,
                format_bytes(c.bytes),
                c.keywords,
                modified
            );
        }
    }

    if !stats.encodings.is_empty() {
        println!();
        println!("  By encoding:");
        for (encoding, count) in &stats.encodings {
            println!("  {:<24} {:>6}", encoding, count);
        }
    }

    if !snapshot.skipped.is_empty() {
        println!();
        println!("  Skipped files:");
        for skipped in &snapshot.skipped {
            println!("  {}  ({})", skipped.path, skipped.reason);
        }
    }

    println!();
}

/// Print every document of `snapshot`, then the skipped files.
pub fn print_scan(snapshot: &CorpusSnapshot) {
    if snapshot.documents.is_empty() {
        println!("No documents found under {}.", snapshot.root.display());
    } else {
        println!(
            "{:<48} {:<20} {:<14} {:>10} {:>9}",
            "PATH", "CATEGORY", "ENCODING", "SIZE", "KEYWORDS"
        );
        for doc in &snapshot.documents {
            println!(
                "{:<48} {:<20} {:<14} {:>10} {:>9}",
                doc.path,
                doc.category,
                doc.encoding,
                format_bytes(doc.size as u64),
                doc.keywords.len()
            );
        }
    }

    if !snapshot.skipped.is_empty() {
        println!();
        println!("Skipped {} file(s):", snapshot.skipped.len());
        for skipped in &snapshot.skipped {
            println!("  {}  ({})", skipped.path, skipped.reason);
        }
    }
}

/// Format a byte count as a human-readable string.
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Format a timestamp relative to now (e.g. "3 hours ago").
fn format_ts_relative(ts: DateTime<Utc>) -> String {
    let delta = (Utc::now() - ts).num_seconds();

    if delta < 0 {
        return ts.format("%Y-%m-%d %H:%M").to_string();
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        ts.format("%Y-%m-%d %H:%M").to_string()
    }
}
