//! `casectx search`: ranked listing of relevant reference documents.

use anyhow::Result;
use std::path::Path;

use case_context_core::keywords::KeywordSet;
use case_context_core::models::{Query, ScoredDocument};
use case_context_core::score::{category_matches, keyword_overlap};

use crate::retrieve::Retriever;
use crate::server::snippet;

/// Run the search command and print results to stdout.
pub fn run_search(
    retriever: &Retriever,
    root: &Path,
    query: &str,
    limit: usize,
    explain: bool,
) -> Result<()> {
    if query.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }

    let parsed = retriever.query(query)?;
    let results = retriever.search(root, query, limit)?;

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, result) in results.iter().enumerate() {
        let doc = &result.document;
        println!(
            "{}. [{:.3}] {} / {}",
            i + 1,
            result.score,
            doc.category,
            doc.path
        );
        println!("    modified: {}", doc.modified_at.format("%Y-%m-%d"));
        println!("    encoding: {}", doc.encoding);
        println!("    excerpt: \"{}\"", snippet(&doc.text, 120));
        if explain {
            print_explanation(&parsed, result);
        }
        println!();
    }

    Ok(())
}

fn print_explanation(query: &Query, result: &ScoredDocument) {
    let doc = &result.document;
    let shared = shared_keywords(&query.keywords, &doc.keywords);
    println!(
        "    overlap: {:.3} ({} shared of {} query / {} document keywords)",
        keyword_overlap(&query.keywords, &doc.keywords),
        shared.len(),
        query.keywords.len(),
        doc.keywords.len()
    );
    if !shared.is_empty() {
        println!("    shared: {}", shared.join(" "));
    }
    println!(
        "    category match: {}",
        if category_matches(&doc.category, query) {
            "yes"
        } else {
            "no"
        }
    );
}

/// Tokens present in both sets, in token order.
pub fn shared_keywords<'a>(query: &'a KeywordSet, doc: &KeywordSet) -> Vec<&'a str> {
    query
        .iter()
        .filter(|(token, _)| doc.contains(token))
        .map(|(token, _)| token)
        .collect()
}
