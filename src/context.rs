//! `casectx context`: print the assembled context for a query.
//!
//! Plain mode writes only the context string to stdout so it can be piped
//! straight into a prompt; the summary goes to the log on stderr.

use anyhow::Result;
use std::path::Path;
use tracing::info;

use crate::retrieve::Retriever;

pub fn run_context(
    retriever: &Retriever,
    root: &Path,
    query: &str,
    budget: usize,
    json: bool,
) -> Result<()> {
    let context = retriever.retrieve(root, query, budget)?;

    info!(
        entries = context.entries.len(),
        truncated = context.entries.iter().any(|e| e.truncated),
        length = context.total_length,
        budget,
        "context ready"
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&context)?);
    } else if !context.text.is_empty() {
        println!("{}", context.text);
    }

    Ok(())
}
