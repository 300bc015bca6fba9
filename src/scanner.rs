//! Corpus scanner: discovers reference files under a root folder and turns
//! them into [`ReferenceDocument`]s.
//!
//! A missing or non-directory root is an empty corpus, not an error. Files
//! that cannot be read or decoded are logged, recorded in the snapshot's
//! skipped list, and left out; the scan always runs to completion.

use anyhow::Result;
use chrono::{DateTime, Utc};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use case_context_core::decode::decode_bytes;
use case_context_core::keywords::KeywordExtractor;
use case_context_core::models::{CorpusSnapshot, ReferenceDocument, SkippedFile, UNCATEGORIZED};

use crate::config::CorpusConfig;

/// File extensions that belong to the corpus (compared case-insensitively).
pub const ALLOWED_EXTENSIONS: &[&str] = &["txt", "md", "markdown"];

const DEFAULT_EXCLUDES: &[&str] = &["**/.git/**", "**/node_modules/**", "**/target/**"];

#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    pub exclude_globs: Vec<String>,
    pub follow_symlinks: bool,
}

impl From<&CorpusConfig> for ScanOptions {
    fn from(config: &CorpusConfig) -> Self {
        Self {
            exclude_globs: config.exclude_globs.clone(),
            follow_symlinks: config.follow_symlinks,
        }
    }
}

/// An eligible file found on disk, before it is read.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    pub abs_path: PathBuf,
    /// Root-relative, `/`-separated.
    pub rel_path: String,
    pub category: String,
    pub len: u64,
    pub modified_at: DateTime<Utc>,
}

/// Whether `path` carries one of the [`ALLOWED_EXTENSIONS`].
pub fn is_eligible(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            ALLOWED_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
        .unwrap_or(false)
}

/// Category of a root-relative path: the immediate parent directory name.
pub fn category_for(relative: &Path) -> String {
    relative
        .parent()
        .and_then(|parent| parent.file_name())
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| UNCATEGORIZED.to_string())
}

fn relative_string(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Walk `root` and list eligible files, sorted by relative path.
///
/// Errors only for invalid exclude patterns.
pub fn discover_files(root: &Path, options: &ScanOptions) -> Result<Vec<DiscoveredFile>> {
    if !root.is_dir() {
        warn!(root = %root.display(), "corpus root does not exist or is not a directory");
        return Ok(Vec::new());
    }

    let mut excludes: Vec<String> = DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect();
    excludes.extend(options.exclude_globs.iter().cloned());
    let exclude_set = build_globset(&excludes)?;

    let mut files = Vec::new();

    let walker = WalkDir::new(root).follow_links(options.follow_symlinks);
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping unreadable directory entry");
                continue;
            }
        };
        if !entry.file_type().is_file() || !is_eligible(entry.path()) {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative_string(relative);

        if exclude_set.is_match(&rel_str) {
            debug!(path = %rel_str, "excluded by glob");
            continue;
        }

        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(e) => {
                warn!(path = %rel_str, error = %e, "skipping file with unreadable metadata");
                continue;
            }
        };
        let modified = metadata
            .modified()
            .unwrap_or(std::time::SystemTime::UNIX_EPOCH);

        files.push(DiscoveredFile {
            abs_path: path.to_path_buf(),
            category: category_for(relative),
            rel_path: rel_str,
            len: metadata.len(),
            modified_at: DateTime::<Utc>::from(modified),
        });
    }

    // Sort for deterministic ordering
    files.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));

    Ok(files)
}

/// Scan `root` into a new snapshot.
///
/// Documents of `previous` whose path, on-disk size and modification time
/// are unchanged are reused as-is instead of being read and tokenized again.
pub fn load_snapshot(
    root: &Path,
    options: &ScanOptions,
    extractor: &KeywordExtractor,
    previous: Option<&CorpusSnapshot>,
    now: DateTime<Utc>,
) -> Result<CorpusSnapshot> {
    let files = discover_files(root, options)?;
    Ok(build_snapshot(root, files, extractor, previous, now))
}

/// Read already-discovered files into a snapshot. Files that vanish or
/// fail to read between discovery and reading land in the skipped list.
fn build_snapshot(
    root: &Path,
    files: Vec<DiscoveredFile>,
    extractor: &KeywordExtractor,
    previous: Option<&CorpusSnapshot>,
    now: DateTime<Utc>,
) -> CorpusSnapshot {
    let mut snapshot = CorpusSnapshot::empty(root, now);
    let mut reused = 0usize;

    for file in files {
        if let Some(doc) = previous.and_then(|p| p.get(&file.rel_path)) {
            if doc.source_len == file.len && doc.modified_at == file.modified_at {
                snapshot.documents.push(Arc::clone(doc));
                reused += 1;
                continue;
            }
        }

        match read_document(&file, extractor) {
            Ok(doc) => snapshot.documents.push(Arc::new(doc)),
            Err(reason) => {
                warn!(path = %file.abs_path.display(), %reason, "skipping reference file");
                snapshot.skipped.push(SkippedFile {
                    path: file.rel_path,
                    reason,
                });
            }
        }
    }

    info!(
        root = %root.display(),
        documents = snapshot.documents.len(),
        reused,
        skipped = snapshot.skipped.len(),
        "corpus scanned"
    );

    snapshot
}

fn read_document(
    file: &DiscoveredFile,
    extractor: &KeywordExtractor,
) -> std::result::Result<ReferenceDocument, String> {
    let bytes = std::fs::read(&file.abs_path).map_err(|e| format!("read failed: {}", e))?;
    let decoded = decode_bytes(&bytes).map_err(|e| e.to_string())?;

    Ok(ReferenceDocument::new(
        file.rel_path.clone(),
        file.category.clone(),
        decoded.text,
        decoded.encoding,
        file.len,
        file.modified_at,
        extractor,
    ))
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
