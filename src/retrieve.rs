//! The query path: validate, snapshot, extract, score, assemble.
//!
//! A missing corpus or a corpus with nothing relevant is never an error;
//! it produces an empty context. Only a zero budget and a blank query are
//! rejected, and both are checked before any filesystem work.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, warn};

use case_context_core::assemble::{assemble, rank, AssemblyOptions};
use case_context_core::error::RetrievalError;
use case_context_core::keywords::KeywordExtractor;
use case_context_core::models::{AssembledContext, CorpusSnapshot, Query, ScoredDocument};
use case_context_core::score::{score_snapshot, ScoringOptions};

use crate::cache::{ContextCache, CorpusLoader, FsLoader};
use crate::config::Config;
use crate::scanner::ScanOptions;

pub struct Retriever<L: CorpusLoader = FsLoader> {
    cache: ContextCache<L>,
    extractor: Arc<KeywordExtractor>,
    scoring: ScoringOptions,
    assembly: AssemblyOptions,
}

impl Retriever<FsLoader> {
    /// Build a filesystem-backed retriever from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let extractor = Arc::new(config.keywords.build_extractor()?);
        let loader = FsLoader::new(ScanOptions::from(&config.corpus), Arc::clone(&extractor));
        let cache = ContextCache::new(loader, config.cache.ttl());
        Ok(Self::new(
            cache,
            extractor,
            config.retrieval.scoring_options(),
            config.retrieval.assembly_options(),
        ))
    }
}

impl<L: CorpusLoader> Retriever<L> {
    pub fn new(
        cache: ContextCache<L>,
        extractor: Arc<KeywordExtractor>,
        scoring: ScoringOptions,
        assembly: AssemblyOptions,
    ) -> Self {
        Self {
            cache,
            extractor,
            scoring,
            assembly,
        }
    }

    pub fn cache(&self) -> &ContextCache<L> {
        &self.cache
    }

    /// Parse a query with this retriever's keyword extractor.
    pub fn query(&self, text: &str) -> Result<Query, RetrievalError> {
        Query::new(text, &self.extractor)
    }

    /// Current snapshot for `root`.
    ///
    /// A root that fails its first load is logged and treated as an empty
    /// corpus; later failures are absorbed by the cache.
    pub fn snapshot(&self, root: &Path) -> Arc<CorpusSnapshot> {
        match self.cache.get_snapshot(root) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(root = %root.display(), error = %e, "corpus load failed, using empty corpus");
                Arc::new(CorpusSnapshot::empty(root, chrono::Utc::now()))
            }
        }
    }

    /// Assemble the context for `query` from the corpus under `root`.
    pub fn retrieve(
        &self,
        root: &Path,
        query: &str,
        budget: usize,
    ) -> Result<AssembledContext, RetrievalError> {
        if budget == 0 {
            return Err(RetrievalError::InvalidBudget(budget));
        }
        let query = self.query(query)?;
        let snapshot = self.snapshot(root);

        let scored = score_snapshot(&query, &snapshot, &self.scoring);
        let context = assemble(scored, budget, &self.assembly)?;

        debug!(
            root = %root.display(),
            entries = context.entries.len(),
            length = context.total_length,
            budget,
            "context assembled"
        );
        Ok(context)
    }

    /// Relevant documents for `query`, best first, at most `limit`.
    pub fn search(
        &self,
        root: &Path,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ScoredDocument>, RetrievalError> {
        let query = self.query(query)?;
        let snapshot = self.snapshot(root);

        let min_score = self.assembly.min_score;
        Ok(rank(score_snapshot(&query, &snapshot, &self.scoring))
            .into_iter()
            .filter(|s| s.score > min_score)
            .take(limit)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn retriever() -> Retriever {
        let mut config = Config::minimal();
        config.cache.ttl_secs = 60;
        Retriever::from_config(&config).unwrap()
    }

    #[test]
    fn test_validation_before_scanning() {
        let r = retriever();
        let root = Path::new("/definitely/not/here");
        assert_eq!(
            r.retrieve(root, "query", 0).unwrap_err(),
            RetrievalError::InvalidBudget(0)
        );
        assert_eq!(
            r.retrieve(root, "   ", 100).unwrap_err(),
            RetrievalError::EmptyQuery
        );
        assert!(r.cache().roots().is_empty());
    }

    #[test]
    fn test_missing_root_gives_empty_context() {
        let r = retriever();
        let ctx = r.retrieve(Path::new("/definitely/not/here"), "数据库", 100).unwrap();
        assert!(ctx.is_empty());
        assert_eq!(ctx.text, "");
    }

    #[test]
    fn test_search_limits_and_ranks() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("db")).unwrap();
        fs::write(root.join("db/one.txt"), "数据库 超时 排查").unwrap();
        fs::write(root.join("db/two.txt"), "数据库 迁移").unwrap();
        fs::write(root.join("db/three.txt"), "市场 营销").unwrap();

        let r = retriever();
        let all = r.search(root, "数据库超时", 10).unwrap();
        // three.txt shares nothing with the query and is left out
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].document.path, "db/one.txt");
        assert_eq!(all[1].document.path, "db/two.txt");
        assert!(all.windows(2).all(|w| w[0].score >= w[1].score));

        let one = r.search(root, "数据库超时", 1).unwrap();
        assert_eq!(one.len(), 1);
    }
}
