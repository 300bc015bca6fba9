use anyhow::{Context, Result};
use globset::Glob;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use case_context_core::assemble::AssemblyOptions;
use case_context_core::keywords::{KeywordExtractor, StopWords, DEFAULT_WEIGHT_CAP};
use case_context_core::score::{ScoringOptions, DEFAULT_CATEGORY_BONUS};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub keywords: KeywordsConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorpusConfig {
    /// Root folder used when a request does not name one.
    #[serde(default = "default_root")]
    pub root: PathBuf,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            exclude_globs: Vec::new(),
            follow_symlinks: false,
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from("./history_references")
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Default context budget in characters.
    #[serde(default = "default_budget")]
    pub budget: usize,
    #[serde(default)]
    pub min_score: f64,
    #[serde(default = "default_category_bonus")]
    pub category_bonus: f64,
    #[serde(default)]
    pub max_documents: Option<usize>,
    /// Default result count for `search`.
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            budget: default_budget(),
            min_score: 0.0,
            category_bonus: default_category_bonus(),
            max_documents: None,
            search_limit: default_search_limit(),
        }
    }
}

fn default_budget() -> usize {
    15_000
}
fn default_category_bonus() -> f64 {
    DEFAULT_CATEGORY_BONUS
}
fn default_search_limit() -> usize {
    10
}

impl RetrievalConfig {
    pub fn scoring_options(&self) -> ScoringOptions {
        ScoringOptions {
            category_bonus: self.category_bonus,
        }
    }

    pub fn assembly_options(&self) -> AssemblyOptions {
        AssemblyOptions {
            min_score: self.min_score,
            max_documents: self.max_documents,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct KeywordsConfig {
    #[serde(default = "default_weight_cap")]
    pub weight_cap: u32,
    /// Extra stop words, one per line, added to the built-in table.
    #[serde(default)]
    pub stopwords_file: Option<PathBuf>,
}

impl Default for KeywordsConfig {
    fn default() -> Self {
        Self {
            weight_cap: default_weight_cap(),
            stopwords_file: None,
        }
    }
}

fn default_weight_cap() -> u32 {
    DEFAULT_WEIGHT_CAP
}

impl KeywordsConfig {
    pub fn build_extractor(&self) -> Result<KeywordExtractor> {
        let mut stopwords = StopWords::builtin();
        if let Some(path) = &self.stopwords_file {
            let table = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read stop-word file: {}", path.display()))?;
            stopwords.extend_from_table(&table);
        }
        Ok(KeywordExtractor::new(stopwords, self.weight_cap))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
        }
    }
}

fn default_ttl_secs() -> u64 {
    300
}

impl CacheConfig {
    pub fn ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

impl Config {
    /// All defaults; used when no config file is present.
    pub fn minimal() -> Self {
        Self {
            corpus: CorpusConfig::default(),
            retrieval: RetrievalConfig::default(),
            keywords: KeywordsConfig::default(),
            cache: CacheConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;

    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    if config.retrieval.budget == 0 {
        anyhow::bail!("retrieval.budget must be > 0");
    }

    if !(0.0..1.0).contains(&config.retrieval.min_score) {
        anyhow::bail!("retrieval.min_score must be in [0.0, 1.0)");
    }

    if !(0.0..=1.0).contains(&config.retrieval.category_bonus) {
        anyhow::bail!("retrieval.category_bonus must be in [0.0, 1.0]");
    }

    if config.retrieval.max_documents == Some(0) {
        anyhow::bail!("retrieval.max_documents must be >= 1 when set");
    }

    if config.retrieval.search_limit == 0 {
        anyhow::bail!("retrieval.search_limit must be >= 1");
    }

    if config.keywords.weight_cap == 0 {
        anyhow::bail!("keywords.weight_cap must be > 0");
    }

    if config.cache.ttl_secs == 0 {
        anyhow::bail!("cache.ttl_secs must be > 0");
    }

    for pattern in &config.corpus.exclude_globs {
        Glob::new(pattern)
            .with_context(|| format!("Invalid corpus.exclude_globs pattern: {}", pattern))?;
    }

    Ok(())
}
