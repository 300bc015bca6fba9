//! Per-root snapshot cache with TTL expiry.
//!
//! Each root folder owns one slot holding its latest [`CorpusSnapshot`].
//! A snapshot whose age reaches the TTL is rebuilt on the next request.
//!
//! Rescans are single-flight per root: the slot's mutex is held while the
//! loader runs, so concurrent callers for the same root wait and then
//! receive the freshly built snapshot. Different roots have independent
//! slots and only share the brief map lookup.
//!
//! When a rescan fails, the expired snapshot keeps being served until a
//! later rescan succeeds.
//!
//! Time is read through [`Clock`] so expiry can be driven by tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use case_context_core::keywords::KeywordExtractor;
use case_context_core::models::CorpusSnapshot;

use crate::scanner::{load_snapshot, ScanOptions};

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += chrono::Duration::from_std(by).unwrap_or_else(|_| chrono::Duration::zero());
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Builds a snapshot for a root.
///
/// `previous` is the snapshot being replaced, if any, so loaders can reuse
/// unchanged documents.
pub trait CorpusLoader: Send + Sync {
    fn load(
        &self,
        root: &Path,
        previous: Option<&CorpusSnapshot>,
        now: DateTime<Utc>,
    ) -> Result<CorpusSnapshot>;
}

/// Loads snapshots from the filesystem via the scanner.
#[derive(Debug, Clone)]
pub struct FsLoader {
    options: ScanOptions,
    extractor: Arc<KeywordExtractor>,
}

impl FsLoader {
    pub fn new(options: ScanOptions, extractor: Arc<KeywordExtractor>) -> Self {
        Self { options, extractor }
    }

    pub fn extractor(&self) -> &Arc<KeywordExtractor> {
        &self.extractor
    }
}

impl CorpusLoader for FsLoader {
    fn load(
        &self,
        root: &Path,
        previous: Option<&CorpusSnapshot>,
        now: DateTime<Utc>,
    ) -> Result<CorpusSnapshot> {
        load_snapshot(root, &self.options, &self.extractor, previous, now)
    }
}

type Slot = Arc<Mutex<Option<Arc<CorpusSnapshot>>>>;

pub struct ContextCache<L: CorpusLoader> {
    loader: L,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    slots: RwLock<HashMap<PathBuf, Slot>>,
}

impl<L: CorpusLoader> ContextCache<L> {
    pub fn new(loader: L, ttl: Duration) -> Self {
        Self::with_clock(loader, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(loader: L, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            loader,
            ttl,
            clock,
            slots: RwLock::new(HashMap::new()),
        }
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Current snapshot for `root`, rescanning when missing or expired.
    ///
    /// A failed rescan returns the previous snapshot, stale or not, when
    /// there is one. Only a root that never loaded reports the error.
    pub fn get_snapshot(&self, root: &Path) -> Result<Arc<CorpusSnapshot>> {
        let slot = self.slot(root);
        let mut current = slot.lock().unwrap_or_else(PoisonError::into_inner);
        let now = self.clock.now();

        if let Some(snapshot) = current.as_ref() {
            if self.is_fresh(snapshot, now) {
                debug!(root = %root.display(), "snapshot cache hit");
                return Ok(Arc::clone(snapshot));
            }
        }

        debug!(root = %root.display(), "snapshot missing or expired, rescanning");
        match self.loader.load(root, current.as_deref(), now) {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                *current = Some(Arc::clone(&snapshot));
                Ok(snapshot)
            }
            Err(e) => match current.as_ref() {
                Some(stale) => {
                    warn!(root = %root.display(), error = %e, "rescan failed, serving previous snapshot");
                    Ok(Arc::clone(stale))
                }
                None => Err(e),
            },
        }
    }

    /// Drop the cached snapshot for `root`. Returns whether one was cached.
    pub fn invalidate(&self, root: &Path) -> bool {
        let slot = {
            let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
            slots.get(root).cloned()
        };
        match slot {
            Some(slot) => slot
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take()
                .is_some(),
            None => false,
        }
    }

    /// Roots that have a slot, sorted.
    pub fn roots(&self) -> Vec<PathBuf> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        let mut roots: Vec<PathBuf> = slots.keys().cloned().collect();
        roots.sort();
        roots
    }

    fn is_fresh(&self, snapshot: &CorpusSnapshot, now: DateTime<Utc>) -> bool {
        // A clock that moved backwards yields a negative age; keep the snapshot.
        match snapshot.age(now).to_std() {
            Ok(age) => age < self.ttl,
            Err(_) => true,
        }
    }

    fn slot(&self, root: &Path) -> Slot {
        {
            let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(slot) = slots.get(root) {
                return Arc::clone(slot);
            }
        }
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(root.to_path_buf()).or_default())
    }
}
