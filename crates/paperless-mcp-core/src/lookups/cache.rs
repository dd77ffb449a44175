//! TTL cache of lookup lists with per-category single-flight fetches
//!
//! Each category owns one slot behind its own mutex. A slot holds the last
//! successful fetch and, while a fetch runs, a shared handle to it so that
//! concurrent readers join instead of issuing their own request. The fetch
//! itself runs in a spawned task: dropping a waiter never cancels it.
//!
//! The lock is never held across an await.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::{join_all, BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use thiserror::Error;
use tokio::time::Instant;

use super::fetcher::LookupFetcher;
use crate::backend::BackendError;
use crate::config::DEFAULT_LOOKUP_CACHE_TTL_SECONDS;
use crate::logging::Logger;
use crate::types::{LookupCategory, LookupRecord};
use crate::{log_debug, log_warn};

/// Cache freshness settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    ttl: Duration,
}

impl CacheConfig {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }

    pub fn from_secs(ttl_seconds: u64) -> Self {
        Self::new(Duration::from_secs(ttl_seconds))
    }

    /// Every read fetches, nothing is retained
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::from_secs(DEFAULT_LOOKUP_CACHE_TTL_SECONDS)
    }
}

/// A lookup list handed to a caller
#[derive(Debug, Clone)]
pub struct CachedLookup {
    pub category: LookupCategory,
    /// Shared, read-only snapshot of the fetched records
    pub records: Arc<Vec<LookupRecord>>,
    pub fetched_at: Instant,
    pub served_from_cache: bool,
}

/// Fetch failure for one category
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to fetch {category}: {source}")]
pub struct LookupFetchError {
    pub category: LookupCategory,
    pub source: BackendError,
}

pub type LookupFetchResult = Result<CachedLookup, LookupFetchError>;

#[derive(Debug, Clone)]
struct Fetched {
    records: Arc<Vec<LookupRecord>>,
    fetched_at: Instant,
}

type SharedFetch = Shared<BoxFuture<'static, Result<Fetched, LookupFetchError>>>;

struct InFlight {
    id: u64,
    future: SharedFetch,
}

#[derive(Default)]
struct Slot {
    entry: Option<Fetched>,
    in_flight: Option<InFlight>,
    /// Bumped by `invalidate`; fetches started under an older generation
    /// do not publish.
    generation: u64,
}

struct Inner {
    fetcher: LookupFetcher,
    config: CacheConfig,
    logger: Arc<dyn Logger>,
    slots: [Mutex<Slot>; 5],
    next_fetch_id: AtomicU64,
}

impl Inner {
    fn slot(&self, category: LookupCategory) -> &Mutex<Slot> {
        let index = match category {
            LookupCategory::Tag => 0,
            LookupCategory::DocumentType => 1,
            LookupCategory::Correspondent => 2,
            LookupCategory::StoragePath => 3,
            LookupCategory::CustomField => 4,
        };
        &self.slots[index]
    }

    fn is_fresh(&self, entry: &Fetched) -> bool {
        self.config.is_enabled() && entry.fetched_at.elapsed() < self.config.ttl()
    }

    /// Record the outcome of fetch `id` in its slot
    fn publish(
        &self,
        category: LookupCategory,
        id: u64,
        generation: u64,
        result: Result<Vec<LookupRecord>, BackendError>,
    ) -> Result<Fetched, LookupFetchError> {
        let mut slot = self.slot(category).lock();
        if slot.in_flight.as_ref().map(|f| f.id) == Some(id) {
            slot.in_flight = None;
        }

        match result {
            Ok(records) => {
                let fetched = Fetched {
                    records: Arc::new(records),
                    fetched_at: Instant::now(),
                };
                if self.config.is_enabled() && slot.generation == generation {
                    slot.entry = Some(fetched.clone());
                }
                Ok(fetched)
            }
            Err(source) => {
                log_warn!(self.logger, "fetching {} failed: {}", category, source);
                Err(LookupFetchError { category, source })
            }
        }
    }

    fn abandon(&self, category: LookupCategory, id: u64) {
        let mut slot = self.slot(category).lock();
        if slot.in_flight.as_ref().map(|f| f.id) == Some(id) {
            slot.in_flight = None;
        }
    }
}

/// Process-wide lookup cache
///
/// Cheap to clone; clones share state. Create one per server (or per test).
#[derive(Clone)]
pub struct LookupCache {
    inner: Arc<Inner>,
}

impl LookupCache {
    pub fn new(fetcher: LookupFetcher, config: CacheConfig, logger: Arc<dyn Logger>) -> Self {
        Self {
            inner: Arc::new(Inner {
                fetcher,
                config,
                logger,
                slots: Default::default(),
                next_fetch_id: AtomicU64::new(0),
            }),
        }
    }

    pub fn config(&self) -> CacheConfig {
        self.inner.config
    }

    /// Read several categories concurrently.
    ///
    /// Each category gets its own result; one failing does not affect the others.
    pub async fn get<I>(&self, categories: I, refresh: bool) -> BTreeMap<LookupCategory, LookupFetchResult>
    where
        I: IntoIterator<Item = LookupCategory>,
    {
        let categories: BTreeSet<LookupCategory> = categories.into_iter().collect();
        let results = join_all(
            categories
                .iter()
                .map(|category| self.get_one(*category, refresh)),
        )
        .await;
        categories.into_iter().zip(results).collect()
    }

    /// Read one category, fetching when missing, stale or `refresh` is set.
    ///
    /// A read that needs a fetch while one is already running for the
    /// category waits for that fetch instead of starting another.
    pub async fn get_one(&self, category: LookupCategory, refresh: bool) -> LookupFetchResult {
        let future = {
            let mut slot = self.inner.slot(category).lock();
            if !refresh {
                if let Some(entry) = slot.entry.as_ref().filter(|e| self.inner.is_fresh(e)) {
                    log_debug!(self.inner.logger, "{} served from cache", category);
                    return Ok(CachedLookup {
                        category,
                        records: Arc::clone(&entry.records),
                        fetched_at: entry.fetched_at,
                        served_from_cache: true,
                    });
                }
            }
            match slot.in_flight.as_ref().map(|f| f.future.clone()) {
                Some(joined) => {
                    log_debug!(self.inner.logger, "joining in-flight fetch of {}", category);
                    joined
                }
                None => self.start_fetch(category, &mut slot),
            }
        };

        let fetched = future.await?;
        Ok(CachedLookup {
            category,
            records: fetched.records,
            fetched_at: fetched.fetched_at,
            served_from_cache: false,
        })
    }

    /// Drop the cached entry of a category.
    ///
    /// No I/O. A fetch already running keeps serving its current waiters but
    /// will not be stored; the next read fetches again.
    pub fn invalidate(&self, category: LookupCategory) {
        let mut slot = self.inner.slot(category).lock();
        slot.entry = None;
        slot.in_flight = None;
        slot.generation = slot.generation.wrapping_add(1);
        log_debug!(self.inner.logger, "{} invalidated", category);
    }

    /// Fetch time of the stored entry, fresh or not
    pub fn cached_at(&self, category: LookupCategory) -> Option<Instant> {
        self.inner
            .slot(category)
            .lock()
            .entry
            .as_ref()
            .map(|e| e.fetched_at)
    }

    fn start_fetch(&self, category: LookupCategory, slot: &mut Slot) -> SharedFetch {
        let id = self.inner.next_fetch_id.fetch_add(1, Ordering::Relaxed);
        let generation = slot.generation;
        log_debug!(self.inner.logger, "fetching {}", category);

        let task_inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            let result = task_inner.fetcher.fetch(category).await;
            task_inner.publish(category, id, generation, result)
        });

        let join_inner = Arc::clone(&self.inner);
        let future = async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => {
                    join_inner.abandon(category, id);
                    Err(LookupFetchError {
                        category,
                        source: BackendError::Internal(format!("lookup fetch task failed: {}", e)),
                    })
                }
            }
        }
        .boxed()
        .shared();

        slot.in_flight = Some(InFlight {
            id,
            future: future.clone(),
        });
        future
    }
}
