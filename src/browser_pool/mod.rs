//! Bounded page pool shared by the audit workers
//!
//! The pool hands out at most `capacity` pages at once. A page returned with
//! `recycle = true` is kept idle for the next acquire; every other exit path
//! (failed attempt, timeout, panic unwinding through a lease) closes the page
//! so the next attempt starts from a fresh one.

pub mod chromium;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};

use crate::errors::{PageError, PoolError};

pub use chromium::{ChromiumPage, ChromiumPageSource};

// =============================================================================
// Browser seam
// =============================================================================

/// A single browser tab the audit can drive
///
/// Clones must refer to the same underlying tab.
pub trait AuditPage: Clone + Send + Sync + 'static {
    /// Navigate to `url` and wait for it to settle
    ///
    /// Returns the URL the page ended up on, which differs from `url` when the
    /// server redirected.
    fn navigate<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<String, PageError>>;
}

/// Factory for pages; one per browser process
pub trait PageSource: Send + Sync + 'static {
    type Page: AuditPage;

    fn create_page(&self) -> BoxFuture<'_, Result<Self::Page, PageError>>;

    fn close_page(&self, page: Self::Page) -> BoxFuture<'_, ()>;
}

// =============================================================================
// Statistics
// =============================================================================

/// Point-in-time counters of a [`PagePool`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    pub capacity: usize,
    pub created: u64,
    pub discarded: u64,
    pub recycled: u64,
    pub in_use: usize,
    pub peak_in_use: usize,
}

#[derive(Debug, Default)]
struct PoolCounters {
    created: AtomicU64,
    discarded: AtomicU64,
    recycled: AtomicU64,
    in_use: AtomicUsize,
    peak_in_use: AtomicUsize,
}

impl PoolCounters {
    fn checkout(&self) {
        let now = self.in_use.fetch_add(1, Ordering::AcqRel) + 1;
        self.peak_in_use.fetch_max(now, Ordering::AcqRel);
    }

    fn checkin(&self) {
        self.in_use.fetch_sub(1, Ordering::AcqRel);
    }
}

// =============================================================================
// Page Pool
// =============================================================================

pub struct PagePool<S: PageSource> {
    source: Arc<S>,
    capacity: usize,
    permits: Arc<Semaphore>,
    idle: Mutex<Vec<S::Page>>,
    counters: PoolCounters,
    next_id: AtomicU64,
    closed: AtomicBool,
}

impl<S: PageSource> std::fmt::Debug for PagePool<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PagePool")
            .field("capacity", &self.capacity)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl<S: PageSource> PagePool<S> {
    /// Create a pool of `capacity` pages; pages are created lazily
    pub fn new(source: Arc<S>, capacity: usize) -> Arc<Self> {
        let capacity = capacity.max(1);
        Arc::new(Self {
            source,
            capacity,
            permits: Arc::new(Semaphore::new(capacity)),
            idle: Mutex::new(Vec::with_capacity(capacity)),
            counters: PoolCounters::default(),
            next_id: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        })
    }

    /// Acquire a page, waiting while all `capacity` pages are leased
    ///
    /// Reuses an idle page when one exists, otherwise creates a new one.
    pub async fn acquire(self: &Arc<Self>) -> Result<PageLease<S>, PoolError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(PoolError::Closed);
        }

        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| PoolError::Closed)?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let reused = self.idle.lock().pop();
        let page = match reused {
            Some(page) => {
                debug!("Lease {} reuses idle page", id);
                page
            }
            None => {
                let page = self.source.create_page().await.map_err(PoolError::Create)?;
                self.counters.created.fetch_add(1, Ordering::Relaxed);
                debug!("Lease {} created new page", id);
                page
            }
        };

        self.counters.checkout();
        Ok(PageLease {
            id,
            page,
            settled: false,
            pool: Arc::clone(self),
            _permit: permit,
        })
    }

    /// Return a lease to the pool
    ///
    /// With `recycle` the page goes back to the idle set, otherwise it is
    /// closed and the slot is refilled by a fresh page on the next acquire.
    pub async fn release(&self, mut lease: PageLease<S>, recycle: bool) {
        lease.settled = true;
        let page = lease.page.clone();
        self.counters.checkin();

        if recycle && !self.closed.load(Ordering::Acquire) {
            self.idle.lock().push(page);
            self.counters.recycled.fetch_add(1, Ordering::Relaxed);
            debug!("Lease {} recycled", lease.id);
        } else {
            self.source.close_page(page).await;
            self.counters.discarded.fetch_add(1, Ordering::Relaxed);
            debug!("Lease {} discarded", lease.id);
        }
        // permit is returned when `lease` drops here
    }

    #[must_use]
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            capacity: self.capacity,
            created: self.counters.created.load(Ordering::Relaxed),
            discarded: self.counters.discarded.load(Ordering::Relaxed),
            recycled: self.counters.recycled.load(Ordering::Relaxed),
            in_use: self.counters.in_use.load(Ordering::Relaxed),
            peak_in_use: self.counters.peak_in_use.load(Ordering::Relaxed),
        }
    }

    /// Stop handing out pages and close every idle one
    ///
    /// Outstanding leases are closed as they are released.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.permits.close();

        let idle: Vec<S::Page> = std::mem::take(&mut *self.idle.lock());
        let count = idle.len();
        for page in idle {
            self.source.close_page(page).await;
        }
        info!("Page pool closed ({} idle pages closed)", count);
    }

    fn discard_detached(&self, page: S::Page, id: u64) {
        self.counters.checkin();
        self.counters.discarded.fetch_add(1, Ordering::Relaxed);
        warn!("Lease {} dropped without release, discarding page", id);

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let source = Arc::clone(&self.source);
                handle.spawn(async move {
                    source.close_page(page).await;
                });
            }
            Err(_) => drop(page),
        }
    }
}

// =============================================================================
// RAII Lease
// =============================================================================

/// Exclusive use of one pooled page
///
/// Dropping a lease without passing it to [`PagePool::release`] discards the
/// page.
pub struct PageLease<S: PageSource> {
    id: u64,
    page: S::Page,
    settled: bool,
    pool: Arc<PagePool<S>>,
    _permit: OwnedSemaphorePermit,
}

impl<S: PageSource> PageLease<S> {
    #[must_use]
    pub fn page(&self) -> &S::Page {
        &self.page
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl<S: PageSource> Drop for PageLease<S> {
    fn drop(&mut self) {
        if !self.settled {
            self.pool.discard_detached(self.page.clone(), self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[derive(Clone)]
    struct StubPage;

    impl AuditPage for StubPage {
        fn navigate<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<String, PageError>> {
            Box::pin(async move { Ok(url.to_string()) })
        }
    }

    #[derive(Default)]
    struct StubSource {
        closed: AtomicUsize,
    }

    impl PageSource for StubSource {
        type Page = StubPage;

        fn create_page(&self) -> BoxFuture<'_, Result<StubPage, PageError>> {
            Box::pin(async { Ok(StubPage) })
        }

        fn close_page(&self, _page: StubPage) -> BoxFuture<'_, ()> {
            self.closed.fetch_add(1, Ordering::SeqCst);
            Box::pin(async {})
        }
    }

    #[tokio::test]
    async fn recycled_page_is_reused() {
        let pool = PagePool::new(Arc::new(StubSource::default()), 1);

        let lease = pool.acquire().await.expect("acquire");
        pool.release(lease, true).await;
        let lease = pool.acquire().await.expect("acquire");
        pool.release(lease, false).await;

        let stats = pool.stats();
        assert_eq!(stats.created, 1);
        assert_eq!(stats.recycled, 1);
        assert_eq!(stats.discarded, 1);
        assert_eq!(stats.in_use, 0);
        assert_eq!(stats.peak_in_use, 1);
    }

    #[tokio::test]
    async fn dropped_lease_is_discarded_and_frees_its_slot() {
        let source = Arc::new(StubSource::default());
        let pool = PagePool::new(Arc::clone(&source), 1);

        {
            let _lease = pool.acquire().await.expect("acquire");
        }
        let lease = tokio::time::timeout(std::time::Duration::from_secs(1), pool.acquire())
            .await
            .expect("slot was not freed")
            .expect("acquire");
        pool.release(lease, true).await;

        let stats = pool.stats();
        assert_eq!(stats.discarded, 1);
        assert_eq!(stats.created, 2);
    }

    #[tokio::test]
    async fn closed_pool_rejects_acquire() {
        let pool = PagePool::new(Arc::new(StubSource::default()), 2);
        pool.close().await;
        assert!(matches!(pool.acquire().await, Err(PoolError::Closed)));
    }
}
