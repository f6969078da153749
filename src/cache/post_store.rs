use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::application::repos::{FetchError, PostSource};
use crate::domain::posts::PostCollection;
use crate::infra::telemetry::{
    POST_STORE_FETCH_FAILURE_TOTAL, POST_STORE_HIT_TOTAL, POST_STORE_REFRESH_TOTAL,
    POST_STORE_STALE_TOTAL,
};

pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
struct CacheEntry {
    collection: Arc<PostCollection>,
    fetched_at: Instant,
}

impl CacheEntry {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }
}

/// Time-bounded cache in front of a [`PostSource`].
///
/// One instance is created per process and shared through `Arc` by the API
/// and the edge layer. Fresh reads take only the read lock. Refreshes are
/// serialised behind `refresh`, and callers that queued behind an attempt
/// reuse its outcome, so a burst of expired readers triggers one upstream
/// fetch whether that fetch succeeds or fails.
pub struct PostStore {
    source: Arc<dyn PostSource>,
    ttl: Duration,
    entry: RwLock<Option<CacheEntry>>,
    /// Completed upstream attempts; bumped while `refresh` is held.
    attempts: AtomicU64,
    /// Error of the most recent attempt, `None` after a success.
    refresh: Mutex<Option<FetchError>>,
}

impl PostStore {
    pub fn new(source: Arc<dyn PostSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            entry: RwLock::new(None),
            attempts: AtomicU64::new(0),
            refresh: Mutex::new(None),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the current collection, fetching a new one when the cache is
    /// empty or older than the TTL.
    ///
    /// A failed fetch falls back to the previous collection when one exists.
    pub async fn load(&self) -> Result<Arc<PostCollection>, FetchError> {
        if let Some(collection) = self.fresh().await {
            metrics::counter!(POST_STORE_HIT_TOTAL).increment(1);
            return Ok(collection);
        }

        let seen = self.attempts.load(Ordering::Acquire);
        let mut last_error = self.refresh.lock().await;

        if let Some(collection) = self.fresh().await {
            metrics::counter!(POST_STORE_HIT_TOTAL).increment(1);
            return Ok(collection);
        }

        // An attempt finished while we waited for the guard: share its outcome.
        if self.attempts.load(Ordering::Acquire) != seen {
            if let Some(entry) = self.entry.read().await.clone() {
                if last_error.is_some() {
                    metrics::counter!(POST_STORE_STALE_TOTAL).increment(1);
                }
                return Ok(entry.collection);
            }
            if let Some(err) = last_error.clone() {
                return Err(err);
            }
        }

        let outcome = self.source.fetch_collection().await;
        self.attempts.fetch_add(1, Ordering::Release);

        match outcome {
            Ok(collection) => {
                let collection = Arc::new(collection);
                debug!(
                    target = "buzzit::cache::post_store",
                    posts = collection.len(),
                    collected_at = %collection.metadata.collected_at,
                    "post collection refreshed"
                );
                metrics::counter!(POST_STORE_REFRESH_TOTAL).increment(1);
                *self.entry.write().await = Some(CacheEntry {
                    collection: Arc::clone(&collection),
                    fetched_at: Instant::now(),
                });
                *last_error = None;
                Ok(collection)
            }
            Err(err) => {
                metrics::counter!(POST_STORE_FETCH_FAILURE_TOTAL).increment(1);
                *last_error = Some(err.clone());
                let stale = self.entry.read().await.clone();
                match stale {
                    Some(entry) => {
                        warn!(
                            target = "buzzit::cache::post_store",
                            error = %err,
                            age_seconds = entry.fetched_at.elapsed().as_secs(),
                            "post fetch failed; serving stale collection"
                        );
                        metrics::counter!(POST_STORE_STALE_TOTAL).increment(1);
                        Ok(entry.collection)
                    }
                    None => {
                        warn!(
                            target = "buzzit::cache::post_store",
                            error = %err,
                            "post fetch failed with nothing cached"
                        );
                        Err(err)
                    }
                }
            }
        }
    }

    /// Cached collection and its age, without touching the upstream.
    pub async fn snapshot(&self) -> Option<(Arc<PostCollection>, Duration)> {
        self.entry
            .read()
            .await
            .as_ref()
            .map(|entry| (Arc::clone(&entry.collection), entry.fetched_at.elapsed()))
    }

    async fn fresh(&self) -> Option<Arc<PostCollection>> {
        self.entry
            .read()
            .await
            .as_ref()
            .filter(|entry| entry.is_fresh(self.ttl))
            .map(|entry| Arc::clone(&entry.collection))
    }
}
