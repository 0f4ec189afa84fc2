//! Keyed query cache
//!
//! Each key holds at most one in-flight request, shared by every caller that
//! asks for the key while it runs. Completed values stay fresh for the cache's
//! staleness window; after that a read still returns the old value and kicks
//! off one background refetch (stale-while-revalidate). Failures go through
//! [`RetryPolicy`] before being recorded.
//!
//! Cancellation is per caller: a cancelled caller stops waiting, and once the
//! last caller is gone the request future is dropped, which aborts it.
//! Cancellation is never recorded as an error.

mod catalog;
mod retry;

pub use catalog::CatalogQueries;
pub use retry::RetryPolicy;

use crate::error::QueryError;
use futures::future::{BoxFuture, FutureExt, Shared, WeakShared};
use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub type QueryResult<V> = Result<Arc<V>, QueryError>;

/// Handle on a running request, shared by everyone waiting on it
pub type SharedFetch<V> = Shared<BoxFuture<'static, QueryResult<V>>>;

/// Snapshot of one key, for rendering without I/O
#[derive(Debug)]
pub enum QueryStatus<V> {
    /// Never requested, or the last request was cancelled
    Idle,
    Loading,
    Ready {
        value: Arc<V>,
        stale: bool,
        /// A revalidation is running
        fetching: bool,
        /// The last revalidation failed; cleared by the next success
        refresh_error: Option<QueryError>,
    },
    Failed(QueryError),
}

impl<V> QueryStatus<V> {
    pub fn value(&self) -> Option<&Arc<V>> {
        match self {
            QueryStatus::Ready { value, .. } => Some(value),
            _ => None,
        }
    }

    /// True when a read should start a request: nothing cached yet, or a
    /// stale value with no request running and no failed revalidation since.
    pub fn wants_fetch(&self) -> bool {
        match self {
            QueryStatus::Idle => true,
            QueryStatus::Ready {
                stale,
                fetching,
                refresh_error,
                ..
            } => *stale && !*fetching && refresh_error.is_none(),
            QueryStatus::Loading | QueryStatus::Failed(_) => false,
        }
    }
}

struct Entry<V> {
    value: Option<Arc<V>>,
    updated_at: Option<Instant>,
    error: Option<QueryError>,
    in_flight: Option<WeakShared<BoxFuture<'static, QueryResult<V>>>>,
    cancel: Option<CancellationToken>,
    generation: u64,
}

impl<V> Default for Entry<V> {
    fn default() -> Self {
        Self {
            value: None,
            updated_at: None,
            error: None,
            in_flight: None,
            cancel: None,
            generation: 0,
        }
    }
}

// Where a superseded waiter goes next
enum Settled<V> {
    Running(SharedFetch<V>),
    Value(Arc<V>),
    Nothing,
}

impl<V> Entry<V> {
    fn in_flight(&self) -> Option<SharedFetch<V>> {
        self.in_flight.as_ref().and_then(|weak| weak.upgrade())
    }
}

pub struct QueryCache<K, V> {
    label: &'static str,
    stale_time: Duration,
    retry: RetryPolicy,
    entries: Arc<Mutex<HashMap<K, Entry<V>>>>,
}

impl<K, V> Clone for QueryCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            label: self.label,
            stale_time: self.stale_time,
            retry: self.retry,
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<K, V> QueryCache<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + 'static,
    V: Send + Sync + 'static,
{
    pub fn new(label: &'static str, stale_time: Duration, retry: RetryPolicy) -> Self {
        Self {
            label,
            stale_time,
            retry,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, Entry<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_stale(&self, entry: &Entry<V>) -> bool {
        entry
            .updated_at
            .map_or(true, |at| at.elapsed() >= self.stale_time)
    }

    pub fn peek(&self, key: &K) -> QueryStatus<V> {
        let entries = self.lock();
        let Some(entry) = entries.get(key) else {
            return QueryStatus::Idle;
        };
        if let Some(value) = &entry.value {
            return QueryStatus::Ready {
                value: Arc::clone(value),
                stale: self.is_stale(entry),
                fetching: entry.in_flight().is_some(),
                refresh_error: entry.error.clone(),
            };
        }
        if entry.in_flight().is_some() {
            return QueryStatus::Loading;
        }
        match &entry.error {
            Some(e) => QueryStatus::Failed(e.clone()),
            None => QueryStatus::Idle,
        }
    }

    /// Read `key`, fetching it if there is no value yet.
    pub async fn fetch<F, Fut>(
        &self,
        key: K,
        fetcher: F,
        cancel: &CancellationToken,
    ) -> QueryResult<V>
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, QueryError>> + Send + 'static,
    {
        let mut shared = {
            let mut entries = self.lock();
            let entry = entries.entry(key.clone()).or_default();

            if let Some(value) = entry.value.clone() {
                if self.is_stale(entry) && entry.in_flight().is_none() {
                    debug!(query = self.label, key = ?key, "Serving stale value, revalidating");
                    let refresh = self.start_fetch(entry, key.clone(), Arc::new(fetcher));
                    tokio::spawn(async move {
                        let _ = refresh.await;
                    });
                }
                return Ok(value);
            }

            match entry.in_flight() {
                Some(shared) => shared,
                None => self.start_fetch(entry, key.clone(), Arc::new(fetcher)),
            }
        };

        loop {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(QueryError::Cancelled),
                result = shared => result,
            };
            match result {
                // Superseded by a newer request for the same key; follow it,
                // or take its value if it already landed
                Err(QueryError::Cancelled) => match self.settled(&key) {
                    Settled::Running(next) => shared = next,
                    Settled::Value(value) => return Ok(value),
                    Settled::Nothing => return Err(QueryError::Cancelled),
                },
                other => return other,
            }
        }
    }

    /// Start a new request for `key` in the background, superseding any
    /// request already in flight. The last known value is kept meanwhile.
    ///
    /// The returned handle resolves when the request finishes; dropping it
    /// does not cancel the request.
    pub fn refetch<F, Fut>(&self, key: K, fetcher: F) -> SharedFetch<V>
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, QueryError>> + Send + 'static,
    {
        let refresh = {
            let mut entries = self.lock();
            let entry = entries.entry(key.clone()).or_default();
            self.start_fetch(entry, key, Arc::new(fetcher))
        };
        let handle = refresh.clone();
        tokio::spawn(async move {
            let _ = refresh.await;
        });
        handle
    }

    #[cfg(test)]
    pub(crate) fn set_value(&self, key: K, value: V) {
        let mut entries = self.lock();
        let entry = entries.entry(key).or_default();
        entry.value = Some(Arc::new(value));
        entry.updated_at = Some(Instant::now());
        entry.error = None;
    }

    fn settled(&self, key: &K) -> Settled<V> {
        let entries = self.lock();
        let Some(entry) = entries.get(key) else {
            return Settled::Nothing;
        };
        match (entry.in_flight(), &entry.value) {
            (Some(next), _) => Settled::Running(next),
            (None, Some(value)) => Settled::Value(Arc::clone(value)),
            (None, None) => Settled::Nothing,
        }
    }

    fn start_fetch<F, Fut>(&self, entry: &mut Entry<V>, key: K, fetcher: Arc<F>) -> SharedFetch<V>
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, QueryError>> + Send + 'static,
    {
        if let Some(previous) = entry.cancel.take() {
            previous.cancel();
        }
        entry.generation += 1;
        let generation = entry.generation;
        let token = CancellationToken::new();
        entry.cancel = Some(token.clone());

        let entries = Arc::clone(&self.entries);
        let retry = self.retry;
        let label = self.label;
        debug!(query = label, key = ?key, generation, "Fetch started");

        let fetch = async move {
            let result = retry
                .run(label, &token, || fetcher(token.clone()))
                .await
                .map(Arc::new);

            let mut entries = entries.lock().unwrap_or_else(PoisonError::into_inner);
            match entries.get_mut(&key) {
                Some(entry) if entry.generation == generation => {
                    entry.in_flight = None;
                    entry.cancel = None;
                    match &result {
                        Ok(value) => {
                            debug!(query = label, key = ?key, "Fetch complete");
                            entry.value = Some(Arc::clone(value));
                            entry.updated_at = Some(Instant::now());
                            entry.error = None;
                        }
                        Err(QueryError::Cancelled) => {}
                        Err(e) => {
                            warn!(query = label, key = ?key, error = %e, "Fetch failed");
                            entry.error = Some(e.clone());
                        }
                    }
                }
                _ => debug!(query = label, key = ?key, "Discarding superseded result"),
            }
            result
        }
        .boxed()
        .shared();

        entry.in_flight = fetch.downgrade();
        fetch
    }
}
