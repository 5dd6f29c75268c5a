//! Query cache
//!
//! Typed results of remote queries keyed by [`QueryKey`]. Entries can be
//! invalidated by key prefix, which marks them stale and wakes the pollers
//! refreshing them. Every fetch takes a ticket; a newer fetch or an explicit
//! cancel supersedes older tickets, whose results are then dropped.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::time::Instant;

use crate::ClientResult;

/// Hierarchical cache key, e.g. `["orders", "kitchen"]`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Key extended by one more segment
    pub fn with(&self, segment: impl fmt::Display) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.to_string());
        Self(segments)
    }

    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(","))
    }
}

/// Cached value with bookkeeping
#[derive(Clone)]
struct Entry {
    value: Arc<dyn Any + Send + Sync>,
    updated_at: Instant,
    stale: bool,
}

/// Exact copy of one cache slot, including "absent"
#[derive(Clone)]
pub struct Snapshot {
    key: QueryKey,
    entry: Option<Entry>,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.entry.is_none()
    }
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("key", &self.key)
            .field("present", &self.entry.is_some())
            .finish()
    }
}

/// Proof that a fetch was started; valid until superseded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    key: QueryKey,
    epoch: u64,
}

/// Key-value store of query results
pub struct QueryCache {
    entries: DashMap<QueryKey, Entry>,
    epochs: DashMap<QueryKey, u64>,
    invalidations: broadcast::Sender<QueryKey>,
}

impl QueryCache {
    pub fn new() -> Self {
        let (invalidations, _) = broadcast::channel(64);
        Self {
            entries: DashMap::new(),
            epochs: DashMap::new(),
            invalidations,
        }
    }

    /// Cached value for `key`, if present and of type `T`
    pub fn get<T: Send + Sync + 'static>(&self, key: &QueryKey) -> Option<Arc<T>> {
        let value = self.entries.get(key)?.value.clone();
        value.downcast::<T>().ok()
    }

    /// Store a fresh value
    pub fn set<T: Send + Sync + 'static>(&self, key: &QueryKey, value: T) {
        self.entries.insert(
            key.clone(),
            Entry {
                value: Arc::new(value),
                updated_at: Instant::now(),
                stale: false,
            },
        );
    }

    /// Apply `f` to a copy of the cached value and store the result
    ///
    /// Staleness and update time are left untouched. Returns `false` when
    /// nothing of type `T` is cached under `key`.
    pub fn update<T, F>(&self, key: &QueryKey, f: F) -> bool
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce(&mut T),
    {
        let Some(mut entry) = self.entries.get_mut(key) else {
            return false;
        };
        let Some(current) = entry.value.downcast_ref::<T>() else {
            return false;
        };
        let mut next = current.clone();
        f(&mut next);
        entry.value = Arc::new(next);
        true
    }

    pub fn remove(&self, key: &QueryKey) {
        self.entries.remove(key);
    }

    /// Copy of the slot for `key`
    pub fn snapshot(&self, key: &QueryKey) -> Snapshot {
        Snapshot {
            key: key.clone(),
            entry: self.entries.get(key).map(|e| e.clone()),
        }
    }

    /// Put a slot back exactly as it was captured
    pub fn restore(&self, snapshot: Snapshot) {
        match snapshot.entry {
            Some(entry) => {
                self.entries.insert(snapshot.key, entry);
            }
            None => {
                self.entries.remove(&snapshot.key);
            }
        }
    }

    /// Mark every entry under `prefix` stale and wake its pollers
    ///
    /// Returns the number of cached entries affected.
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        let mut count = 0;
        for mut entry in self.entries.iter_mut() {
            if entry.key().starts_with(prefix) {
                entry.stale = true;
                count += 1;
            }
        }
        tracing::debug!(key = %prefix, entries = count, "Invalidated queries");
        // no receivers just means no poller is running
        let _ = self.invalidations.send(prefix.clone());
        count
    }

    /// Drop every entry and supersede every running fetch
    pub fn remove_all(&self) {
        self.entries.clear();
        for mut epoch in self.epochs.iter_mut() {
            *epoch += 1;
        }
        tracing::debug!("Query cache cleared");
    }

    /// Present, not invalidated and younger than `stale_time`
    pub fn is_fresh(&self, key: &QueryKey, stale_time: Duration) -> bool {
        self.entries
            .get(key)
            .map(|e| !e.stale && e.updated_at.elapsed() < stale_time)
            .unwrap_or(false)
    }

    pub fn is_stale(&self, key: &QueryKey) -> bool {
        self.entries.get(key).map(|e| e.stale).unwrap_or(true)
    }

    /// Receiver of invalidated prefixes
    pub fn subscribe(&self) -> broadcast::Receiver<QueryKey> {
        self.invalidations.subscribe()
    }

    // ==================== Fetch tickets ====================

    /// Start a fetch, superseding any fetch already running for `key`
    pub fn begin_fetch(&self, key: &QueryKey) -> FetchTicket {
        let mut epoch = self.epochs.entry(key.clone()).or_insert(0);
        *epoch += 1;
        FetchTicket {
            key: key.clone(),
            epoch: *epoch,
        }
    }

    /// Supersede any fetch running for `key`
    pub fn cancel(&self, key: &QueryKey) {
        if let Some(mut epoch) = self.epochs.get_mut(key) {
            *epoch += 1;
        }
    }

    pub fn is_current(&self, ticket: &FetchTicket) -> bool {
        self.epochs
            .get(&ticket.key)
            .map(|e| *e == ticket.epoch)
            .unwrap_or(false)
    }

    /// Store the result of a fetch unless the ticket was superseded
    pub fn complete<T: Send + Sync + 'static>(&self, ticket: &FetchTicket, value: T) -> bool {
        // epoch guard is held while storing so a concurrent cancel cannot slip in
        let Some(epoch) = self.epochs.get(&ticket.key) else {
            return false;
        };
        if *epoch != ticket.epoch {
            tracing::trace!(key = %ticket.key, "Dropped superseded fetch result");
            return false;
        }
        self.set(&ticket.key, value);
        drop(epoch);
        true
    }

    /// Run `fetcher` under a ticket and store its result
    ///
    /// Returns `Ok(None)` when the result was superseded while in flight.
    pub async fn fetch<T, F, Fut>(&self, key: &QueryKey, fetcher: F) -> ClientResult<Option<Arc<T>>>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = ClientResult<T>>,
    {
        let ticket = self.begin_fetch(key);
        let value = fetcher().await?;
        if self.complete(&ticket, value) {
            Ok(self.get::<T>(key))
        } else {
            Ok(None)
        }
    }

    /// Cached value when fresh, otherwise fetch it
    pub async fn ensure<T, F, Fut>(
        &self,
        key: &QueryKey,
        stale_time: Duration,
        fetcher: F,
    ) -> ClientResult<Option<Arc<T>>>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = ClientResult<T>>,
    {
        if self.is_fresh(key, stale_time)
            && let Some(value) = self.get::<T>(key)
        {
            return Ok(Some(value));
        }
        self.fetch(key, fetcher).await
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryCache")
            .field("entries", &self.entries.len())
            .finish()
    }
}
