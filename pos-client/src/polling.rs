//! Background refresh of cached queries
//!
//! One tokio task per data source. A source refreshes on every tick of its
//! interval, when its cache key is invalidated, and on focus regain when it
//! asks for that. A disabled source stays idle until its predicate flips.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::cache::{QueryCache, QueryKey};

/// Refresh timing of one data source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Time between two scheduled refreshes
    pub interval: Duration,
    /// Age after which a cached value no longer counts as fresh
    pub stale_time: Duration,
    /// Refresh on focus regain when the cached value is stale
    pub refetch_on_focus: bool,
}

impl PollSettings {
    pub fn every(interval: Duration) -> Self {
        Self {
            interval,
            stale_time: Duration::ZERO,
            refetch_on_focus: false,
        }
    }

    pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = stale_time;
        self
    }

    pub fn with_refetch_on_focus(mut self, enabled: bool) -> Self {
        self.refetch_on_focus = enabled;
        self
    }
}

/// Predicate deciding whether a source is polled right now
pub type EnabledFn = Arc<dyn Fn() -> bool + Send + Sync>;

/// Refresh routine of a source; it reports its own errors
pub type RefreshFn = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Typed polling configuration of one data source
#[derive(Clone)]
pub struct PollSpec {
    pub key: QueryKey,
    pub settings: PollSettings,
    enabled: EnabledFn,
}

impl PollSpec {
    /// Always-enabled source
    pub fn new(key: QueryKey, settings: PollSettings) -> Self {
        Self {
            key,
            settings,
            enabled: Arc::new(|| true),
        }
    }

    /// Poll only while `predicate` holds
    pub fn when<F>(mut self, predicate: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.enabled = Arc::new(predicate);
        self
    }

    pub fn is_enabled(&self) -> bool {
        (self.enabled)()
    }

    /// Whether an invalidation of `prefix` concerns this source
    fn matches(&self, prefix: &QueryKey) -> bool {
        self.key.starts_with(prefix) || prefix.starts_with(&self.key)
    }
}

impl fmt::Debug for PollSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollSpec")
            .field("key", &self.key)
            .field("settings", &self.settings)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Tick,
    Focus,
    Invalidated,
}

/// Running poll task; stops when dropped
pub struct PollHandle {
    key: QueryKey,
    task: JoinHandle<()>,
    _guard: DropGuard,
}

impl PollHandle {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop polling and wait for the task to exit
    pub async fn stop(self) {
        let Self { task, _guard, .. } = self;
        drop(_guard);
        let _ = task.await;
    }
}

impl fmt::Debug for PollHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollHandle").field("key", &self.key).finish()
    }
}

/// Poll task spawner
pub struct Poller;

impl Poller {
    /// Spawn the refresh loop of one source
    ///
    /// The first tick fires immediately, which doubles as the initial load.
    pub fn spawn(
        spec: PollSpec,
        cache: Arc<QueryCache>,
        focus: broadcast::Receiver<()>,
        refresh: RefreshFn,
    ) -> PollHandle {
        let token = CancellationToken::new();
        let key = spec.key.clone();
        let task = tokio::spawn(Self::run(spec, cache, focus, refresh, token.clone()));
        PollHandle {
            key,
            task,
            _guard: token.drop_guard(),
        }
    }

    async fn run(
        spec: PollSpec,
        cache: Arc<QueryCache>,
        mut focus: broadcast::Receiver<()>,
        refresh: RefreshFn,
        shutdown: CancellationToken,
    ) {
        let mut ticker = interval(spec.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut invalidations = cache.subscribe();
        let mut watch_focus = spec.settings.refetch_on_focus;

        tracing::debug!(
            key = %spec.key,
            interval_ms = spec.settings.interval.as_millis() as u64,
            "Poller started"
        );

        loop {
            let trigger = tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => Trigger::Tick,
                event = focus.recv(), if watch_focus => match event {
                    Ok(()) | Err(RecvError::Lagged(_)) => Trigger::Focus,
                    Err(RecvError::Closed) => {
                        watch_focus = false;
                        continue;
                    }
                },
                event = invalidations.recv() => match event {
                    Ok(prefix) if spec.matches(&prefix) => Trigger::Invalidated,
                    Ok(_) => continue,
                    Err(RecvError::Lagged(missed)) => {
                        tracing::debug!(key = %spec.key, missed, "Invalidation channel lagged");
                        Trigger::Invalidated
                    }
                    Err(RecvError::Closed) => break,
                },
            };

            if !spec.is_enabled() {
                continue;
            }
            if trigger == Trigger::Focus && cache.is_fresh(&spec.key, spec.settings.stale_time) {
                continue;
            }

            tracing::trace!(key = %spec.key, ?trigger, "Refreshing");
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = refresh() => {}
            }
            if trigger == Trigger::Invalidated {
                // push the next scheduled refresh a full interval out
                ticker.reset();
            }
        }

        tracing::debug!(key = %spec.key, "Poller stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    fn counting_refresh(counter: Arc<AtomicUsize>) -> RefreshFn {
        Arc::new(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
            .boxed()
        })
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn test_settings_builder() {
        let s = PollSettings::every(Duration::from_secs(5))
            .with_stale_time(Duration::from_secs(3))
            .with_refetch_on_focus(true);
        assert_eq!(s.interval, Duration::from_secs(5));
        assert_eq!(s.stale_time, Duration::from_secs(3));
        assert!(s.refetch_on_focus);
    }

    #[test]
    fn test_spec_matches_both_directions() {
        let spec = PollSpec::new(
            QueryKey::new(["orders", "history"]),
            PollSettings::every(Duration::from_secs(1)),
        );
        assert!(spec.matches(&QueryKey::new(["orders"])));
        assert!(spec.matches(&QueryKey::new(["orders", "history", "plov"])));
        assert!(!spec.matches(&QueryKey::new(["tables"])));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_refresh() {
        let cache = Arc::new(QueryCache::new());
        let (_focus_tx, focus_rx) = broadcast::channel(4);
        let counter = Arc::new(AtomicUsize::new(0));
        let spec = PollSpec::new(
            QueryKey::new(["tables"]),
            PollSettings::every(Duration::from_secs(5)),
        );

        let handle = Poller::spawn(spec, cache, focus_rx, counting_refresh(counter.clone()));
        settle().await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(5)).await;
        settle().await;
        assert_eq!(counter.load(Ordering::SeqCst), 2);

        handle.stop().await;
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidation_wakes_before_tick() {
        let cache = Arc::new(QueryCache::new());
        let (_focus_tx, focus_rx) = broadcast::channel(4);
        let counter = Arc::new(AtomicUsize::new(0));
        let spec = PollSpec::new(
            QueryKey::new(["orders", "ready"]),
            PollSettings::every(Duration::from_secs(60)),
        );

        let _handle = Poller::spawn(
            spec,
            cache.clone(),
            focus_rx,
            counting_refresh(counter.clone()),
        );
        settle().await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        cache.invalidate(&QueryKey::new(["tables"]));
        settle().await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        cache.invalidate(&QueryKey::new(["orders"]));
        settle().await;
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_focus_refreshes_only_when_stale() {
        let cache = Arc::new(QueryCache::new());
        let key = QueryKey::new(["orders", "ready"]);
        let (focus_tx, focus_rx) = broadcast::channel(4);
        let counter = Arc::new(AtomicUsize::new(0));
        let spec = PollSpec::new(
            key.clone(),
            PollSettings::every(Duration::from_secs(60))
                .with_stale_time(Duration::from_secs(10))
                .with_refetch_on_focus(true),
        );

        let _handle = Poller::spawn(
            spec,
            cache.clone(),
            focus_rx,
            counting_refresh(counter.clone()),
        );
        settle().await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        cache.set(&key, 1u8);
        focus_tx.send(()).unwrap();
        settle().await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(11)).await;
        focus_tx.send(()).unwrap();
        settle().await;
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_source_is_idle() {
        let cache = Arc::new(QueryCache::new());
        let (_focus_tx, focus_rx) = broadcast::channel(4);
        let counter = Arc::new(AtomicUsize::new(0));
        let enabled = Arc::new(AtomicBool::new(false));
        let flag = enabled.clone();
        let spec = PollSpec::new(
            QueryKey::new(["orders", "history"]),
            PollSettings::every(Duration::from_secs(1)),
        )
        .when(move || flag.load(Ordering::SeqCst));

        let _handle = Poller::spawn(spec, cache, focus_rx, counting_refresh(counter.clone()));
        tokio::time::sleep(Duration::from_secs(3)).await;
        settle().await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        enabled.store(true, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(1)).await;
        settle().await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
