//! Time-bounded cache

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Snapshot refreshed lazily once older than `ttl`
#[derive(Debug)]
pub struct TimedCache<T> {
    snapshot: Option<Arc<T>>,
    taken_at: Option<Instant>,
    ttl: Duration,
}

impl<T> TimedCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            snapshot: None,
            taken_at: None,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn is_stale(&self, now: Instant) -> bool {
        match self.taken_at {
            Some(taken_at) => now.saturating_duration_since(taken_at) > self.ttl,
            None => true,
        }
    }

    pub fn snapshot(&self) -> Option<Arc<T>> {
        self.snapshot.clone()
    }

    /// Return the snapshot, refreshing it first when stale.
    ///
    /// The timestamp moves even when the refresh produced nothing, so a failing
    /// source is polled at most once per `ttl`.
    pub async fn get_or_refresh<F, Fut>(&mut self, refresh: F) -> Option<Arc<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Option<T>>,
    {
        if self.is_stale(Instant::now()) {
            if let Some(value) = refresh().await {
                self.snapshot = Some(Arc::new(value));
            }
            self.taken_at = Some(Instant::now());
        }
        self.snapshot.clone()
    }

    /// Force a refresh on next access
    pub fn invalidate(&mut self) {
        self.taken_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_refresh_only_when_stale() {
        let refreshes = AtomicUsize::new(0);
        let mut cache = TimedCache::new(Duration::from_millis(50));

        for _ in 0..3 {
            let value = cache
                .get_or_refresh(|| async { Some(refreshes.fetch_add(1, Ordering::SeqCst)) })
                .await;
            assert_eq!(value.as_deref(), Some(&0));
        }
        assert_eq!(refreshes.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(80)).await;
        let value = cache
            .get_or_refresh(|| async { Some(refreshes.fetch_add(1, Ordering::SeqCst)) })
            .await;
        assert_eq!(value.as_deref(), Some(&1));
    }

    #[tokio::test]
    async fn test_invalidate_and_failed_refresh() {
        let mut cache = TimedCache::new(Duration::from_secs(60));
        cache.get_or_refresh(|| async { Some("first") }).await;

        cache.invalidate();
        let value = cache.get_or_refresh(|| async { None }).await;
        assert_eq!(value.as_deref(), Some(&"first"));
        assert!(!cache.is_stale(Instant::now()));
    }
}
