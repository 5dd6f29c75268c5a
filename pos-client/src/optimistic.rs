//! Optimistic cache transitions

use std::future::Future;

use crate::ClientResult;
use crate::cache::{QueryCache, QueryKey, Snapshot};

/// Project the expected result into the cache, then run the request
///
/// Running fetches of `key` are superseded first so a poll in flight cannot
/// overwrite the projection. On failure the cached slot is restored to the
/// exact snapshot taken before the projection, absence included.
pub async fn apply_optimistic<T, P, F, Fut, R>(
    cache: &QueryCache,
    key: &QueryKey,
    project: P,
    request: F,
) -> ClientResult<R>
where
    T: Clone + Send + Sync + 'static,
    P: FnOnce(&mut T),
    F: FnOnce() -> Fut,
    Fut: Future<Output = ClientResult<R>>,
{
    apply_optimistic_with(cache, key, project, request, |cache, snapshot| {
        cache.restore(snapshot)
    })
    .await
}

/// Same as [`apply_optimistic`] with a custom rollback
pub async fn apply_optimistic_with<T, P, F, Fut, R, B>(
    cache: &QueryCache,
    key: &QueryKey,
    project: P,
    request: F,
    rollback: B,
) -> ClientResult<R>
where
    T: Clone + Send + Sync + 'static,
    P: FnOnce(&mut T),
    F: FnOnce() -> Fut,
    Fut: Future<Output = ClientResult<R>>,
    B: FnOnce(&QueryCache, Snapshot),
{
    cache.cancel(key);
    let snapshot = cache.snapshot(key);
    if !cache.update::<T, _>(key, project) {
        tracing::debug!(key = %key, "Nothing cached to project onto");
    }

    match request().await {
        Ok(value) => Ok(value),
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "Optimistic update rolled back");
            rollback(cache, snapshot);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClientError;
    use reqwest::StatusCode;
    use serde_json::Value;

    fn key() -> QueryKey {
        QueryKey::new(["orders", "kitchen"])
    }

    #[tokio::test]
    async fn test_success_keeps_projection() {
        let cache = QueryCache::new();
        cache.set(&key(), vec![1i64, 2, 3]);

        let result = apply_optimistic::<Vec<i64>, _, _, _, _>(
            &cache,
            &key(),
            |orders| orders.retain(|id| *id != 2),
            || async { Ok("done") },
        )
        .await
        .unwrap();

        assert_eq!(result, "done");
        assert_eq!(*cache.get::<Vec<i64>>(&key()).unwrap(), vec![1, 3]);
    }

    #[tokio::test]
    async fn test_failure_restores_exact_snapshot() {
        let cache = QueryCache::new();
        cache.set(&key(), vec![1i64, 2, 3]);

        let err = apply_optimistic::<Vec<i64>, _, _, _, ()>(
            &cache,
            &key(),
            |orders| orders.clear(),
            || async {
                Err(ClientError::from_status(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Value::Null,
                ))
            },
        )
        .await
        .unwrap_err();

        assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert_eq!(*cache.get::<Vec<i64>>(&key()).unwrap(), vec![1, 2, 3]);
        assert!(!cache.is_stale(&key()));
    }

    #[tokio::test]
    async fn test_failure_restores_absence() {
        let cache = QueryCache::new();
        let shared = &cache;

        let _ = apply_optimistic::<Vec<i64>, _, _, _, ()>(
            shared,
            &key(),
            |orders| orders.push(9),
            move || async move {
                shared.set(&key(), vec![9i64]);
                Err(ClientError::Unauthorized)
            },
        )
        .await;

        assert!(cache.get::<Vec<i64>>(&key()).is_none());
    }

    #[tokio::test]
    async fn test_projection_supersedes_running_fetch() {
        let cache = QueryCache::new();
        cache.set(&key(), vec![1i64]);
        let ticket = cache.begin_fetch(&key());

        apply_optimistic::<Vec<i64>, _, _, _, _>(&cache, &key(), |o| o.clear(), || async {
            Ok(())
        })
        .await
        .unwrap();

        assert!(!cache.complete(&ticket, vec![1i64]));
        assert!(cache.get::<Vec<i64>>(&key()).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_custom_rollback() {
        let cache = QueryCache::new();
        cache.set(&key(), vec![1i64]);

        let _ = apply_optimistic_with::<Vec<i64>, _, _, _, (), _>(
            &cache,
            &key(),
            |o| o.clear(),
            || async { Err(ClientError::Unauthorized) },
            |cache, _snapshot| cache.remove(&key()),
        )
        .await;

        assert!(cache.get::<Vec<i64>>(&key()).is_none());
    }
}
