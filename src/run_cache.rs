//! Per-run memoization for scrape results. One enrichment pass touches
//! the same team pages many times (both teams of every match, shared
//! standings tables), and every fetch costs a browser tab.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;

use tokio::sync::Mutex;

/// A run-scoped cache. The lock is held across the fill future, so when
/// both teams of one match race for the same key only one fetch happens.
pub struct RunCache<K, V> {
    inner: Mutex<HashMap<K, V>>,
}

impl<K, V> RunCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached value for `key`, or awaits `fill` once and
    /// caches its result. Errors are not cached; the next caller retries.
    pub async fn get_or_try_insert<E, F, Fut>(&self, key: K, fill: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let mut map = self.inner.lock().await;
        if let Some(value) = map.get(&key) {
            return Ok(value.clone());
        }
        let value = fill().await?;
        map.insert(key, value.clone());
        Ok(value)
    }
}

impl<K, V> Default for RunCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn second_lookup_does_not_refetch() {
        let cache: RunCache<String, Vec<String>> = RunCache::new();
        let fetches = AtomicU32::new(0);

        for _ in 0..2 {
            let roster: Result<_, ()> = cache
                .get_or_try_insert("Karmine Corp Blue".to_string(), || async {
                    fetches.fetch_add(1, Ordering::SeqCst);
                    Ok(vec!["player".to_string()])
                })
                .await;
            assert_eq!(roster.unwrap().len(), 1);
        }

        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn errors_are_not_cached() {
        let cache: RunCache<&str, u32> = RunCache::new();
        let calls = AtomicU32::new(0);

        let first: Result<u32, &str> = cache
            .get_or_try_insert("key", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("down")
            })
            .await;
        assert!(first.is_err());

        let second: Result<u32, &str> = cache
            .get_or_try_insert("key", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(7)
            })
            .await;
        assert_eq!(second.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
