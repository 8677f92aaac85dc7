//! Keyed once-per-key cache used for tenant connection pools and lead
//! schemas. Concurrent first-time callers for the same key are coalesced:
//! one runs the init future, the rest wait for and share its result.
//! Different keys never contend on a creation lock.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::{OnceCell, RwLock};

#[derive(Debug)]
pub struct ConnectionCache<T> {
    cells: RwLock<HashMap<String, Arc<OnceCell<T>>>>,
}

impl<T: Clone> ConnectionCache<T> {
    pub fn new() -> Self {
        Self {
            cells: RwLock::new(HashMap::new()),
        }
    }

    /// Return the cached value for `key`, or run `init` to produce it.
    /// The map lock is held only long enough to claim the per-key cell, so
    /// slow initialization of one key never blocks lookups of another.
    pub async fn get_or_try_init<F, Fut, E>(&self, key: &str, init: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        // Fast path: the cell already exists
        let cell = {
            let cells = self.cells.read().await;
            cells.get(key).cloned()
        };

        let cell = match cell {
            Some(cell) => cell,
            None => {
                let mut cells = self.cells.write().await;
                cells
                    .entry(key.to_string())
                    .or_insert_with(|| Arc::new(OnceCell::new()))
                    .clone()
            }
        };

        cell.get_or_try_init(init).await.map(|value| value.clone())
    }

    /// Peek at a cached value without initializing.
    pub async fn get(&self, key: &str) -> Option<T> {
        let cells = self.cells.read().await;
        cells.get(key).and_then(|cell| cell.get().cloned())
    }

    /// Drop the cell for `key` so the next caller re-initializes. Returns
    /// the previously cached value, if initialization had completed.
    pub async fn evict(&self, key: &str) -> Option<T> {
        let mut cells = self.cells.write().await;
        cells.remove(key).and_then(|cell| cell.get().cloned())
    }

    /// Remove and return every initialized entry (e.g. on shutdown).
    pub async fn drain(&self) -> Vec<(String, T)> {
        let mut cells = self.cells.write().await;
        cells
            .drain()
            .filter_map(|(key, cell)| cell.get().cloned().map(|value| (key, value)))
            .collect()
    }
}

impl<T: Clone> Default for ConnectionCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn sequential_calls_initialize_once() {
        let cache = ConnectionCache::<u32>::new();
        let opened = AtomicUsize::new(0);

        for _ in 0..5 {
            let value: Result<u32, Infallible> = cache
                .get_or_try_init("tenant_alice", || async {
                    opened.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                })
                .await;
            assert_eq!(value.unwrap(), 7);
        }

        assert_eq!(opened.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_time_calls_are_coalesced() {
        let cache = Arc::new(ConnectionCache::<u32>::new());
        let opened = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let cache = cache.clone();
            let opened = opened.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_try_init("tenant_alice", || async move {
                        opened.fetch_add(1, Ordering::SeqCst);
                        // Widen the race window so losers really do wait
                        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                        Ok::<u32, Infallible>(42)
                    })
                    .await
                    .unwrap()
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), 42);
        }
        assert_eq!(opened.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_keys_initialize_independently() {
        let cache = ConnectionCache::<String>::new();

        let a: Result<String, Infallible> = cache
            .get_or_try_init("tenant_alice", || async { Ok("a".to_string()) })
            .await;
        let b: Result<String, Infallible> = cache
            .get_or_try_init("tenant_bob", || async { Ok("b".to_string()) })
            .await;

        assert_eq!(a.unwrap(), "a");
        assert_eq!(b.unwrap(), "b");
    }

    #[tokio::test]
    async fn failed_init_leaves_cell_retryable() {
        let cache = ConnectionCache::<u32>::new();

        let failed: Result<u32, &str> = cache
            .get_or_try_init("tenant_alice", || async { Err("unreachable") })
            .await;
        assert!(failed.is_err());

        let recovered: Result<u32, &str> = cache
            .get_or_try_init("tenant_alice", || async { Ok(1) })
            .await;
        assert_eq!(recovered.unwrap(), 1);
    }

    #[tokio::test]
    async fn evicted_keys_reinitialize() {
        let cache = ConnectionCache::<u32>::new();

        let first: Result<u32, Infallible> = cache
            .get_or_try_init("tenant_alice", || async { Ok(1) })
            .await;
        assert_eq!(first.unwrap(), 1);

        assert_eq!(cache.evict("tenant_alice").await, Some(1));

        let second: Result<u32, Infallible> = cache
            .get_or_try_init("tenant_alice", || async { Ok(9) })
            .await;
        assert_eq!(second.unwrap(), 9);
        assert_eq!(cache.get("tenant_alice").await, Some(9));
    }
}
