use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::oneshot;
use tracing::warn;

use crate::GatedStore;
use crate::Key;
use crate::KvError;
use crate::KvStore;
use crate::SingleFlight;

/// Produces a fresh value (and its TTL) for a key on cache miss. Runs as a
/// detached task; at most one instance per key exists process-wide.
pub type Generator<K, V, E> =
    Arc<dyn Fn(K) -> BoxFuture<'static, Result<(V, Duration), E>> + Send + Sync>;

/// Owns the gated KV tier. Typed views share one manager so the gate bounds
/// all outbound cache traffic together.
pub struct CacheManager {
    store: GatedStore,
}

impl CacheManager {
    pub fn new(store: Arc<dyn KvStore>, max_open: usize) -> Arc<Self> {
        Arc::new(Self {
            store: GatedStore::new(store, max_open),
        })
    }

    pub async fn fetch(&self, key: &str) -> Result<Option<Vec<u8>>, KvError> {
        self.store.fetch(key).await
    }

    pub async fn store(&self, key: &str, data: Vec<u8>, ttl: Duration) -> Result<(), KvError> {
        self.store.store(key, data, ttl).await
    }

    /// A typed two-tier view over this manager for one entity kind.
    pub fn typed<K, V, E>(self: &Arc<Self>, generator: Generator<K, V, E>) -> TypedManager<K, V, E>
    where
        K: Key + Send + 'static,
        V: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
        E: Clone + Send + Sync + 'static,
    {
        TypedManager {
            inner: Arc::new(Inner {
                manager: Arc::clone(self),
                sf: SingleFlight::new(),
                generator,
            }),
        }
    }
}

/// Two-tier coalescing lookup for one entity type: KV fetch, then per-key
/// single-flight around the generator.
pub struct TypedManager<K, V, E> {
    inner: Arc<Inner<K, V, E>>,
}

impl<K, V, E> Clone for TypedManager<K, V, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<K, V, E> {
    manager: Arc<CacheManager>,
    sf: SingleFlight<Result<V, E>>,
    generator: Generator<K, V, E>,
}

impl<K, V, E> TypedManager<K, V, E>
where
    K: Key + Send + 'static,
    V: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    pub async fn get(&self, key: K) -> Result<V, E> {
        let key_string = key.cache_key();

        // Check if the request can be served from the KV tier.
        match self.inner.manager.fetch(&key_string).await {
            Ok(Some(data)) => match serde_json::from_slice(&data) {
                Ok(value) => return Ok(value),
                // A stale schema or corrupt entry regenerates instead of
                // failing the request.
                Err(err) => warn!("decode: key: {key_string:?}, err: {err}"),
            },
            Ok(None) => {}
            Err(err) => warn!("fetch: key: {key_string:?}, err: {err}"),
        }

        // No luck. Join the fan-in; the first requester generates.
        let (tx, rx) = oneshot::channel();
        if self.inner.sf.request(&key_string, tx) {
            tokio::spawn(Self::generate(Arc::clone(&self.inner), key, key_string));
        }

        match rx.await {
            Ok(result) => result,
            // The electee was torn down before fulfilling, which only a
            // runtime shutdown produces; park like any unfulfilled waiter.
            Err(_) => futures::future::pending().await,
        }
    }

    async fn generate(inner: Arc<Inner<K, V, E>>, key: K, key_string: String) {
        let result = match (inner.generator)(key).await {
            Ok((value, ttl)) => {
                // Store best-effort: a failed save never fails a request
                // that otherwise succeeded.
                match serde_json::to_vec(&value) {
                    Ok(data) => {
                        if let Err(err) = inner.manager.store(&key_string, data, ttl).await {
                            warn!("store: key: {key_string:?}, err: {err}");
                        }
                    }
                    Err(err) => warn!("serialize: key: {key_string:?}, err: {err}"),
                }
                Ok(value)
            }
            Err(err) => Err(err),
        };

        // Respond to all audience, the error case included.
        inner.sf.fulfill(&key_string, result);
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use futures::FutureExt;
    use pretty_assertions::assert_eq;

    use crate::MemoryStore;

    use super::*;

    struct TestKey(&'static str);

    impl Key for TestKey {
        fn cache_key(&self) -> String {
            format!("test:{}", self.0)
        }
    }

    fn counting_generator(
        calls: Arc<AtomicUsize>,
        delay: Duration,
    ) -> Generator<TestKey, String, String> {
        Arc::new(move |key: TestKey| {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(delay).await;
                Ok((format!("value-for-{}", key.0), Duration::from_secs(60)))
            }
            .boxed()
        })
    }

    #[tokio::test]
    async fn concurrent_misses_coalesce_onto_one_generator() {
        let manager = CacheManager::new(Arc::new(MemoryStore::new()), 4);
        let calls = Arc::new(AtomicUsize::new(0));
        let typed = manager.typed(counting_generator(
            Arc::clone(&calls),
            Duration::from_millis(50),
        ));

        let mut tasks = Vec::new();
        for _ in 0..100 {
            let typed = typed.clone();
            tasks.push(tokio::spawn(async move { typed.get(TestKey("k")).await }));
        }
        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap(), "value-for-k");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // A late arrival is served from the KV tier without regenerating.
        assert_eq!(typed.get(TestKey("k")).await.unwrap(), "value-for-k");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_keys_generate_independently() {
        let manager = CacheManager::new(Arc::new(MemoryStore::new()), 4);
        let calls = Arc::new(AtomicUsize::new(0));
        let typed = manager.typed(counting_generator(Arc::clone(&calls), Duration::ZERO));

        assert_eq!(typed.get(TestKey("a")).await.unwrap(), "value-for-a");
        assert_eq!(typed.get(TestKey("b")).await.unwrap(), "value-for-b");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn generator_errors_reach_every_waiter_and_are_not_cached() {
        let manager = CacheManager::new(Arc::new(MemoryStore::new()), 4);
        let attempts = Arc::new(AtomicUsize::new(0));
        let typed: TypedManager<TestKey, String, String> = manager.typed(Arc::new({
            let attempts = Arc::clone(&attempts);
            move |_key: TestKey| {
                let attempts = Arc::clone(&attempts);
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Err("boom".to_owned())
                }
                .boxed()
            }
        }));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let typed = typed.clone();
            tasks.push(tokio::spawn(async move { typed.get(TestKey("k")).await }));
        }
        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap_err(), "boom");
        }

        // Errors are not stored; the next lookup tries again.
        assert_eq!(typed.get(TestKey("k")).await.unwrap_err(), "boom");
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn undecodable_cached_bytes_regenerate() {
        let store = Arc::new(MemoryStore::new());
        store
            .store("test:k", b"not json".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();

        let manager = CacheManager::new(store, 4);
        let calls = Arc::new(AtomicUsize::new(0));
        let typed = manager.typed(counting_generator(Arc::clone(&calls), Duration::ZERO));

        assert_eq!(typed.get(TestKey("k")).await.unwrap(), "value-for-k");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
