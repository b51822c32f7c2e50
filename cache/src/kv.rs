use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::Duration;
use std::time::Instant;

use async_trait::async_trait;
use bbsweb_gate::Gate;

/// Request and connect timeout for KV calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KvError {
    /// The gate refused a slot; retriable, distinct from transport errors.
    #[error("cache pool too busy")]
    TooBusy,
    #[error("cache request timed out")]
    Timeout,
    #[error("cache transport: {0}")]
    Transport(String),
}

/// Byte-addressed external cache with TTL'd writes. A miss is first-class
/// (`Ok(None)`), never an error.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn fetch(&self, key: &str) -> Result<Option<Vec<u8>>, KvError>;
    async fn store(&self, key: &str, data: Vec<u8>, ttl: Duration) -> Result<(), KvError>;
}

/// Wraps a [`KvStore`] with the gate and the default request timeout. All
/// cache I/O in the workspace goes through this.
pub struct GatedStore {
    inner: Arc<dyn KvStore>,
    gate: Gate,
    timeout: Duration,
}

impl GatedStore {
    pub fn new(inner: Arc<dyn KvStore>, max_open: usize) -> Self {
        Self {
            inner,
            gate: Gate::new(max_open, max_open),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub async fn fetch(&self, key: &str) -> Result<Option<Vec<u8>>, KvError> {
        let Some(mut rsv) = self.gate.reserve() else {
            return Err(KvError::TooBusy);
        };
        rsv.wait().await;

        tokio::time::timeout(self.timeout, self.inner.fetch(key))
            .await
            .map_err(|_| KvError::Timeout)?
    }

    pub async fn store(&self, key: &str, data: Vec<u8>, ttl: Duration) -> Result<(), KvError> {
        let Some(mut rsv) = self.gate.reserve() else {
            return Err(KvError::TooBusy);
        };
        rsv.wait().await;

        // TTLs are whole seconds on the wire.
        let ttl = Duration::from_secs(ttl.as_secs());
        tokio::time::timeout(self.timeout, self.inner.store(key, data, ttl))
            .await
            .map_err(|_| KvError::Timeout)?
    }
}

/// In-process [`KvStore`] with lazy expiry. The production deployment points
/// at an external store; this one backs tests and single-node setups.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, (Vec<u8>, Instant)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn fetch(&self, key: &str) -> Result<Option<Vec<u8>>, KvError> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some((data, deadline)) = entries.get(key)
            && *deadline > Instant::now()
        {
            return Ok(Some(data.clone()));
        }
        entries.remove(key);
        Ok(None)
    }

    async fn store(&self, key: &str, data: Vec<u8>, ttl: Duration) -> Result<(), KvError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned(), (data, Instant::now() + ttl));
        Ok(())
    }
}
