//! Misbehaving storage nodes for tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use distlock_core::{DriverError, StorageDriver};
use distlock_memory::MemoryDriver;

/// Coerce concrete memory nodes into a pool.
pub(crate) fn as_pool(nodes: &[Arc<MemoryDriver>]) -> Vec<Arc<dyn StorageDriver>> {
    nodes
        .iter()
        .map(|n| Arc::clone(n) as Arc<dyn StorageDriver>)
        .collect()
}

/// A node that is unreachable.
pub(crate) struct FailingDriver;

#[async_trait]
impl StorageDriver for FailingDriver {
    fn driver_name(&self) -> &'static str {
        "failing"
    }

    async fn set(&self, _key: &str, _value: &[u8], _ttl: Duration) -> Result<(), DriverError> {
        Err(DriverError::Io("connection refused".to_string()))
    }

    async fn get(&self, _key: &str) -> Result<Bytes, DriverError> {
        Err(DriverError::Io("connection refused".to_string()))
    }

    async fn delete(&self, _key: &str) -> Result<(), DriverError> {
        Err(DriverError::Io("connection refused".to_string()))
    }
}

/// A node whose client code panics.
pub(crate) struct PanickingDriver;

#[async_trait]
impl StorageDriver for PanickingDriver {
    fn driver_name(&self) -> &'static str {
        "panicking"
    }

    async fn set(&self, _key: &str, _value: &[u8], _ttl: Duration) -> Result<(), DriverError> {
        panic!("driver bug in set");
    }

    async fn get(&self, _key: &str) -> Result<Bytes, DriverError> {
        panic!("driver bug in get");
    }

    async fn delete(&self, _key: &str) -> Result<(), DriverError> {
        panic!("driver bug in delete");
    }
}

/// A healthy memory node behind a slow link.
pub(crate) struct SlowDriver {
    latency: Duration,
    inner: MemoryDriver,
}

impl SlowDriver {
    pub(crate) fn new(latency: Duration) -> Self {
        Self {
            latency,
            inner: MemoryDriver::new(),
        }
    }
}

#[async_trait]
impl StorageDriver for SlowDriver {
    fn driver_name(&self) -> &'static str {
        "slow"
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), DriverError> {
        tokio::time::sleep(self.latency).await;
        self.inner.set(key, value, ttl).await
    }

    async fn get(&self, key: &str) -> Result<Bytes, DriverError> {
        tokio::time::sleep(self.latency).await;
        self.inner.get(key).await
    }

    async fn delete(&self, key: &str) -> Result<(), DriverError> {
        tokio::time::sleep(self.latency).await;
        self.inner.delete(key).await
    }
}

/// A memory node that accepts any TTL, capping it at an hour internally.
pub(crate) struct LenientDriver {
    inner: MemoryDriver,
}

impl LenientDriver {
    pub(crate) fn new() -> Self {
        Self {
            inner: MemoryDriver::new(),
        }
    }
}

#[async_trait]
impl StorageDriver for LenientDriver {
    fn driver_name(&self) -> &'static str {
        "lenient"
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), DriverError> {
        self.inner
            .set(key, value, ttl.min(Duration::from_secs(3600)))
            .await
    }

    async fn get(&self, key: &str) -> Result<Bytes, DriverError> {
        self.inner.get(key).await
    }

    async fn delete(&self, key: &str) -> Result<(), DriverError> {
        self.inner.delete(key).await
    }
}

/// A node whose writes run on a detached task, like a driver doing blocking
/// I/O on `spawn_blocking`. Dropping the call does not stop the write.
pub(crate) struct DetachedDriver {
    latency: Duration,
    inner: Arc<MemoryDriver>,
}

impl DetachedDriver {
    pub(crate) fn new(latency: Duration) -> Self {
        Self {
            latency,
            inner: Arc::new(MemoryDriver::new()),
        }
    }

    pub(crate) fn live_records(&self) -> usize {
        self.inner.len()
    }
}

#[async_trait]
impl StorageDriver for DetachedDriver {
    fn driver_name(&self) -> &'static str {
        "detached"
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), DriverError> {
        let inner = Arc::clone(&self.inner);
        let latency = self.latency;
        let key = key.to_string();
        let value = value.to_vec();
        tokio::spawn(async move {
            tokio::time::sleep(latency).await;
            inner.set(&key, &value, ttl).await
        })
        .await
        .map_err(|e| DriverError::Internal(e.to_string()))?
    }

    async fn get(&self, key: &str) -> Result<Bytes, DriverError> {
        self.inner.get(key).await
    }

    async fn delete(&self, key: &str) -> Result<(), DriverError> {
        self.inner.delete(key).await
    }
}
