use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use distlock_core::{DriverError, StorageDriver};
use tracing::{debug, instrument};

/// A stored value and the instant it stops being live.
#[derive(Debug, Clone)]
struct Record {
    value: Bytes,
    expires_at: Instant,
}

impl Record {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// In-memory storage node.
///
/// Records expire lazily: an expired record stays in the map until it is
/// overwritten, deleted or purged, but is never reported as live.
#[derive(Debug, Default)]
pub struct MemoryDriver {
    records: RwLock<HashMap<String, Record>>,
}

impl MemoryDriver {
    /// Create a new empty node.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live records on this node.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        records.values().filter(|r| r.is_live(now)).count()
    }

    /// Whether the node holds no live record.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Physically remove expired records. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        let before = records.len();
        records.retain(|_, r| r.is_live(now));
        before - records.len()
    }
}

#[async_trait]
impl StorageDriver for MemoryDriver {
    fn driver_name(&self) -> &'static str {
        "memory"
    }

    #[instrument(skip(self, value), level = "debug", fields(value_len = value.len()))]
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), DriverError> {
        let now = Instant::now();
        let expires_at = now
            .checked_add(ttl)
            .ok_or_else(|| DriverError::Internal(format!("TTL out of range: {:?}", ttl)))?;
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = records.get(key) {
            if existing.is_live(now) {
                return Err(DriverError::AlreadyExists(key.to_string()));
            }
            debug!("Overwriting expired record {}", key);
        }

        records.insert(
            key.to_string(),
            Record {
                value: Bytes::copy_from_slice(value),
                expires_at,
            },
        );
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn get(&self, key: &str) -> Result<Bytes, DriverError> {
        let now = Instant::now();
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        match records.get(key) {
            Some(record) if record.is_live(now) => Ok(record.value.clone()),
            _ => Err(DriverError::NotFound(key.to_string())),
        }
    }

    #[instrument(skip(self), level = "debug")]
    async fn delete(&self, key: &str) -> Result<(), DriverError> {
        let now = Instant::now();
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        match records.remove(key) {
            Some(record) if record.is_live(now) => Ok(()),
            _ => Err(DriverError::NotFound(key.to_string())),
        }
    }
}
