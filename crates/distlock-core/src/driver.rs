use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::DriverError;

/// A single independent storage node taking part in a quorum lock.
///
/// Nodes know nothing about each other. Each one only has to keep records
/// that expire on their own once their TTL has passed. A record whose expiry
/// is in the past is logically absent, even if it has not been purged yet.
///
/// Each operation must be atomic on the node itself; atomicity across nodes
/// is approximated by the mutex, never by the driver.
#[async_trait]
pub trait StorageDriver: Send + Sync {
    /// Short backend name used in logs (e.g. "memory", "fs").
    fn driver_name(&self) -> &'static str;

    /// Store `value` under `key` for `ttl`, only if no live record exists.
    ///
    /// # Returns
    /// * `Ok(())` - the record was written
    /// * `Err(DriverError::AlreadyExists)` - a live record already holds the key
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), DriverError>;

    /// Get the value of the live record stored under `key`.
    ///
    /// Returns `Err(DriverError::NotFound)` if there is no live record.
    async fn get(&self, key: &str) -> Result<Bytes, DriverError>;

    /// Remove the record stored under `key`.
    ///
    /// Returns `Err(DriverError::NotFound)` if there is no record.
    async fn delete(&self, key: &str) -> Result<(), DriverError>;
}
