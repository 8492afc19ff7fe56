use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use dashmap::DashMap;
use distlock_core::StorageDriver;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::builder::MutexBuilder;
use crate::delay::RetryDelay;
use crate::error::LockError;
use crate::fanout::{self, NodeCall};
use crate::value::ValueGenerator;

/// A lock this instance acquired and has not released yet.
#[derive(Debug, Clone)]
pub(crate) struct HeldLock {
    value: Bytes,
    until: Instant,
}

/// Quorum mutex over a fixed pool of independent storage nodes.
///
/// A lock is acquired when a majority of nodes stored our token and the time
/// spent talking to them still leaves part of the TTL. The instance remembers
/// the tokens it holds so that `unlock` only removes its own records.
///
/// One `Mutex` may be shared (e.g. behind an `Arc`) and used concurrently
/// for different keys. Separate instances never share held locks, even
/// over the same nodes.
pub struct Mutex {
    pub(crate) pool: Vec<Arc<dyn StorageDriver>>,
    pub(crate) quorum: usize,
    pub(crate) tries: u32,
    pub(crate) value_generator: Box<dyn ValueGenerator>,
    pub(crate) retry_delay: Box<dyn RetryDelay>,
    pub(crate) node_timeout: Option<Duration>,
    pub(crate) held: DashMap<String, HeldLock>,
}

impl fmt::Debug for Mutex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mutex")
            .field("pool_size", &self.pool.len())
            .field("quorum", &self.quorum)
            .field("tries", &self.tries)
            .field("node_timeout", &self.node_timeout)
            .field("held", &self.held.len())
            .finish()
    }
}

impl Mutex {
    pub fn builder() -> MutexBuilder {
        MutexBuilder::new()
    }

    pub fn pool_size(&self) -> usize {
        self.pool.len()
    }

    /// Number of nodes that must agree: `pool_size / 2 + 1`.
    pub fn quorum(&self) -> usize {
        self.quorum
    }

    pub fn tries(&self) -> u32 {
        self.tries
    }

    /// Acquire `key` for `ttl`.
    ///
    /// # Returns
    /// * `Ok(())` - a quorum of nodes holds our token
    /// * `Err(LockError::AlreadyTaken)` - no valid quorum after all tries
    pub async fn lock(&self, key: &str, ttl: Duration) -> Result<(), LockError> {
        self.acquire(key, ttl, None).await
    }

    /// Same as `lock`, but gives up as soon as `cancel` fires. Node calls
    /// in flight at that moment count as failures.
    pub async fn lock_with_cancel(
        &self,
        cancel: &CancellationToken,
        key: &str,
        ttl: Duration,
    ) -> Result<(), LockError> {
        self.acquire(key, ttl, Some(cancel)).await
    }

    /// Release `key` if this instance holds it.
    ///
    /// Unlocking a key this instance never locked, or already unlocked, is a
    /// no-op. The local entry is dropped even when the release fails.
    ///
    /// # Returns
    /// * `Ok(())` - released on a quorum of nodes, or nothing to release
    /// * `Err(LockError::QuorumNotDeleted)` - fewer than quorum nodes confirmed
    pub async fn unlock(&self, key: &str) -> Result<(), LockError> {
        self.release(key, None).await
    }

    /// Same as `unlock`, with node calls abandoned once `cancel` fires.
    pub async fn unlock_with_cancel(
        &self,
        cancel: &CancellationToken,
        key: &str,
    ) -> Result<(), LockError> {
        self.release(key, Some(cancel)).await
    }

    /// Remaining validity of a lock held by this instance, as computed when
    /// it was acquired. `None` if not held or already expired.
    pub fn validity(&self, key: &str) -> Option<Duration> {
        let held = self.held.get(key)?;
        held.until
            .checked_duration_since(Instant::now())
            .filter(|left| !left.is_zero())
    }

    /// Whether this instance holds `key` and its validity has not run out.
    pub fn is_held(&self, key: &str) -> bool {
        self.validity(key).is_some()
    }

    fn node_call(&self, cancel: Option<&CancellationToken>) -> NodeCall {
        NodeCall {
            timeout: self.node_timeout,
            cancel: cancel.cloned(),
        }
    }

    #[instrument(skip(self, cancel), level = "debug")]
    async fn acquire(
        &self,
        key: &str,
        ttl: Duration,
        cancel: Option<&CancellationToken>,
    ) -> Result<(), LockError> {
        let call = self.node_call(cancel);
        let cancelled = || cancel.is_some_and(CancellationToken::is_cancelled);

        // One token per lock call, shared by every attempt
        let value = self.value_generator.generate();

        for attempt in 0..self.tries {
            if attempt > 0 {
                let delay = self.retry_delay.delay(attempt);
                debug!("Retrying lock on {} in {:?} (attempt {})", key, delay, attempt + 1);
                if !sleep_unless_cancelled(delay, cancel).await {
                    break;
                }
            }

            let start = Instant::now();
            let stored = fanout::store_all(&self.pool, key, &value, ttl, &call).await;
            let end = Instant::now();
            // An unrepresentable deadline (e.g. `Duration::MAX`) is a failed attempt
            let valid_until = end
                .checked_add(ttl.saturating_sub(end.duration_since(start)))
                .filter(|until| stored >= self.quorum && Instant::now() < *until);

            if let Some(until) = valid_until {
                self.held.insert(
                    key.to_string(),
                    HeldLock {
                        value: value.clone(),
                        until,
                    },
                );
                debug!(
                    "Acquired lock on {} ({}/{} nodes, valid for {:?})",
                    key,
                    stored,
                    self.pool.len(),
                    until.saturating_duration_since(Instant::now())
                );
                return Ok(());
            }

            debug!(
                "Lock on {} not acquired: {}/{} nodes (quorum {}), round trip {:?}",
                key,
                stored,
                self.pool.len(),
                self.quorum,
                end.duration_since(start)
            );

            // Roll back whatever partial stores went through
            fanout::delete_all(&self.pool, key, &value, &call).await;

            if cancelled() {
                debug!("Lock on {} cancelled", key);
                break;
            }
        }

        Err(LockError::AlreadyTaken)
    }

    #[instrument(skip(self, cancel), level = "debug")]
    async fn release(&self, key: &str, cancel: Option<&CancellationToken>) -> Result<(), LockError> {
        let Some((_, held)) = self.held.remove(key) else {
            debug!("Lock on {} not held by this instance (no-op)", key);
            return Ok(());
        };

        let call = self.node_call(cancel);
        let deleted = fanout::delete_all(&self.pool, key, &held.value, &call).await;
        if deleted < self.quorum {
            warn!(
                "Released lock on {} on {}/{} nodes only (quorum {}); remaining records expire with their TTL",
                key,
                deleted,
                self.pool.len(),
                self.quorum
            );
            return Err(LockError::QuorumNotDeleted);
        }

        debug!("Released lock on {} ({}/{} nodes)", key, deleted, self.pool.len());
        Ok(())
    }
}

/// Sleep for `delay`. Returns `false` if `cancel` fired first.
async fn sleep_unless_cancelled(delay: Duration, cancel: Option<&CancellationToken>) -> bool {
    match cancel {
        Some(token) => tokio::select! {
            biased;
            _ = token.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        },
        None => {
            tokio::time::sleep(delay).await;
            true
        }
    }
}
