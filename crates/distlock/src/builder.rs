use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use distlock_core::StorageDriver;

use crate::delay::{JitteredDelay, RetryDelay};
use crate::error::ConfigError;
use crate::mutex::Mutex;
use crate::value::{RandomValueGenerator, ValueGenerator};

/// Builder for `Mutex`.
///
/// Only the storage drivers are required. Defaults: one try, 16 random
/// bytes per token, `JitteredDelay` between tries, no per-node timeout.
pub struct MutexBuilder {
    drivers: Vec<Arc<dyn StorageDriver>>,
    tries: u32,
    value_generator: Box<dyn ValueGenerator>,
    retry_delay: Box<dyn RetryDelay>,
    node_timeout: Option<Duration>,
}

impl Default for MutexBuilder {
    fn default() -> Self {
        Self {
            drivers: Vec::new(),
            tries: 1,
            value_generator: Box::new(RandomValueGenerator::default()),
            retry_delay: Box::new(JitteredDelay::default()),
            node_timeout: None,
        }
    }
}

impl MutexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one storage node to the pool.
    pub fn driver(mut self, driver: Arc<dyn StorageDriver>) -> Self {
        self.drivers.push(driver);
        self
    }

    /// Add several storage nodes to the pool, keeping their order.
    pub fn drivers<I>(mut self, drivers: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn StorageDriver>>,
    {
        self.drivers.extend(drivers);
        self
    }

    /// Maximum number of lock attempts per `lock` call. Zero is raised to one.
    pub fn tries(mut self, tries: u32) -> Self {
        self.tries = tries.max(1);
        self
    }

    pub fn value_generator<G>(mut self, generator: G) -> Self
    where
        G: ValueGenerator + 'static,
    {
        self.value_generator = Box::new(generator);
        self
    }

    pub fn retry_delay<D>(mut self, delay: D) -> Self
    where
        D: RetryDelay + 'static,
    {
        self.retry_delay = Box::new(delay);
        self
    }

    /// Bound every single node call. A node that does not answer in time
    /// counts as failed for that fan-out.
    ///
    /// The timeout only stops waiting: work the driver already handed off
    /// (such as a blocking file write on `spawn_blocking`) may still complete
    /// on the node afterwards. A record written that way is not reached by
    /// the compensating delete and stays until its TTL expires, so the key
    /// may look taken for up to one TTL after a failed attempt.
    pub fn node_timeout(mut self, timeout: Duration) -> Self {
        self.node_timeout = Some(timeout);
        self
    }

    /// Validate the pool and build the mutex.
    ///
    /// The pool must hold an odd number of nodes so that two disjoint halves
    /// can never both reach a majority.
    pub fn build(self) -> Result<Mutex, ConfigError> {
        let pool_size = self.drivers.len();
        if pool_size == 0 {
            return Err(ConfigError::NoDrivers);
        }
        if pool_size % 2 == 0 {
            return Err(ConfigError::EvenDriverCount(pool_size));
        }

        Ok(Mutex {
            quorum: pool_size / 2 + 1,
            pool: self.drivers,
            tries: self.tries,
            value_generator: self.value_generator,
            retry_delay: self.retry_delay,
            node_timeout: self.node_timeout,
            held: DashMap::new(),
        })
    }
}
