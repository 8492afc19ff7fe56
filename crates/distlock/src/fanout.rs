//! Quorum fan-out: run one operation against every node in parallel and
//! count how many succeeded.
//!
//! Every fan-out waits for all nodes. A partial success still counts towards
//! the quorum, so nothing is short-circuited on the first failure.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use distlock_core::StorageDriver;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// How a single node call is bounded.
#[derive(Debug, Clone, Default)]
pub(crate) struct NodeCall {
    pub timeout: Option<Duration>,
    pub cancel: Option<CancellationToken>,
}

impl NodeCall {
    /// Run `op`, turning an elapsed timeout or a cancellation into a failure.
    async fn run<Fut>(self, op: Fut) -> bool
    where
        Fut: Future<Output = bool>,
    {
        let NodeCall { timeout, cancel } = self;
        let bounded = async move {
            match timeout {
                Some(limit) => tokio::time::timeout(limit, op).await.unwrap_or(false),
                None => op.await,
            }
        };

        match cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => false,
                ok = bounded => ok,
            },
            None => bounded.await,
        }
    }
}

/// Spawn `op` once per node, join all of them and count the `true` results.
async fn count_successes<F, Fut>(pool: &[Arc<dyn StorageDriver>], call: &NodeCall, op: F) -> usize
where
    F: Fn(Arc<dyn StorageDriver>) -> Fut,
    Fut: Future<Output = bool> + Send + 'static,
{
    let mut tasks = JoinSet::new();
    for driver in pool {
        tasks.spawn(call.clone().run(op(Arc::clone(driver))));
    }

    let mut successes = 0;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(true) => successes += 1,
            Ok(false) => {}
            Err(e) => warn!("Node task failed: {}", e),
        }
    }
    successes
}

/// Set `key = value` with `ttl` on every node. Returns the number of nodes
/// that accepted the record.
pub(crate) async fn store_all(
    pool: &[Arc<dyn StorageDriver>],
    key: &str,
    value: &Bytes,
    ttl: Duration,
    call: &NodeCall,
) -> usize {
    let key: Arc<str> = Arc::from(key);
    count_successes(pool, call, |driver| {
        let key = Arc::clone(&key);
        let value = value.clone();
        async move {
            match driver.set(&key, &value, ttl).await {
                Ok(()) => true,
                Err(e) => {
                    debug!("{} node rejected store of {}: {}", driver.driver_name(), key, e);
                    false
                }
            }
        }
    })
    .await
}

/// Delete `key` from every node whose record still holds exactly `value`.
/// Returns the number of nodes where our record was found and removed.
///
/// A record with a different value belongs to another owner (ours expired
/// and the key was taken again) and is left alone.
pub(crate) async fn delete_all(
    pool: &[Arc<dyn StorageDriver>],
    key: &str,
    value: &Bytes,
    call: &NodeCall,
) -> usize {
    let key: Arc<str> = Arc::from(key);
    count_successes(pool, call, |driver| {
        let key = Arc::clone(&key);
        let value = value.clone();
        async move {
            let stored = match driver.get(&key).await {
                Ok(stored) => stored,
                Err(e) => {
                    debug!("{} node has no record for {}: {}", driver.driver_name(), key, e);
                    return false;
                }
            };
            if stored != value {
                debug!("{} node holds another owner's value for {}", driver.driver_name(), key);
                return false;
            }
            match driver.delete(&key).await {
                Ok(()) => true,
                Err(e) => {
                    debug!("{} node failed to delete {}: {}", driver.driver_name(), key, e);
                    false
                }
            }
        }
    })
    .await
}
