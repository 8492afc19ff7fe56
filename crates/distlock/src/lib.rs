//! Distributed mutual exclusion over independent key-value nodes.
//!
//! A lock on a key is held only when a majority of the configured storage
//! nodes accepted the same random value for it, and enough of the requested
//! TTL is left once every node has answered. Nodes never talk to each other;
//! all coordination happens here, in the client.
//!
//! - `Mutex`: lock / unlock with quorum counting, retries and ownership checks
//! - `MutexBuilder`: pool, tries, value generator, retry delay, node timeout
//! - `ValueGenerator` / `RetryDelay`: pluggable strategies
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use std::time::Duration;
//! # use distlock::{LockError, Mutex, StorageDriver};
//! # async fn demo(nodes: Vec<Arc<dyn StorageDriver>>) -> Result<(), Box<dyn std::error::Error>> {
//! let mutex = Mutex::builder().drivers(nodes).tries(3).build()?;
//!
//! match mutex.lock("orders:42", Duration::from_secs(5)).await {
//!     Ok(()) => {
//!         // critical section
//!         mutex.unlock("orders:42").await?;
//!     }
//!     Err(LockError::AlreadyTaken) => { /* someone else holds it */ }
//!     Err(e) => return Err(e.into()),
//! }
//! # Ok(())
//! # }
//! ```

mod builder;
mod delay;
mod error;
mod fanout;
mod mutex;
mod value;

#[cfg(test)]
mod test_support;

pub use builder::MutexBuilder;
pub use delay::{JitteredDelay, RetryDelay};
pub use distlock_core::{DriverError, StorageDriver};
pub use error::{ConfigError, LockError};
pub use mutex::Mutex;
pub use tokio_util::sync::CancellationToken;
pub use value::{RandomValueGenerator, ValueGenerator};
