use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use distlock::{CancellationToken, LockError, Mutex, StorageDriver};
use distlock_fs::FileDriver;
use tokio::process::Command;
use tracing::{info, warn};

use crate::config::Config;

/// Exit code when the lock is held by someone else (EX_TEMPFAIL).
pub const EXIT_LOCK_TAKEN: i32 = 75;

/// Exit code when acquisition was interrupted.
pub const EXIT_INTERRUPTED: i32 = 130;

/// Build the quorum mutex over the configured node directories.
pub fn build_mutex(config: &Config) -> anyhow::Result<Mutex> {
    let pool = config
        .nodes
        .iter()
        .map(|dir| Arc::new(FileDriver::new(dir)) as Arc<dyn StorageDriver>);

    let mut builder = Mutex::builder().drivers(pool).tries(config.tries);
    if let Some(timeout) = config.node_timeout() {
        builder = builder.node_timeout(timeout);
    }
    builder.build().context("Invalid node configuration")
}

/// Acquire the lock, run the command, release the lock.
///
/// Returns the exit code to leave the process with.
pub async fn run(config: &Config, cancel: &CancellationToken) -> anyhow::Result<i32> {
    let mutex = build_mutex(config)?;
    let key = config.key.as_str();

    match mutex.lock_with_cancel(cancel, key, config.ttl()).await {
        Ok(()) => {}
        Err(_) if cancel.is_cancelled() => {
            info!("Interrupted while acquiring {}", key);
            return Ok(EXIT_INTERRUPTED);
        }
        Err(e) => {
            warn!("Could not acquire {}: {}", key, e);
            return Ok(EXIT_LOCK_TAKEN);
        }
    }
    info!(
        "Acquired {} (quorum {} of {} nodes), valid for {:?}",
        key,
        mutex.quorum(),
        mutex.pool_size(),
        mutex.validity(key).unwrap_or_default()
    );

    let started = Instant::now();
    let status = Command::new(&config.command[0])
        .args(&config.command[1..])
        .status()
        .await
        .with_context(|| format!("Failed to run {}", config.command[0]));

    if !mutex.is_held(key) {
        warn!(
            "Command ran for {:?}, longer than the lock on {} was valid",
            started.elapsed(),
            key
        );
    }

    match mutex.unlock(key).await {
        Ok(()) => info!("Released {}", key),
        Err(LockError::QuorumNotDeleted) => {
            warn!("Released {} on a minority of nodes; it will expire with its TTL", key)
        }
        Err(e) => warn!("Failed to release {}: {}", key, e),
    }

    let status = status?;
    info!("Command exited with {}", status);
    Ok(status.code().unwrap_or(1))
}
