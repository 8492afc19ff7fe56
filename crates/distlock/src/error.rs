use thiserror::Error;

/// Errors returned by `Mutex::lock` and `Mutex::unlock`.
///
/// Node-level failures never show up here: they are only counted against
/// the quorum.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockError {
    /// No valid quorum was reached within the configured number of tries.
    #[error("Lock key is already in use")]
    AlreadyTaken,

    /// Fewer than quorum nodes confirmed deleting our lock value.
    /// The remaining records still expire with their TTL.
    #[error("Could not unlock quorum")]
    QuorumNotDeleted,
}

/// Misconfiguration detected while building a `Mutex`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("At least one storage driver is required")]
    NoDrivers,

    #[error("Storage driver count must be odd to prevent split brain, got {0}")]
    EvenDriverCount(usize),
}
