//! Core traits and types for distlock storage nodes.
//!
//! This crate defines the contract every storage node must satisfy so that
//! the quorum mutex in `distlock` can drive it:
//! - `StorageDriver`: set-if-absent / get / delete with TTL expiry
//! - `DriverError`: node-level failures, folded into quorum counts upstream

mod driver;
mod error;

pub use driver::StorageDriver;
pub use error::DriverError;
