//! In-memory storage node for distlock.
//!
//! Every `MemoryDriver` is an independent node. Building a pool out of
//! several of them gives a fully in-process quorum, which is what the
//! `distlock` tests run against.

mod driver;

pub use driver::MemoryDriver;
