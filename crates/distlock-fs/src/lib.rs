//! Directory-backed storage node for distlock.
//!
//! Each `FileDriver` directory is one node. Processes pointing at the same
//! directory see the same node, so a host can run a quorum across several
//! directories (ideally on different disks or mounts).

mod driver;
mod record;

pub use driver::FileDriver;
