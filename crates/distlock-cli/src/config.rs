use std::path::PathBuf;
use std::time::Duration;

use clap::builder::NonEmptyStringValueParser;
use clap::Parser;

/// Configuration for distlock-run.
#[derive(Parser, Debug, Clone)]
#[command(name = "distlock-run")]
#[command(about = "Run a command while holding a quorum lock over directory nodes")]
pub struct Config {
    /// Node directories (odd count). Repeat the flag or pass a comma-separated list.
    #[arg(long = "node", required = true, value_delimiter = ',', env = "DISTLOCK_NODES")]
    pub nodes: Vec<PathBuf>,

    /// Name of the resource to lock
    #[arg(long, env = "DISTLOCK_KEY", value_parser = NonEmptyStringValueParser::new())]
    pub key: String,

    /// Lock time-to-live in milliseconds
    #[arg(long, default_value = "30000", env = "DISTLOCK_TTL_MS", value_parser = clap::value_parser!(u64).range(1..))]
    pub ttl_ms: u64,

    /// Lock attempts before giving up
    #[arg(long, default_value = "1", env = "DISTLOCK_TRIES")]
    pub tries: u32,

    /// Per-node call timeout in milliseconds
    #[arg(long, env = "DISTLOCK_NODE_TIMEOUT_MS")]
    pub node_timeout_ms: Option<u64>,

    /// Command to run while the lock is held
    #[arg(last = true, required = true)]
    pub command: Vec<String>,
}

impl Config {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    pub fn node_timeout(&self) -> Option<Duration> {
        self.node_timeout_ms.map(Duration::from_millis)
    }
}
