mod config;
mod runner;

use clap::Parser;
use distlock::CancellationToken;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging (stderr, stdout belongs to the command)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::parse();

    info!("Starting distlock-run");
    info!("  Key: {}", config.key);
    info!("  Nodes: {}", config.nodes.len());
    info!("  TTL: {:?}, tries: {}", config.ttl(), config.tries);

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let code = runner::run(&config, &cancel).await?;
    std::process::exit(code);
}

/// Cancel lock acquisition on Ctrl+C. Once the command runs, it receives the
/// signal itself and we only wait for it to exit before releasing.
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C");
                cancel.cancel();
            }
            Err(e) => warn!("Failed to listen for Ctrl+C: {}", e),
        }
    });
}
