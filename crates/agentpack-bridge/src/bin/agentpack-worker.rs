// ABOUTME: Worker process for isolated tool calls: reads one envelope on stdin, writes events to stdout.
// ABOUTME: Logs go to stderr, which the parent captures and reports if the worker fails.

use agentpack_bridge::{DirectTransport, run_worker};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("agentpack=warn")),
        )
        .init();

    let transport = DirectTransport::new();
    run_worker(tokio::io::stdin(), tokio::io::stdout(), &transport).await?;
    Ok(())
}
