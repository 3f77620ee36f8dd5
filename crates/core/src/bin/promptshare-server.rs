//! promptshare-server: serve the prompt library over WebSocket JSON-RPC

use std::sync::Arc;

use anyhow::Context;
use promptshare_core::{app::App, config::Config, logging, runtime, server};

fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("failed to load configuration")?;
    logging::init(&config.log_level);

    runtime::block_on(run(config))
}

async fn run(config: Config) -> anyhow::Result<()> {
    let app = Arc::new(App::open(config).await.context("failed to open store")?);
    let handle = server::start(app).await.context("failed to start server")?;

    println!("{}", handle.url());

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    tracing::info!("shutting down");
    handle.stop().await;
    Ok(())
}
