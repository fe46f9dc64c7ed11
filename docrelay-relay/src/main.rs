use docrelay_config::shared::RelayConfig;
use docrelay_telemetry::init_tracing_with_pipeline;
use tracing::error;

use crate::config::load_relay_config;
use crate::core::start_relay_with_config;

mod config;
mod core;

fn main() -> anyhow::Result<()> {
    let relay_config = load_relay_config()?;

    // Json log lines are tagged with the pipeline name.
    let _log_flusher = init_tracing_with_pipeline(
        env!("CARGO_BIN_NAME"),
        Some(relay_config.pipeline.name.clone()),
    )?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main(relay_config))?;

    Ok(())
}

async fn async_main(relay_config: RelayConfig) -> anyhow::Result<()> {
    if let Err(err) = start_relay_with_config(relay_config).await {
        error!("an error occurred in the relay: {err}");

        return Err(err);
    }

    Ok(())
}
