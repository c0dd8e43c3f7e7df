//! Binary entry point.

use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use streamwatch::api::{ApiServer, ApiServerConfig};
use streamwatch::control::SignalFiles;
use streamwatch::monitor::MonitorCoordinator;
use streamwatch::probe::HttpLiveProbe;
use streamwatch::recorder::FfmpegRecorder;
use streamwatch::streamer::Registry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("streamwatch=info")),
        )
        .init();

    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("STREAMWATCH_CONFIG").ok())
        .unwrap_or_else(|| "streamers_config.json".to_string());

    let registry = Registry::open(&config_path)
        .await
        .with_context(|| format!("failed to load configuration from {config_path}"))?;

    let probe = Arc::new(HttpLiveProbe::new().context("failed to build liveness probe")?);
    let recorder = Arc::new(FfmpegRecorder::from_env_or_default());
    let signals = SignalFiles::in_current_dir();

    let (coordinator, handle) = MonitorCoordinator::new(registry, probe, recorder, signals);

    let api_shutdown = CancellationToken::new();
    let api = ApiServer::new(ApiServerConfig::from_env_or_default(), handle.clone());
    let api_task = tokio::spawn({
        let token = api_shutdown.clone();
        async move {
            if let Err(e) = api.serve(token).await {
                error!(error = %e, "API server failed");
            }
        }
    });

    // Ctrl-C takes the same graceful path as every other stop request.
    tokio::spawn({
        let handle = handle.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received, requesting graceful stop");
                let _ = handle.stop("signal_interrupt").await;
            }
        }
    });

    let result = coordinator.run().await;

    api_shutdown.cancel();
    let _ = api_task.await;

    result.context("monitor loop failed")
}
