use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fpu_core::DriverConfig;
use fpu_driver::{
    shared_store, Dispatcher, FeedbackHandle, LoggingClock, LoggingSink, NmeaDriver, TickWriter,
};

#[derive(Parser)]
#[command(name = "fpu-bridge")]
#[command(about = "Bridge NMEA 0183 FPU devices over UDP to a downstream tag sink")]
struct Args {
    /// Path to the JSON configuration document
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Validate the configuration and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,fpu_driver=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    // Configuration is the only fatal error
    let config = match DriverConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(path = %args.config.display(), "failed to load configuration: {}", e);
            return Err(e)
                .with_context(|| format!("loading configuration from {}", args.config.display()));
        }
    };
    tracing::info!(
        path = %args.config.display(),
        devices = config.devices.len(),
        write_tags = config.write_tags.len(),
        "configuration loaded"
    );
    if args.check {
        return Ok(());
    }
    let config = Arc::new(config);

    let store = shared_store(config.devices.iter().map(|d| d.name.as_str()));
    let mut driver = NmeaDriver::new(&config);
    let events = driver
        .take_events()
        .context("driver event stream already taken")?;
    let cancel = CancellationToken::new();

    let feedback = FeedbackHandle::new(store.clone(), config.clone());
    for path in feedback.subscription_paths() {
        tracing::debug!(%path, "feedback path");
    }

    let dispatch_handle = tokio::spawn(Dispatcher::new(store.clone()).run(events, cancel.clone()));

    let writer = TickWriter::new(
        config.clone(),
        store.clone(),
        Arc::new(LoggingSink),
        Arc::new(LoggingClock),
    );
    let writer_handle = tokio::spawn(writer.run(cancel.clone()));

    driver.start_all(&cancel).await;
    tracing::info!(devices = ?driver.device_names(), "FPU bridge ready");

    // Wait for shutdown signal
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl+C, shutting down..."),
        Err(e) => tracing::error!("Failed to listen for Ctrl+C: {}, shutting down...", e),
    }

    driver.stop_all().await;
    cancel.cancel();
    for (name, handle) in [("dispatcher", dispatch_handle), ("tick writer", writer_handle)] {
        if let Err(e) = handle.await {
            tracing::warn!("{} task failed: {}", name, e);
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
