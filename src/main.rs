//! # ATS-Oxide inspector
//!
//! Starts one channel, reports what the driver sees, and keeps re-capturing
//! the application tree until a stop signal arrives.
//!
//! ## Environment
//! - `ATS_CONFIG`: TOML configuration file (default: `ATS_*` variables)
//! - `ATS_APPLICATION`: application to start, e.g. `mobile://10.0.0.5:8080/com.app`
//! - `ATS_CHANNEL`: channel name (default: main)
//! - `ATS_PROBE_POINT`: `x,y` point to hit-test after start
//! - `ATS_WATCH_SECS`: re-capture interval; the inspector exits after one pass when unset

use anyhow::{anyhow, Context};
use ats_oxide::{
    channel::{ChannelManager, DriverManager},
    config::Config,
    report::ActionStatus,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match std::env::var("ATS_CONFIG") {
        Ok(path) => Config::from_file(&path).with_context(|| format!("loading {}", path))?,
        Err(_) => Config::from_env()?,
    };

    // RUST_LOG wins over the configured level
    let log_level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|v| v.parse::<Level>().ok())
        .or_else(|| config.log_level.parse::<Level>().ok())
        .unwrap_or(Level::INFO);

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    info!("ATS-Oxide inspector v{}", ats_oxide::VERSION);

    let application = std::env::var("ATS_APPLICATION")
        .map_err(|_| anyhow!("ATS_APPLICATION is not set"))?;
    let name = std::env::var("ATS_CHANNEL").unwrap_or_else(|_| "main".to_string());
    let probe = std::env::var("ATS_PROBE_POINT")
        .ok()
        .map(|raw| parse_point(&raw))
        .transpose()?;
    let watch = std::env::var("ATS_WATCH_SECS")
        .ok()
        .map(|raw| raw.trim().parse::<u64>().context("invalid ATS_WATCH_SECS"))
        .transpose()?
        .map(Duration::from_secs);

    let stop = Arc::new(AtomicBool::new(false));
    spawn_signal_handler(stop.clone());

    let mut manager = ChannelManager::new(config, Arc::new(DriverManager::new()));

    let mut status = ActionStatus::new();
    let channel = match manager.start_channel(&mut status, &name, &application).await {
        Some(channel) => channel,
        None => {
            error!("Channel [{}] failed to start: {}", name, status.message());
            return Err(anyhow!(status.message().to_string()));
        }
    };
    info!(
        "Channel [{}] started in {:?} ({} x {})",
        channel.name(),
        status.duration(),
        channel.dimensions().channel.width,
        channel.dimensions().channel.height
    );

    loop {
        match channel.engine().get_source().await {
            Ok(source) => info!("Captured source: {} bytes", source.len()),
            Err(e) => warn!("Unable to capture source: {}", e),
        }

        if let Some((x, y)) = probe {
            match channel.engine().element_from_point(false, x, y).await {
                Ok(Some(element)) => info!(
                    "Element at {},{}: {} [{}] {:?}",
                    x, y, element.tag, element.id, element.rect
                ),
                Ok(None) => info!("No element at {},{}", x, y),
                Err(e) => warn!("Hit test failed: {}", e),
            }
        }

        let Some(interval) = watch else { break };
        if stop.load(Ordering::SeqCst) {
            break;
        }
        tokio::time::sleep(interval).await;
        if stop.load(Ordering::SeqCst) {
            break;
        }
        if let Err(e) = channel.engine().refresh_element_map_location().await {
            warn!("Unable to refresh tree: {}", e);
        }
    }

    info!("Tearing down channels...");
    manager.tear_down().await;

    info!("Inspector stopped");
    Ok(())
}

fn parse_point(raw: &str) -> anyhow::Result<(f64, f64)> {
    let (x, y) = raw
        .split_once(',')
        .ok_or_else(|| anyhow!("ATS_PROBE_POINT must be x,y"))?;
    Ok((
        x.trim().parse().context("invalid probe x")?,
        y.trim().parse().context("invalid probe y")?,
    ))
}

fn spawn_signal_handler(stop: Arc<AtomicBool>) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(mut sigterm), Ok(mut sigint)) => {
                    tokio::select! {
                        _ = sigterm.recv() => info!("Received SIGTERM signal"),
                        _ = sigint.recv() => info!("Received SIGINT signal"),
                    }
                }
                _ => {
                    warn!("Unable to install signal handlers, falling back to Ctrl+C");
                    let _ = tokio::signal::ctrl_c().await;
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
            info!("Received Ctrl+C signal");
        }

        stop.store(true, Ordering::SeqCst);
    });
}
