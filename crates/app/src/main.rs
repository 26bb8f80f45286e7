// Logging behavior:
// - Writes logs to both stderr and a daily-rotated file at logs/auralink.log.
// - Default log level is INFO. Control via RUST_LOG:
//   * RUST_LOG=info                        # standard logging (default)
//   * RUST_LOG=debug                       # verbose, includes per-second stage stats
//   * RUST_LOG=trace                       # maximum verbosity, includes per-frame events
// - The logs/ directory is created on startup if missing; file output uses a non-blocking writer.
use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

use clap::Parser;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use auralink_app::runtime::{self, AppRuntimeOptions};
use auralink_app::Settings;
use auralink_audio::DeviceManager;
use auralink_foundation::{AppState, HealthMonitor, StateManager};

fn init_logging() -> Result<tracing_appender::non_blocking::WorkerGuard, Box<dyn std::error::Error>>
{
    std::fs::create_dir_all("logs")?;
    let file_appender = RollingFileAppender::new(Rotation::DAILY, "logs", "auralink.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = fmt::layer().with_writer(std::io::stderr);
    let file_layer = fmt::layer().with_writer(non_blocking_file).with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();
    Ok(guard)
}

/// Prune rotated log files in `logs/` older than `retention_days` days. `0` disables pruning.
fn prune_old_logs(retention_days: u64) {
    if retention_days == 0 {
        tracing::debug!("log retention disabled (retention_days=0)");
        return;
    }

    let Some(cutoff) =
        SystemTime::now().checked_sub(Duration::from_secs(retention_days * 24 * 60 * 60))
    else {
        return;
    };

    let logs_dir = Path::new("logs");
    if !logs_dir.exists() {
        return;
    }

    match fs::read_dir(logs_dir) {
        Ok(entries) => {
            for entry in entries.flatten() {
                let path = entry.path();
                if let Some(name) = path.file_name().and_then(|s| s.to_str()) {
                    if name.starts_with("auralink.log.") {
                        if let Ok(meta) = entry.metadata() {
                            if let Ok(modified) = meta.modified() {
                                if modified < cutoff {
                                    if let Err(e) = fs::remove_file(&path) {
                                        tracing::warn!(
                                            "failed to remove old log {}: {}",
                                            path.display(),
                                            e
                                        );
                                    } else {
                                        tracing::info!("removed old log file: {}", path.display());
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
        Err(e) => tracing::warn!("failed to read logs directory for pruning: {}", e),
    }
}

#[derive(Parser, Debug)]
#[command(name = "auralink", author, version, about = "Real-time audio pipeline over UDP")]
struct Cli {
    /// List available input devices and exit.
    #[arg(long = "list-devices")]
    list_devices: bool,

    /// Input device name (substring match); defaults to the host's preferred input device.
    #[arg(long)]
    device: Option<String>,

    /// Local address to bind the UDP transport to.
    #[arg(long)]
    bind: Option<String>,

    /// Remote peer address to send frames to. Receive-only operation is possible without it.
    #[arg(long)]
    peer: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _log_guard = init_logging()?;
    tracing::info!("starting auralink");

    let cli = Cli::parse();
    let mut settings = Settings::new().unwrap_or_else(|e| {
        tracing::error!("failed to load settings: {}", e);
        Settings::default()
    });
    prune_old_logs(settings.logging.retention_days);

    if cli.list_devices {
        let dm = DeviceManager::new()?;
        tracing::info!("CPAL host: {:?}", dm.host_id());
        println!("Input devices (host: {:?}):", dm.host_id());
        for d in dm.enumerate_devices() {
            let def = if d.is_default { " (default)" } else { "" };
            println!("- {}{}", d.name, def);
        }
        return Ok(());
    }

    if let Some(device) = cli.device {
        settings.device = Some(device);
    }
    if let Some(bind) = cli.bind {
        settings.transport.bind = bind;
    }
    if let Some(peer) = cli.peer {
        settings.transport.peer = Some(peer);
    }

    let options = AppRuntimeOptions {
        device: settings.device.clone(),
        chunks_per_second: settings.chunker.chunks_per_second,
        codec_rate: settings.resampler.codec_rate,
        resampler_quality: settings.resampler.quality.into(),
        max_latency_ms: settings.resampler.max_latency_ms,
        max_unordered: settings.orderer.max_unordered,
        bind_addr: settings.transport.bind.clone(),
        peer_addr: settings.transport.peer.clone(),
        capture_buffer_samples: 65_536,
    };

    let state_manager = StateManager::new();
    let _health_monitor = HealthMonitor::new(Duration::from_secs(10)).start();
    let shutdown = auralink_foundation::ShutdownHandler::new().install().await;

    let handle = runtime::start(options).await?;
    tracing::info!("pipeline running, bound to {}", handle.local_addr);
    state_manager.transition(AppState::Running)?;

    let mut stats_interval = tokio::time::interval(Duration::from_secs(30));
    let metrics = handle.metrics.clone();
    tokio::select! {
        _ = shutdown.wait() => {
            tracing::debug!("shutdown signal received");
        }
        _ = async {
            loop {
                stats_interval.tick().await;
                use std::sync::atomic::Ordering;
                tracing::info!(
                    chunker_fps = metrics.chunker_fps.load(Ordering::Relaxed) as f64 / 10.0,
                    resampler_fps = metrics.resampler_fps.load(Ordering::Relaxed) as f64 / 10.0,
                    encoder_fps = metrics.encoder_fps.load(Ordering::Relaxed) as f64 / 10.0,
                    decoder_fps = metrics.decoder_fps.load(Ordering::Relaxed) as f64 / 10.0,
                    resampler_buffer_fill_pct = metrics.resampler_buffer_fill.load(Ordering::Relaxed),
                    orderer_buffer_fill_pct = metrics.orderer_buffer_fill.load(Ordering::Relaxed),
                    wire_records_sent = metrics.wire_records_sent.load(Ordering::Relaxed),
                    wire_records_malformed = metrics.wire_records_malformed.load(Ordering::Relaxed),
                    orderer_concealed_frames = metrics.orderer_concealed_frames.load(Ordering::Relaxed),
                    orderer_skipped_frames = metrics.orderer_skipped_frames.load(Ordering::Relaxed),
                    "pipeline running..."
                );
            }
        } => {}
    }

    tracing::info!("tearing down pipeline");
    state_manager.transition(AppState::Stopping)?;
    handle.shutdown().await;
    state_manager.transition(AppState::Stopped)?;
    tracing::debug!("shutdown complete");

    Ok(())
}
