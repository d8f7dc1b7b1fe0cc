//! Audio Player (remplay-ap) - Main entry point
//!
//! Loads configuration, builds the main list, opens the audio backend,
//! starts the TCP control server and runs the playback session until an
//! `exit`/`quit` command or a termination signal arrives.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use remplay_ap::audio;
use remplay_ap::control::{CommandOrigin, CommandQueue, CommandServer};
use remplay_ap::library;
use remplay_ap::playback::PlaybackSession;
use remplay_common::config::{BackendKind, ConfigResolver};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for remplay-ap
#[derive(Parser, Debug)]
#[command(name = "remplay-ap")]
#[command(about = "Headless audio player controlled over a TCP command channel")]
#[command(version)]
struct Args {
    /// Configuration file (overrides REMPLAY_CONFIG and the platform default)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Control socket address (ip:port)
    #[arg(short, long)]
    bind: Option<String>,

    /// Files or directories for the main list (replaces the configured playlist)
    #[arg(short, long = "playlist")]
    playlist: Vec<PathBuf>,

    /// Audio backend: cpal or null
    #[arg(long)]
    backend: Option<String>,

    /// Initial volume (0.0-1.0)
    #[arg(long)]
    volume: Option<f32>,

    /// Initial playback speed (0.0-1000.0)
    #[arg(long)]
    speed: Option<f32>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// List audio output devices and exit
    #[arg(long)]
    list_devices: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let resolver = ConfigResolver::new(args.config.clone());
    let mut config = resolver.load().context("Failed to load configuration")?;

    // CLI overrides
    if let Some(bind) = &args.bind {
        let (ip, port) = bind
            .rsplit_once(':')
            .context("--bind must be in ip:port form")?;
        config.socket_ip = ip.to_string();
        config.socket_port = port.parse().context("Invalid port in --bind")?;
    }
    if !args.playlist.is_empty() {
        config.playlist = args.playlist.clone();
    }
    if let Some(backend) = &args.backend {
        config.backend = backend.parse::<BackendKind>()?;
    }
    if let Some(volume) = args.volume {
        config.volume = volume;
    }
    if let Some(speed) = args.speed {
        config.speed = speed;
    }
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    let config = config.normalized();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting remplay-ap v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match resolver.resolve_path() {
        Some(path) => info!("Configuration: {}", path.display()),
        None => info!("Configuration: built-in defaults"),
    }

    if args.list_devices {
        let devices = audio::list_output_devices().context("Failed to list audio devices")?;
        for device in devices {
            println!("{}", device);
        }
        return Ok(());
    }

    let main_list = library::scan(&config.playlist, &config.formats);
    if main_list.is_empty() {
        bail!("No playable files found in the configured playlist");
    }

    let backend = audio::create_backend(&config).context("Failed to initialize audio backend")?;

    let queue = CommandQueue::new();
    let server = Arc::new(
        CommandServer::start(&config.bind_address(), queue.clone())
            .await
            .context("Failed to start control server")?,
    );
    info!("Listening for commands on {}", server.local_addr());

    // Signals end the session through the normal exit path
    let signal_queue = queue.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_queue.push(CommandOrigin::Internal, "exit");
    });

    let mut session = PlaybackSession::from_config(&config, backend, Arc::clone(&server), main_list);
    let result = session.run().await;

    server.shutdown();
    result.context("Playback session failed")?;

    info!("Shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
