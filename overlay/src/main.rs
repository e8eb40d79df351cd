//! clipqa-overlay - shows matched answers on top of everything else.
//!
//! Listens on 127.0.0.1:<port> for messages from the finder and renders each
//! one as a card that fades in, stays for the configured time and fades out.
//!
//! Usage: clipqa-overlay [--port 12345] [--config <path>] [--pid-file <path>] [--headless]

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::mpsc;

use clipqa_core::ShutdownFlag;
use clipqa_core::config::{default_config_path, load_configuration};
use clipqa_core::ipc::DEFAULT_PORT;
use clipqa_core::logging::init_logging;
use clipqa_core::pidfile::PidFile;
use clipqa_overlay::platform::{HeadlessOverlay, OverlayConfig, OverlayPlatform, PlatformError};
use clipqa_overlay::reload::watch_config;
use clipqa_overlay::{LoopExit, OverlayApp, OverlayCommand, PayloadServer, TextPainter};
use clipqa_types::Configuration;

const COMMAND_QUEUE: usize = 32;

#[derive(Parser, Debug)]
#[command(version, about = "Click-through answer overlay for clipqa")]
struct Args {
    /// Loopback port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Configuration document (default: per-user config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write a pid marker here while running
    #[arg(long)]
    pid_file: Option<PathBuf>,

    /// Run without a window; cards are tracked but never drawn
    #[arg(long)]
    headless: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let _log_guard = init_logging("clipqa-overlay");

    let shutdown = match ShutdownFlag::install() {
        Ok(flag) => flag,
        Err(e) => {
            tracing::error!(error = %e, "Failed to install signal handlers");
            return ExitCode::FAILURE;
        }
    };

    let config_path = match args.config.clone().map(Ok).unwrap_or_else(default_config_path) {
        Ok(path) => path,
        Err(e) => {
            tracing::error!(error = %e, "Cannot determine configuration path");
            return ExitCode::FAILURE;
        }
    };
    let config = load_configuration(&config_path);

    let pid_file = match args.pid_file.as_ref().map(PidFile::create).transpose() {
        Ok(pid) => pid,
        Err(e) => {
            tracing::error!(error = %e, "Failed to write pid file");
            return ExitCode::FAILURE;
        }
    };

    if let Some(pid) = &pid_file {
        tracing::info!(path = %pid.path().display(), pid = pid.handle().pid, "Liveness marker written");
    }

    let server = match PayloadServer::bind(args.port) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(error = %e, port = args.port, "Cannot start listener");
            return ExitCode::FAILURE;
        }
    };

    let (tx, rx) = mpsc::channel::<OverlayCommand>(COMMAND_QUEUE);

    let _watcher = match watch_config(config_path.clone(), config.clone(), tx.clone()) {
        Ok(watcher) => {
            tracing::info!(path = %watcher.path().display(), "Live config reload enabled");
            Some(watcher)
        }
        Err(e) => {
            tracing::warn!(error = %e, path = %config_path.display(), "Live config reload disabled");
            None
        }
    };

    let listener = server.spawn(tx, shutdown.clone());
    let config = Arc::new(config);

    let exit = if args.headless {
        run(HeadlessOverlay::new(window_config()), config, rx, &shutdown)
    } else {
        run_windowed(config, rx, &shutdown)
    };

    shutdown.request();
    if listener.join().is_err() {
        tracing::warn!("Listener thread panicked");
    }

    match exit {
        Some(LoopExit::Shutdown) => {
            tracing::info!("Overlay stopped");
            ExitCode::SUCCESS
        }
        Some(LoopExit::WindowLost) => {
            tracing::error!("Display connection lost");
            ExitCode::FAILURE
        }
        None => ExitCode::FAILURE,
    }
}

fn window_config() -> OverlayConfig {
    OverlayConfig::default()
}

#[cfg(all(unix, not(target_os = "macos")))]
fn run_windowed(
    config: Arc<Configuration>,
    rx: mpsc::Receiver<OverlayCommand>,
    shutdown: &ShutdownFlag,
) -> Option<LoopExit> {
    use clipqa_overlay::platform::X11Overlay;
    run(X11Overlay::new(window_config()), config, rx, shutdown)
}

#[cfg(not(all(unix, not(target_os = "macos"))))]
fn run_windowed(
    _config: Arc<Configuration>,
    _rx: mpsc::Receiver<OverlayCommand>,
    _shutdown: &ShutdownFlag,
) -> Option<LoopExit> {
    tracing::error!("No overlay window backend for this platform; use --headless");
    None
}

fn run<P: OverlayPlatform>(
    platform: Result<P, PlatformError>,
    config: Arc<Configuration>,
    rx: mpsc::Receiver<OverlayCommand>,
    shutdown: &ShutdownFlag,
) -> Option<LoopExit> {
    let platform = match platform {
        Ok(platform) => platform,
        Err(e) => {
            tracing::error!(error = %e, "Cannot create overlay window");
            return None;
        }
    };

    let painter = TextPainter::new();
    let mut app = OverlayApp::new(platform, painter, config, rx);
    tracing::info!("Overlay ready");
    Some(app.run(shutdown))
}
