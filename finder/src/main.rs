//! clipqa-finder - watches the clipboard and sends matching answers to the overlay.
//!
//! Usage:
//!   clipqa-finder [watch] [--corpus answers.json] [--port 12345] [--interval-ms 500]
//!   clipqa-finder send <question> <answer>...
//!   clipqa-finder dismiss | ping
//!   clipqa-finder lookup <query>

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use clipqa_core::clipboard::ClipboardTool;
use clipqa_core::finder::{DEFAULT_MIN_QUERY_CHARS, MAX_POLL_INTERVAL_MS, MIN_POLL_INTERVAL_MS};
use clipqa_core::ipc::DEFAULT_PORT;
use clipqa_core::logging::init_logging;
use clipqa_core::matcher::DEFAULT_THRESHOLD;
use clipqa_core::{ShutdownFlag, TcpSink, WireMessage};

use commands::WatchOptions;

const DEFAULT_CORPUS: &str = "answers.json";

#[derive(Parser, Debug)]
#[command(version, about = "Clipboard question finder for clipqa")]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    watch: WatchArgs,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Watch the clipboard (default)
    Watch(WatchArgs),
    /// Show a card on the overlay
    Send {
        question: String,
        #[arg(required = true)]
        answers: Vec<String>,
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },
    /// Fade out the current card
    Dismiss {
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },
    /// Check whether the overlay is listening
    Ping {
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },
    /// Match a query against the corpus without the overlay
    Lookup {
        query: String,
        #[arg(long, default_value = DEFAULT_CORPUS)]
        corpus: PathBuf,
        #[arg(long, default_value_t = DEFAULT_THRESHOLD, value_parser = parse_threshold)]
        threshold: f32,
    },
}

#[derive(Args, Debug)]
struct WatchArgs {
    /// JSON array of {question, answer | answers} records
    #[arg(long, default_value = DEFAULT_CORPUS)]
    corpus: PathBuf,

    /// Overlay loopback port
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Clipboard poll interval
    #[arg(
        long,
        default_value_t = 500,
        value_parser = clap::value_parser!(u64).range(MIN_POLL_INTERVAL_MS..=MAX_POLL_INTERVAL_MS)
    )]
    interval_ms: u64,

    /// Minimum similarity for a match, 0.0-1.0
    #[arg(long, default_value_t = DEFAULT_THRESHOLD, value_parser = parse_threshold)]
    threshold: f32,

    /// Ignore clipboard text shorter than this
    #[arg(long, default_value_t = DEFAULT_MIN_QUERY_CHARS)]
    min_query_chars: usize,

    /// Force a clipboard tool (wl-paste, xclip, xsel)
    #[arg(long)]
    backend: Option<ClipboardTool>,

    /// Write a pid marker here while running
    #[arg(long)]
    pid_file: Option<PathBuf>,
}

fn parse_threshold(s: &str) -> Result<f32, String> {
    let value: f32 = s.parse().map_err(|_| format!("'{s}' is not a number"))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("threshold must be between 0.0 and 1.0, got {value}"))
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let _log_guard = init_logging("clipqa-finder");

    let ok = match cli.command {
        None => watch(cli.watch),
        Some(Commands::Watch(args)) => watch(args),
        Some(Commands::Send {
            question,
            answers,
            port,
        }) => commands::deliver(
            &mut TcpSink::new(port),
            &commands::show_message(question, answers),
        ),
        Some(Commands::Dismiss { port }) => {
            commands::deliver(&mut TcpSink::new(port), &WireMessage::Hide)
        }
        Some(Commands::Ping { port }) => {
            commands::deliver(&mut TcpSink::new(port), &WireMessage::Ping)
        }
        Some(Commands::Lookup {
            query,
            corpus,
            threshold,
        }) => commands::lookup(&corpus, threshold, &query),
    };

    if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

fn watch(args: WatchArgs) -> bool {
    let shutdown = match ShutdownFlag::install() {
        Ok(flag) => flag,
        Err(e) => {
            tracing::error!(error = %e, "Failed to install signal handlers");
            return false;
        }
    };

    commands::watch(
        WatchOptions {
            corpus: &args.corpus,
            port: args.port,
            interval: Duration::from_millis(args.interval_ms),
            threshold: args.threshold,
            min_query_chars: args.min_query_chars,
            backend: args.backend,
            pid_file: args.pid_file.as_deref(),
        },
        &shutdown,
    )
}
