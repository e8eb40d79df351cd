//! The finder pipeline: clipboard change → corpus lookup → overlay
//!
//! [`Finder::run`] is the process's only blocking loop. Each iteration polls
//! the clipboard once, looks up new text, hands a hit to the overlay and then
//! sleeps for the poll interval in short slices so a shutdown request is seen
//! quickly.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crate::clipboard::{ClipboardSource, ClipboardWatcher, PollOutcome, WatchError};
use crate::ipc::{self, OverlayPayload, TransportError, WireMessage};
use crate::matcher::{MatchResult, QuestionIndex};
use crate::normalize::normalize;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
pub const MIN_POLL_INTERVAL_MS: u64 = 100;
pub const MAX_POLL_INTERVAL_MS: u64 = 5000;
pub const DEFAULT_MIN_QUERY_CHARS: usize = 3;
pub const PING_INTERVAL: Duration = Duration::from_secs(10);

const SLEEP_SLICE: Duration = Duration::from_millis(50);

// ─────────────────────────────────────────────────────────────────────────────
// Delivery
// ─────────────────────────────────────────────────────────────────────────────

/// Where matched payloads go
pub trait PayloadSink {
    fn send(&mut self, message: &WireMessage) -> Result<(), TransportError>;
}

/// One-shot loopback TCP delivery to the overlay
#[derive(Debug, Clone)]
pub struct TcpSink {
    addr: SocketAddr,
    timeout: Duration,
}

impl TcpSink {
    pub fn new(port: u16) -> Self {
        Self {
            addr: ipc::overlay_addr(port),
            timeout: ipc::IO_TIMEOUT,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

impl PayloadSink for TcpSink {
    fn send(&mut self, message: &WireMessage) -> Result<(), TransportError> {
        ipc::send_message(self.addr, message, self.timeout)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Pipeline
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct FinderSettings {
    pub interval: Duration,
    /// Candidates shorter than this (after normalization) are not looked up
    pub min_query_chars: usize,
    pub ping_interval: Duration,
}

impl Default for FinderSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            min_query_chars: DEFAULT_MIN_QUERY_CHARS,
            ping_interval: PING_INTERVAL,
        }
    }
}

/// Result of one pipeline step
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// Clipboard unchanged, empty, or unreadable this time
    Idle,
    /// New text too short to look up
    TooShort,
    NoMatch,
    Delivered(MatchResult),
    /// Matched, but the overlay could not be reached; payload dropped
    Dropped(MatchResult),
}

pub struct Finder<S, I, T> {
    watcher: ClipboardWatcher<S>,
    index: I,
    sink: T,
    settings: FinderSettings,
    overlay_reachable: Option<bool>,
    last_ping: Option<Instant>,
}

impl<S, I, T> Finder<S, I, T>
where
    S: ClipboardSource,
    I: QuestionIndex,
    T: PayloadSink,
{
    pub fn new(source: S, index: I, sink: T, settings: FinderSettings) -> Self {
        Self {
            watcher: ClipboardWatcher::new(source),
            index,
            sink,
            settings,
            overlay_reachable: None,
            last_ping: None,
        }
    }

    pub fn sink(&self) -> &T {
        &self.sink
    }

    pub fn overlay_reachable(&self) -> Option<bool> {
        self.overlay_reachable
    }

    /// Poll once and act on whatever changed
    pub fn step(&mut self) -> Result<StepOutcome, WatchError> {
        let text = match self.watcher.poll()? {
            PollOutcome::Candidate(text) => text,
            PollOutcome::Unchanged | PollOutcome::Empty | PollOutcome::Failed => {
                return Ok(StepOutcome::Idle);
            }
        };

        let query_chars = normalize(&text).chars().count();
        if query_chars < self.settings.min_query_chars {
            tracing::debug!(
                chars = query_chars,
                min = self.settings.min_query_chars,
                "Clipboard text too short, ignoring"
            );
            return Ok(StepOutcome::TooShort);
        }

        let Some(result) = self.index.best_match(&text) else {
            tracing::debug!(chars = query_chars, "No match for clipboard text");
            return Ok(StepOutcome::NoMatch);
        };

        tracing::info!(
            score = result.score,
            kind = ?result.kind,
            index = result.index,
            question = %result.entry.question,
            "Match found"
        );

        let message = WireMessage::Show(OverlayPayload::from(&result));
        match self.sink.send(&message) {
            Ok(()) => {
                self.note_reachability(true);
                Ok(StepOutcome::Delivered(result))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to deliver match to overlay, dropping it");
                self.note_reachability(false);
                Ok(StepOutcome::Dropped(result))
            }
        }
    }

    /// Probe the overlay if the ping interval has elapsed
    pub fn heartbeat(&mut self, now: Instant) {
        let due = self
            .last_ping
            .is_none_or(|last| now.duration_since(last) >= self.settings.ping_interval);
        if !due {
            return;
        }
        self.last_ping = Some(now);

        let reachable = match self.sink.send(&WireMessage::Ping) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(error = %e, "Overlay ping failed");
                false
            }
        };
        self.note_reachability(reachable);
    }

    /// Log availability changes once per transition
    fn note_reachability(&mut self, reachable: bool) {
        if self.overlay_reachable == Some(reachable) {
            return;
        }
        if reachable {
            tracing::info!("Overlay reachable");
        } else {
            tracing::warn!("Overlay unreachable, matches will be dropped until it is back");
        }
        self.overlay_reachable = Some(reachable);
    }

    /// Run until `shutdown` is set or the clipboard backend is beyond repair
    pub fn run(&mut self, shutdown: &AtomicBool) -> Result<(), WatchError> {
        tracing::info!(
            interval_ms = self.settings.interval.as_millis() as u64,
            min_query_chars = self.settings.min_query_chars,
            backend = self.watcher.source().name(),
            "Watching clipboard"
        );

        while !shutdown.load(Ordering::SeqCst) {
            self.step()?;
            self.heartbeat(Instant::now());
            sleep_unless_shutdown(self.settings.interval, shutdown);
        }

        tracing::info!("Finder stopped");
        Ok(())
    }
}

/// Sleep for `total`, waking early when `shutdown` is set
fn sleep_unless_shutdown(total: Duration, shutdown: &AtomicBool) {
    let deadline = Instant::now() + total;
    loop {
        if shutdown.load(Ordering::SeqCst) {
            return;
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return;
        }
        thread::sleep(remaining.min(SLEEP_SLICE));
    }
}
