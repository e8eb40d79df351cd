//! Change detection over a clipboard source

use thiserror::Error;

use super::{ClipboardError, ClipboardSource};
use crate::normalize::is_blank;

/// Consecutive read failures before the backend is re-initialized
pub const MAX_CONSECUTIVE_FAILURES: u32 = 3;

/// Re-initializations allowed before the watcher gives up
pub const MAX_REINIT_ATTEMPTS: u32 = 5;

/// What one poll observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// New non-blank text
    Candidate(String),
    /// Same text as the previous poll
    Unchanged,
    /// Clipboard changed to empty or whitespace-only content
    Empty,
    /// The read failed; logged and counted
    Failed,
}

#[derive(Debug, Error)]
pub enum WatchError {
    #[error(
        "clipboard backend {backend} still failing after {attempts} re-initialization attempts: {last_error}"
    )]
    Exhausted {
        backend: String,
        attempts: u32,
        last_error: String,
    },
}

/// Polls a [`ClipboardSource`] and reports text that differs from the last
/// snapshot it saw.
#[derive(Debug)]
pub struct ClipboardWatcher<S> {
    source: S,
    last_seen: Option<String>,
    consecutive_failures: u32,
    reinit_attempts: u32,
}

impl<S: ClipboardSource> ClipboardWatcher<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            last_seen: None,
            consecutive_failures: 0,
            reinit_attempts: 0,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn last_seen(&self) -> Option<&str> {
        self.last_seen.as_deref()
    }

    /// Read the clipboard once and compare against the last snapshot.
    ///
    /// Read failures are absorbed and counted. The only error is running out
    /// of re-initialization attempts.
    pub fn poll(&mut self) -> Result<PollOutcome, WatchError> {
        match self.source.read_text() {
            Ok(text) => {
                self.consecutive_failures = 0;
                self.reinit_attempts = 0;
                Ok(self.observe(text.unwrap_or_default()))
            }
            Err(e) => self.record_failure(e),
        }
    }

    fn observe(&mut self, text: String) -> PollOutcome {
        if self.last_seen.as_deref() == Some(text.as_str()) {
            return PollOutcome::Unchanged;
        }

        let blank = is_blank(&text);
        self.last_seen = Some(text.clone());
        if blank {
            PollOutcome::Empty
        } else {
            PollOutcome::Candidate(text)
        }
    }

    fn record_failure(&mut self, error: ClipboardError) -> Result<PollOutcome, WatchError> {
        self.consecutive_failures += 1;
        tracing::warn!(
            backend = self.source.name(),
            error = %error,
            consecutive = self.consecutive_failures,
            "Clipboard read failed"
        );

        if self.consecutive_failures < MAX_CONSECUTIVE_FAILURES {
            return Ok(PollOutcome::Failed);
        }

        if self.reinit_attempts >= MAX_REINIT_ATTEMPTS {
            return Err(WatchError::Exhausted {
                backend: self.source.name().to_string(),
                attempts: self.reinit_attempts,
                last_error: error.to_string(),
            });
        }

        self.consecutive_failures = 0;
        self.reinit_attempts += 1;
        match self.source.reinitialize() {
            Ok(()) => tracing::info!(
                backend = self.source.name(),
                attempt = self.reinit_attempts,
                "Clipboard backend re-initialized"
            ),
            Err(e) => tracing::warn!(
                attempt = self.reinit_attempts,
                error = %e,
                "Clipboard backend re-initialization failed"
            ),
        }
        Ok(PollOutcome::Failed)
    }
}
