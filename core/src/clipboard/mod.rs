//! Clipboard access
//!
//! [`ClipboardSource`] is the seam between the watch loop and the desktop.
//! The production source shells out to the session's clipboard tool
//! ([`CommandClipboard`]); tests drive the watcher with scripted sources.

mod command;
mod watcher;

pub use command::{ClipboardTool, CommandClipboard, SessionKind};
pub use watcher::{
    ClipboardWatcher, MAX_CONSECUTIVE_FAILURES, MAX_REINIT_ATTEMPTS, PollOutcome, WatchError,
};

#[cfg(test)]
pub(crate) use watcher::tests::ScriptedClipboard;

use std::time::Duration;

use thiserror::Error;

/// A readable plain-text clipboard
pub trait ClipboardSource {
    /// Current clipboard text. `Ok(None)` means the clipboard is empty or
    /// holds no text.
    fn read_text(&mut self) -> Result<Option<String>, ClipboardError>;

    /// Re-acquire the backend after repeated failures
    fn reinitialize(&mut self) -> Result<(), ClipboardError>;

    /// Short backend name for logs
    fn name(&self) -> &str;
}

impl<S: ClipboardSource + ?Sized> ClipboardSource for Box<S> {
    fn read_text(&mut self) -> Result<Option<String>, ClipboardError> {
        (**self).read_text()
    }

    fn reinitialize(&mut self) -> Result<(), ClipboardError> {
        (**self).reinitialize()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("no clipboard tool found (looked for {looked_for})")]
    NoBackend { looked_for: String },

    #[error("failed to run {tool}: {source}")]
    Spawn {
        tool: String,
        source: std::io::Error,
    },

    #[error("{tool} did not finish within {timeout:?}")]
    Timeout { tool: String, timeout: Duration },

    #[error("{tool} exited with {status}: {stderr}")]
    Failed {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("clipboard backend error: {0}")]
    Other(String),
}
