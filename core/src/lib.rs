//! Finder-side logic for clipqa: corpus loading, matching, clipboard
//! watching and the overlay wire protocol, plus the process plumbing both
//! binaries share.

pub mod clipboard;
pub mod config;
pub mod corpus;
pub mod finder;
pub mod ipc;
pub mod logging;
pub mod matcher;
pub mod normalize;
pub mod pidfile;
pub mod shutdown;

// Re-exports for convenience
pub use corpus::{Corpus, CorpusError, QAEntry};
pub use finder::{Finder, FinderSettings, PayloadSink, StepOutcome, TcpSink};
pub use ipc::{OverlayPayload, TransportError, WireMessage};
pub use matcher::{MatchKind, MatchResult, Matcher, QuestionIndex};
pub use shutdown::ShutdownFlag;
