//! clipqa overlay: a click-through card that shows matched answers
//!
//! The binary wires four pieces together: the loopback [`server`], the
//! config [`reload`] watcher, the card [`lifecycle`] and a [`platform`]
//! window driven by the [`app`] event loop.

pub mod app;
pub mod lifecycle;
pub mod platform;
pub mod reload;
pub mod render;
pub mod server;
pub mod utils;

// Re-exports for convenience
pub use app::{LoopExit, OverlayApp, OverlayCommand};
pub use lifecycle::{Card, Lifecycle, Phase, Transition};
pub use platform::{HeadlessOverlay, MonitorInfo, OverlayConfig, OverlayPlatform, PlatformError};
pub use render::{CardPainter, TextPainter};
pub use server::{PayloadServer, ServerError};
