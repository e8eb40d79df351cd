//! Shared types for clipqa
//!
//! The configuration document is read by the overlay process and written by
//! external editors, so its shape lives here with no runtime dependencies
//! beyond serde.

pub mod config;

pub use config::{
    BehaviorSection, Configuration, HexColor, OverlaySection, ParseColorError, ScreenAnchor,
    ScreenArea, TextSection,
};
