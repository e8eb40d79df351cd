//! Platform window layer
//!
//! An overlay window is a borderless, always-on-top, click-through surface
//! that never takes focus. Content is handed over as premultiplied RGBA
//! through [`OverlayPlatform::pixel_buffer`] and pushed to the screen by
//! [`OverlayPlatform::commit`].

pub mod headless;
#[cfg(all(unix, not(target_os = "macos")))]
pub mod x11;

use clipqa_types::ScreenArea;
use thiserror::Error;

pub use headless::HeadlessOverlay;
#[cfg(all(unix, not(target_os = "macos")))]
pub use x11::X11Overlay;

/// Initial window geometry
#[derive(Debug, Clone)]
pub struct OverlayConfig {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    /// Window class / title
    pub namespace: String,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
            width: 600,
            height: 200,
            namespace: "clipqa-overlay".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorInfo {
    pub id: String,
    pub name: String,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub is_primary: bool,
}

impl MonitorInfo {
    pub fn area(&self) -> ScreenArea {
        ScreenArea {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
        }
    }
}

/// Area of the primary monitor, or the first one, or a 1920x1080 guess
pub fn primary_area(monitors: &[MonitorInfo]) -> ScreenArea {
    monitors
        .iter()
        .find(|m| m.is_primary)
        .or_else(|| monitors.first())
        .map(MonitorInfo::area)
        .unwrap_or(ScreenArea::FALLBACK)
}

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("no display connection: {0}")]
    NoDisplay(String),
    #[error("{0}")]
    Other(String),
}

pub trait OverlayPlatform: Sized {
    fn new(config: OverlayConfig) -> Result<Self, PlatformError>;

    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn x(&self) -> i32;
    fn y(&self) -> i32;

    fn set_position(&mut self, x: i32, y: i32);
    /// Resize; the pixel buffer is reallocated to match
    fn set_size(&mut self, width: u32, height: u32);
    /// Whole-window opacity applied on commit, `0.0..=1.0`
    fn set_opacity(&mut self, opacity: f32);

    /// Premultiplied RGBA, `width * height * 4` bytes
    fn pixel_buffer(&mut self) -> Option<&mut [u8]>;
    fn commit(&mut self);

    /// Map the window and raise it above everything else
    fn show(&mut self);
    fn hide(&mut self);
    fn is_visible(&self) -> bool;

    /// Drain pending window-system events. Returns false once the display
    /// connection is gone.
    fn poll_events(&mut self) -> bool;

    fn get_monitors(&self) -> Vec<MonitorInfo>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor(id: &str, x: i32, is_primary: bool) -> MonitorInfo {
        MonitorInfo {
            id: id.to_string(),
            name: id.to_string(),
            x,
            y: 0,
            width: 2560,
            height: 1440,
            is_primary,
        }
    }

    #[test]
    fn test_primary_area() {
        let monitors = vec![monitor("left", 0, false), monitor("main", 2560, true)];
        assert_eq!(primary_area(&monitors).x, 2560);
        assert_eq!(primary_area(&monitors[..1]).x, 0);
        assert_eq!(primary_area(&[]), ScreenArea::FALLBACK);
    }
}
