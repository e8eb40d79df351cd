//! Window-less platform
//!
//! Keeps the geometry, opacity and pixels it is given and counts commits.
//! Used for `--headless` runs and by the event loop tests.

use super::{MonitorInfo, OverlayConfig, OverlayPlatform, PlatformError};

#[derive(Debug)]
pub struct HeadlessOverlay {
    x: i32,
    y: i32,
    width: u32,
    height: u32,
    opacity: f32,
    visible: bool,
    pixel_data: Vec<u8>,
    commits: usize,
    monitors: Vec<MonitorInfo>,
}

impl HeadlessOverlay {
    /// Replace the simulated monitor layout
    pub fn with_monitors(mut self, monitors: Vec<MonitorInfo>) -> Self {
        self.monitors = monitors;
        self
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn commits(&self) -> usize {
        self.commits
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixel_data
    }
}

impl OverlayPlatform for HeadlessOverlay {
    fn new(config: OverlayConfig) -> Result<Self, PlatformError> {
        Ok(Self {
            x: config.x,
            y: config.y,
            width: config.width,
            height: config.height,
            opacity: 1.0,
            visible: false,
            pixel_data: vec![0; (config.width * config.height * 4) as usize],
            commits: 0,
            monitors: vec![MonitorInfo {
                id: "headless-0".to_string(),
                name: "headless".to_string(),
                x: 0,
                y: 0,
                width: 1920,
                height: 1080,
                is_primary: true,
            }],
        })
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn x(&self) -> i32 {
        self.x
    }

    fn y(&self) -> i32 {
        self.y
    }

    fn set_position(&mut self, x: i32, y: i32) {
        self.x = x;
        self.y = y;
    }

    fn set_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.pixel_data.resize((width * height * 4) as usize, 0);
    }

    fn set_opacity(&mut self, opacity: f32) {
        self.opacity = opacity.clamp(0.0, 1.0);
    }

    fn pixel_buffer(&mut self) -> Option<&mut [u8]> {
        Some(&mut self.pixel_data)
    }

    fn commit(&mut self) {
        self.commits += 1;
    }

    fn show(&mut self) {
        self.visible = true;
    }

    fn hide(&mut self) {
        self.visible = false;
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn poll_events(&mut self) -> bool {
        true
    }

    fn get_monitors(&self) -> Vec<MonitorInfo> {
        self.monitors.clone()
    }
}
