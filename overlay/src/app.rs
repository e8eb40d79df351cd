//! Overlay event loop
//!
//! Runs on the main thread. Each iteration drains the command channel,
//! advances the lifecycle, pushes pixels when something visible changed and
//! polls window events. The loop sleeps 16 ms while a fade is running and
//! 50 ms otherwise.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tiny_skia::Pixmap;
use tokio::sync::mpsc::Receiver;

use clipqa_core::{OverlayPayload, ShutdownFlag};
use clipqa_types::Configuration;

use crate::lifecycle::{Lifecycle, Phase, Transition};
use crate::platform::{OverlayPlatform, primary_area};
use crate::render::CardPainter;

/// Distance kept between the card and the screen edge
pub const SCREEN_MARGIN: i32 = 20;
/// Cards never grow taller than this share of the screen
pub const MAX_HEIGHT_FRACTION: f32 = 0.8;

const ANIMATING_FRAME: Duration = Duration::from_millis(16);
const IDLE_FRAME: Duration = Duration::from_millis(50);

/// Commands delivered to the event loop
#[derive(Debug, Clone)]
pub enum OverlayCommand {
    Show(OverlayPayload),
    Hide,
    /// New configuration; applies from the next card on
    Reconfigure(Arc<Configuration>),
}

/// Why the loop returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    Shutdown,
    WindowLost,
}

pub struct OverlayApp<P, C> {
    platform: P,
    painter: C,
    lifecycle: Lifecycle,
    config: Arc<Configuration>,
    rx: Receiver<OverlayCommand>,
    frame: Option<Pixmap>,
    needs_upload: bool,
    last_opacity: Option<f32>,
}

impl<P: OverlayPlatform, C: CardPainter> OverlayApp<P, C> {
    pub fn new(
        platform: P,
        painter: C,
        config: Arc<Configuration>,
        rx: Receiver<OverlayCommand>,
    ) -> Self {
        Self {
            platform,
            painter,
            lifecycle: Lifecycle::new(),
            config,
            rx,
            frame: None,
            needs_upload: false,
            last_opacity: None,
        }
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub fn config(&self) -> &Arc<Configuration> {
        &self.config
    }

    /// One loop iteration at `now`. Returns false when the window is gone.
    pub fn step(&mut self, now: Instant) -> bool {
        while let Ok(cmd) = self.rx.try_recv() {
            self.handle_command(cmd, now);
        }

        let transitions = self.lifecycle.tick(now);
        self.apply(&transitions);
        self.present(now);

        self.platform.poll_events()
    }

    pub fn run(&mut self, shutdown: &ShutdownFlag) -> LoopExit {
        let exit = loop {
            if shutdown.is_requested() {
                break LoopExit::Shutdown;
            }
            if !self.step(Instant::now()) {
                break LoopExit::WindowLost;
            }
            let frame = if self.lifecycle.is_animating() {
                ANIMATING_FRAME
            } else {
                IDLE_FRAME
            };
            thread::sleep(frame);
        };
        self.shutdown();
        exit
    }

    /// Cancel pending timers and take the card off screen
    pub fn shutdown(&mut self) {
        if let Some(t) = self.lifecycle.cancel() {
            tracing::debug!(cycle = t.cycle, from = ?t.from, "Cancelled live card");
        }
        self.platform.hide();
        self.frame = None;
        self.last_opacity = None;
    }

    fn handle_command(&mut self, cmd: OverlayCommand, now: Instant) {
        match cmd {
            OverlayCommand::Show(payload) => {
                let transitions = self.lifecycle.show(payload, Arc::clone(&self.config), now);
                self.apply(&transitions);
            }
            OverlayCommand::Hide => {
                let transitions = self.lifecycle.dismiss(now);
                self.apply(&transitions);
            }
            OverlayCommand::Reconfigure(config) => {
                tracing::debug!("Configuration snapshot replaced");
                self.config = config;
            }
        }
    }

    fn apply(&mut self, transitions: &[Transition]) {
        for t in transitions {
            tracing::debug!(cycle = t.cycle, from = ?t.from, to = ?t.to, "Card transition");
            match t.to {
                Phase::FadingIn => self.prepare_card(),
                Phase::Hidden => {
                    self.platform.hide();
                    self.frame = None;
                    self.last_opacity = None;
                }
                Phase::Visible | Phase::FadingOut => {}
            }
        }
    }

    /// Paint the live card, size and place the window for it
    fn prepare_card(&mut self) {
        let Some(card) = self.lifecycle.card() else {
            return;
        };

        let area = primary_area(&self.platform.get_monitors());
        let max_height = (area.height as f32 * MAX_HEIGHT_FRACTION) as u32;

        let Some(pixmap) = self.painter.paint(card, max_height) else {
            tracing::warn!(cycle = card.cycle, "Failed to paint card");
            // The previous card's pixels must not show under this cycle
            self.frame = None;
            self.needs_upload = false;
            self.last_opacity = None;
            self.platform.hide();
            return;
        };

        let (width, height) = (pixmap.width(), pixmap.height());
        let (x, y) = card
            .config
            .overlay
            .position
            .place(area, width, height, SCREEN_MARGIN);

        self.platform.set_size(width, height);
        self.platform.set_position(x, y);
        self.frame = Some(pixmap);
        self.needs_upload = true;
        self.last_opacity = None;
        self.platform.show();
    }

    /// Upload pixels and opacity if either changed since the last frame
    fn present(&mut self, now: Instant) {
        let (Some(frame), Some(card)) = (&self.frame, self.lifecycle.card()) else {
            return;
        };

        let opacity = self.lifecycle.opacity(now) * card.config.opacity();
        if !self.needs_upload && self.last_opacity == Some(opacity) {
            return;
        }

        if self.needs_upload {
            match self.platform.pixel_buffer() {
                Some(buf) if buf.len() == frame.data().len() => buf.copy_from_slice(frame.data()),
                Some(buf) => tracing::warn!(
                    buffer = buf.len(),
                    frame = frame.data().len(),
                    "Pixel buffer size mismatch"
                ),
                None => tracing::warn!("Platform has no pixel buffer"),
            }
            self.needs_upload = false;
        }

        self.platform.set_opacity(opacity);
        self.platform.commit();
        self.last_opacity = Some(opacity);
    }
}
