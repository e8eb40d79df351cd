//! X11 overlay window
//!
//! An override-redirect window (no window manager decoration, never focused)
//! with an empty input shape so clicks pass through to whatever is below.
//! A 32-bit ARGB visual is used when the server has one; otherwise the
//! window is opaque and fading goes through `_NET_WM_WINDOW_OPACITY`, which
//! compositing managers honor.

use x11rb::connection::{Connection, RequestConnection};
use x11rb::protocol::Event;
use x11rb::protocol::randr::ConnectionExt as _;
use x11rb::protocol::shape::{self, ConnectionExt as _};
use x11rb::protocol::xproto::{
    self, Atom, AtomEnum, ClipOrdering, ColormapAlloc, ConfigureWindowAux, ConnectionExt as _,
    CreateGCAux, CreateWindowAux, EventMask, Gcontext, ImageFormat, ImageOrder, PropMode, Screen,
    StackMode, VisualClass, Visualid, Window, WindowClass,
};
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;

use super::{MonitorInfo, OverlayConfig, OverlayPlatform, PlatformError};

fn x_err(e: impl std::fmt::Display) -> PlatformError {
    PlatformError::Other(e.to_string())
}

fn intern(conn: &RustConnection, name: &[u8]) -> Result<Atom, PlatformError> {
    Ok(conn.intern_atom(false, name).map_err(x_err)?.reply().map_err(x_err)?.atom)
}

/// First 32-bit TrueColor visual on the screen
fn find_argb_visual(screen: &Screen) -> Option<Visualid> {
    screen
        .allowed_depths
        .iter()
        .filter(|d| d.depth == 32)
        .flat_map(|d| d.visuals.iter())
        .find(|v| v.class == VisualClass::TRUE_COLOR)
        .map(|v| v.visual_id)
}

pub struct X11Overlay {
    conn: RustConnection,
    root: Window,
    window: Window,
    gc: Gcontext,
    colormap: Option<xproto::Colormap>,
    depth: u8,
    argb: bool,
    msb_first: bool,
    opacity_atom: Atom,
    max_request_bytes: usize,

    x: i32,
    y: i32,
    width: u32,
    height: u32,
    opacity: f32,
    applied_opacity: Option<u32>,
    visible: bool,

    pixel_data: Vec<u8>,
    // Pre-allocated buffer for RGBA -> server byte order conversion
    bgra_buffer: Vec<u8>,
}

impl X11Overlay {
    fn configure(&self, aux: &ConfigureWindowAux) {
        let result = self
            .conn
            .configure_window(self.window, aux)
            .map_err(x_err)
            .and_then(|_| self.conn.flush().map_err(x_err));
        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to configure overlay window");
        }
    }

    fn raise(&self) {
        self.configure(&ConfigureWindowAux::new().stack_mode(StackMode::ABOVE));
    }

    /// Empty input region: pointer events fall through to windows below
    fn make_click_through(&self) -> Result<(), PlatformError> {
        if self
            .conn
            .extension_information(shape::X11_EXTENSION_NAME)
            .map_err(x_err)?
            .is_none()
        {
            tracing::warn!("X server has no SHAPE extension, overlay will intercept clicks");
            return Ok(());
        }
        self.conn
            .shape_rectangles(
                shape::SO::SET,
                shape::SK::INPUT,
                ClipOrdering::UNSORTED,
                self.window,
                0,
                0,
                &[],
            )
            .map_err(x_err)?;
        Ok(())
    }

    /// Without an ARGB visual the compositor fades the whole window
    fn apply_window_opacity(&mut self) {
        if self.argb {
            return;
        }
        let value = (f64::from(self.opacity) * f64::from(u32::MAX)) as u32;
        if self.applied_opacity == Some(value) {
            return;
        }
        let result = self
            .conn
            .change_property32(
                PropMode::REPLACE,
                self.window,
                self.opacity_atom,
                AtomEnum::CARDINAL,
                &[value],
            )
            .map_err(x_err);
        match result {
            Ok(_) => self.applied_opacity = Some(value),
            Err(e) => tracing::warn!(error = %e, "Failed to set window opacity"),
        }
    }

    fn convert_pixels(&mut self) {
        let scale = if self.argb { self.opacity } else { 1.0 };
        self.bgra_buffer.resize(self.pixel_data.len(), 0);

        for (src, dst) in self
            .pixel_data
            .chunks_exact(4)
            .zip(self.bgra_buffer.chunks_exact_mut(4))
        {
            let [r, g, b, a] = [src[0], src[1], src[2], src[3]].map(|c| (c as f32 * scale) as u8);
            let a = if self.argb { a } else { 0xFF };
            if self.msb_first {
                dst.copy_from_slice(&[a, r, g, b]);
            } else {
                dst.copy_from_slice(&[b, g, r, a]);
            }
        }
    }

    fn put_image(&self) -> Result<(), PlatformError> {
        let stride = self.width as usize * 4;
        if stride == 0 || self.height == 0 {
            return Ok(());
        }
        // Leave room for the request header
        let rows_per_strip = ((self.max_request_bytes.saturating_sub(64)) / stride).max(1);

        for (strip_index, strip) in self.bgra_buffer.chunks(rows_per_strip * stride).enumerate() {
            let rows = strip.len() / stride;
            let y = strip_index * rows_per_strip;
            self.conn
                .put_image(
                    ImageFormat::Z_PIXMAP,
                    self.window,
                    self.gc,
                    self.width as u16,
                    rows as u16,
                    0,
                    y as i16,
                    0,
                    self.depth,
                    strip,
                )
                .map_err(x_err)?;
        }
        self.conn.flush().map_err(x_err)?;
        Ok(())
    }
}

impl OverlayPlatform for X11Overlay {
    fn new(config: OverlayConfig) -> Result<Self, PlatformError> {
        let (conn, screen_num) =
            x11rb::connect(None).map_err(|e| PlatformError::NoDisplay(e.to_string()))?;

        let setup = conn.setup();
        let screen = setup
            .roots
            .get(screen_num)
            .ok_or_else(|| PlatformError::NoDisplay(format!("screen {screen_num} missing")))?;
        let root = screen.root;
        let msb_first = setup.image_byte_order == ImageOrder::MSB_FIRST;

        let argb_visual = find_argb_visual(screen);
        let (depth, visual, colormap) = match argb_visual {
            Some(visual) => {
                let colormap = conn.generate_id().map_err(x_err)?;
                conn.create_colormap(ColormapAlloc::NONE, colormap, root, visual)
                    .map_err(x_err)?;
                (32u8, visual, Some(colormap))
            }
            None => {
                tracing::info!("No ARGB visual, falling back to window opacity");
                (screen.root_depth, screen.root_visual, None)
            }
        };

        let window = conn.generate_id().map_err(x_err)?;
        let mut aux = CreateWindowAux::new()
            .background_pixel(0u32)
            .border_pixel(0u32)
            .override_redirect(1u32)
            .event_mask(EventMask::EXPOSURE | EventMask::STRUCTURE_NOTIFY);
        if let Some(colormap) = colormap {
            aux = aux.colormap(colormap);
        }

        conn.create_window(
            depth,
            window,
            root,
            config.x as i16,
            config.y as i16,
            config.width.max(1) as u16,
            config.height.max(1) as u16,
            0,
            WindowClass::INPUT_OUTPUT,
            visual,
            &aux,
        )
        .map_err(x_err)?;

        conn.change_property8(
            PropMode::REPLACE,
            window,
            AtomEnum::WM_NAME,
            AtomEnum::STRING,
            config.namespace.as_bytes(),
        )
        .map_err(x_err)?;

        let window_type = intern(&conn, b"_NET_WM_WINDOW_TYPE")?;
        let notification = intern(&conn, b"_NET_WM_WINDOW_TYPE_NOTIFICATION")?;
        conn.change_property32(
            PropMode::REPLACE,
            window,
            window_type,
            AtomEnum::ATOM,
            &[notification],
        )
        .map_err(x_err)?;

        let opacity_atom = intern(&conn, b"_NET_WM_WINDOW_OPACITY")?;

        let gc = conn.generate_id().map_err(x_err)?;
        conn.create_gc(gc, window, &CreateGCAux::new())
            .map_err(x_err)?;

        let max_request_bytes = conn.maximum_request_bytes();

        let overlay = Self {
            conn,
            root,
            window,
            gc,
            colormap,
            depth,
            argb: argb_visual.is_some(),
            msb_first,
            opacity_atom,
            max_request_bytes,
            x: config.x,
            y: config.y,
            width: config.width,
            height: config.height,
            opacity: 1.0,
            applied_opacity: None,
            visible: false,
            pixel_data: vec![0; (config.width * config.height * 4) as usize],
            bgra_buffer: Vec::new(),
        };
        overlay.make_click_through()?;
        overlay.conn.flush().map_err(x_err)?;

        tracing::info!(
            window = overlay.window,
            argb = overlay.argb,
            depth = overlay.depth,
            "X11 overlay window created"
        );
        Ok(overlay)
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
        if (x, y) == (self.x, self.y) {
            return;
        }
        self.x = x;
        self.y = y;
        self.configure(&ConfigureWindowAux::new().x(x).y(y));
    }

    fn set_size(&mut self, width: u32, height: u32) {
        let (width, height) = (width.max(1), height.max(1));
        if (width, height) == (self.width, self.height) {
            return;
        }
        self.width = width;
        self.height = height;
        self.pixel_data = vec![0; (width * height * 4) as usize];
        self.configure(&ConfigureWindowAux::new().width(width).height(height));
    }

    fn set_opacity(&mut self, opacity: f32) {
        self.opacity = opacity.clamp(0.0, 1.0);
        self.apply_window_opacity();
    }

    fn pixel_buffer(&mut self) -> Option<&mut [u8]> {
        Some(&mut self.pixel_data)
    }

    fn commit(&mut self) {
        if !self.visible {
            return;
        }
        self.convert_pixels();
        if let Err(e) = self.put_image() {
            tracing::warn!(error = %e, "Failed to upload overlay image");
        }
        self.raise();
    }

    fn show(&mut self) {
        if self.visible {
            self.raise();
            return;
        }
        if let Err(e) = self.conn.map_window(self.window) {
            tracing::warn!(error = %e, "Failed to map overlay window");
            return;
        }
        self.visible = true;
        self.raise();
    }

    fn hide(&mut self) {
        if !self.visible {
            return;
        }
        let result = self
            .conn
            .unmap_window(self.window)
            .map_err(x_err)
            .and_then(|_| self.conn.flush().map_err(x_err));
        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to unmap overlay window");
        }
        self.visible = false;
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn poll_events(&mut self) -> bool {
        let mut exposed = false;
        loop {
            match self.conn.poll_for_event() {
                Ok(Some(Event::Expose(e))) if e.count == 0 => exposed = true,
                Ok(Some(Event::DestroyNotify(e))) if e.window == self.window => {
                    tracing::warn!("Overlay window destroyed externally");
                    return false;
                }
                Ok(Some(_)) => {}
                Ok(None) => break,
                Err(e) => {
                    tracing::error!(error = %e, "Lost X11 connection");
                    return false;
                }
            }
        }
        if exposed && self.visible {
            if let Err(e) = self.put_image() {
                tracing::warn!(error = %e, "Failed to redraw after expose");
            }
        }
        true
    }

    fn get_monitors(&self) -> Vec<MonitorInfo> {
        let reply = self
            .conn
            .randr_get_monitors(self.root, true)
            .map_err(x_err)
            .and_then(|cookie| cookie.reply().map_err(x_err));

        match reply {
            Ok(reply) if !reply.monitors.is_empty() => reply
                .monitors
                .iter()
                .enumerate()
                .map(|(i, m)| {
                    let name = self
                        .conn
                        .get_atom_name(m.name)
                        .ok()
                        .and_then(|c| c.reply().ok())
                        .map(|r| String::from_utf8_lossy(&r.name).into_owned())
                        .unwrap_or_else(|| format!("monitor-{i}"));
                    MonitorInfo {
                        id: name.clone(),
                        name,
                        x: i32::from(m.x),
                        y: i32::from(m.y),
                        width: u32::from(m.width),
                        height: u32::from(m.height),
                        is_primary: m.primary,
                    }
                })
                .collect(),
            other => {
                if let Err(e) = other {
                    tracing::debug!(error = %e, "RandR monitor query failed, using root window size");
                }
                let screen = self
                    .conn
                    .setup()
                    .roots
                    .iter()
                    .find(|s| s.root == self.root);
                screen
                    .map(|s| {
                        vec![MonitorInfo {
                            id: "root".to_string(),
                            name: "root".to_string(),
                            x: 0,
                            y: 0,
                            width: u32::from(s.width_in_pixels),
                            height: u32::from(s.height_in_pixels),
                            is_primary: true,
                        }]
                    })
                    .unwrap_or_default()
            }
        }
    }
}

impl Drop for X11Overlay {
    fn drop(&mut self) {
        let _ = self.conn.free_gc(self.gc);
        let _ = self.conn.destroy_window(self.window);
        if let Some(colormap) = self.colormap {
            let _ = self.conn.free_colormap(colormap);
        }
        let _ = self.conn.flush();
    }
}
