//! Card rendering
//!
//! A card is painted once per cycle into an off-screen pixmap at full
//! opacity; fading is applied by the platform when the pixmap is shown.

use cosmic_text::{Attrs, Buffer, Color, Family, FontSystem, Metrics, Shaping, SwashCache, Weight};
use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Rect, Transform};

use clipqa_core::OverlayPayload;
use clipqa_types::{Configuration, HexColor};

use crate::lifecycle::Card;
use crate::utils::{color_from_rgba, truncate_text};

pub const MAX_QUESTION_CHARS: usize = 80;
pub const MAX_ANSWER_CHARS: usize = 500;
pub const MAX_ANSWERS: usize = 5;

/// Inner padding between the card edge and its text
const PADDING: f32 = 16.0;
const CORNER_RADIUS: f32 = 10.0;
/// Line height as a multiple of the font size
const LINE_HEIGHT_FACTOR: f32 = 1.3;

/// Turns a card into pixels
pub trait CardPainter {
    /// Paint `card` into a new pixmap. The width comes from the card's
    /// configuration; the height grows with the content up to `max_height`.
    fn paint(&mut self, card: &Card, max_height: u32) -> Option<Pixmap>;
}

/// The text lines a card shows, prefixes applied and lengths capped
pub fn card_lines(payload: &OverlayPayload, config: &Configuration) -> Vec<String> {
    let text = &config.text;
    let mut lines = Vec::with_capacity(payload.answers.len().min(MAX_ANSWERS) + 2);
    lines.push(with_prefix(
        &text.question_prefix,
        &truncate_text(payload.question.trim(), MAX_QUESTION_CHARS),
    ));
    for answer in payload.answers.iter().take(MAX_ANSWERS) {
        lines.push(with_prefix(
            &text.answer_prefix,
            &truncate_text(answer.trim(), MAX_ANSWER_CHARS),
        ));
    }
    if payload.answers.len() > MAX_ANSWERS {
        lines.push(format!("(+{} more)", payload.answers.len() - MAX_ANSWERS));
    }
    lines
}

fn with_prefix(prefix: &str, text: &str) -> String {
    if prefix.is_empty() {
        text.to_string()
    } else {
        format!("{prefix} {text}")
    }
}

/// Window height for content of `content_height`: at least the configured
/// height, at most `max_height`.
pub fn card_height(content_height: f32, configured: u32, max_height: u32) -> u32 {
    let wanted = (content_height.ceil() as u32).max(configured);
    wanted.min(max_height.max(1))
}

/// 8-direction offsets for an outline of `width` pixels
fn outline_offsets(width: u32) -> Vec<(i32, i32)> {
    if width == 0 {
        return Vec::new();
    }
    let w = width as i32;
    [(-w, -w), (0, -w), (w, -w), (-w, 0), (w, 0), (-w, w), (0, w), (w, w)].to_vec()
}

fn text_color(color: HexColor) -> Color {
    let [r, g, b, a] = color.rgba();
    Color::rgba(r, g, b, a)
}

// ─────────────────────────────────────────────────────────────────────────────
// cosmic-text painter
// ─────────────────────────────────────────────────────────────────────────────

pub struct TextPainter {
    font_system: FontSystem,
    swash_cache: SwashCache,
}

impl Default for TextPainter {
    fn default() -> Self {
        Self::new()
    }
}

impl TextPainter {
    pub fn new() -> Self {
        let locale = sys_locale::get_locale().unwrap_or_else(|| "en-US".to_string());
        let mut db = cosmic_text::fontdb::Database::new();
        db.load_system_fonts();
        tracing::debug!(faces = db.len(), locale = %locale, "Font database loaded");

        Self {
            font_system: FontSystem::new_with_locale_and_db(locale, db),
            swash_cache: SwashCache::new(),
        }
    }

    fn layout(&mut self, line: &str, config: &Configuration, width: f32) -> Buffer {
        let font_size = config.text.font_size as f32;
        let metrics = Metrics::new(font_size, font_size * LINE_HEIGHT_FACTOR);
        let mut attrs = Attrs::new().family(Family::Name(&config.text.font_family));
        if config.text.bold {
            attrs = attrs.weight(Weight::BOLD);
        }

        let mut buffer = Buffer::new(&mut self.font_system, metrics);
        buffer.set_size(&mut self.font_system, Some(width), None);
        buffer.set_text(&mut self.font_system, line, attrs, Shaping::Advanced);
        buffer.shape_until_scroll(&mut self.font_system, false);
        buffer
    }

    fn draw_buffer(
        &mut self,
        pixmap: &mut Pixmap,
        buffer: &Buffer,
        origin: (f32, f32),
        color: Color,
    ) {
        let mut paint = Paint {
            anti_alias: false,
            ..Default::default()
        };
        buffer.draw(
            &mut self.font_system,
            &mut self.swash_cache,
            color,
            |x, y, w, h, c| {
                if c.a() == 0 {
                    return;
                }
                let Some(rect) = Rect::from_xywh(
                    origin.0 + x as f32,
                    origin.1 + y as f32,
                    w as f32,
                    h as f32,
                ) else {
                    return;
                };
                paint.set_color_rgba8(c.r(), c.g(), c.b(), c.a());
                pixmap.fill_rect(rect, &paint, Transform::identity(), None);
            },
        );
    }
}

fn buffer_height(buffer: &Buffer) -> f32 {
    buffer.layout_runs().count().max(1) as f32 * buffer.metrics().line_height
}

impl CardPainter for TextPainter {
    fn paint(&mut self, card: &Card, max_height: u32) -> Option<Pixmap> {
        let config = card.config.as_ref();
        let width = config.overlay.width;
        let text_width = (width as f32 - 2.0 * PADDING).max(1.0);
        let spacing = config.text.line_spacing as f32;

        let buffers: Vec<Buffer> = card_lines(&card.payload, config)
            .iter()
            .map(|line| self.layout(line, config, text_width))
            .collect();

        let content: f32 = buffers.iter().map(buffer_height).sum::<f32>()
            + spacing * buffers.len().saturating_sub(1) as f32
            + 2.0 * PADDING;
        let height = card_height(content, config.overlay.height, max_height);

        let mut pixmap = Pixmap::new(width, height)?;
        fill_background(&mut pixmap, config.text.background_color);

        let outline = text_color(config.text.outline_color);
        let fill = text_color(config.text.text_color);
        let offsets = outline_offsets(config.text.outline_width);

        let mut y = PADDING;
        for buffer in &buffers {
            if y >= height as f32 {
                break;
            }
            for (dx, dy) in &offsets {
                self.draw_buffer(
                    &mut pixmap,
                    buffer,
                    (PADDING + *dx as f32, y + *dy as f32),
                    outline,
                );
            }
            self.draw_buffer(&mut pixmap, buffer, (PADDING, y), fill);
            y += buffer_height(buffer) + spacing;
        }

        Some(pixmap)
    }
}

fn fill_background(pixmap: &mut Pixmap, color: HexColor) {
    let mut paint = Paint::default();
    paint.set_color(color_from_rgba(color.rgba()));
    paint.anti_alias = true;

    let (w, h) = (pixmap.width() as f32, pixmap.height() as f32);
    let r = CORNER_RADIUS.min(w / 2.0).min(h / 2.0);

    let mut pb = PathBuilder::new();
    pb.move_to(r, 0.0);
    pb.line_to(w - r, 0.0);
    pb.quad_to(w, 0.0, w, r);
    pb.line_to(w, h - r);
    pb.quad_to(w, h, w - r, h);
    pb.line_to(r, h);
    pb.quad_to(0.0, h, 0.0, h - r);
    pb.line_to(0.0, r);
    pb.quad_to(0.0, 0.0, r, 0.0);
    pb.close();

    if let Some(path) = pb.finish() {
        pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
    }
}
