//! Overlay configuration document
//!
//! The document has three sections (`overlay`, `text`, `behavior`). Every
//! section and every key is optional: missing entries take the built-in
//! defaults below, so a hand-written file only needs the keys it changes.
//!
//! ```toml
//! [overlay]
//! position = "center-bottom"
//! transparency = 80
//!
//! [behavior]
//! auto_hide_seconds = 0
//! ```

use serde::{Deserialize, Deserializer, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Bounds
// ─────────────────────────────────────────────────────────────────────────────

pub const MIN_OVERLAY_SIZE: u32 = 100;
pub const MAX_OVERLAY_SIZE: u32 = 4096;
pub const MIN_TRANSPARENCY: u8 = 50;
pub const MAX_TRANSPARENCY: u8 = 100;
pub const MIN_FONT_SIZE: u32 = 6;
pub const MAX_FONT_SIZE: u32 = 72;
pub const MAX_OUTLINE_WIDTH: u32 = 5;
pub const MAX_LINE_SPACING: u32 = 60;
pub const MAX_AUTO_HIDE_SECONDS: u32 = 120;

// ─────────────────────────────────────────────────────────────────────────────
// Document
// ─────────────────────────────────────────────────────────────────────────────

/// The full configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub overlay: OverlaySection,
    pub text: TextSection,
    pub behavior: BehaviorSection,
}

impl Configuration {
    /// Clamp every numeric option into its documented range.
    ///
    /// Out-of-range values are not an error; an editor writing `transparency
    /// = 10` gets the nearest legal value instead of losing the whole file.
    pub fn sanitized(mut self) -> Self {
        let o = &mut self.overlay;
        o.width = o.width.clamp(MIN_OVERLAY_SIZE, MAX_OVERLAY_SIZE);
        o.height = o.height.clamp(MIN_OVERLAY_SIZE, MAX_OVERLAY_SIZE);
        o.transparency = o.transparency.clamp(MIN_TRANSPARENCY, MAX_TRANSPARENCY);

        let t = &mut self.text;
        t.font_size = t.font_size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
        t.outline_width = t.outline_width.min(MAX_OUTLINE_WIDTH);
        t.line_spacing = t.line_spacing.min(MAX_LINE_SPACING);

        let b = &mut self.behavior;
        b.auto_hide_seconds = b.auto_hide_seconds.min(MAX_AUTO_HIDE_SECONDS);

        self
    }

    /// Window opacity as a factor in `0.5..=1.0`.
    pub fn opacity(&self) -> f32 {
        f32::from(self.overlay.transparency.clamp(MIN_TRANSPARENCY, MAX_TRANSPARENCY)) / 100.0
    }
}

/// Accept any integer and saturate it into `u32`; the real bounds are applied
/// by [`Configuration::sanitized`].
fn saturating_u32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let value = i64::deserialize(deserializer)?;
    Ok(u32::try_from(value.max(0)).unwrap_or(u32::MAX))
}

fn saturating_u8<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let value = i64::deserialize(deserializer)?;
    Ok(u8::try_from(value.max(0)).unwrap_or(u8::MAX))
}

/// Window placement and size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlaySection {
    pub position: ScreenAnchor,
    #[serde(deserialize_with = "saturating_u32")]
    pub width: u32,
    /// Initial height; the window grows to fit longer answers.
    #[serde(deserialize_with = "saturating_u32")]
    pub height: u32,
    /// Window opacity in percent (50-100).
    #[serde(deserialize_with = "saturating_u8")]
    pub transparency: u8,
}

impl Default for OverlaySection {
    fn default() -> Self {
        Self {
            position: ScreenAnchor::RightMiddle,
            width: 600,
            height: 200,
            transparency: 95,
        }
    }
}

/// Font and color scheme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextSection {
    pub font_family: String,
    #[serde(deserialize_with = "saturating_u32")]
    pub font_size: u32,
    pub bold: bool,
    pub text_color: HexColor,
    pub outline_color: HexColor,
    pub background_color: HexColor,
    /// Outline thickness in pixels, 0 disables the outline.
    #[serde(deserialize_with = "saturating_u32")]
    pub outline_width: u32,
    /// Vertical gap between rendered lines in pixels.
    #[serde(deserialize_with = "saturating_u32")]
    pub line_spacing: u32,
    pub question_prefix: String,
    pub answer_prefix: String,
}

impl Default for TextSection {
    fn default() -> Self {
        Self {
            font_family: "Arial".to_string(),
            font_size: 12,
            bold: true,
            text_color: HexColor::rgb(0xFF, 0xFF, 0xFF),
            outline_color: HexColor::rgb(0x00, 0x00, 0x00),
            background_color: HexColor::rgb(0x2B, 0x2B, 0x2B),
            outline_width: 3,
            line_spacing: 15,
            question_prefix: "\u{1F50D}".to_string(),
            answer_prefix: "\u{27A4}".to_string(),
        }
    }
}

/// Visibility timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorSection {
    /// Seconds a card stays visible; 0 keeps it until replaced or dismissed.
    #[serde(deserialize_with = "saturating_u32")]
    pub auto_hide_seconds: u32,
    pub animations_enabled: bool,
}

impl Default for BehaviorSection {
    fn default() -> Self {
        Self {
            auto_hide_seconds: 30,
            animations_enabled: true,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Screen anchors
// ─────────────────────────────────────────────────────────────────────────────

/// One of the nine named screen anchor points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScreenAnchor {
    LeftTop,
    CenterTop,
    RightTop,
    LeftMiddle,
    Center,
    #[default]
    RightMiddle,
    LeftBottom,
    CenterBottom,
    RightBottom,
}

impl ScreenAnchor {
    pub const ALL: [ScreenAnchor; 9] = [
        Self::LeftTop,
        Self::CenterTop,
        Self::RightTop,
        Self::LeftMiddle,
        Self::Center,
        Self::RightMiddle,
        Self::LeftBottom,
        Self::CenterBottom,
        Self::RightBottom,
    ];

    /// Name as written in the configuration document
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LeftTop => "left-top",
            Self::CenterTop => "center-top",
            Self::RightTop => "right-top",
            Self::LeftMiddle => "left-middle",
            Self::Center => "center",
            Self::RightMiddle => "right-middle",
            Self::LeftBottom => "left-bottom",
            Self::CenterBottom => "center-bottom",
            Self::RightBottom => "right-bottom",
        }
    }

    /// Top-left corner for a `width` x `height` window anchored in `area`.
    ///
    /// Edge anchors keep `margin` pixels from the screen border. The result is
    /// clamped so the window never starts outside the area, even when it is
    /// larger than the screen.
    pub fn place(self, area: ScreenArea, width: u32, height: u32, margin: i32) -> (i32, i32) {
        let w = width as i32;
        let h = height as i32;
        let aw = area.width as i32;
        let ah = area.height as i32;

        let x = match self {
            Self::LeftTop | Self::LeftMiddle | Self::LeftBottom => margin,
            Self::CenterTop | Self::Center | Self::CenterBottom => (aw - w) / 2,
            Self::RightTop | Self::RightMiddle | Self::RightBottom => aw - w - margin,
        };
        let y = match self {
            Self::LeftTop | Self::CenterTop | Self::RightTop => margin,
            Self::LeftMiddle | Self::Center | Self::RightMiddle => (ah - h) / 2,
            Self::LeftBottom | Self::CenterBottom | Self::RightBottom => ah - h - margin,
        };

        let x = x.min(aw - w).max(0);
        let y = y.min(ah - h).max(0);
        (area.x + x, area.y + y)
    }
}

impl std::fmt::Display for ScreenAnchor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rectangle of screen space in absolute pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenArea {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl ScreenArea {
    pub const FALLBACK: ScreenArea = ScreenArea {
        x: 0,
        y: 0,
        width: 1920,
        height: 1080,
    };
}

// ─────────────────────────────────────────────────────────────────────────────
// Colors
// ─────────────────────────────────────────────────────────────────────────────

/// An RGBA color written as `#RRGGBB` or `#RRGGBBAA`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor(pub [u8; 4]);

impl HexColor {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b, 255])
    }

    pub const fn rgba(self) -> [u8; 4] {
        self.0
    }

    pub fn parse(s: &str) -> Result<Self, ParseColorError> {
        let hex = s.trim();
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if !(hex.len() == 6 || hex.len() == 8) || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ParseColorError(s.to_string()));
        }

        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| ParseColorError(s.to_string()))
        };
        let alpha = if hex.len() == 8 { channel(6)? } else { 255 };
        Ok(Self([channel(0)?, channel(2)?, channel(4)?, alpha]))
    }
}

impl std::fmt::Display for HexColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let [r, g, b, a] = self.0;
        if a == 255 {
            write!(f, "#{r:02X}{g:02X}{b:02X}")
        } else {
            write!(f, "#{r:02X}{g:02X}{b:02X}{a:02X}")
        }
    }
}

impl TryFrom<String> for HexColor {
    type Error = ParseColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<HexColor> for String {
    fn from(color: HexColor) -> Self {
        color.to_string()
    }
}

/// A color string that is not `#RRGGBB` or `#RRGGBBAA`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseColorError(pub String);

impl std::fmt::Display for ParseColorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid color {:?}, expected #RRGGBB or #RRGGBBAA", self.0)
    }
}

impl std::error::Error for ParseColorError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_yields_defaults() {
        let config: Configuration = toml::from_str("").unwrap();
        assert_eq!(config, Configuration::default());
        assert_eq!(config.overlay.position, ScreenAnchor::RightMiddle);
        assert_eq!(config.overlay.width, 600);
        assert_eq!(config.overlay.height, 200);
        assert_eq!(config.overlay.transparency, 95);
        assert_eq!(config.text.font_family, "Arial");
        assert_eq!(config.text.font_size, 12);
        assert!(config.text.bold);
        assert_eq!(config.text.text_color, HexColor::rgb(255, 255, 255));
        assert_eq!(config.text.background_color, HexColor::rgb(0x2B, 0x2B, 0x2B));
        assert_eq!(config.behavior.auto_hide_seconds, 30);
        assert!(config.behavior.animations_enabled);
    }

    #[test]
    fn test_partial_document_keeps_other_defaults() {
        let toml = r#"
[overlay]
position = "center-bottom"

[behavior]
auto_hide_seconds = 0
"#;
        let config: Configuration = toml::from_str(toml).unwrap();
        assert_eq!(config.overlay.position, ScreenAnchor::CenterBottom);
        assert_eq!(config.overlay.width, 600);
        assert_eq!(config.behavior.auto_hide_seconds, 0);
        assert!(config.behavior.animations_enabled);
        assert_eq!(config.text, TextSection::default());
    }

    #[test]
    fn test_full_document_round_trip() {
        let config = Configuration {
            overlay: OverlaySection {
                position: ScreenAnchor::LeftTop,
                width: 800,
                height: 300,
                transparency: 70,
            },
            text: TextSection {
                font_family: "DejaVu Sans".to_string(),
                font_size: 16,
                bold: false,
                text_color: HexColor::rgb(0x11, 0x22, 0x33),
                outline_color: HexColor([0, 0, 0, 0x80]),
                background_color: HexColor::rgb(0xFE, 0xDC, 0xBA),
                outline_width: 1,
                line_spacing: 20,
                question_prefix: "Q:".to_string(),
                answer_prefix: "A:".to_string(),
            },
            behavior: BehaviorSection {
                auto_hide_seconds: 90,
                animations_enabled: false,
            },
        };

        let text = toml::to_string(&config).unwrap();
        let parsed: Configuration = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_out_of_range_numbers_keep_the_document() {
        let toml = r#"
[overlay]
position = "left-top"
width = -40
transparency = 300

[text]
font_size = 5000000000
outline_width = -1

[behavior]
auto_hide_seconds = 0
"#;
        let config: Configuration = toml::from_str(toml).unwrap();
        assert_eq!(config.overlay.position, ScreenAnchor::LeftTop);
        assert_eq!(config.overlay.transparency, u8::MAX);

        let config = config.sanitized();
        assert_eq!(config.overlay.position, ScreenAnchor::LeftTop);
        assert_eq!(config.overlay.width, MIN_OVERLAY_SIZE);
        assert_eq!(config.overlay.height, 200);
        assert_eq!(config.overlay.transparency, 100);
        assert_eq!(config.text.font_size, MAX_FONT_SIZE);
        assert_eq!(config.text.outline_width, 0);
        assert_eq!(config.behavior.auto_hide_seconds, 0);
    }

    #[test]
    fn test_non_integer_size_is_rejected() {
        let result: Result<Configuration, _> = toml::from_str("[overlay]\nwidth = \"wide\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_anchor_is_rejected() {
        let result: Result<Configuration, _> = toml::from_str("[overlay]\nposition = \"middle\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_every_anchor_name_parses() {
        for anchor in ScreenAnchor::ALL {
            let toml = format!("[overlay]\nposition = \"{}\"", anchor.as_str());
            let config: Configuration = toml::from_str(&toml).unwrap();
            assert_eq!(config.overlay.position, anchor);
        }
    }

    #[test]
    fn test_hex_color_parse() {
        assert_eq!(HexColor::parse("#FFFFFF").unwrap(), HexColor::rgb(255, 255, 255));
        assert_eq!(HexColor::parse("2b2b2b").unwrap(), HexColor::rgb(0x2B, 0x2B, 0x2B));
        assert_eq!(HexColor::parse("#00000080").unwrap(), HexColor([0, 0, 0, 0x80]));
        assert!(HexColor::parse("#FFF").is_err());
        assert!(HexColor::parse("#GGGGGG").is_err());
        assert!(HexColor::parse("white").is_err());
    }

    #[test]
    fn test_hex_color_display() {
        assert_eq!(HexColor::rgb(0x2B, 0x2B, 0x2B).to_string(), "#2B2B2B");
        assert_eq!(HexColor([1, 2, 3, 4]).to_string(), "#01020304");
    }

    #[test]
    fn test_sanitized_clamps_ranges() {
        let mut config = Configuration::default();
        config.overlay.transparency = 10;
        config.overlay.width = 0;
        config.text.font_size = 500;
        config.text.outline_width = 9;
        config.behavior.auto_hide_seconds = 1000;

        let config = config.sanitized();
        assert_eq!(config.overlay.transparency, MIN_TRANSPARENCY);
        assert_eq!(config.overlay.width, MIN_OVERLAY_SIZE);
        assert_eq!(config.text.font_size, MAX_FONT_SIZE);
        assert_eq!(config.text.outline_width, MAX_OUTLINE_WIDTH);
        assert_eq!(config.behavior.auto_hide_seconds, MAX_AUTO_HIDE_SECONDS);
    }

    #[test]
    fn test_anchor_placement() {
        let area = ScreenArea {
            x: 0,
            y: 0,
            width: 1000,
            height: 800,
        };
        assert_eq!(ScreenAnchor::LeftTop.place(area, 200, 100, 20), (20, 20));
        assert_eq!(ScreenAnchor::Center.place(area, 200, 100, 20), (400, 350));
        assert_eq!(ScreenAnchor::RightMiddle.place(area, 200, 100, 20), (780, 350));
        assert_eq!(ScreenAnchor::RightBottom.place(area, 200, 100, 20), (780, 680));
        assert_eq!(ScreenAnchor::CenterBottom.place(area, 200, 100, 20), (400, 680));
    }

    #[test]
    fn test_anchor_placement_is_offset_and_clamped() {
        let area = ScreenArea {
            x: 1920,
            y: 0,
            width: 300,
            height: 200,
        };
        // Window wider than the monitor still starts on the monitor
        assert_eq!(ScreenAnchor::RightTop.place(area, 500, 100, 20), (1920, 20));
        assert_eq!(ScreenAnchor::LeftBottom.place(area, 100, 100, 20), (1940, 80));
    }
}
