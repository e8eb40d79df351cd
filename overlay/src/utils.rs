//! Small helpers shared by the renderer and the event loop

use tiny_skia::Color;

/// Convert [u8; 4] RGBA array to tiny_skia Color
#[inline]
pub fn color_from_rgba(rgba: [u8; 4]) -> Color {
    Color::from_rgba8(rgba[0], rgba[1], rgba[2], rgba[3])
}

/// Truncate a string to max_chars, ending in "…" if truncated
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_chars.saturating_sub(1)).collect();
        format!("{}…", truncated.trim_end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("exactly10!", 10), "exactly10!");
        assert_eq!(truncate_text("abcdefghijklmnop", 10), "abcdefghi…");
        assert_eq!(truncate_text("größenänderung", 5), "größ…");
    }

    #[test]
    fn test_color_from_rgba() {
        let c = color_from_rgba([255, 0, 0, 255]);
        assert_eq!(c.red(), 1.0);
        assert_eq!(c.alpha(), 1.0);
    }
}
