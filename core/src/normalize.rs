//! Text normalization shared by the clipboard pipeline and the matcher.
//!
//! Normalized text is only used for comparison. Display always uses the
//! original string.

/// Trim, collapse whitespace runs to a single space and case-fold.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for word in text.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.extend(word.chars().flat_map(char::to_lowercase));
    }
    out
}

/// True when `text` has nothing but whitespace.
#[inline]
pub fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  Capital   Of\tFrance \n"), "capital of france");
        assert_eq!(normalize("ÄRGER über"), "ärger über");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize(" \t\n "), "");
    }

    #[test]
    fn test_is_blank() {
        assert!(is_blank("   \n\t"));
        assert!(!is_blank(" x "));
    }
}
