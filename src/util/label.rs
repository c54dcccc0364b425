use std::borrow::Cow;

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const ELLIPSIS: &str = "...";

/// Removes terminal control characters and escape sequences from server text.
///
/// Item names and collection names come straight from the marketplace API and
/// are rendered into the terminal, so `ESC`-introduced sequences and C0/DEL
/// control bytes are dropped. Newlines and tabs become spaces since a card
/// label is a single line. Clean input is returned borrowed.
pub fn sanitize(s: &str) -> Cow<'_, str> {
    if !s.chars().any(|c| c.is_control()) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\x1b' => match chars.peek() {
                // CSI: parameters until a final byte in @..=~
                Some('[') => {
                    chars.next();
                    for n in chars.by_ref() {
                        if ('\x40'..='\x7e').contains(&n) {
                            break;
                        }
                    }
                }
                // OSC: until BEL or ST
                Some(']') => {
                    chars.next();
                    while let Some(n) = chars.next() {
                        if n == '\x07' {
                            break;
                        }
                        if n == '\x1b' && chars.peek() == Some(&'\\') {
                            chars.next();
                            break;
                        }
                    }
                }
                _ => {}
            },
            '\n' | '\t' | '\r' => out.push(' '),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Produces a sanitized card label that fits in `max_width` terminal columns.
///
/// Labels wider than the limit are cut on a character boundary and end in
/// `...`; limits of three columns or fewer get no ellipsis.
pub fn card_label(name: &str, max_width: usize) -> String {
    let clean = sanitize(name);
    if UnicodeWidthStr::width(clean.as_ref()) <= max_width {
        return clean.into_owned();
    }

    let limit = if max_width > ELLIPSIS.len() {
        max_width - ELLIPSIS.len()
    } else {
        max_width
    };

    let mut width = 0;
    let mut out = String::new();
    for c in clean.chars() {
        let w = UnicodeWidthChar::width(c).unwrap_or(0);
        if width + w > limit {
            break;
        }
        width += w;
        out.push(c);
    }
    if max_width > ELLIPSIS.len() {
        out.push_str(ELLIPSIS);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_name_is_borrowed() {
        assert!(matches!(sanitize("Moon Cat #12"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_sanitize_strips_escapes() {
        assert_eq!(sanitize("\x1b[31mRed\x1b[0m Cat"), "Red Cat");
        assert_eq!(sanitize("\x1b]0;title\x07Cat"), "Cat");
        assert_eq!(sanitize("\x1b]0;title\x1b\\Cat"), "Cat");
        assert_eq!(sanitize("Ca\x00t\x7f"), "Cat");
        assert_eq!(sanitize("two\nlines"), "two lines");
    }

    #[test]
    fn test_label_fits() {
        assert_eq!(card_label("Short", 10), "Short");
        assert_eq!(card_label("12345", 5), "12345");
    }

    #[test]
    fn test_label_truncated_with_ellipsis() {
        assert_eq!(card_label("Hello World", 8), "Hello...");
        assert_eq!(card_label("你好世界", 7), "你好...");
    }

    #[test]
    fn test_label_narrow_limit() {
        assert_eq!(card_label("Test", 0), "");
        assert_eq!(card_label("Testing", 3), "Tes");
        assert_eq!(card_label("你好", 1), "");
    }
}
