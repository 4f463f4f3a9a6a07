// ABOUTME: Text normalization for feed fields.
// ABOUTME: Whitespace squashing, control character stripping and byte-length caps.

/// True for characters that never belong in a text field.
/// Tab, line feed and carriage return are kept; the squash functions fold them.
fn is_stray_control(c: char) -> bool {
    c.is_control() && !matches!(c, '\t' | '\n' | '\r')
}

/// Removes control characters other than tab, LF and CR.
pub fn strip_control_chars(s: &str) -> String {
    s.chars().filter(|&c| !is_stray_control(c)).collect()
}

/// Collapses every whitespace run into one space and trims both ends.
/// Control characters are dropped.
pub fn squash_whitespace(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut pending_space = false;

    for c in s.chars() {
        if c.is_whitespace() {
            pending_space = !result.is_empty();
        } else if !is_stray_control(c) {
            if pending_space {
                result.push(' ');
                pending_space = false;
            }
            result.push(c);
        }
    }

    result
}

/// Like `squash_whitespace`, but line feeds and carriage returns survive.
/// Runs of other whitespace become one space.
pub fn squash_whitespace_keep_newlines(s: &str) -> String {
    let trimmed = s.trim();
    let mut result = String::with_capacity(trimmed.len());
    let mut last_was_space = false;

    for c in trimmed.chars() {
        if c == '\n' || c == '\r' {
            result.push(c);
            last_was_space = false;
        } else if c.is_whitespace() {
            if !last_was_space {
                result.push(' ');
                last_was_space = true;
            }
        } else if !is_stray_control(c) {
            result.push(c);
            last_was_space = false;
        }
    }

    result
}

/// Largest index <= `max` that lies on a char boundary of `s`.
pub fn floor_char_boundary(s: &str, max: usize) -> usize {
    if max >= s.len() {
        return s.len();
    }
    let mut idx = max;
    while !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

/// Truncates `s` in place to at most `max` bytes without splitting a char.
/// Returns true when something was cut.
pub fn truncate_to(s: &mut String, max: usize) -> bool {
    if s.len() <= max {
        return false;
    }
    let idx = floor_char_boundary(s, max);
    s.truncate(idx);
    true
}

/// Returns `None` for blank input, otherwise the input.
pub fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_squash_whitespace() {
        assert_eq!(squash_whitespace("  Hello\n\n World  "), "Hello World");
        assert_eq!(
            squash_whitespace(" some\t   text  with a    lot of   spaces "),
            "some text with a lot of spaces"
        );
        assert_eq!(squash_whitespace("   "), "");
    }

    #[test]
    fn test_squash_drops_control_chars() {
        assert_eq!(squash_whitespace("a\u{0}b\u{1b}c"), "abc");
        assert_eq!(strip_control_chars("x\u{7}y\nz"), "xy\nz");
    }

    #[test]
    fn test_squash_keep_newlines() {
        assert_eq!(
            squash_whitespace_keep_newlines(" linefeeds\ncarriage\r  returns"),
            "linefeeds\ncarriage\r returns"
        );
        assert_eq!(squash_whitespace_keep_newlines("a \t b\n\nc"), "a b\n\nc");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let mut s = String::from("héllo");
        assert!(truncate_to(&mut s, 2));
        assert_eq!(s, "h");

        let mut short = String::from("abc");
        assert!(!truncate_to(&mut short, 10));
        assert_eq!(short, "abc");
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty("  ".into()), None);
        assert_eq!(non_empty("x".into()), Some("x".into()));
    }
}
