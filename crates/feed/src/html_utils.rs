// ABOUTME: HTML helpers for episode descriptions.
// ABOUTME: HTML detection heuristic, tag removal to plain text, and entity decoding.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static HTML_TEST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<[a-z][a-z0-9]*(?:\s.*?>|/?>)").unwrap());
static NEWLINE_TAGS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(<br[^>]*>|</?ul[^>]*>|</li>)").unwrap());
static LISTING_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<li[^>]*>").unwrap());
static PARAGRAPH_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[Pp]>").unwrap());
static ANY_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());
static ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[A-Za-z][A-Za-z0-9]{1,7});").unwrap());
static EXTRA_NEWLINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([\r\n]{2})[\r\n]+").unwrap());

/// Heuristically tells whether text is HTML by looking for an opening tag.
pub fn is_html(text: &str) -> bool {
    HTML_TEST.is_match(text)
}

/// Converts HTML into plain text suitable for a simple text view.
///
/// Line-level tags (`<br>`, list markup, `<p>`) become line breaks, all other
/// tags are removed, entities are decoded and runs of more than two line
/// breaks collapse to two.
pub fn remove_html_tags(html: &str) -> String {
    let result = NEWLINE_TAGS.replace_all(html, "\n");
    let result = LISTING_TAGS.replace_all(&result, "\n * ");
    let result = PARAGRAPH_TAGS.replace_all(&result, "\n\n");
    let result = ANY_TAG.replace_all(&result, "");
    let result = decode_entities(&result);
    let result = EXTRA_NEWLINES.replace_all(&result, "$1");
    result.trim().to_string()
}

/// Decodes named and numeric character references.
/// Unknown names are left untouched.
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    ENTITY
        .replace_all(s, |caps: &Captures<'_>| match resolve_entity(&caps[1]) {
            Some(decoded) => decoded,
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Resolves the body of an entity reference (without `&` and `;`).
/// Handles `#123`, `#x7B` and the named entities feeds commonly use.
pub fn resolve_entity(name: &str) -> Option<String> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse::<u32>().ok()?,
        };
        return char::from_u32(code).map(String::from);
    }
    named_entity(name).map(str::to_string)
}

fn named_entity(name: &str) -> Option<&'static str> {
    let decoded = match name {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        "nbsp" => "\u{A0}",
        "ndash" => "\u{2013}",
        "mdash" => "\u{2014}",
        "lsquo" => "\u{2018}",
        "rsquo" => "\u{2019}",
        "ldquo" => "\u{201C}",
        "rdquo" => "\u{201D}",
        "hellip" => "\u{2026}",
        "copy" => "\u{A9}",
        "reg" => "\u{AE}",
        "trade" => "\u{2122}",
        "bull" => "\u{2022}",
        "middot" => "\u{B7}",
        "deg" => "\u{B0}",
        "plusmn" => "\u{B1}",
        "times" => "\u{D7}",
        "divide" => "\u{F7}",
        "frac12" => "\u{BD}",
        "frac14" => "\u{BC}",
        "frac34" => "\u{BE}",
        "euro" => "\u{20AC}",
        "pound" => "\u{A3}",
        "yen" => "\u{A5}",
        "cent" => "\u{A2}",
        "auml" => "\u{E4}",
        "ouml" => "\u{F6}",
        "uuml" => "\u{FC}",
        "Auml" => "\u{C4}",
        "Ouml" => "\u{D6}",
        "Uuml" => "\u{DC}",
        "szlig" => "\u{DF}",
        "eacute" => "\u{E9}",
        "egrave" => "\u{E8}",
        "aacute" => "\u{E1}",
        "agrave" => "\u{E0}",
        "ccedil" => "\u{E7}",
        _ => return None,
    };
    Some(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_html() {
        assert!(is_html("<h1>HELLO</h1>"));
        assert!(is_html("text with <br/> break"));
        assert!(is_html("<a href=\"x\">link</a>"));
        assert!(!is_html("a < b < c"));
        assert!(!is_html("plain text"));
    }

    #[test]
    fn test_remove_html_tags() {
        assert_eq!(remove_html_tags("<p>Hello</p>"), "Hello");
        assert_eq!(remove_html_tags("one<br>two"), "one\ntwo");
        assert_eq!(
            remove_html_tags("<ul><li>a</li><li>b</li></ul>"),
            "* a\n\n * b"
        );
        assert_eq!(remove_html_tags("Tom &amp; Jerry &#169;"), "Tom & Jerry \u{A9}");
    }

    #[test]
    fn test_remove_html_collapses_newlines() {
        assert_eq!(remove_html_tags("a<br><br><br><br>b"), "a\n\nb");
    }

    #[test]
    fn test_decode_entities_named_and_numeric() {
        assert_eq!(decode_entities("&amp;&#38;&lt;"), "&&<");
        assert_eq!(decode_entities("&#x26;&#xA9;"), "&\u{A9}");
        assert_eq!(decode_entities("&mdash;"), "\u{2014}");
    }

    #[test]
    fn test_decode_entities_is_single_pass() {
        assert_eq!(decode_entities("&amp;lt;"), "&lt;");
    }

    #[test]
    fn test_unknown_entity_kept() {
        assert_eq!(decode_entities("&bogus; & done"), "&bogus; & done");
        assert_eq!(resolve_entity("bogus"), None);
        assert_eq!(resolve_entity("#65"), Some("A".to_string()));
    }
}
