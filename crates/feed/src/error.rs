// ABOUTME: Error types for podcast feed parsing operations.
// ABOUTME: Provides FeedError, the single fatal failure surfaced by every entry point.

use std::fmt;
use thiserror::Error;

/// Fatal errors that abort a parse.
///
/// Recoverable defects (bad dates, unknown namespaces, oversized text) never
/// show up here: the affected field is left at its "unknown" value instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    /// The document is not well-formed XML or could not be decoded.
    #[error("malformed XML at byte {position}: {message}")]
    Xml { position: u64, message: String },

    /// The underlying byte stream failed.
    #[error("failed to read feed: {0}")]
    Io(String),

    /// The root element is neither an RSS `rss` nor an Atom `feed`.
    #[error("unsupported feed type: <{0}>")]
    UnsupportedRoot(String),

    /// The document parsed but lacks mandatory feed-level data.
    #[error("invalid feed: {0}")]
    Invalid(String),

    /// Element nesting went deeper than the configured maximum.
    #[error("element nesting exceeds the maximum depth of {0}")]
    DepthExceeded(usize),

    /// A paged-feed continuation could not be fetched.
    #[error("failed to fetch {url}: {message}")]
    Fetch { url: String, message: String },
}

impl FeedError {
    /// Creates an Xml error from an underlying tokenizer error.
    pub fn parse(position: u64, err: impl fmt::Display) -> Self {
        FeedError::Xml {
            position,
            message: err.to_string(),
        }
    }

    /// Creates an Invalid error with a custom message.
    pub fn invalid(msg: impl Into<String>) -> Self {
        FeedError::Invalid(msg.into())
    }

    /// Creates a Fetch error for the given continuation URL.
    pub fn fetch(url: impl Into<String>, err: impl fmt::Display) -> Self {
        FeedError::Fetch {
            url: url.into(),
            message: err.to_string(),
        }
    }

    /// True when the document itself was unreadable as XML.
    pub fn is_malformed(&self) -> bool {
        matches!(self, FeedError::Xml { .. } | FeedError::DepthExceeded(_))
    }

    /// Maps a tokenizer error, keeping stream failures apart from syntax errors.
    pub(crate) fn from_xml(err: quick_xml::Error, position: u64) -> Self {
        match err {
            quick_xml::Error::Io(io) => FeedError::Io(io.to_string()),
            other => FeedError::parse(position, other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            FeedError::parse(12, "unexpected end").to_string(),
            "malformed XML at byte 12: unexpected end"
        );
        assert_eq!(
            FeedError::UnsupportedRoot("html".into()).to_string(),
            "unsupported feed type: <html>"
        );
        assert_eq!(
            FeedError::DepthExceeded(256).to_string(),
            "element nesting exceeds the maximum depth of 256"
        );
    }

    #[test]
    fn test_is_malformed() {
        assert!(FeedError::parse(0, "x").is_malformed());
        assert!(FeedError::DepthExceeded(4).is_malformed());
        assert!(!FeedError::invalid("no channel").is_malformed());
        assert!(!FeedError::fetch("http://a/", "timeout").is_malformed());
    }
}
