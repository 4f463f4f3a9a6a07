// ABOUTME: Parse configuration: resource caps and paged-feed following.
// ABOUTME: ParseOptions has documented defaults and a fluent builder-style API.

/// Default cap on episodes retained from one document.
pub const DEFAULT_MAX_EPISODES: usize = 10_000;

/// Default cap on element nesting depth.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Default cap on text collected for a single element, in bytes.
pub const DEFAULT_MAX_TEXT_LEN: usize = 1024 * 1024;

/// Default number of "next page" links followed by `parse_feed_paged`.
pub const DEFAULT_MAX_PAGE_HOPS: usize = 1;

/// Configuration for a parse call.
///
/// Every parse builds its own state from these values; the options are never
/// mutated by the parser, so one instance can be shared between threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// Maximum episodes kept, earliest-declared first. Never below 1.
    pub max_episodes: usize,
    /// Maximum element nesting before the parse fails.
    pub max_depth: usize,
    /// Maximum bytes of text kept per element; the rest is discarded.
    pub max_text_len: usize,
    /// Whether `parse_feed_paged` follows "next page" links.
    pub follow_next_page: bool,
    /// Maximum continuation pages fetched when following is enabled.
    pub max_page_hops: usize,
    /// Use the link or the single enclosure URL as guid when an item has none.
    pub derive_missing_guids: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_episodes: DEFAULT_MAX_EPISODES,
            max_depth: DEFAULT_MAX_DEPTH,
            max_text_len: DEFAULT_MAX_TEXT_LEN,
            follow_next_page: false,
            max_page_hops: DEFAULT_MAX_PAGE_HOPS,
            derive_missing_guids: false,
        }
    }
}

impl ParseOptions {
    /// Create options with the documented defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of retained episodes.
    pub fn max_episodes(mut self, max: usize) -> Self {
        self.max_episodes = max.max(1);
        self
    }

    /// Set the maximum element nesting depth.
    pub fn max_depth(mut self, max: usize) -> Self {
        self.max_depth = max.max(1);
        self
    }

    /// Set the per-element text cap in bytes.
    pub fn max_text_len(mut self, max: usize) -> Self {
        self.max_text_len = max;
        self
    }

    /// Enable or disable following "next page" links.
    pub fn follow_next_page(mut self, follow: bool) -> Self {
        self.follow_next_page = follow;
        self
    }

    /// Set how many continuation pages may be fetched.
    pub fn max_page_hops(mut self, hops: usize) -> Self {
        self.max_page_hops = hops;
        self
    }

    /// Enable or disable guid derivation for items without one.
    pub fn derive_missing_guids(mut self, derive: bool) -> Self {
        self.derive_missing_guids = derive;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = ParseOptions::default();
        assert_eq!(opts.max_episodes, DEFAULT_MAX_EPISODES);
        assert_eq!(opts.max_depth, DEFAULT_MAX_DEPTH);
        assert_eq!(opts.max_text_len, DEFAULT_MAX_TEXT_LEN);
        assert!(!opts.follow_next_page);
        assert_eq!(opts.max_page_hops, 1);
        assert!(!opts.derive_missing_guids);
    }

    #[test]
    fn test_builder_clamps_caps() {
        let opts = ParseOptions::new().max_episodes(0).max_depth(0);
        assert_eq!(opts.max_episodes, 1);
        assert_eq!(opts.max_depth, 1);
    }

    #[test]
    fn test_builder_chain() {
        let opts = ParseOptions::new()
            .max_episodes(5)
            .follow_next_page(true)
            .max_page_hops(3)
            .derive_missing_guids(true);
        assert_eq!(opts.max_episodes, 5);
        assert!(opts.follow_next_page);
        assert_eq!(opts.max_page_hops, 3);
        assert!(opts.derive_missing_guids);
    }
}
