// ABOUTME: Streaming podcast feed parser library for podparse.
// ABOUTME: Turns RSS 2.0 and Atom documents into Podcast/Episode models in a single pass.

pub mod builder;
pub mod dispatch;
pub mod duration_parse;
pub mod error;
pub mod html_utils;
pub mod models;
pub mod namespace;
pub mod options;
pub mod pagination;
pub mod parser;
pub mod text;
pub mod time_parse;
pub mod url_utils;

pub use duration_parse::parse_duration_seconds;
pub use error::FeedError;
pub use html_utils::{decode_entities, is_html, remove_html_tags};
pub use models::{
    Chapter, Enclosure, EnclosureSource, Episode, EpisodeType, FundingLink, Owner, Person,
    Podcast, PodcastType,
};
pub use namespace::Ns;
pub use options::{
    ParseOptions, DEFAULT_MAX_DEPTH, DEFAULT_MAX_EPISODES, DEFAULT_MAX_PAGE_HOPS,
    DEFAULT_MAX_TEXT_LEN,
};
pub use pagination::{parse_feed_paged, FeedFetcher};
pub use parser::{parse_feed, parse_feed_bytes};
pub use text::{squash_whitespace, squash_whitespace_keep_newlines};
pub use time_parse::{parse_flexible_time, parse_pubdate};
pub use url_utils::file_stem;
