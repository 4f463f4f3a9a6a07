// ABOUTME: Immutable result models for parsed podcast feeds.
// ABOUTME: Podcast, Episode, Enclosure, Chapter, Person and their small enums.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Show ordering hint from `itunes:type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PodcastType {
    Episodic,
    Serial,
}

impl PodcastType {
    pub fn from_text(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "episodic" => Some(PodcastType::Episodic),
            "serial" => Some(PodcastType::Serial),
            _ => None,
        }
    }
}

/// Episode kind from `itunes:episodeType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EpisodeType {
    Full,
    Trailer,
    Bonus,
}

impl EpisodeType {
    pub fn from_text(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Some(EpisodeType::Full),
            "trailer" => Some(EpisodeType::Trailer),
            "bonus" => Some(EpisodeType::Bonus),
            _ => None,
        }
    }
}

/// Where an enclosure candidate was declared.
///
/// `Enclosure` covers RSS `enclosure` and `media:content`; `AlternateMedia`
/// covers Atom `link rel="enclosure"`. On duplicate URLs the former wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnclosureSource {
    Enclosure,
    AlternateMedia,
}

impl EnclosureSource {
    /// Lower is preferred.
    pub(crate) fn rank(self) -> u8 {
        match self {
            EnclosureSource::Enclosure => 0,
            EnclosureSource::AlternateMedia => 1,
        }
    }
}

/// A downloadable media file of an episode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enclosure {
    pub url: String,
    pub mime_type: String,
    /// Size in bytes, 0 when unknown.
    pub file_size: u64,
    pub source: EnclosureSource,
}

/// A chapter mark, start offset in whole seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub start: u32,
    pub title: String,
    pub href: Option<String>,
    pub image: Option<String>,
}

/// Someone involved in an episode (`podcast:person`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    pub role: String,
    pub group: String,
    pub href: Option<String>,
    pub img: Option<String>,
}

/// Contact from `itunes:owner`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// A `podcast:funding` link with its optional label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingLink {
    pub url: String,
    pub title: Option<String>,
}

/// A single retained episode. Always has a guid and at least one enclosure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    pub guid: String,
    pub title: String,
    pub link: Option<String>,
    pub description: String,
    pub description_html: Option<String>,
    pub subtitle: Option<String>,
    /// Unix timestamp in seconds, 0 when unknown.
    pub published: i64,
    /// Length in seconds, 0 when unknown.
    pub total_time: u32,
    pub explicit: bool,
    pub season: Option<u32>,
    pub number: Option<u32>,
    #[serde(rename = "type")]
    pub episode_type: Option<EpisodeType>,
    pub author: Option<String>,
    pub art_url: Option<String>,
    pub payment_url: Option<String>,
    pub chapters_url: Option<String>,
    pub transcript_url: Option<String>,
    pub persons: Vec<Person>,
    pub enclosures: Vec<Enclosure>,
    pub chapters: Vec<Chapter>,
}

impl Episode {
    /// The publication time, or None when the feed gave no usable date.
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        if self.published == 0 {
            return None;
        }
        DateTime::from_timestamp(self.published, 0)
    }

    /// The duration, or None when unknown.
    pub fn duration_seconds(&self) -> Option<u32> {
        (self.total_time > 0).then_some(self.total_time)
    }
}

/// The parsed feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Podcast {
    /// Never empty: falls back to the link, the feed file name, or a placeholder.
    pub title: String,
    pub link: Option<String>,
    pub description: String,
    pub cover_url: Option<String>,
    pub language: Option<String>,
    pub explicit: bool,
    #[serde(rename = "type")]
    pub podcast_type: Option<PodcastType>,
    pub author: Option<String>,
    pub owner: Option<Owner>,
    /// Each entry is a category path: top level first, then sub-categories.
    pub categories: Vec<Vec<String>>,
    pub keywords: Vec<String>,
    pub payment_url: Option<String>,
    pub new_feed_url: Option<String>,
    pub locked: bool,
    pub funding: Vec<FundingLink>,
    pub generator: Option<String>,
    /// Paged-feed continuation (`atom:link rel="next"`), advisory.
    pub next_page_url: Option<String>,
    pub first_page_url: Option<String>,
    /// Declaration order, truncated to the configured maximum.
    pub episodes: Vec<Episode>,
}

impl Podcast {
    /// True when the feed points at a further page of episodes.
    pub fn is_paged(&self) -> bool {
        self.next_page_url.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_parsing() {
        assert_eq!(PodcastType::from_text(" Serial "), Some(PodcastType::Serial));
        assert_eq!(PodcastType::from_text("weekly"), None);
        assert_eq!(EpisodeType::from_text("TRAILER"), Some(EpisodeType::Trailer));
        assert_eq!(EpisodeType::from_text(""), None);
    }

    #[test]
    fn test_enclosure_source_rank() {
        assert!(EnclosureSource::Enclosure.rank() < EnclosureSource::AlternateMedia.rank());
    }
}
