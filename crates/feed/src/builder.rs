// ABOUTME: In-progress podcast and episode builders filled while streaming.
// ABOUTME: Applies conflict policies and runs per-episode validation and post-processing.

use std::collections::HashMap;

use crate::dispatch::{EpisodeField, Policy, PodcastField, Value};
use crate::html_utils::{is_html, remove_html_tags};
use crate::models::{
    Chapter, Enclosure, Episode, EpisodeType, FundingLink, Owner, Person, Podcast, PodcastType,
};
use crate::options::ParseOptions;
use crate::url_utils::{file_stem, is_absolute};

const UNTITLED_PODCAST: &str = "Untitled Podcast";

fn assign<T>(slot: &mut Option<T>, value: T, policy: Policy) {
    if policy == Policy::FirstWins && slot.is_some() {
        return;
    }
    *slot = Some(value);
}

/// Normalizes an enclosure mime type; anything without a `/` is unknown.
pub fn parse_mime_type(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        Some(mime) if mime.contains('/') => mime.to_string(),
        _ => "application/octet-stream".to_string(),
    }
}

/// Parses an enclosure byte size; missing, zero or garbage sizes are 0.
pub fn parse_length(raw: Option<&str>) -> u64 {
    raw.and_then(|s| s.trim().parse::<u64>().ok()).unwrap_or(0)
}

/// Episode fields gathered between the item's open and close tags.
#[derive(Debug, Default)]
pub struct EpisodeBuilder {
    guid: Option<String>,
    guid_is_permalink: bool,
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    description_html: Option<String>,
    subtitle: Option<String>,
    published: Option<i64>,
    total_time: Option<u32>,
    explicit: Option<bool>,
    season: Option<u32>,
    number: Option<u32>,
    episode_type: Option<EpisodeType>,
    author: Option<String>,
    art_url: Option<String>,
    payment_url: Option<String>,
    chapters_url: Option<String>,
    transcript_url: Option<String>,
    persons: Vec<Person>,
    enclosures: Vec<Enclosure>,
    chapters: Vec<Chapter>,
}

impl EpisodeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, field: EpisodeField, value: Value, policy: Policy) {
        match (field, value) {
            (EpisodeField::Guid, Value::Text(v)) => assign(&mut self.guid, v, policy),
            (EpisodeField::Title, Value::Text(v)) => assign(&mut self.title, v, policy),
            (EpisodeField::Link, Value::Text(v)) => assign(&mut self.link, v, policy),
            (EpisodeField::Description, Value::Text(v)) => {
                assign(&mut self.description, v, policy)
            }
            (EpisodeField::DescriptionHtml, Value::Text(v)) => {
                assign(&mut self.description_html, v, policy)
            }
            (EpisodeField::Subtitle, Value::Text(v)) => assign(&mut self.subtitle, v, policy),
            (EpisodeField::Published, Value::Timestamp(v)) => {
                assign(&mut self.published, v, policy)
            }
            (EpisodeField::Duration, Value::Seconds(v)) => assign(&mut self.total_time, v, policy),
            (EpisodeField::Explicit, Value::Flag(v)) => assign(&mut self.explicit, v, policy),
            (EpisodeField::Season, Value::Int(v)) => assign(&mut self.season, v, policy),
            (EpisodeField::Number, Value::Int(v)) => assign(&mut self.number, v, policy),
            (EpisodeField::EpisodeType, Value::EpisodeType(v)) => {
                assign(&mut self.episode_type, v, policy)
            }
            (EpisodeField::Author, Value::Text(v)) => assign(&mut self.author, v, policy),
            (EpisodeField::ArtUrl, Value::Text(v)) => assign(&mut self.art_url, v, policy),
            (EpisodeField::TranscriptUrl, Value::Text(v)) => {
                assign(&mut self.transcript_url, v, policy)
            }
            (EpisodeField::ChaptersUrl, Value::Text(v)) => {
                assign(&mut self.chapters_url, v, policy)
            }
            (field, value) => log::debug!("ignoring {value:?} for episode field {field:?}"),
        }
    }

    /// Sets the guid from an RSS `guid` element.
    pub fn set_guid(&mut self, guid: String, is_permalink: bool) {
        self.guid = Some(guid);
        self.guid_is_permalink = is_permalink;
    }

    /// RSS item descriptions carry either HTML or plain text; neither
    /// replaces a value another element already provided.
    pub fn set_rss_description(&mut self, raw: &str, plain: Option<String>) {
        if is_html(raw) {
            let html = raw.trim();
            if self.description_html.is_none() && !html.is_empty() {
                self.description_html = Some(html.to_string());
            }
        } else if self.description.is_none() {
            self.description = plain;
        }
    }

    pub fn has_link(&self) -> bool {
        self.link.is_some()
    }

    pub fn set_link_if_missing(&mut self, link: String) {
        if self.link.is_none() {
            self.link = Some(link);
        }
    }

    pub fn set_payment_url(&mut self, url: String) {
        self.payment_url = Some(url);
    }

    pub fn add_enclosure(&mut self, enclosure: Enclosure) {
        self.enclosures.push(enclosure);
    }

    pub fn add_chapter(&mut self, chapter: Chapter) {
        self.chapters.push(chapter);
    }

    pub fn add_person(&mut self, person: Person) {
        self.persons.push(person);
    }

    /// Names the person opened last.
    pub fn set_last_person_name(&mut self, name: String) {
        if let Some(person) = self.persons.last_mut() {
            person.name = name;
        }
    }

    /// Validates and post-processes the episode.
    /// Returns None when it has no guid or no usable enclosure.
    pub fn finish(self, options: &ParseOptions) -> Option<Episode> {
        let enclosures = dedupe_enclosures(self.enclosures);
        if enclosures.is_empty() {
            log::debug!("dropping episode {:?}: no usable enclosure", self.guid);
            return None;
        }

        let guid = match self.guid {
            Some(guid) => guid,
            None => {
                let derived = options
                    .derive_missing_guids
                    .then(|| derive_guid(self.link.as_deref(), &enclosures))
                    .flatten();
                match derived {
                    Some(guid) => guid,
                    None => {
                        log::debug!("dropping episode without guid");
                        return None;
                    }
                }
            }
        };

        let mut link = self.link;
        if link.is_none() && self.guid_is_permalink && is_absolute(&guid) {
            link = Some(guid.clone());
        }

        let (description, description_html) =
            choose_descriptions(self.description, self.description_html);

        let title = self
            .title
            .or_else(|| match enclosures.as_slice() {
                [only] => file_stem(&only.url),
                _ => None,
            })
            .unwrap_or_default();

        let mut chapters = self.chapters;
        chapters.sort_by_key(|chapter| chapter.start);

        let persons = self
            .persons
            .into_iter()
            .filter(|person| !person.name.is_empty())
            .collect();

        Some(Episode {
            guid,
            title,
            link,
            description,
            description_html,
            subtitle: self.subtitle,
            published: self.published.unwrap_or(0),
            total_time: self.total_time.unwrap_or(0),
            explicit: self.explicit.unwrap_or(false),
            season: self.season,
            number: self.number,
            episode_type: self.episode_type,
            author: self.author,
            art_url: self.art_url,
            payment_url: self.payment_url,
            chapters_url: self.chapters_url,
            transcript_url: self.transcript_url,
            persons,
            enclosures,
            chapters,
        })
    }
}

/// Collapses enclosures sharing a URL. The survivor keeps the position of
/// the first occurrence and the data of the preferred source; a missing
/// size is filled from any duplicate.
fn dedupe_enclosures(enclosures: Vec<Enclosure>) -> Vec<Enclosure> {
    let mut result: Vec<Enclosure> = Vec::with_capacity(enclosures.len());
    let mut index: HashMap<String, usize> = HashMap::new();

    for enclosure in enclosures {
        match index.get(&enclosure.url) {
            Some(&pos) => {
                let kept = &mut result[pos];
                let size = kept.file_size;
                if enclosure.source.rank() < kept.source.rank() {
                    *kept = enclosure;
                    if kept.file_size == 0 {
                        kept.file_size = size;
                    }
                } else if kept.file_size == 0 {
                    kept.file_size = enclosure.file_size;
                }
            }
            None => {
                index.insert(enclosure.url.clone(), result.len());
                result.push(enclosure);
            }
        }
    }

    result
}

/// The link, or the URL shared by every enclosure.
fn derive_guid(link: Option<&str>, enclosures: &[Enclosure]) -> Option<String> {
    if let Some(link) = link {
        return Some(link.to_string());
    }
    match enclosures {
        [only] => Some(only.url.clone()),
        _ => None,
    }
}

/// HTML that ended up in the plain description moves to the HTML slot;
/// an empty plain description is then rendered from the HTML.
fn choose_descriptions(
    plain: Option<String>,
    html: Option<String>,
) -> (String, Option<String>) {
    let mut plain = plain.unwrap_or_default();
    let mut html = html;

    if is_html(&plain) {
        if html.is_none() {
            html = Some(plain.clone());
        }
        plain.clear();
    }

    if plain.is_empty() {
        if let Some(html) = &html {
            plain = remove_html_tags(html);
        }
    }

    (plain, html)
}

/// Feed-level fields plus the episodes retained so far.
#[derive(Debug, Default)]
pub struct PodcastBuilder {
    seen_channel: bool,
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    cover_url: Option<String>,
    language: Option<String>,
    generator: Option<String>,
    author: Option<String>,
    new_feed_url: Option<String>,
    explicit: Option<bool>,
    locked: Option<bool>,
    podcast_type: Option<PodcastType>,
    keywords: Vec<String>,
    owner: Option<Owner>,
    categories: Vec<Vec<String>>,
    funding: Vec<FundingLink>,
    payment_url: Option<String>,
    next_page_url: Option<String>,
    first_page_url: Option<String>,
    current: Option<EpisodeBuilder>,
    episodes: Vec<Episode>,
}

impl PodcastBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_channel(&mut self) {
        self.seen_channel = true;
    }

    pub fn apply(&mut self, field: PodcastField, value: Value, policy: Policy) {
        match (field, value) {
            (PodcastField::Title, Value::Text(v)) => assign(&mut self.title, v, policy),
            (PodcastField::Link, Value::Text(v)) => assign(&mut self.link, v, policy),
            (PodcastField::Description, Value::Text(v)) => {
                assign(&mut self.description, v, policy)
            }
            (PodcastField::CoverUrl, Value::Text(v)) => assign(&mut self.cover_url, v, policy),
            (PodcastField::Language, Value::Text(v)) => assign(&mut self.language, v, policy),
            (PodcastField::Generator, Value::Text(v)) => assign(&mut self.generator, v, policy),
            (PodcastField::Author, Value::Text(v)) => assign(&mut self.author, v, policy),
            (PodcastField::NewFeedUrl, Value::Text(v)) => {
                assign(&mut self.new_feed_url, v, policy)
            }
            (PodcastField::Explicit, Value::Flag(v)) => assign(&mut self.explicit, v, policy),
            (PodcastField::Locked, Value::Flag(v)) => assign(&mut self.locked, v, policy),
            (PodcastField::Type, Value::PodcastType(v)) => {
                assign(&mut self.podcast_type, v, policy)
            }
            (PodcastField::Keywords, Value::List(words)) => match policy {
                Policy::Accumulate => {
                    for word in words {
                        if !self.keywords.contains(&word) {
                            self.keywords.push(word);
                        }
                    }
                }
                Policy::FirstWins if !self.keywords.is_empty() => {}
                _ => self.keywords = words,
            },
            (PodcastField::OwnerName, Value::Text(v)) => {
                assign(&mut self.owner.get_or_insert_with(Owner::default).name, v, policy)
            }
            (PodcastField::OwnerEmail, Value::Text(v)) => {
                assign(&mut self.owner.get_or_insert_with(Owner::default).email, v, policy)
            }
            (field, value) => log::debug!("ignoring {value:?} for podcast field {field:?}"),
        }
    }

    pub fn add_category(&mut self, name: String) {
        self.categories.push(vec![name]);
    }

    pub fn add_subcategory(&mut self, name: String) {
        if let Some(path) = self.categories.last_mut() {
            path.push(name);
        }
    }

    pub fn add_funding(&mut self, url: String) {
        self.funding.push(FundingLink { url, title: None });
    }

    pub fn set_last_funding_title(&mut self, title: Option<String>) {
        if let Some(funding) = self.funding.last_mut() {
            funding.title = title;
        }
    }

    pub fn set_payment_url(&mut self, url: String) {
        self.payment_url = Some(url);
    }

    pub fn set_next_page_url(&mut self, url: String) {
        self.next_page_url = Some(url);
    }

    pub fn set_first_page_url(&mut self, url: String) {
        self.first_page_url = Some(url);
    }

    pub fn set_link(&mut self, url: String) {
        self.link = Some(url);
    }

    pub fn begin_episode(&mut self) {
        self.current = Some(EpisodeBuilder::new());
    }

    /// The episode between `begin_episode` and `end_episode`, if any.
    pub fn episode_mut(&mut self) -> Option<&mut EpisodeBuilder> {
        self.current.as_mut()
    }

    /// Validates the open episode and keeps it if it is usable.
    pub fn end_episode(&mut self, options: &ParseOptions) {
        if let Some(episode) = self.current.take().and_then(|b| b.finish(options)) {
            self.episodes.push(episode);
        }
    }

    pub fn episode_count(&self) -> usize {
        self.episodes.len()
    }

    pub fn has_content(&self) -> bool {
        self.seen_channel || self.new_feed_url.is_some()
    }

    /// Produces the final podcast; `url` is the request URL used for the
    /// title fallback.
    pub fn finish(self, url: &str) -> Podcast {
        let title = self
            .title
            .or_else(|| self.link.clone())
            .or_else(|| file_stem(url))
            .unwrap_or_else(|| UNTITLED_PODCAST.to_string());

        let categories = self
            .categories
            .into_iter()
            .map(|path| path.into_iter().filter(|c| !c.is_empty()).collect::<Vec<_>>())
            .filter(|path| !path.is_empty())
            .collect();

        Podcast {
            title,
            link: self.link,
            description: self.description.unwrap_or_default(),
            cover_url: self.cover_url,
            language: self.language,
            explicit: self.explicit.unwrap_or(false),
            podcast_type: self.podcast_type,
            author: self.author,
            owner: self.owner,
            categories,
            keywords: self.keywords,
            payment_url: self.payment_url,
            new_feed_url: self.new_feed_url,
            locked: self.locked.unwrap_or(false),
            funding: self.funding,
            generator: self.generator,
            next_page_url: self.next_page_url,
            first_page_url: self.first_page_url,
            episodes: self.episodes,
        }
    }
}
