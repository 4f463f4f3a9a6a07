// ABOUTME: Streaming parse engine: drives quick-xml and folds elements into the model.
// ABOUTME: Keeps a frame stack with collected text and xml:base, and enforces resource caps.

use std::io::{BufReader, Read};

use quick_xml::encoding::Decoder;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;
use url::Url;

use crate::builder::{parse_length, parse_mime_type, PodcastBuilder};
use crate::dispatch::{lookup, Action, EpisodeField, Field, Handler, Policy, Scope, Transform, Value};
use crate::duration_parse::parse_duration_seconds;
use crate::error::FeedError;
use crate::html_utils::{decode_entities, resolve_entity};
use crate::models::{Chapter, Enclosure, EnclosureSource, Person, Podcast};
use crate::namespace::{resolve, NamespaceRef, Ns};
use crate::options::ParseOptions;
use crate::text::{non_empty, squash_whitespace, truncate_to};
use crate::url_utils::{is_absolute, parse_base, resolve as resolve_url, resolve_link, resolve_media_url};

/// Parses a podcast feed from a byte stream.
///
/// # Arguments
/// * `url` - The URL the feed was requested from, used to resolve relative links
/// * `reader` - The feed document, read incrementally
/// * `options` - Resource caps and parsing switches
///
/// # Returns
/// * `Ok(Podcast)` - The assembled podcast; episodes in document order
/// * `Err(FeedError)` - Malformed XML, an unsupported root, no channel/feed, or
///   a stream failure. No partial result is returned.
pub fn parse_feed<R: Read>(url: &str, reader: R, options: &ParseOptions) -> Result<Podcast, FeedError> {
    let mut reader = NsReader::from_reader(BufReader::new(reader));
    let config = reader.config_mut();
    config.expand_empty_elements = true;
    config.trim_text(false);

    let mut engine = Engine::new(url, options);
    let mut buf = Vec::new();

    loop {
        let result = reader
            .read_resolved_event_into(&mut buf)
            .map(|(resolved, event)| (namespace_of(resolved), event));
        let (ns, event) = match result {
            Ok(resolved) => resolved,
            Err(err) => return Err(FeedError::from_xml(err, reader.error_position())),
        };
        let position = reader.buffer_position() as u64;
        let decoder = reader.decoder();

        match event {
            Event::Start(ref e) => engine.start(ns, e, decoder, position)?,
            Event::End(_) => engine.end(),
            // Every text node is decoded, so undecodable bytes are fatal
            // wherever they appear.
            Event::Text(ref t) => {
                let text = decoder.decode(t).map_err(|err| FeedError::parse(position, err))?;
                engine.text(&text);
            }
            Event::CData(ref c) => {
                let text = decoder.decode(c).map_err(|err| FeedError::parse(position, err))?;
                engine.text(&text);
            }
            Event::GeneralRef(ref r) => {
                let name = decoder.decode(r).map_err(|err| FeedError::parse(position, err))?;
                if engine.collecting() {
                    match resolve_entity(&name) {
                        Some(resolved) => engine.text(&resolved),
                        None => engine.text(&format!("&{name};")),
                    }
                }
            }
            Event::Eof => {
                if !engine.stack.is_empty() {
                    return Err(FeedError::parse(position, "unexpected end of document"));
                }
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    engine.finish()
}

/// Parses a complete in-memory feed document with default options.
pub fn parse_feed_bytes(data: &[u8], url: &str) -> Result<Podcast, FeedError> {
    parse_feed(url, data, &ParseOptions::default())
}

fn namespace_of(resolved: ResolveResult<'_>) -> Ns {
    match resolved {
        ResolveResult::Unbound => resolve(NamespaceRef::Unqualified),
        ResolveResult::Bound(ns) => {
            let uri = String::from_utf8_lossy(ns.as_ref());
            resolve(NamespaceRef::Uri(&uri))
        }
        ResolveResult::Unknown(prefix) => {
            let prefix = String::from_utf8_lossy(&prefix);
            resolve(NamespaceRef::UndeclaredPrefix(&prefix))
        }
    }
}

/// Decoded attributes of one start tag, entity references resolved.
struct Attrs(Vec<(String, String)>);

impl Attrs {
    fn read(e: &BytesStart<'_>, decoder: Decoder, position: u64) -> Result<Self, FeedError> {
        let mut attributes = e.attributes();
        attributes.with_checks(false);
        let mut pairs = Vec::new();
        for attr in attributes.flatten() {
            let key = decoder
                .decode(attr.key.as_ref())
                .map_err(|err| FeedError::parse(position, err))?;
            let value = decoder
                .decode(&attr.value)
                .map_err(|err| FeedError::parse(position, err))?;
            pairs.push((key.into_owned(), decode_entities(&value)));
        }
        Ok(Attrs(pairs))
    }

    fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// One open element.
struct Frame {
    scope: Scope,
    handler: Option<&'static Handler>,
    /// Collected text; Some only when the handler consumes text.
    text: Option<String>,
    truncated: bool,
    /// Base set by this element's own `xml:base`.
    base: Option<Url>,
    is_permalink: bool,
    content_type: Option<String>,
}

impl Frame {
    fn new(scope: Scope, handler: Option<&'static Handler>, base: Option<Url>) -> Self {
        Frame {
            scope,
            handler,
            text: None,
            truncated: false,
            base,
            is_permalink: true,
            content_type: None,
        }
    }
}

/// Nearest `xml:base` in scope, else the request URL.
fn effective_base<'a>(stack: &'a [Frame], document_base: Option<&'a Url>) -> Option<&'a Url> {
    stack
        .iter()
        .rev()
        .find_map(|frame| frame.base.as_ref())
        .or(document_base)
}

/// Per-call parse state. Nothing here outlives the call.
struct Engine<'a> {
    url: &'a str,
    options: &'a ParseOptions,
    document_base: Option<Url>,
    stack: Vec<Frame>,
    podcast: PodcastBuilder,
    root_seen: bool,
    cap_logged: bool,
}

impl<'a> Engine<'a> {
    fn new(url: &'a str, options: &'a ParseOptions) -> Self {
        Engine {
            url,
            options,
            document_base: parse_base(url),
            stack: Vec::new(),
            podcast: PodcastBuilder::new(),
            root_seen: false,
            cap_logged: false,
        }
    }

    fn collecting(&self) -> bool {
        self.stack.iter().any(|frame| frame.text.is_some())
    }

    fn start(&mut self, ns: Ns, e: &BytesStart<'_>, decoder: Decoder, position: u64) -> Result<(), FeedError> {
        if self.stack.len() >= self.options.max_depth {
            return Err(FeedError::DepthExceeded(self.options.max_depth));
        }

        let parent = match self.stack.last() {
            Some(frame) => frame.scope,
            None if self.root_seen => {
                return Err(FeedError::parse(position, "content after the root element"));
            }
            None => Scope::Document,
        };

        let local = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
        let mut handler = match parent {
            Scope::Unrecognized => None,
            _ => lookup(parent, ns, &local),
        };

        if parent == Scope::Document {
            if handler.is_none() {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                return Err(FeedError::UnsupportedRoot(name));
            }
            self.root_seen = true;
        }

        let capped = handler.is_some_and(|h| h.action == Action::Episode)
            && self.podcast.episode_count() >= self.options.max_episodes;
        if capped {
            if !self.cap_logged {
                log::warn!(
                    "episode limit of {} reached, skipping remaining entries",
                    self.options.max_episodes
                );
                self.cap_logged = true;
            }
            handler = None;
        }

        let attrs = Attrs::read(e, decoder, position)?;
        let own_base = attrs.get("xml:base").and_then(|base| {
            resolve_url(effective_base(&self.stack, self.document_base.as_ref()), base)
        });

        // Unknown elements are transparent: their children are looked up in
        // the parent's scope. Leaf content and capped episodes stay opaque.
        let scope = match handler {
            Some(h) => h.scope,
            None if capped => Scope::Unrecognized,
            None => parent,
        };
        let mut frame = Frame::new(scope, handler, own_base);
        if let Some(h) = handler {
            match h.action {
                Action::Guid => {
                    frame.is_permalink = attrs
                        .get("isPermaLink")
                        .map_or(true, |v| v.trim().eq_ignore_ascii_case("true"));
                }
                Action::AtomContent => {
                    frame.content_type =
                        Some(attrs.get("type").unwrap_or("text").trim().to_ascii_lowercase());
                }
                _ => {}
            }
        }
        self.stack.push(frame);

        if let Some(h) = handler {
            let base = effective_base(&self.stack, self.document_base.as_ref());
            let active = begin_element(&mut self.podcast, h, &attrs, base);
            if let Some(frame) = self.stack.last_mut() {
                if !active {
                    frame.handler = None;
                } else if h.action.wants_text() {
                    frame.text = Some(String::new());
                }
            }
        }

        Ok(())
    }

    fn text(&mut self, chunk: &str) {
        let max = self.options.max_text_len;
        let Some(Frame {
            text: Some(text),
            truncated,
            ..
        }) = self.stack.iter_mut().rev().find(|frame| frame.text.is_some())
        else {
            return;
        };

        text.push_str(chunk);
        if truncate_to(text, max) && !*truncated {
            log::warn!("element text exceeds {max} bytes, truncating");
            *truncated = true;
        }
    }

    fn end(&mut self) {
        let Some(frame) = self.stack.pop() else {
            return;
        };
        let Some(handler) = frame.handler else {
            return;
        };
        let base = frame
            .base
            .as_ref()
            .or_else(|| effective_base(&self.stack, self.document_base.as_ref()));
        end_element(&mut self.podcast, self.options, handler, &frame, base);
    }

    fn finish(self) -> Result<Podcast, FeedError> {
        if !self.root_seen {
            return Err(FeedError::invalid("document has no root element"));
        }
        if !self.podcast.has_content() {
            return Err(FeedError::invalid("no channel or feed element found"));
        }
        let podcast = self.podcast.finish(self.url);
        log::debug!("parsed {:?} with {} episodes", podcast.title, podcast.episodes.len());
        Ok(podcast)
    }
}

fn apply_field(podcast: &mut PodcastBuilder, field: Field, value: Value, policy: Policy) {
    match field {
        Field::Podcast(field) => podcast.apply(field, value, policy),
        Field::Episode(field) => {
            if let Some(episode) = podcast.episode_mut() {
                episode.apply(field, value, policy);
            }
        }
    }
}

/// Start-tag effects. Returns false when the element turned out unusable,
/// so its text and end tag are ignored.
fn begin_element(podcast: &mut PodcastBuilder, handler: &Handler, attrs: &Attrs, base: Option<&Url>) -> bool {
    match handler.action {
        Action::Channel => podcast.mark_channel(),
        Action::Episode => podcast.begin_episode(),
        Action::Attr { name, field, transform } => {
            if let Some(value) = attrs.get(name).and_then(|raw| transform.apply(raw, base)) {
                apply_field(podcast, field, value, handler.policy);
            }
        }
        Action::Enclosure { size_attr, source } => {
            let Some(url) = attrs.get("url").and_then(|url| resolve_media_url(base, url)) else {
                return true;
            };
            if let Some(episode) = podcast.episode_mut() {
                episode.add_enclosure(Enclosure {
                    url,
                    mime_type: parse_mime_type(attrs.get("type")),
                    file_size: parse_length(attrs.get(size_attr)),
                    source,
                });
            }
        }
        Action::PodcastLink => podcast_link(podcast, attrs, base),
        Action::EpisodeLink => episode_link(podcast, attrs, base),
        Action::Chapters => {
            let version = attrs.get("version").map_or("1.1", str::trim);
            if !matches!(version, "1.1" | "1.2") {
                log::warn!("possibly incompatible chapters version {version:?}");
            }
        }
        Action::Chapter => chapter(podcast, attrs, base),
        Action::Person => {
            if let Some(episode) = podcast.episode_mut() {
                episode.add_person(Person {
                    name: String::new(),
                    role: lowercase_or(attrs.get("role"), "host"),
                    group: lowercase_or(attrs.get("group"), "cast"),
                    href: attrs.get("href").and_then(|href| resolve_link(base, href)),
                    img: attrs.get("img").and_then(|img| resolve_link(base, img)),
                });
            }
        }
        Action::Category => podcast.add_category(squash_whitespace(attrs.get("text").unwrap_or(""))),
        Action::SubCategory => {
            if let Some(name) = attrs.get("text").and_then(|text| non_empty(squash_whitespace(text))) {
                podcast.add_subcategory(name);
            }
        }
        Action::Funding => match attrs.get("url").and_then(|url| resolve_link(base, url)) {
            Some(url) => podcast.add_funding(url),
            None => return false,
        },
        Action::None | Action::Text { .. } | Action::Guid | Action::RssDescription | Action::AtomContent => {}
    }
    true
}

/// End-tag effects, fed with the collected text.
fn end_element(
    podcast: &mut PodcastBuilder,
    options: &ParseOptions,
    handler: &Handler,
    frame: &Frame,
    base: Option<&Url>,
) {
    let text = frame.text.as_deref().unwrap_or("");
    match handler.action {
        Action::Episode => podcast.end_episode(options),
        Action::Text { field, transform } => {
            if let Some(value) = transform.apply(text, base) {
                apply_field(podcast, field, value, handler.policy);
            }
        }
        Action::Guid => {
            let guid = text.trim();
            if guid.is_empty() {
                return;
            }
            // Root-relative permalinks are only meaningful against the base.
            let guid = if frame.is_permalink && guid.starts_with('/') && !is_absolute(guid) {
                resolve_link(base, guid).unwrap_or_else(|| guid.to_string())
            } else {
                guid.to_string()
            };
            if let Some(episode) = podcast.episode_mut() {
                episode.set_guid(guid, frame.is_permalink);
            }
        }
        Action::RssDescription => {
            if let Some(episode) = podcast.episode_mut() {
                episode.set_rss_description(text, non_empty(squash_whitespace(text)));
            }
        }
        Action::AtomContent => {
            let (field, transform) = match frame.content_type.as_deref() {
                Some("html") | Some("text/html") => (EpisodeField::DescriptionHtml, Transform::Raw),
                Some("text") | Some("text/plain") | Some("xhtml") | None => {
                    (EpisodeField::Description, Transform::Squash)
                }
                Some(other) => {
                    log::debug!("ignoring atom content of type {other:?}");
                    return;
                }
            };
            if let Some(value) = transform.apply(text, base) {
                apply_field(podcast, Field::Episode(field), value, Policy::LastWins);
            }
        }
        Action::Person => {
            if let Some(episode) = podcast.episode_mut() {
                episode.set_last_person_name(squash_whitespace(text));
            }
        }
        Action::Funding => podcast.set_last_funding_title(non_empty(squash_whitespace(text))),
        _ => {}
    }
}

fn lowercase_or(value: Option<&str>, default: &str) -> String {
    value
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Channel-level `atom:link`: paged-feed links, payment and the site link.
fn podcast_link(podcast: &mut PodcastBuilder, attrs: &Attrs, base: Option<&Url>) {
    let Some(url) = attrs.get("href").and_then(|href| resolve_link(base, href)) else {
        return;
    };
    let rel = attrs.get("rel").map_or("alternate", str::trim);
    let mime_type = parse_mime_type(attrs.get("type"));

    match rel {
        "first" => podcast.set_first_page_url(url),
        "next" => podcast.set_next_page_url(url),
        "payment" => podcast.set_payment_url(url),
        "self" | "alternate" if mime_type == "text/html" => podcast.set_link(url),
        _ => {}
    }
}

/// Item-level `atom:link`: enclosures, payment and a fallback link.
fn episode_link(podcast: &mut PodcastBuilder, attrs: &Attrs, base: Option<&Url>) {
    let Some(episode) = podcast.episode_mut() else {
        return;
    };
    let Some(href) = attrs.get("href") else {
        return;
    };
    let rel = attrs.get("rel").map_or("alternate", str::trim);
    let mime_type = parse_mime_type(Some(attrs.get("type").unwrap_or("text/html")));

    match rel {
        "enclosure" => {
            if let Some(url) = resolve_media_url(base, href) {
                episode.add_enclosure(Enclosure {
                    url,
                    mime_type,
                    file_size: parse_length(attrs.get("length")),
                    source: EnclosureSource::AlternateMedia,
                });
            }
        }
        "payment" => {
            if let Some(url) = resolve_link(base, href) {
                episode.set_payment_url(url);
            }
        }
        "self" | "alternate" if mime_type == "text/html" && !episode.has_link() => {
            if let Some(url) = resolve_link(base, href) {
                episode.set_link_if_missing(url);
            }
        }
        _ => {}
    }
}

/// `psc:chapter`: start and title are mandatory, start must parse.
fn chapter(podcast: &mut PodcastBuilder, attrs: &Attrs, base: Option<&Url>) {
    let (Some(start), Some(title)) = (attrs.get("start"), attrs.get("title")) else {
        log::warn!("invalid chapter: missing start and/or title");
        return;
    };
    let Some(start) = parse_duration_seconds(start) else {
        log::warn!("invalid chapter start {start:?}");
        return;
    };
    if let Some(episode) = podcast.episode_mut() {
        episode.add_chapter(Chapter {
            start,
            title: squash_whitespace(title),
            href: attrs.get("href").and_then(|href| resolve_link(base, href)),
            image: attrs.get("image").and_then(|image| resolve_link(base, image)),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "http://example.com/feed.xml";

    fn parse(xml: &str) -> Result<Podcast, FeedError> {
        parse_feed(URL, xml.as_bytes(), &ParseOptions::default())
    }

    #[test]
    fn test_minimal_rss() {
        let podcast = parse(
            r#"<rss><channel><title>Show</title>
                <item><guid>1</guid><enclosure url="a.mp3" type="audio/mpeg" length="5"/></item>
            </channel></rss>"#,
        )
        .unwrap();
        assert_eq!(podcast.title, "Show");
        assert_eq!(podcast.episodes.len(), 1);
        assert_eq!(podcast.episodes[0].enclosures[0].url, "http://example.com/a.mp3");
        assert_eq!(podcast.episodes[0].enclosures[0].file_size, 5);
    }

    #[test]
    fn test_entities_in_text_and_attributes() {
        let podcast = parse(
            r#"<rss><channel><title>Tom &amp; Jerry&#39;s &mdash; Show</title>
                <item><guid>1</guid><title>A &lt; B</title>
                <enclosure url="http://example.com/a.mp3?x=1&amp;y=2"/></item>
            </channel></rss>"#,
        )
        .unwrap();
        assert_eq!(podcast.title, "Tom & Jerry's \u{2014} Show");
        assert_eq!(podcast.episodes[0].title, "A < B");
        assert_eq!(podcast.episodes[0].enclosures[0].url, "http://example.com/a.mp3?x=1&y=2");
    }

    #[test]
    fn test_cdata_description() {
        let podcast = parse(
            r#"<rss><channel>
                <item><guid>1</guid><description><![CDATA[<p>Hello <b>world</b></p>]]></description>
                <enclosure url="a.mp3"/></item>
            </channel></rss>"#,
        )
        .unwrap();
        let episode = &podcast.episodes[0];
        assert_eq!(episode.description_html.as_deref(), Some("<p>Hello <b>world</b></p>"));
        assert_eq!(episode.description, "Hello world");
    }

    #[test]
    fn test_text_cap_truncates_silently() {
        let long = "x".repeat(100);
        let xml = format!(
            "<rss><channel><title>{long}</title><item><guid>1</guid><enclosure url=\"a.mp3\"/></item></channel></rss>"
        );
        let options = ParseOptions::default().max_text_len(10);
        let podcast = parse_feed(URL, xml.as_bytes(), &options).unwrap();
        assert_eq!(podcast.title, "x".repeat(10));
    }

    #[test]
    fn test_unclosed_document_is_fatal() {
        let err = parse("<rss><channel><title>x</title>").unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn test_empty_document() {
        assert!(matches!(parse(""), Err(FeedError::Invalid(_))));
    }

    #[test]
    fn test_rss_without_channel() {
        assert!(matches!(parse("<rss></rss>"), Err(FeedError::Invalid(_))));
    }

    #[test]
    fn test_second_root_is_fatal() {
        let err = parse("<rss><channel/></rss><rss/>").unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn test_unknown_wrappers_are_traversed() {
        let podcast = parse(
            r#"<rss xmlns:x="urn:example:wrap"><channel><title>Show</title>
                <x:wrap><item><x:meta><title>Wrapped</title></x:meta>
                    <guid>1</guid><enclosure url="a.mp3"/></item></x:wrap>
                <textInput><title>Search</title><link>http://example.com/search</link></textInput>
            </channel></rss>"#,
        )
        .unwrap();
        assert_eq!(podcast.title, "Show");
        assert_eq!(podcast.link, None);
        assert_eq!(podcast.episodes.len(), 1);
        assert_eq!(podcast.episodes[0].title, "Wrapped");
    }

    #[test]
    fn test_funding_without_url_keeps_no_title() {
        let podcast = parse(
            r#"<rss xmlns:podcast="https://podcastindex.org/namespace/1.0"><channel>
                <podcast:funding>Orphan</podcast:funding>
                <podcast:funding url="https://example.com/donate"> Support us </podcast:funding>
            </channel></rss>"#,
        )
        .unwrap();
        assert_eq!(podcast.funding.len(), 1);
        assert_eq!(podcast.funding[0].url, "https://example.com/donate");
        assert_eq!(podcast.funding[0].title.as_deref(), Some("Support us"));
    }
}
