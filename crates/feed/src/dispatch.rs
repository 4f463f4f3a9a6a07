// ABOUTME: Static element dispatch table: (scope, namespace, local name) to handler.
// ABOUTME: Handlers name the model field, the value transform and the conflict policy.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use url::Url;

use crate::duration_parse::parse_duration_seconds;
use crate::models::{EnclosureSource, EpisodeType, PodcastType};
use crate::namespace::Ns;
use crate::text::{non_empty, squash_whitespace, squash_whitespace_keep_newlines, strip_control_chars};
use crate::time_parse::parse_pubdate;
use crate::url_utils::resolve_link;

/// Where in the document an element sits. This is the parse engine's state:
/// an element is looked up in the scope its parent opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Outside the root element.
    Document,
    Rss,
    Redirect,
    Channel,
    ChannelImage,
    Owner,
    Category,
    SubCategory,
    Item,
    /// Atom `feed`, the Atom counterpart of `Channel`.
    Feed,
    Entry,
    MediaGroup,
    Chapters,
    /// Leaf or opaque content: nothing below it is dispatched.
    Unrecognized,
}

/// What to do when the same field is written more than once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    FirstWins,
    /// The last non-empty value wins.
    LastWins,
    Accumulate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PodcastField {
    Title,
    Link,
    Description,
    CoverUrl,
    Language,
    Generator,
    Author,
    NewFeedUrl,
    Explicit,
    Locked,
    Type,
    Keywords,
    OwnerName,
    OwnerEmail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpisodeField {
    Guid,
    Title,
    Link,
    Description,
    DescriptionHtml,
    Subtitle,
    Published,
    Duration,
    Explicit,
    Season,
    Number,
    EpisodeType,
    Author,
    ArtUrl,
    TranscriptUrl,
    ChaptersUrl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Podcast(PodcastField),
    Episode(EpisodeField),
}

/// A decoded field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Text(String),
    Int(u32),
    Timestamp(i64),
    Seconds(u32),
    Flag(bool),
    List(Vec<String>),
    PodcastType(PodcastType),
    EpisodeType(EpisodeType),
}

/// Turns raw element text or an attribute value into a field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    Squash,
    SquashKeepNewlines,
    /// Markup content: control characters removed, otherwise untouched.
    Raw,
    /// A link resolved against the current base.
    Url,
    Integer,
    PositiveInteger,
    Date,
    Duration,
    /// yes/explicit/true and no/clean/false.
    Flag,
    /// Comma separated list.
    Keywords,
    PodcastType,
    EpisodeType,
}

impl Transform {
    /// Applies the transform. None means "no usable value": the field keeps
    /// whatever it had.
    pub fn apply(self, raw: &str, base: Option<&Url>) -> Option<Value> {
        match self {
            Transform::Squash => non_empty(squash_whitespace(raw)).map(Value::Text),
            Transform::SquashKeepNewlines => {
                non_empty(squash_whitespace_keep_newlines(raw)).map(Value::Text)
            }
            Transform::Raw => non_empty(strip_control_chars(raw.trim())).map(Value::Text),
            Transform::Url => resolve_link(base, raw).map(Value::Text),
            Transform::Integer => raw.trim().parse::<u32>().ok().map(Value::Int),
            Transform::PositiveInteger => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .map(Value::Int),
            Transform::Date => {
                let parsed = parse_pubdate(raw);
                if parsed.is_none() && !raw.trim().is_empty() {
                    log::warn!("could not parse date {:?}", raw.trim());
                }
                parsed.map(Value::Timestamp)
            }
            Transform::Duration => {
                let parsed = parse_duration_seconds(raw);
                if parsed.is_none() && !raw.trim().is_empty() {
                    log::debug!("could not parse duration {:?}", raw.trim());
                }
                parsed.map(Value::Seconds)
            }
            Transform::Flag => parse_flag(raw).map(Value::Flag),
            Transform::Keywords => {
                let words: Vec<String> = raw
                    .split(',')
                    .map(squash_whitespace)
                    .filter(|w| !w.is_empty())
                    .collect();
                (!words.is_empty()).then_some(Value::List(words))
            }
            Transform::PodcastType => PodcastType::from_text(raw).map(Value::PodcastType),
            Transform::EpisodeType => EpisodeType::from_text(raw).map(Value::EpisodeType),
        }
    }
}

/// Reads `itunes:explicit` style flags. Anything else is not a value.
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "yes" | "explicit" | "true" => Some(true),
        "no" | "clean" | "false" => Some(false),
        _ => None,
    }
}

/// The effect of an element beyond opening a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    None,
    /// Marks that a channel or Atom feed was seen.
    Channel,
    /// Opens an in-progress episode, validated when the element closes.
    Episode,
    /// Element text decoded into a field.
    Text { field: Field, transform: Transform },
    /// One attribute decoded into a field when the element opens.
    Attr {
        name: &'static str,
        field: Field,
        transform: Transform,
    },
    /// RSS `guid`, honouring `isPermaLink`.
    Guid,
    /// RSS item `description`: HTML or plain text by inspection.
    RssDescription,
    /// Atom `content`, routed by its `type` attribute.
    AtomContent,
    Enclosure {
        size_attr: &'static str,
        source: EnclosureSource,
    },
    /// `atom:link` on the channel or feed.
    PodcastLink,
    /// `atom:link` on an item or entry.
    EpisodeLink,
    Chapters,
    Chapter,
    Person,
    Category,
    SubCategory,
    Funding,
}

impl Action {
    /// True when the element's text has to be collected.
    pub fn wants_text(self) -> bool {
        matches!(
            self,
            Action::Text { .. }
                | Action::Guid
                | Action::RssDescription
                | Action::AtomContent
                | Action::Person
                | Action::Funding
        )
    }
}

/// Table entry for one element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Handler {
    /// Scope opened for the element's children.
    pub scope: Scope,
    pub action: Action,
    pub policy: Policy,
}

type Children = HashMap<&'static str, Handler>;

static TABLE: Lazy<HashMap<(Scope, Ns), Children>> = Lazy::new(build_table);

/// Finds the handler for an element opened inside `parent`.
pub fn lookup(parent: Scope, ns: Ns, local: &str) -> Option<&'static Handler> {
    TABLE.get(&(parent, ns))?.get(local)
}

const fn container(scope: Scope) -> Handler {
    Handler {
        scope,
        action: Action::None,
        policy: Policy::LastWins,
    }
}

const fn opens(scope: Scope, action: Action) -> Handler {
    Handler {
        scope,
        action,
        policy: Policy::LastWins,
    }
}

const fn leaf(action: Action) -> Handler {
    opens(Scope::Unrecognized, action)
}

/// Known element whose children must not leak into the enclosing scope.
const fn opaque() -> Handler {
    leaf(Action::None)
}

const fn podcast_text(field: PodcastField, transform: Transform, policy: Policy) -> Handler {
    Handler {
        scope: Scope::Unrecognized,
        action: Action::Text {
            field: Field::Podcast(field),
            transform,
        },
        policy,
    }
}

const fn episode_text(field: EpisodeField, transform: Transform, policy: Policy) -> Handler {
    Handler {
        scope: Scope::Unrecognized,
        action: Action::Text {
            field: Field::Episode(field),
            transform,
        },
        policy,
    }
}

const fn attr(name: &'static str, field: Field) -> Handler {
    leaf(Action::Attr {
        name,
        field,
        transform: Transform::Url,
    })
}

const fn enclosure(size_attr: &'static str) -> Handler {
    leaf(Action::Enclosure {
        size_attr,
        source: EnclosureSource::Enclosure,
    })
}

#[derive(Default)]
struct TableBuilder {
    table: HashMap<(Scope, Ns), Children>,
}

impl TableBuilder {
    fn add(&mut self, parent: Scope, ns: Ns, local: &'static str, handler: Handler) -> &mut Self {
        let previous = self
            .table
            .entry((parent, ns))
            .or_default()
            .insert(local, handler);
        debug_assert!(previous.is_none(), "duplicate entry for {local}");
        self
    }
}

fn build_table() -> HashMap<(Scope, Ns), Children> {
    use EpisodeField as E;
    use PodcastField as P;
    use Policy::{Accumulate, FirstWins, LastWins};
    use Transform as T;

    let mut t = TableBuilder::default();

    t.add(Scope::Document, Ns::Rss, "rss", container(Scope::Rss))
        .add(Scope::Document, Ns::Atom, "feed", opens(Scope::Feed, Action::Channel));

    t.add(Scope::Rss, Ns::Rss, "channel", opens(Scope::Channel, Action::Channel))
        .add(Scope::Rss, Ns::Rss, "redirect", container(Scope::Redirect))
        .add(
            Scope::Redirect,
            Ns::Rss,
            "newLocation",
            podcast_text(P::NewFeedUrl, T::Squash, LastWins),
        );

    // Channel
    t.add(Scope::Channel, Ns::Rss, "title", podcast_text(P::Title, T::Squash, LastWins))
        .add(Scope::Channel, Ns::Rss, "link", podcast_text(P::Link, T::Url, LastWins))
        .add(
            Scope::Channel,
            Ns::Rss,
            "description",
            podcast_text(P::Description, T::SquashKeepNewlines, LastWins),
        )
        .add(Scope::Channel, Ns::Rss, "image", container(Scope::ChannelImage))
        .add(Scope::ChannelImage, Ns::Rss, "url", podcast_text(P::CoverUrl, T::Url, LastWins))
        .add(Scope::Channel, Ns::Rss, "generator", podcast_text(P::Generator, T::Squash, LastWins))
        .add(Scope::Channel, Ns::Rss, "language", podcast_text(P::Language, T::Squash, LastWins))
        .add(Scope::Channel, Ns::Rss, "item", opens(Scope::Item, Action::Episode))
        .add(Scope::Channel, Ns::Rss, "textInput", opaque())
        .add(Scope::Channel, Ns::Rss, "textinput", opaque());

    t.add(
        Scope::Channel,
        Ns::Itunes,
        "summary",
        podcast_text(P::Description, T::SquashKeepNewlines, FirstWins),
    )
    .add(Scope::Channel, Ns::Itunes, "image", attr("href", Field::Podcast(P::CoverUrl)))
    .add(Scope::Channel, Ns::Itunes, "type", podcast_text(P::Type, T::PodcastType, LastWins))
    .add(Scope::Channel, Ns::Itunes, "author", podcast_text(P::Author, T::Squash, LastWins))
    .add(Scope::Channel, Ns::Itunes, "explicit", podcast_text(P::Explicit, T::Flag, LastWins))
    .add(
        Scope::Channel,
        Ns::Itunes,
        "new-feed-url",
        podcast_text(P::NewFeedUrl, T::Squash, LastWins),
    )
    .add(
        Scope::Channel,
        Ns::Itunes,
        "keywords",
        podcast_text(P::Keywords, T::Keywords, Accumulate),
    )
    .add(Scope::Channel, Ns::Itunes, "owner", container(Scope::Owner))
    .add(Scope::Owner, Ns::Itunes, "name", podcast_text(P::OwnerName, T::Squash, LastWins))
    .add(Scope::Owner, Ns::Itunes, "email", podcast_text(P::OwnerEmail, T::Squash, LastWins))
    .add(Scope::Channel, Ns::Itunes, "category", opens(Scope::Category, Action::Category))
    .add(Scope::Category, Ns::Itunes, "category", opens(Scope::SubCategory, Action::SubCategory))
    .add(Scope::SubCategory, Ns::Itunes, "category", leaf(Action::SubCategory));

    t.add(Scope::Channel, Ns::Podcast, "funding", leaf(Action::Funding))
        .add(Scope::Channel, Ns::Podcast, "locked", podcast_text(P::Locked, T::Flag, LastWins))
        .add(Scope::Channel, Ns::Podcast, "liveItem", opaque())
        .add(Scope::Channel, Ns::Atom, "link", leaf(Action::PodcastLink));

    // Item
    t.add(Scope::Item, Ns::Rss, "guid", leaf(Action::Guid))
        .add(Scope::Item, Ns::Rss, "title", episode_text(E::Title, T::Squash, LastWins))
        .add(Scope::Item, Ns::Rss, "link", episode_text(E::Link, T::Url, LastWins))
        .add(Scope::Item, Ns::Rss, "description", leaf(Action::RssDescription))
        .add(Scope::Item, Ns::Rss, "pubDate", episode_text(E::Published, T::Date, LastWins))
        .add(Scope::Item, Ns::Rss, "enclosure", enclosure("length"));

    t.add(
        Scope::Item,
        Ns::Itunes,
        "summary",
        episode_text(E::Description, T::Squash, LastWins),
    )
    .add(Scope::Item, Ns::Itunes, "subtitle", episode_text(E::Subtitle, T::Squash, LastWins))
    .add(Scope::Item, Ns::Itunes, "duration", episode_text(E::Duration, T::Duration, LastWins))
    .add(Scope::Item, Ns::Itunes, "explicit", episode_text(E::Explicit, T::Flag, LastWins))
    .add(Scope::Item, Ns::Itunes, "author", episode_text(E::Author, T::Squash, LastWins))
    .add(Scope::Item, Ns::Itunes, "season", episode_text(E::Season, T::Integer, LastWins))
    .add(
        Scope::Item,
        Ns::Itunes,
        "episode",
        episode_text(E::Number, T::PositiveInteger, LastWins),
    )
    .add(
        Scope::Item,
        Ns::Itunes,
        "episodeType",
        episode_text(E::EpisodeType, T::EpisodeType, LastWins),
    )
    .add(Scope::Item, Ns::Itunes, "image", attr("href", Field::Episode(E::ArtUrl)));

    t.add(Scope::Item, Ns::Content, "encoded", episode_text(E::DescriptionHtml, T::Raw, LastWins))
        .add(Scope::Item, Ns::Atom, "link", leaf(Action::EpisodeLink))
        .add(Scope::Item, Ns::Psc, "chapters", opens(Scope::Chapters, Action::Chapters))
        .add(Scope::Chapters, Ns::Psc, "chapter", leaf(Action::Chapter))
        .add(Scope::Item, Ns::Podcast, "transcript", attr("url", Field::Episode(E::TranscriptUrl)))
        .add(Scope::Item, Ns::Podcast, "chapters", attr("url", Field::Episode(E::ChaptersUrl)))
        .add(Scope::Item, Ns::Podcast, "person", leaf(Action::Person));

    for scope in [Scope::Item, Scope::Entry, Scope::MediaGroup] {
        t.add(
            scope,
            Ns::Media,
            "description",
            episode_text(E::Description, T::Squash, LastWins),
        )
        .add(scope, Ns::Media, "thumbnail", attr("url", Field::Episode(E::ArtUrl)))
        .add(scope, Ns::Media, "content", enclosure("fileSize"));
    }
    t.add(Scope::Item, Ns::Media, "group", container(Scope::MediaGroup));

    // Atom
    t.add(Scope::Feed, Ns::Atom, "title", podcast_text(P::Title, T::Squash, LastWins))
        .add(
            Scope::Feed,
            Ns::Atom,
            "subtitle",
            podcast_text(P::Description, T::SquashKeepNewlines, LastWins),
        )
        .add(Scope::Feed, Ns::Atom, "icon", podcast_text(P::CoverUrl, T::Url, LastWins))
        .add(Scope::Feed, Ns::Atom, "link", leaf(Action::PodcastLink))
        .add(Scope::Feed, Ns::Atom, "entry", opens(Scope::Entry, Action::Episode));

    t.add(Scope::Entry, Ns::Atom, "id", episode_text(E::Guid, T::Squash, LastWins))
        .add(Scope::Entry, Ns::Atom, "title", episode_text(E::Title, T::Squash, LastWins))
        .add(Scope::Entry, Ns::Atom, "link", leaf(Action::EpisodeLink))
        .add(Scope::Entry, Ns::Atom, "content", leaf(Action::AtomContent))
        .add(Scope::Entry, Ns::Atom, "published", episode_text(E::Published, T::Date, LastWins))
        .add(Scope::Entry, Ns::Atom, "updated", episode_text(E::Published, T::Date, FirstWins))
        .add(
            Scope::Entry,
            Ns::Content,
            "encoded",
            episode_text(E::DescriptionHtml, T::Raw, LastWins),
        )
        .add(Scope::Entry, Ns::Media, "group", container(Scope::MediaGroup))
        .add(Scope::Entry, Ns::Psc, "chapters", opens(Scope::Chapters, Action::Chapters))
        .add(Scope::Entry, Ns::Atom, "source", opaque())
        .add(Scope::Entry, Ns::Atom, "author", opaque())
        .add(Scope::Feed, Ns::Atom, "author", opaque());

    t.table
}
