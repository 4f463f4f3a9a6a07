// ABOUTME: Integration tests for paged-feed following.
// ABOUTME: Uses closure fetchers serving inline pages; checks hop limits, dedupe and failures.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{Cursor, Read};

use pretty_assertions::assert_eq;
use podparse_feed::{parse_feed_paged, FeedError, FeedFetcher, ParseOptions};

fn page(guids: &[&str], next: Option<&str>) -> String {
    let link = next
        .map(|href| format!(r#"<atom:link rel="next" href="{href}"/>"#))
        .unwrap_or_default();
    let items: String = guids
        .iter()
        .map(|guid| {
            format!(r#"<item><guid>{guid}</guid><enclosure url="https://cdn.example.com/{guid}.mp3"/></item>"#)
        })
        .collect();
    format!(
        r#"<rss xmlns:atom="http://www.w3.org/2005/Atom"><channel><title>Paged</title>{link}{items}</channel></rss>"#
    )
}

/// Serves pages from a map and records which URLs were requested.
struct MapFetcher {
    pages: HashMap<String, String>,
    requested: RefCell<Vec<String>>,
}

impl MapFetcher {
    fn new(pages: &[(&str, String)]) -> Self {
        MapFetcher {
            pages: pages
                .iter()
                .map(|(url, body)| (url.to_string(), body.clone()))
                .collect(),
            requested: RefCell::new(Vec::new()),
        }
    }
}

impl FeedFetcher for MapFetcher {
    fn fetch(&self, url: &str) -> Result<Box<dyn Read>, FeedError> {
        self.requested.borrow_mut().push(url.to_string());
        match self.pages.get(url) {
            Some(body) => Ok(Box::new(Cursor::new(body.clone().into_bytes()))),
            None => Err(FeedError::fetch(url, "404 Not Found")),
        }
    }
}

fn guids(podcast: &podparse_feed::Podcast) -> Vec<&str> {
    podcast.episodes.iter().map(|e| e.guid.as_str()).collect()
}

/// One hop by default, even when further pages exist.
#[test]
fn test_single_hop_by_default() {
    let fetcher = MapFetcher::new(&[
        ("https://example.com/p2", page(&["c", "d"], Some("https://example.com/p3"))),
        ("https://example.com/p3", page(&["e"], None)),
    ]);
    let first = page(&["a", "b"], Some("/p2"));
    let options = ParseOptions::default().follow_next_page(true);

    let podcast =
        parse_feed_paged("https://example.com/p1", first.as_bytes(), &options, &fetcher).unwrap();

    assert_eq!(guids(&podcast), vec!["a", "b", "c", "d"]);
    assert_eq!(*fetcher.requested.borrow(), vec!["https://example.com/p2".to_string()]);
    assert_eq!(podcast.next_page_url.as_deref(), Some("https://example.com/p3"));
}

/// More hops follow the chain until it ends.
#[test]
fn test_multiple_hops() {
    let fetcher = MapFetcher::new(&[
        ("https://example.com/p2", page(&["b"], Some("https://example.com/p3"))),
        ("https://example.com/p3", page(&["c"], None)),
    ]);
    let first = page(&["a"], Some("https://example.com/p2"));
    let options = ParseOptions::default().follow_next_page(true).max_page_hops(5);

    let podcast =
        parse_feed_paged("https://example.com/p1", first.as_bytes(), &options, &fetcher).unwrap();

    assert_eq!(guids(&podcast), vec!["a", "b", "c"]);
    assert_eq!(podcast.next_page_url, None);
}

/// A page linking back to an earlier one is not fetched again.
#[test]
fn test_cycle_is_not_refetched() {
    let fetcher = MapFetcher::new(&[(
        "https://example.com/p2",
        page(&["a", "b"], Some("https://example.com/p1")),
    )]);
    let first = page(&["a"], Some("https://example.com/p2"));
    let options = ParseOptions::default().follow_next_page(true).max_page_hops(10);

    let podcast =
        parse_feed_paged("https://example.com/p1", first.as_bytes(), &options, &fetcher).unwrap();

    assert_eq!(guids(&podcast), vec!["a", "b"]);
    assert_eq!(fetcher.requested.borrow().len(), 1);
}

/// Following stops once the episode cap is full.
#[test]
fn test_episode_cap_spans_pages() {
    let fetcher = MapFetcher::new(&[
        ("https://example.com/p2", page(&["c", "d"], Some("https://example.com/p3"))),
        ("https://example.com/p3", page(&["e"], None)),
    ]);
    let first = page(&["a", "b"], Some("https://example.com/p2"));
    let options = ParseOptions::default()
        .follow_next_page(true)
        .max_page_hops(5)
        .max_episodes(3);

    let podcast =
        parse_feed_paged("https://example.com/p1", first.as_bytes(), &options, &fetcher).unwrap();

    assert_eq!(guids(&podcast), vec!["a", "b", "c"]);
    assert_eq!(fetcher.requested.borrow().len(), 1);
}

/// A failed continuation fetch fails the whole call.
#[test]
fn test_fetch_failure_propagates() {
    let fetcher = MapFetcher::new(&[]);
    let first = page(&["a"], Some("https://example.com/missing"));
    let options = ParseOptions::default().follow_next_page(true);

    let err = parse_feed_paged("https://example.com/p1", first.as_bytes(), &options, &fetcher)
        .unwrap_err();
    assert_eq!(err, FeedError::fetch("https://example.com/missing", "404 Not Found"));
}

/// Plain closures work as fetchers.
#[test]
fn test_closure_fetcher() {
    let fetcher = |url: &str| -> Result<Box<dyn Read>, FeedError> {
        assert_eq!(url, "https://example.com/p2");
        Ok(Box::new(Cursor::new(page(&["z"], None))))
    };
    let first = page(&["a"], Some("https://example.com/p2"));
    let options = ParseOptions::default().follow_next_page(true);

    let podcast =
        parse_feed_paged("https://example.com/p1", first.as_bytes(), &options, &fetcher).unwrap();
    assert_eq!(guids(&podcast), vec!["a", "z"]);
}
