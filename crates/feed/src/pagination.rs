// ABOUTME: Paged-feed following: fetches "next" pages through a caller-supplied fetcher.
// ABOUTME: Bounded by a hop counter; merges unseen episodes up to the episode cap.

use std::collections::HashSet;
use std::io::Read;

use crate::error::FeedError;
use crate::models::Podcast;
use crate::options::ParseOptions;
use crate::parser::parse_feed;

/// Supplies the bytes of a continuation page. The library never performs
/// network I/O itself.
pub trait FeedFetcher {
    fn fetch(&self, url: &str) -> Result<Box<dyn Read>, FeedError>;
}

impl<F> FeedFetcher for F
where
    F: Fn(&str) -> Result<Box<dyn Read>, FeedError>,
{
    fn fetch(&self, url: &str) -> Result<Box<dyn Read>, FeedError> {
        self(url)
    }
}

/// Parses a feed and, when `options.follow_next_page` is set, follows up to
/// `options.max_page_hops` "next" links.
///
/// Continuation episodes are appended in page order, skipping guids already
/// seen, until `options.max_episodes` is reached. A URL is never fetched
/// twice. `next_page_url` of the result is the link of the last page read.
/// Fetch and parse failures of a continuation page fail the whole call.
pub fn parse_feed_paged<R, F>(
    url: &str,
    reader: R,
    options: &ParseOptions,
    fetcher: &F,
) -> Result<Podcast, FeedError>
where
    R: Read,
    F: FeedFetcher + ?Sized,
{
    let mut podcast = parse_feed(url, reader, options)?;
    if !options.follow_next_page {
        return Ok(podcast);
    }

    let mut visited: HashSet<String> = HashSet::from([url.to_string()]);
    let mut seen: HashSet<String> = podcast.episodes.iter().map(|e| e.guid.clone()).collect();
    let mut hops = 0;

    while hops < options.max_page_hops && podcast.episodes.len() < options.max_episodes {
        let Some(next) = podcast.next_page_url.clone() else {
            break;
        };
        if !visited.insert(next.clone()) {
            log::debug!("next page {next} was already read, stopping");
            break;
        }

        hops += 1;
        log::debug!("following next page {next} (hop {hops})");
        let stream = fetcher.fetch(&next)?;
        let page = parse_feed(&next, stream, options)?;

        for episode in page.episodes {
            if podcast.episodes.len() >= options.max_episodes {
                break;
            }
            if seen.insert(episode.guid.clone()) {
                podcast.episodes.push(episode);
            }
        }
        podcast.next_page_url = page.next_page_url;
    }

    Ok(podcast)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn page(guids: &[&str], next: Option<&str>) -> String {
        let items: String = guids
            .iter()
            .map(|g| format!("<item><guid>{g}</guid><enclosure url=\"http://e/{g}.mp3\"/></item>"))
            .collect();
        let link = next
            .map(|n| format!("<atom:link rel=\"next\" href=\"{n}\"/>"))
            .unwrap_or_default();
        format!(
            "<rss xmlns:atom=\"http://www.w3.org/2005/Atom\"><channel><title>P</title>{link}{items}</channel></rss>"
        )
    }

    #[test]
    fn test_not_following_by_default() {
        let first = page(&["a"], Some("http://e/2"));
        let fetcher = |_: &str| -> Result<Box<dyn Read>, FeedError> {
            panic!("must not fetch");
        };
        let podcast =
            parse_feed_paged("http://e/1", first.as_bytes(), &ParseOptions::default(), &fetcher)
                .unwrap();
        assert_eq!(podcast.episodes.len(), 1);
        assert_eq!(podcast.next_page_url.as_deref(), Some("http://e/2"));
    }

    #[test]
    fn test_follows_one_hop() {
        let first = page(&["a", "b"], Some("http://e/2"));
        let fetcher = |url: &str| -> Result<Box<dyn Read>, FeedError> {
            assert_eq!(url, "http://e/2");
            Ok(Box::new(Cursor::new(page(&["b", "c"], Some("http://e/3")))))
        };
        let options = ParseOptions::default().follow_next_page(true);
        let podcast = parse_feed_paged("http://e/1", first.as_bytes(), &options, &fetcher).unwrap();
        let guids: Vec<&str> = podcast.episodes.iter().map(|e| e.guid.as_str()).collect();
        assert_eq!(guids, vec!["a", "b", "c"]);
        assert_eq!(podcast.next_page_url.as_deref(), Some("http://e/3"));
    }
}
