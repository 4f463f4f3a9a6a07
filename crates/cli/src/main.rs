// ABOUTME: CLI for parsing podcast feeds with the podparse feed parser.
// ABOUTME: Streams a feed from URL or file/stdin and prints JSON for verification.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use podparse_feed::{parse_feed_paged, FeedError, FeedFetcher, ParseOptions, DEFAULT_MAX_EPISODES};
use reqwest::blocking::Client;
use serde_json::json;

/// Parse one or more RSS/Atom podcast feeds and output JSON.
#[derive(Parser, Debug)]
#[command(name = "podparse-cli")]
#[command(about = "Parse podcast feeds and print JSON", long_about = None)]
struct Args {
    /// Feed URL(s) (http/https) or local file paths. Use "-" to read one feed from stdin.
    #[arg(required = true)]
    targets: Vec<String>,

    /// URL used to resolve relative links (only valid when a single target is provided).
    #[arg(long)]
    feed_url: Option<String>,

    /// Maximum number of episodes kept per feed.
    #[arg(long, default_value_t = DEFAULT_MAX_EPISODES)]
    max_episodes: usize,

    /// Follow the feed's "next page" link.
    #[arg(long, default_value_t = false)]
    follow_next: bool,

    /// Output compact JSON instead of pretty.
    #[arg(long, default_value_t = false)]
    compact: bool,
}

/// Fetches continuation pages over HTTP.
struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("podparse-cli/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client })
    }

    fn get(&self, url: &str) -> reqwest::Result<reqwest::blocking::Response> {
        self.client.get(url).send()?.error_for_status()
    }
}

impl FeedFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Box<dyn Read>, FeedError> {
        let response = self.get(url).map_err(|err| FeedError::fetch(url, err))?;
        Ok(Box::new(response))
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.targets.len() > 1 && args.feed_url.is_some() {
        bail!("--feed-url is only valid when parsing a single target");
    }

    let options = ParseOptions::new()
        .max_episodes(args.max_episodes)
        .follow_next_page(args.follow_next);
    let fetcher = HttpFetcher::new()?;

    let mut results = Vec::new();

    for target in &args.targets {
        let feed_url = args.feed_url.clone().unwrap_or_else(|| target.clone());

        let parsed = open_target(target, &fetcher).and_then(|reader| {
            parse_feed_paged(&feed_url, reader, &options, &fetcher).map_err(anyhow::Error::new)
        });
        match parsed {
            Ok(podcast) => {
                log::info!("{}: {} episodes", feed_url, podcast.episodes.len());
                results.push(json!({
                    "feed_url": feed_url,
                    "ok": true,
                    "podcast": podcast,
                    "error": null
                }))
            }
            Err(err) => {
                log::error!("{}: {:#}", feed_url, err);
                results.push(json!({
                    "feed_url": feed_url,
                    "ok": false,
                    "podcast": null,
                    "error": format!("{:#}", err)
                }))
            }
        }
    }

    // Single successful target prints the podcast itself; anything else
    // gets an envelope with per-target results and counts.
    let parsed = results
        .iter()
        .filter(|r| r.get("ok").and_then(|v| v.as_bool()) == Some(true))
        .count();
    let output = match results.as_slice() {
        [only] if parsed == 1 => only.get("podcast").cloned().unwrap_or_else(|| json!({})),
        _ => json!({
            "feeds": results,
            "total_feeds": results.len(),
            "parsed": parsed,
            "failed": results.len() - parsed
        }),
    };

    if args.compact {
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!("{}", serde_json::to_string_pretty(&output)?);
    }

    Ok(())
}

/// Opens a feed for streaming: stdin, an http(s) URL, or a local file.
fn open_target(target: &str, fetcher: &HttpFetcher) -> Result<Box<dyn Read>> {
    if target == "-" {
        return Ok(Box::new(io::stdin()));
    }

    if target.starts_with("http://") || target.starts_with("https://") {
        let response = fetcher
            .get(target)
            .with_context(|| format!("failed to fetch {}", target))?;
        return Ok(Box::new(response));
    }

    let path = Path::new(target);
    if !path.exists() {
        return Err(anyhow!("file not found: {}", target));
    }
    let file = File::open(path).with_context(|| format!("failed to open {}", target))?;
    Ok(Box::new(file))
}
