use anyhow::{Context, Result};
use common::{FeedConfig, FetchConfig};
use feed_rs::model::{Entry, Feed};
use feed_rs::parser;
use reqwest::Client;
use std::time::Duration;
use tracing::{info, warn};

use crate::article::ArticleCandidate;

/// Summary used when an entry carries neither a summary nor a content body.
pub const MISSING_SUMMARY: &str = "No summary available.";

/// Source of raw feed entries.
#[async_trait::async_trait]
pub trait FeedSource: Send + Sync {
    /// Entries of a single feed, in the order the feed lists them.
    async fn fetch(&self, url: &str) -> Result<Vec<ArticleCandidate>>;
}

/// Fetches feeds over HTTP and parses them with feed-rs.
pub struct HttpFeedSource {
    client: Client,
}

impl HttpFeedSource {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.as_str())
            .build()
            .context("failed to build reqwest client")?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch(&self, url: &str) -> Result<Vec<ArticleCandidate>> {
        let feed = fetch_and_parse_feed(&self.client, url).await?;
        Ok(candidates_from_feed(feed))
    }
}

/// Fetches a feed from the given URL and parses it. Single attempt, no retry.
pub async fn fetch_and_parse_feed(client: &Client, url: &str) -> Result<Feed> {
    let response = client.get(url).send().await.context("failed to fetch feed")?;

    let status = response.status();
    if !status.is_success() {
        return Err(anyhow::anyhow!("feed fetch failed with status: {}", status));
    }

    let bytes = response.bytes().await.context("failed to read response body")?;

    let feed = parser::parse(bytes.as_ref()).context("failed to parse feed")?;

    Ok(feed)
}

pub fn candidates_from_feed(feed: Feed) -> Vec<ArticleCandidate> {
    feed.entries.into_iter().map(candidate_from_entry).collect()
}

fn candidate_from_entry(entry: Entry) -> ArticleCandidate {
    let title = entry.title.map(|t| t.content).unwrap_or_default();
    let link = entry.links.into_iter().next().map(|l| l.href).unwrap_or_default();
    let raw_summary = entry
        .summary
        .map(|s| s.content)
        .or_else(|| entry.content.and_then(|c| c.body))
        .unwrap_or_else(|| MISSING_SUMMARY.to_string());

    ArticleCandidate { title, link, raw_summary }
}

/// Reads every feed in order and concatenates their entries.
///
/// A feed that cannot be fetched or parsed contributes nothing; the scan
/// carries on with the remaining feeds.
pub async fn read_feeds<S>(source: &S, feeds: &[FeedConfig]) -> Vec<ArticleCandidate>
where
    S: FeedSource + ?Sized,
{
    let mut candidates = Vec::new();
    for feed in feeds {
        match source.fetch(&feed.url).await {
            Ok(entries) => {
                info!("Fetched feed '{}': {} items", feed.label(), entries.len());
                candidates.extend(entries);
            }
            Err(e) => warn!(url = %feed.url, "skipping feed '{}': {:#}", feed.label(), e),
        }
    }
    candidates
}
