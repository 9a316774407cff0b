use chrono::NaiveDate;
use common::Config;
use tracing::info;

use crate::article::{self, TopicSelection};
use crate::ingestion::{self, FeedSource};
use crate::llm::LlmProvider;
use crate::newsletter::{self, Newsletter};

pub const NO_RESULTS_MESSAGE: &str =
    "No high-quality articles found for selected topics. Try expanding your selection!";

/// Result of one generation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewsletterOutcome {
    /// Nothing survived filtering; no generation call was made.
    NoResults,
    Ready(Newsletter),
}

/// Runs the whole pipeline for one request: read every configured feed in
/// order, filter, and assemble when at least one article survives.
pub async fn generate_newsletter<S, P>(
    config: &Config,
    feeds: &S,
    provider: &P,
    topics: &TopicSelection,
) -> NewsletterOutcome
where
    S: FeedSource + ?Sized,
    P: LlmProvider + ?Sized,
{
    info!(topics = ?topics.labels(), feeds = config.feeds.len(), "generating newsletter");

    let candidates = ingestion::read_feeds(feeds, &config.feeds).await;
    let total = candidates.len();
    let articles = article::select(candidates, topics, &config.filter);
    info!("selected {} of {} candidates", articles.len(), total);

    if articles.is_empty() {
        return NewsletterOutcome::NoResults;
    }

    NewsletterOutcome::Ready(newsletter::build(provider, &articles).await)
}

/// `newsletter_<YYYY-MM-DD>.md`
pub fn download_filename(date: NaiveDate) -> String {
    format!("newsletter_{}.md", date.format("%Y-%m-%d"))
}

/// Accepts only names produced by [`download_filename`].
pub fn is_download_filename(name: &str) -> bool {
    name.strip_prefix("newsletter_")
        .and_then(|rest| rest.strip_suffix(".md"))
        .filter(|date| date.len() == 10)
        .map(|date| NaiveDate::parse_from_str(date, "%Y-%m-%d").is_ok())
        .unwrap_or(false)
}

pub fn today_filename() -> String {
    download_filename(chrono::Local::now().date_naive())
}
