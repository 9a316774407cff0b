use common::{FilterConfig, MatchMode};
use thiserror::Error;
use tracing::debug;

use crate::sanitize;

/// Feed entry before quality and relevance filtering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleCandidate {
    pub title: String,
    pub link: String,
    /// Summary as published, possibly HTML
    pub raw_summary: String,
}

/// Candidate that passed sanitization and filtering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub title: String,
    pub link: String,
    pub summary: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("select at least one topic")]
    Empty,
    #[error("unknown topic: {0}")]
    UnknownTopic(String),
}

/// Non-empty set of labels taken from the configured topic vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicSelection {
    labels: Vec<String>,
}

impl TopicSelection {
    /// Validates `labels` against `vocabulary`. Duplicates are collapsed, first occurrence wins.
    pub fn new<I, S>(labels: I, vocabulary: &[String]) -> Result<Self, SelectionError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut picked: Vec<String> = Vec::new();
        for label in labels {
            let label = label.into();
            if !vocabulary.contains(&label) {
                return Err(SelectionError::UnknownTopic(label));
            }
            if !picked.contains(&label) {
                picked.push(label);
            }
        }
        if picked.is_empty() {
            return Err(SelectionError::Empty);
        }
        Ok(Self { labels: picked })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Lower-cased labels used for matching.
    pub fn keywords(&self) -> Vec<String> {
        self.labels.iter().map(|l| l.to_lowercase()).collect()
    }
}

/// Filters candidates in the order given and keeps the first `max_articles` survivors.
///
/// A candidate survives when its sanitized summary has at least
/// `min_summary_length` characters and one of the selected keywords occurs,
/// case-insensitively, in its title or summary. An empty result is a normal
/// outcome; callers report it as "no results".
pub fn select<I>(candidates: I, topics: &TopicSelection, filter: &FilterConfig) -> Vec<Article>
where
    I: IntoIterator<Item = ArticleCandidate>,
{
    let keywords = topics.keywords();
    let mut selected = Vec::new();

    for candidate in candidates {
        if selected.len() >= filter.max_articles {
            break;
        }

        let summary = sanitize::plain_text(&candidate.raw_summary);
        if sanitize::text_len(&summary) < filter.min_summary_length {
            debug!(title = %candidate.title, "skipping candidate with short summary");
            continue;
        }

        let title_lower = candidate.title.to_lowercase();
        let summary_lower = summary.to_lowercase();
        let relevant = keywords.iter().any(|k| {
            keyword_matches(&title_lower, k, filter.match_mode)
                || keyword_matches(&summary_lower, k, filter.match_mode)
        });

        if relevant {
            selected.push(Article {
                title: candidate.title,
                link: candidate.link,
                summary,
            });
        }
    }

    selected
}

/// Both arguments are expected lower-cased.
fn keyword_matches(haystack: &str, keyword: &str, mode: MatchMode) -> bool {
    match mode {
        MatchMode::Substring => haystack.contains(keyword),
        MatchMode::Word => haystack.match_indices(keyword).any(|(start, found)| {
            let before = haystack[..start].chars().next_back();
            let after = haystack[start + found.len()..].chars().next();
            !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
        }),
    }
}
