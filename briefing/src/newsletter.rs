//! Newsletter assembly: three kinds of generation calls turned into a
//! structured document, rendered to markdown in one step.

use tracing::info;

use crate::article::Article;
use crate::llm::{generate_text, Generation, LlmProvider, LlmRequest};

pub const FALLBACK_TITLE: &str = "Weekly Strategic Insights";
pub const INSIGHT_FALLBACK: &str = "- Strategic analysis unavailable.";
pub const TAKEAWAYS_FALLBACK: &str =
    "- Themes extracted from real articles.\n- Market signals spotted.\n- Strategic responses anticipated.";

pub const DIGEST_HEADING: &str = "📌 Caught My Eye";
pub const INSIGHTS_HEADING: &str = "🔍 The So What";
pub const TAKEAWAYS_HEADING: &str = "🧠 Key Takeaways";

const TITLE_SYSTEM_PROMPT: &str = "You are a newsletter editor. Create a short, strategic title (under 6 words) capturing this week's dominant theme.";
const INSIGHT_SYSTEM_PROMPT: &str =
    "You are a strategy consultant. For this article, write:\n- Impact\n- Signal\n- Long-term Implication";
const TAKEAWAYS_SYSTEM_PROMPT: &str = "You are a strategy consultant analyzing this week's newsletter. Identify 3–5 major emerging strategic themes from these articles.";

/// Commentary generated for one article
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleInsight {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Section {
    Digest(Vec<Article>),
    Insights(Vec<ArticleInsight>),
    Takeaways(String),
}

impl Section {
    pub fn heading(&self) -> &'static str {
        match self {
            Section::Digest(_) => DIGEST_HEADING,
            Section::Insights(_) => INSIGHTS_HEADING,
            Section::Takeaways(_) => TAKEAWAYS_HEADING,
        }
    }

    fn render_into(&self, out: &mut String) {
        match self {
            Section::Digest(articles) => {
                for a in articles {
                    out.push_str(&format!("- [{}]({}): {}\n\n", a.title, a.link, a.summary));
                }
            }
            Section::Insights(insights) => {
                for i in insights {
                    out.push_str(&format!("**{}**\n{}\n\n", i.title, i.body));
                }
            }
            Section::Takeaways(text) => {
                out.push_str(text);
                out.push('\n');
            }
        }
    }
}

/// Assembled newsletter. Built once per request, never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Newsletter {
    title: String,
    sections: Vec<Section>,
}

impl Newsletter {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn article_count(&self) -> usize {
        self.sections
            .iter()
            .find_map(|s| match s {
                Section::Digest(articles) => Some(articles.len()),
                _ => None,
            })
            .unwrap_or(0)
    }

    /// Markdown document offered for preview and download.
    pub fn render(&self) -> String {
        let mut out = format!("# {}\n\n", self.title);
        for (i, section) in self.sections.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push_str(&format!("## {}\n", section.heading()));
            section.render_into(&mut out);
        }
        out
    }
}

/// Builds the newsletter for `articles` (expected non-empty, in filter order).
///
/// Makes 1 + N + 1 sequential generation calls. Each call degrades to its own
/// fallback text on failure without affecting the others.
pub async fn build<P: LlmProvider + ?Sized>(provider: &P, articles: &[Article]) -> Newsletter {
    info!("assembling newsletter from {} articles", articles.len());

    let title = generate_text(provider, title_request(articles))
        .await
        .text_or(FALLBACK_TITLE);

    let mut insights = Vec::with_capacity(articles.len());
    for article in articles {
        let body = match generate_text(provider, insight_request(article)).await {
            Generation::Text(text) => text,
            Generation::Failed(reason) => {
                info!(title = %article.title, %reason, "using insight placeholder");
                INSIGHT_FALLBACK.to_string()
            }
        };
        insights.push(ArticleInsight {
            title: article.title.clone(),
            body,
        });
    }

    let takeaways = generate_text(provider, takeaways_request(articles))
        .await
        .text_or(TAKEAWAYS_FALLBACK);

    Newsletter {
        title,
        sections: vec![
            Section::Digest(articles.to_vec()),
            Section::Insights(insights),
            Section::Takeaways(takeaways),
        ],
    }
}

fn title_request(articles: &[Article]) -> LlmRequest {
    let combined_titles = articles
        .iter()
        .map(|a| a.title.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    LlmRequest::new(
        TITLE_SYSTEM_PROMPT,
        format!(
            "Here are the article titles:\n\n{}\n\nSuggest a newsletter title.",
            combined_titles
        ),
    )
    .with_sampling(0.5, 50)
}

fn insight_request(article: &Article) -> LlmRequest {
    LlmRequest::new(
        INSIGHT_SYSTEM_PROMPT,
        format!(
            "Article Summary: {}\n\nWrite the strategic analysis.",
            article.summary
        ),
    )
    .with_sampling(0.5, 300)
}

fn takeaways_request(articles: &[Article]) -> LlmRequest {
    let combined_summaries = articles
        .iter()
        .map(|a| format!("Title: {}\nSummary: {}", a.title, a.summary))
        .collect::<Vec<_>>()
        .join("\n");
    LlmRequest::new(
        TAKEAWAYS_SYSTEM_PROMPT,
        format!(
            "Here are this week's articles:\n\n{}\n\nSummarize the major strategic takeaways.",
            combined_summaries
        ),
    )
    .with_sampling(0.4, 300)
}
