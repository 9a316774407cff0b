/*!
common/src/lib.rs

Shared configuration types for the strategic newsletter builder.

This file provides:
- Config data structures (deserialized from TOML, every section has defaults)
- An async loader merging a default file with an optional override file
- Validation of the loaded configuration
*/

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Feeds scanned when the configuration does not list any.
pub const DEFAULT_FEEDS: &[&str] = &[
    "https://techcrunch.com/feed/",
    "https://www.finextra.com/rss/finextranews.aspx",
    "https://cointelegraph.com/rss",
    "https://thefinancialbrand.com/feed/",
    "https://news.google.com/rss/search?q=artificial+intelligence",
    "https://news.google.com/rss/search?q=payments",
    "https://news.google.com/rss/search?q=stablecoins",
    "https://news.google.com/rss/search?q=banking+innovation",
    "https://news.google.com/rss/search?q=fintech",
];

/// Topic vocabulary offered to the user when none is configured.
pub const DEFAULT_TOPICS: &[&str] = &[
    "Artificial Intelligence",
    "Machine Learning",
    "Generative AI",
    "Agentic AI",
    "Explainable AI (XAI)",
    "Quantum Computing",
    "Robotics in Finance",
    "Payments Innovation",
    "Digital Wallets",
    "CBDCs (Central Bank Digital Currencies)",
    "Stablecoins",
    "Tokenization of Assets",
    "Cross-Border Payments",
    "Real-Time Payments",
    "Open Banking",
    "Digital Banking Transformation",
    "Embedded Finance",
    "Banking-as-a-Service (BaaS)",
    "Core Banking Modernization",
    "Fintech M&A",
    "WealthTech",
    "InsurTech",
    "LendingTech (BNPL)",
    "Challenger Banks (Neobanks)",
    "Super Apps",
    "Cryptocurrency Regulation",
    "DeFi (Decentralized Finance)",
    "Crypto Custody Solutions",
    "Smart Contracts Development",
    "ESG in Finance",
];

/// Topics pre-selected in the UI.
pub const DEFAULT_SELECTION: &[&str] = &["Artificial Intelligence", "Payments Innovation"];

pub const DEFAULT_MAX_ARTICLES: usize = 5;
pub const DEFAULT_MIN_SUMMARY_LENGTH: usize = 300;

/// A single syndication source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedConfig {
    pub url: String,
    pub title: Option<String>,
}

impl FeedConfig {
    /// Name used in logs: the configured title, else the URL.
    pub fn label(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.url)
    }
}

/// Topic vocabulary and the initial selection shown in the UI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicsConfig {
    #[serde(default = "default_topics")]
    pub available: Vec<String>,
    #[serde(default = "default_selection")]
    pub default_selection: Vec<String>,
}

impl Default for TopicsConfig {
    fn default() -> Self {
        Self {
            available: default_topics(),
            default_selection: default_selection(),
        }
    }
}

/// How a topic keyword is looked up in an article's title and summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Keyword may appear anywhere, including inside a longer word.
    #[default]
    Substring,
    /// Keyword must not be glued to alphanumeric characters on either side.
    Word,
}

/// Article selection thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Cap on articles carried into generation
    #[serde(default = "default_max_articles")]
    pub max_articles: usize,
    /// Minimum sanitized summary length, in characters
    #[serde(default = "default_min_summary_length")]
    pub min_summary_length: usize,
    #[serde(default)]
    pub match_mode: MatchMode,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            max_articles: DEFAULT_MAX_ARTICLES,
            min_summary_length: DEFAULT_MIN_SUMMARY_LENGTH,
            match_mode: MatchMode::default(),
        }
    }
}

/// Remote text-generation endpoint (OpenAI-compatible chat completions)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_llm_timeout")]
    pub timeout_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key_env: default_api_key_env(),
            model: default_model(),
            timeout_seconds: default_llm_timeout(),
        }
    }
}

/// Feed fetching configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_fetch_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_fetch_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// HTTP server binding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

/// Top-level application configuration (deserialized from config.toml)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_feeds")]
    pub feeds: Vec<FeedConfig>,
    #[serde(default)]
    pub topics: TopicsConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feeds: default_feeds(),
            topics: TopicsConfig::default(),
            filter: FilterConfig::default(),
            llm: LlmConfig::default(),
            fetch: FetchConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration with an optional default file and an optional override file.
    /// If both are present, they are merged (override takes precedence). Missing keys
    /// fall back to the built-in defaults.
    pub async fn load_with_defaults(default_path: Option<&Path>, override_path: Option<&Path>) -> Result<Self> {
        let mut config_value = toml::Value::Table(toml::map::Map::new());

        for (kind, path) in [("default", default_path), ("override", override_path)] {
            let Some(path) = path else { continue };
            if !path.exists() {
                continue;
            }
            let data = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read {} config: {}", kind, path.display()))?;
            let val: toml::Value = toml::from_str(&data)
                .with_context(|| format!("Failed to parse {} configuration", kind))?;
            merge_toml(&mut config_value, val);
        }

        let cfg: Config = config_value.try_into().context("Failed to parse merged configuration")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.feeds.is_empty() {
            bail!("configuration lists no feeds");
        }
        for feed in &self.feeds {
            url::Url::parse(&feed.url).with_context(|| format!("invalid feed url: {}", feed.url))?;
        }
        if self.topics.available.is_empty() {
            bail!("topic vocabulary is empty");
        }
        if let Some(unknown) = self
            .topics
            .default_selection
            .iter()
            .find(|t| !self.topics.available.contains(t))
        {
            bail!("default topic '{}' is not part of the vocabulary", unknown);
        }
        if self.filter.max_articles == 0 {
            bail!("filter.max_articles must be at least 1");
        }
        Ok(())
    }
}

fn merge_toml(a: &mut toml::Value, b: toml::Value) {
    match (a, b) {
        (toml::Value::Table(a_map), toml::Value::Table(b_map)) => {
            for (k, v) in b_map {
                if let Some(a_val) = a_map.get_mut(&k) {
                    merge_toml(a_val, v);
                } else {
                    a_map.insert(k, v);
                }
            }
        }
        (a_val, b_val) => *a_val = b_val,
    }
}

fn default_feeds() -> Vec<FeedConfig> {
    DEFAULT_FEEDS
        .iter()
        .map(|url| FeedConfig { url: url.to_string(), title: None })
        .collect()
}

fn default_topics() -> Vec<String> {
    DEFAULT_TOPICS.iter().map(|t| t.to_string()).collect()
}

fn default_selection() -> Vec<String> {
    DEFAULT_SELECTION.iter().map(|t| t.to_string()).collect()
}

fn default_max_articles() -> usize {
    DEFAULT_MAX_ARTICLES
}

fn default_min_summary_length() -> usize {
    DEFAULT_MIN_SUMMARY_LENGTH
}

fn default_api_url() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_llm_timeout() -> u64 {
    30
}

fn default_fetch_timeout() -> u64 {
    10
}

fn default_user_agent() -> String {
    "Briefing/0.1.0".to_string()
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_config_uses_defaults() {
        let cfg: Config = toml::from_str("").expect("parse config");
        assert_eq!(cfg.feeds.len(), DEFAULT_FEEDS.len());
        assert_eq!(cfg.topics.available.len(), 30);
        assert_eq!(cfg.filter.max_articles, 5);
        assert_eq!(cfg.filter.min_summary_length, 300);
        assert_eq!(cfg.filter.match_mode, MatchMode::Substring);
        assert_eq!(cfg.llm.api_key_env, "OPENAI_API_KEY");
        assert_eq!(cfg.llm.model, "gpt-3.5-turbo");
        cfg.validate().expect("defaults are valid");
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let toml = r#"
            [[feeds]]
            url = "https://example.com/rss"
            title = "Example"

            [filter]
            max_articles = 3
            match_mode = "word"
        "#;

        let cfg: Config = toml::from_str(toml).expect("parse config");
        assert_eq!(cfg.feeds.len(), 1);
        assert_eq!(cfg.feeds[0].title.as_deref(), Some("Example"));
        assert_eq!(cfg.filter.max_articles, 3);
        assert_eq!(cfg.filter.min_summary_length, 300);
        assert_eq!(cfg.filter.match_mode, MatchMode::Word);
        assert_eq!(cfg.server.port, 8000);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut cfg = Config::default();
        cfg.feeds = vec![FeedConfig { url: "not a url".into(), title: None }];
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.topics.default_selection = vec!["Underwater Basket Weaving".into()];
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("Underwater Basket Weaving"));

        let mut cfg = Config::default();
        cfg.filter.max_articles = 0;
        assert!(cfg.validate().is_err());
    }

    #[tokio::test]
    async fn override_file_takes_precedence() {
        let mut defaults = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            defaults,
            "[filter]\nmax_articles = 8\nmin_summary_length = 120\n\n[llm]\nmodel = \"gpt-4o-mini\""
        )
        .expect("write defaults");

        let mut overrides = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(overrides, "[filter]\nmax_articles = 2").expect("write overrides");

        let cfg = Config::load_with_defaults(Some(defaults.path()), Some(overrides.path()))
            .await
            .expect("load config");

        assert_eq!(cfg.filter.max_articles, 2);
        assert_eq!(cfg.filter.min_summary_length, 120);
        assert_eq!(cfg.llm.model, "gpt-4o-mini");
    }

    #[tokio::test]
    async fn missing_files_fall_back_to_builtin_defaults() {
        let cfg = Config::load_with_defaults(Some(Path::new("does/not/exist.toml")), None)
            .await
            .expect("load config");
        assert_eq!(cfg.feeds[0].url, "https://techcrunch.com/feed/");
    }

    #[test]
    fn feed_label_prefers_title() {
        let titled = FeedConfig {
            url: "https://example.com/rss".into(),
            title: Some("Example Wire".into()),
        };
        let bare = FeedConfig {
            url: "https://example.com/atom".into(),
            title: None,
        };
        assert_eq!(titled.label(), "Example Wire");
        assert_eq!(bare.label(), "https://example.com/atom");
    }
}
