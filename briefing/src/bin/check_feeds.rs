use anyhow::Result;
use clap::Parser;
use common::Config;
use std::path::PathBuf;

use briefing::ingestion::{FeedSource, HttpFeedSource};
use briefing::sanitize;

/// Fetch every configured feed once and report what it yields.
#[derive(Parser, Debug)]
#[command(name = "check_feeds")]
struct Args {
    /// Path to config.toml; built-in feeds are used when omitted
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let config = Config::load_with_defaults(None, args.config.as_deref()).await?;
    let source = HttpFeedSource::new(&config.fetch)?;

    for feed in &config.feeds {
        println!("\n{}", "=".repeat(60));
        println!("Feed: {}", feed.label());
        if feed.title.is_some() {
            println!("URL:  {}", feed.url);
        }
        println!("{}", "=".repeat(60));

        match source.fetch(&feed.url).await {
            Ok(candidates) => {
                println!("✓ {} entries", candidates.len());
                for (i, candidate) in candidates.iter().take(3).enumerate() {
                    let summary = sanitize::plain_text(&candidate.raw_summary);
                    println!("    {}. {}", i + 1, candidate.title);
                    println!("       URL: {}", candidate.link);
                    println!(
                        "       Summary: {} chars (minimum {})",
                        sanitize::text_len(&summary),
                        config.filter.min_summary_length
                    );
                }
            }
            Err(e) => {
                println!("✗ Failed: {:#}", e);
            }
        }
    }

    Ok(())
}
