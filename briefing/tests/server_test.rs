use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use briefing::article::ArticleCandidate;
use briefing::ingestion::FeedSource;
use briefing::llm::{LlmProvider, LlmRequest, LlmResponse, UsageMetadata};
use briefing::pipeline::{self, NO_RESULTS_MESSAGE};
use briefing::server::{build_rocket, AppState};
use common::{Config, FeedConfig};
use rocket::http::{ContentType, Status};
use rocket::local::asynchronous::Client;
use serde_json::{json, Value};

struct CannedFeed;

#[async_trait::async_trait]
impl FeedSource for CannedFeed {
    async fn fetch(&self, _url: &str) -> Result<Vec<ArticleCandidate>> {
        Ok(vec![
            ArticleCandidate {
                title: "Stablecoins rally".into(),
                link: "https://news.test/stablecoins".into(),
                raw_summary: format!("<p>Stablecoins <b>settle</b> faster. {}</p>", "Issuers grow. ".repeat(25)),
            },
            ArticleCandidate {
                title: "Garden notes".into(),
                link: "https://news.test/garden".into(),
                raw_summary: "Tomatoes need sun. ".repeat(25),
            },
        ])
    }
}

#[derive(Clone, Default)]
struct CountingLlm {
    calls: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl LlmProvider for CountingLlm {
    async fn generate(&self, _request: LlmRequest) -> Result<LlmResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(LlmResponse {
            content: "Settlement <Speeds> Up".into(),
            usage: UsageMetadata::default(),
            model: "canned".into(),
        })
    }

    fn model(&self) -> &str {
        "canned"
    }
}

async fn client() -> (Client, Arc<AtomicUsize>) {
    let config = Config {
        feeds: vec![FeedConfig {
            url: "https://feed.test/rss".into(),
            title: None,
        }],
        ..Config::default()
    };
    let llm = CountingLlm::default();
    let calls = llm.calls.clone();
    let state = AppState::new(Arc::new(config), Arc::new(CannedFeed), Arc::new(llm));
    let client = Client::tracked(build_rocket(state)).await.expect("valid rocket instance");
    (client, calls)
}

#[tokio::test]
async fn index_lists_topics_with_defaults_checked() {
    let (client, _) = client().await;

    let response = client.get("/").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(response.content_type(), Some(ContentType::HTML));

    let body = response.into_string().await.expect("body");
    assert!(body.contains("Generate Newsletter"));
    assert!(body.contains(r#"value="Artificial Intelligence" checked"#));
    assert!(body.contains(r#"value="Payments Innovation" checked"#));
    assert!(body.contains(r#"value="Stablecoins">"#));
}

#[tokio::test]
async fn form_generation_shows_preview_and_download() {
    let (client, calls) = client().await;

    let response = client
        .post("/newsletter")
        .header(ContentType::Form)
        .body("topics=Stablecoins")
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let body = response.into_string().await.expect("body");
    assert!(body.contains("Found 1 strong articles."));
    assert!(body.contains("# Settlement &lt;Speeds&gt; Up"));
    assert!(body.contains("[Stablecoins rally](https://news.test/stablecoins)"));
    assert!(!body.contains("Garden notes"));
    assert!(body.contains(&format!(r#"name="filename" value="{}""#, pipeline::today_filename())));
    assert!(body.contains("Download Newsletter (.md)"));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn empty_selection_asks_for_a_topic() {
    let (client, calls) = client().await;

    let response = client
        .post("/newsletter")
        .header(ContentType::Form)
        .body("")
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let body = response.into_string().await.expect("body");
    assert!(body.contains("Select at least one topic to generate a newsletter."));
    assert!(body.contains("Generate Newsletter"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unknown_topic_is_reported_on_the_form() {
    let (client, calls) = client().await;

    let response = client
        .post("/newsletter")
        .header(ContentType::Form)
        .body("topics=Gardening")
        .dispatch()
        .await;

    let body = response.into_string().await.expect("body");
    assert!(body.contains("unknown topic: Gardening"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn no_matches_shows_message_without_generation() {
    let (client, calls) = client().await;

    let response = client
        .post("/newsletter")
        .header(ContentType::Form)
        .body("topics=WealthTech&topics=InsurTech")
        .dispatch()
        .await;

    let body = response.into_string().await.expect("body");
    assert!(body.contains(NO_RESULTS_MESSAGE));
    assert!(body.contains(r#"value="WealthTech" checked"#));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn download_returns_markdown_attachment() {
    let (client, _) = client().await;

    let response = client
        .post("/download")
        .header(ContentType::Form)
        .body("filename=newsletter_2024-03-07.md&markdown=%23%20Title%0D%0A%0D%0A-%20item%0D%0A")
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(response.content_type(), Some(ContentType::new("text", "markdown")));
    assert_eq!(
        response.headers().get_one("Content-Disposition"),
        Some(r#"attachment; filename="newsletter_2024-03-07.md""#)
    );

    let body = response.into_string().await.expect("body");
    assert_eq!(body, "# Title\n\n- item\n");
}

#[tokio::test]
async fn download_accepts_full_sized_newsletter() {
    let (client, _) = client().await;

    let mut markdown = String::from("# Settlement Speeds Up\n\n## 📌 Caught My Eye\n");
    for i in 0..5 {
        markdown.push_str(&format!(
            "- [Story {}](https://news.test/{}?a=1&b=2): {}\n\n",
            i,
            i,
            "Issuers grow 10% as reserves + audits land; “quotes” included. ".repeat(150)
        ));
    }
    markdown.push_str("\n## 🧠 Key Takeaways\n- Reserves matter\n");
    assert!(markdown.len() > 32 * 1024);

    // Browsers send line breaks as CRLF and spaces as '+'
    let encoded: String = url::form_urlencoded::byte_serialize(markdown.replace('\n', "\r\n").as_bytes()).collect();
    let response = client
        .post("/download")
        .header(ContentType::Form)
        .body(format!("filename=newsletter_2024-03-07.md&markdown={}", encoded))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let body = response.into_string().await.expect("body");
    assert_eq!(body, markdown);
}

#[tokio::test]
async fn download_rejects_foreign_filename() {
    let (client, _) = client().await;

    let response = client
        .post("/download")
        .header(ContentType::Form)
        .body("filename=..%2Fsecrets.md&markdown=x")
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);
}

#[tokio::test]
async fn api_generates_json_newsletter() {
    let (client, calls) = client().await;

    let response = client
        .post("/api/v1/newsletter")
        .json(&json!({ "topics": ["Stablecoins"] }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let body: Value = response.into_json().await.expect("json body");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["article_count"], 1);
    assert_eq!(body["title"], "Settlement <Speeds> Up");
    assert_eq!(body["filename"], pipeline::today_filename());
    let markdown = body["markdown"].as_str().expect("markdown");
    assert!(markdown.starts_with("# Settlement <Speeds> Up\n\n## 📌 Caught My Eye\n"));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn api_reports_no_results() {
    let (client, calls) = client().await;

    let response = client
        .post("/api/v1/newsletter")
        .json(&json!({ "topics": ["WealthTech"] }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let body: Value = response.into_json().await.expect("json body");
    assert_eq!(body["status"], "no_results");
    assert_eq!(body["message"], NO_RESULTS_MESSAGE);
    assert_eq!(body["article_count"], 0);
    assert!(body.get("markdown").is_none());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn api_rejects_invalid_selection() {
    let (client, _) = client().await;

    for payload in [json!({ "topics": [] }), json!({}), json!({ "topics": ["Gardening"] })] {
        let response = client.post("/api/v1/newsletter").json(&payload).dispatch().await;
        assert_eq!(response.status(), Status::UnprocessableEntity);
        let body: Value = response.into_json().await.expect("json body");
        assert!(body["error"].is_string());
    }
}

#[tokio::test]
async fn metadata_endpoints() {
    let (client, _) = client().await;

    let health = client.get("/health").dispatch().await;
    assert_eq!(health.status(), Status::Ok);
    assert_eq!(health.into_string().await.as_deref(), Some("OK"));

    let topics: Value = client
        .get("/api/v1/topics")
        .dispatch()
        .await
        .into_json()
        .await
        .expect("json body");
    assert_eq!(topics["available"].as_array().map(Vec::len), Some(30));
    assert_eq!(
        topics["default_selection"],
        json!(["Artificial Intelligence", "Payments Innovation"])
    );

    let status: Value = client
        .get("/api/v1/status")
        .dispatch()
        .await
        .into_json()
        .await
        .expect("json body");
    assert_eq!(status["status"], "ok");
    assert_eq!(status["feeds_count"], 1);
    assert_eq!(status["model"], "canned");
}
