use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use html_escape::{encode_double_quoted_attribute, encode_text};
use rocket::data::{Limits, ToByteUnit};
use rocket::form::Form;
use rocket::http::{ContentType, Header, Status};
use rocket::response::content::RawHtml;
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::{get, post, routes, Build, FromForm, Responder, Rocket, State};
use serde::{Deserialize, Serialize};

use common::Config;

use crate::article::{SelectionError, TopicSelection};
use crate::ingestion::FeedSource;
use crate::llm::LlmProvider;
use crate::pipeline::{self, NewsletterOutcome, NO_RESULTS_MESSAGE};

/// Application state stored inside Rocket managed state.
#[derive(Clone)]
pub struct AppState {
    pub started_at: DateTime<Utc>,
    pub config: Arc<Config>,
    pub feeds: Arc<dyn FeedSource>,
    pub llm: Arc<dyn LlmProvider>,
}

impl AppState {
    pub fn new(config: Arc<Config>, feeds: Arc<dyn FeedSource>, llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            started_at: Utc::now(),
            config,
            feeds,
            llm,
        }
    }
}

/// Response structure for `/api/v1/status`.
#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
    uptime_seconds: i64,
    feeds_count: usize,
    topics_count: usize,
    model: String,
}

#[derive(Serialize)]
struct TopicsResponse {
    available: Vec<String>,
    default_selection: Vec<String>,
}

#[derive(Deserialize)]
struct NewsletterRequest {
    #[serde(default)]
    topics: Vec<String>,
}

#[derive(Serialize)]
struct NewsletterResponse {
    status: &'static str,
    message: String,
    article_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    markdown: Option<String>,
}

#[derive(FromForm)]
struct GenerateForm {
    #[field(default = Vec::new())]
    topics: Vec<String>,
}

#[derive(FromForm)]
struct DownloadForm {
    filename: String,
    markdown: String,
}

/// Markdown attachment returned by `/download`.
#[derive(Responder)]
struct MarkdownDownload {
    inner: (ContentType, String),
    disposition: Header<'static>,
}

#[get("/health")]
async fn health() -> &'static str {
    "OK"
}

/// Status endpoint returning simple JSON with uptime and basic config info.
#[get("/api/v1/status")]
async fn service_status(state: &State<AppState>) -> Json<StatusResponse> {
    let uptime = (Utc::now() - state.started_at).num_seconds();

    Json(StatusResponse {
        status: "ok",
        uptime_seconds: uptime,
        feeds_count: state.config.feeds.len(),
        topics_count: state.config.topics.available.len(),
        model: state.llm.model().to_string(),
    })
}

#[get("/api/v1/topics")]
async fn topics(state: &State<AppState>) -> Json<TopicsResponse> {
    Json(TopicsResponse {
        available: state.config.topics.available.clone(),
        default_selection: state.config.topics.default_selection.clone(),
    })
}

/// Topic selection page
#[get("/")]
async fn index(state: &State<AppState>) -> RawHtml<String> {
    RawHtml(form_page(&state.config, &state.config.topics.default_selection, None))
}

/// Runs the pipeline for the submitted topics and shows the preview.
#[post("/newsletter", data = "<form>")]
async fn generate(state: &State<AppState>, form: Form<GenerateForm>) -> RawHtml<String> {
    let form = form.into_inner();
    let selection = match TopicSelection::new(form.topics.clone(), &state.config.topics.available) {
        Ok(selection) => selection,
        Err(e) => {
            tracing::info!("rejected topic selection: {}", e);
            let hint = match e {
                SelectionError::Empty => "Select at least one topic to generate a newsletter.".to_string(),
                other => other.to_string(),
            };
            return RawHtml(form_page(&state.config, &form.topics, Some(&hint)));
        }
    };

    let outcome = pipeline::generate_newsletter(
        &state.config,
        state.feeds.as_ref(),
        state.llm.as_ref(),
        &selection,
    )
    .await;

    RawHtml(result_page(&state.config, &selection, &outcome))
}

/// Sends back a previously rendered newsletter as a markdown attachment.
#[post("/download", data = "<form>")]
async fn download(form: Form<DownloadForm>) -> Result<MarkdownDownload, Status> {
    let form = form.into_inner();
    if !pipeline::is_download_filename(&form.filename) {
        tracing::warn!("download: rejected filename {:?}", form.filename);
        return Err(Status::BadRequest);
    }

    // Browsers submit form line breaks as CRLF
    let markdown = form.markdown.replace("\r\n", "\n");

    Ok(MarkdownDownload {
        inner: (ContentType::new("text", "markdown"), markdown),
        disposition: Header::new(
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", form.filename),
        ),
    })
}

/// JSON variant of `/newsletter`.
#[post("/api/v1/newsletter", data = "<body>")]
async fn generate_api(
    state: &State<AppState>,
    body: Json<NewsletterRequest>,
) -> Result<Json<NewsletterResponse>, status::Custom<Json<serde_json::Value>>> {
    let selection = TopicSelection::new(body.into_inner().topics, &state.config.topics.available)
        .map_err(|e| {
            status::Custom(
                Status::UnprocessableEntity,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
        })?;

    let outcome = pipeline::generate_newsletter(
        &state.config,
        state.feeds.as_ref(),
        state.llm.as_ref(),
        &selection,
    )
    .await;

    let response = match outcome {
        NewsletterOutcome::NoResults => NewsletterResponse {
            status: "no_results",
            message: NO_RESULTS_MESSAGE.to_string(),
            article_count: 0,
            title: None,
            filename: None,
            markdown: None,
        },
        NewsletterOutcome::Ready(newsletter) => NewsletterResponse {
            status: "ok",
            message: found_message(newsletter.article_count()),
            article_count: newsletter.article_count(),
            title: Some(newsletter.title().to_string()),
            filename: Some(pipeline::today_filename()),
            markdown: Some(newsletter.render()),
        },
    };

    Ok(Json(response))
}

fn found_message(count: usize) -> String {
    format!("Found {} strong articles.", count)
}

fn page(body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Strategic Research Newsletter</title>
<style>
body {{ font-family: sans-serif; max-width: 46rem; margin: 2rem auto; padding: 0 1rem; }}
fieldset {{ columns: 2; border: none; padding: 0; }}
label {{ display: block; margin: .2rem 0; }}
.error {{ color: #a40000; }}
.success {{ color: #1b6e20; }}
pre.newsletter {{ white-space: pre-wrap; background: #f6f6f6; padding: 1rem; }}
</style>
</head>
<body>
<h1>📰 Strategic Research Newsletter Builder</h1>
{}
</body>
</html>
"#,
        body
    )
}

fn form_page(config: &Config, checked: &[String], hint: Option<&str>) -> String {
    let mut body = String::from(
        "<p>Select your topics, click generate, and get a custom AI-powered newsletter.</p>\n",
    );
    if let Some(hint) = hint {
        body.push_str(&format!("<p class=\"error\">{}</p>\n", encode_text(hint)));
    }
    body.push_str("<form method=\"post\" action=\"/newsletter\">\n<p>Choose your research topics:</p>\n<fieldset>\n");
    for topic in &config.topics.available {
        let mark = if checked.contains(topic) { " checked" } else { "" };
        body.push_str(&format!(
            "<label><input type=\"checkbox\" name=\"topics\" value=\"{}\"{}> {}</label>\n",
            encode_double_quoted_attribute(topic),
            mark,
            encode_text(topic)
        ));
    }
    body.push_str("</fieldset>\n<button type=\"submit\">Generate Newsletter</button>\n</form>\n");
    page(&body)
}

fn result_page(config: &Config, selection: &TopicSelection, outcome: &NewsletterOutcome) -> String {
    let newsletter = match outcome {
        NewsletterOutcome::NoResults => {
            return form_page(config, selection.labels(), Some(NO_RESULTS_MESSAGE));
        }
        NewsletterOutcome::Ready(newsletter) => newsletter,
    };

    let markdown = newsletter.render();
    let filename = pipeline::today_filename();

    let body = format!(
        r#"<p class="success">{found}</p>
<h2>📄 Generated Newsletter Preview</h2>
<pre class="newsletter">{preview}</pre>
<form method="post" action="/download">
<input type="hidden" name="filename" value="{filename}">
<textarea name="markdown" hidden>{source}</textarea>
<button type="submit">📥 Download Newsletter (.md)</button>
</form>
<p><a href="/">Start over</a></p>
"#,
        found = encode_text(&found_message(newsletter.article_count())),
        preview = encode_text(&markdown),
        filename = encode_double_quoted_attribute(&filename),
        source = encode_text(&markdown),
    );
    page(&body)
}

/// Build the Rocket instance with managed state and all routes mounted.
pub fn build_rocket(state: AppState) -> Rocket<Build> {
    // `/download` receives the whole rendered newsletter back as a urlencoded form
    let limits = Limits::default().limit("form", 2.mebibytes());

    let figment = rocket::Config::figment()
        .merge(("address", state.config.server.bind.clone()))
        .merge(("port", state.config.server.port))
        .merge(("limits", limits));

    rocket::custom(figment).manage(state).mount(
        "/",
        routes![
            index,
            generate,
            download,
            health,
            service_status,
            topics,
            generate_api,
        ],
    )
}

/// Build and launch the Rocket server.
///
/// This function blocks until the Rocket server shuts down and returns an
/// error if Rocket fails to start.
pub async fn launch_rocket(state: AppState) -> Result<()> {
    tracing::info!(
        bind = %state.config.server.bind,
        port = state.config.server.port,
        "Starting Rocket HTTP server"
    );
    build_rocket(state)
        .launch()
        .await
        .map_err(|e| anyhow!("Rocket failed: {}", e))?;

    tracing::info!("Rocket HTTP server has shut down");
    Ok(())
}
