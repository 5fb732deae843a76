use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::{get, post},
    Form, Json, Router,
};
use pulldown_cmark::{html, Event, Options, Parser};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

use crate::data::models::Ticket;
use crate::error::{PipelineError, Result};
use crate::pipeline::NewsletterPipeline;

pub struct AppState {
    pub pipeline: NewsletterPipeline,
}

#[derive(Deserialize, Default)]
pub struct ResearchForm {
    #[serde(default)]
    pub ticket: String,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/research", post(research_page))
        .route("/api/research", post(research_json))
        .with_state(state)
}

pub async fn run_server(state: Arc<AppState>, bind: &str) -> Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|e| PipelineError::Config(format!("Failed to bind {bind}: {e}")))?;
    info!("API Server listening on {}", bind);
    axum::serve(listener, app)
        .await
        .map_err(|e| PipelineError::Config(format!("Server error: {e}")))
}

async fn index() -> Html<String> {
    Html(render_page("", Outcome::Empty))
}

async fn research_page(
    State(state): State<Arc<AppState>>,
    Form(form): Form<ResearchForm>,
) -> impl IntoResponse {
    let ticket = match Ticket::parse(&form.ticket) {
        Ok(t) => t,
        Err(e) => {
            info!("🖥️ [API] Rejected submission: {}", e);
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Html(render_page(&form.ticket, Outcome::Invalid(validation_message(&e)))),
            );
        }
    };

    info!("🖥️ [API] Research requested for {}", ticket);
    match state.pipeline.run(&ticket).await {
        Ok(result) => {
            let artifact = result
                .final_output()
                .map(|o| o.raw.clone())
                .unwrap_or_default();
            (StatusCode::OK, Html(render_page(ticket.as_str(), Outcome::Artifact(artifact))))
        }
        Err(e) => {
            error!("❌ [API] Run failed for {}: {}", ticket, e);
            (
                StatusCode::BAD_GATEWAY,
                Html(render_page(ticket.as_str(), Outcome::Failed(e.to_string()))),
            )
        }
    }
}

async fn research_json(
    State(state): State<Arc<AppState>>,
    Json(form): Json<ResearchForm>,
) -> impl IntoResponse {
    let ticket = match Ticket::parse(&form.ticket) {
        Ok(t) => t,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"status": "invalid", "message": validation_message(&e)})),
            )
                .into_response()
        }
    };

    match state.pipeline.run(&ticket).await {
        Ok(result) => Json(result).into_response(),
        Err(e) => {
            error!("❌ [API] Run failed for {}: {}", ticket, e);
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({"status": "failed", "message": e.to_string()})),
            )
                .into_response()
        }
    }
}

fn validation_message(err: &PipelineError) -> String {
    match err {
        PipelineError::Validation(msg) => msg.clone(),
        other => other.to_string(),
    }
}

enum Outcome {
    Empty,
    Invalid(String),
    Artifact(String),
    Failed(String),
}

fn render_page(ticket: &str, outcome: Outcome) -> String {
    let body = match outcome {
        Outcome::Empty => String::new(),
        Outcome::Invalid(msg) => format!(r#"<p class="error">{}</p>"#, escape_html(&msg)),
        Outcome::Artifact(text) => format!(
            "<h2>Research results:</h2>\n<article class=\"result\">\n{}</article>",
            render_markdown(&text)
        ),
        Outcome::Failed(msg) => format!(
            r#"<p class="error">Research run failed: {}</p>"#,
            escape_html(&msg)
        ),
    };

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Stock Newsletter</title>
<style>
body {{ font-family: sans-serif; margin: 2rem; display: flex; gap: 2rem; }}
aside {{ min-width: 16rem; }}
.error {{ color: #b00020; }}
.result {{ max-width: 48rem; line-height: 1.5; }}
</style>
</head>
<body>
<aside>
<h3>Enter the stock to research</h3>
<form method="post" action="/research">
<label for="ticket">Ticket</label>
<input id="ticket" name="ticket" type="text" value="{}">
<button type="submit">Run research</button>
</form>
</aside>
<main>
{}
</main>
</body>
</html>
"#,
        escape_html(ticket),
        body
    )
}

/// Markdown to HTML. Raw HTML in model output is shown as text, never passed through.
pub fn render_markdown(text: &str) -> String {
    let parser = Parser::new_ext(text, Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH).map(
        |event| match event {
            Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
            other => other,
        },
    );
    let mut out = String::with_capacity(text.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
