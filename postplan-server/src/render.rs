//! HTML pages for the browser front end.
//!
//! Every piece of user or model text goes through [`escape_html`].

use base64::{engine::general_purpose::STANDARD, Engine as _};
use postplan_core::models::{ALLOWED_COUNTS, DEFAULT_IDEA_COUNT};
use postplan_core::{IdeaRecord, PersistenceStatus, PlanOutcome};

const TITLE: &str = "Social Agent";

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{TITLE}</title>
<style>
body {{ font-family: sans-serif; max-width: 46rem; margin: 2rem auto; padding: 0 1rem; }}
.error {{ color: #b00020; }}
.success {{ color: #1b5e20; }}
.notice {{ color: #6d4c00; }}
.meta {{ color: #666; font-size: 0.9rem; }}
</style>
</head>
<body>
<h1>{TITLE} 🚀</h1>
<h3>Save time &amp; boost engagement with AI-generated viral post ideas!</h3>
{body}
<hr>
<p class="meta">Happy Posting! 🚀</p>
</body>
</html>
"#
    )
}

/// The topic/count form. `topic` and `count` pre-fill it after an error.
pub fn form(topic: &str, count: u8) -> String {
    let options: String = ALLOWED_COUNTS
        .iter()
        .map(|n| {
            let selected = if *n == count { " selected" } else { "" };
            format!(r#"<option value="{n}"{selected}>{n}</option>"#)
        })
        .collect();

    format!(
        r#"<form method="post" action="/generate">
<label>Enter your topic <input type="text" name="topic" value="{topic}" placeholder="e.g. fitness, coffee, pets, study motivation"></label>
<label>Number of ideas <select name="count">{options}</select></label>
<button type="submit">Generate Viral Posts</button>
</form>"#,
        topic = escape_html(topic),
    )
}

pub fn index_page() -> String {
    layout(&form("", DEFAULT_IDEA_COUNT))
}

/// Form plus an error banner. Used for validation and generation failures.
pub fn error_page(message: &str, topic: &str, count: u8) -> String {
    layout(&format!(
        r#"{}
<p class="error">{}</p>"#,
        form(topic, count),
        escape_html(message)
    ))
}

pub fn idea_block(idea: &IdeaRecord) -> String {
    format!(
        r#"<section class="idea">
<h4>Idea {index}: {description}</h4>
<p><strong>{caption}</strong></p>
<p class="meta">Best time: {best_time}  •  {hashtags}</p>
<hr>
</section>"#,
        index = idea.index,
        description = escape_html(&idea.description),
        caption = escape_html(&idea.caption),
        best_time = escape_html(&idea.best_time),
        hashtags = escape_html(&idea.hashtags),
    )
}

fn persistence_notice(status: &PersistenceStatus) -> String {
    let class = match status {
        PersistenceStatus::Saved => "success",
        PersistenceStatus::Failed { .. } => "error",
        PersistenceStatus::Disabled => "notice",
    };
    format!(
        r#"<p class="{class}">{}</p>"#,
        escape_html(&status.notice())
    )
}

/// Browsers rewrite line endings in submitted form text, so the plan travels
/// base64-encoded and `/download` decodes it back to the exact reply.
pub fn encode_plan(raw: &str) -> String {
    STANDARD.encode(raw.as_bytes())
}

/// Inverse of [`encode_plan`]. `None` for anything that is not base64 UTF-8.
pub fn decode_plan(encoded: &str) -> Option<String> {
    let bytes = STANDARD.decode(encoded.trim()).ok()?;
    String::from_utf8(bytes).ok()
}

fn download_form(outcome: &PlanOutcome) -> String {
    format!(
        r#"<form method="post" action="/download">
<input type="hidden" name="topic" value="{topic}">
<input type="hidden" name="plan" value="{plan}">
<button type="submit">Download Full Plan</button>
</form>"#,
        topic = escape_html(outcome.request.topic()),
        plan = encode_plan(&outcome.raw),
    )
}

pub fn result_page(outcome: &PlanOutcome) -> String {
    let ideas: String = outcome.ideas.iter().map(idea_block).collect();
    layout(&format!(
        r#"{form}
<p class="success">Here are your {count} post ideas!</p>
{ideas}
{notice}
{download}"#,
        form = form(outcome.request.topic(), outcome.request.count()),
        count = outcome.request.count(),
        notice = persistence_notice(&outcome.persistence),
        download = download_form(outcome),
    ))
}
