//! postplan-cli: terminal front end for a running Postplan server
//!
//! # Subcommands
//! - `generate <topic> [-n <count>] [--json] [--out <dir>]`: generate post ideas
//! - `status`: show server health

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::Deserialize;

const DEFAULT_SERVER: &str = "http://127.0.0.1:8787";
const DEFAULT_COUNT: u8 = 3;

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "postplan-cli",
    version,
    about = "Generate viral social post ideas with Postplan"
)]
struct Cli {
    /// Postplan HTTP server URL (overrides POSTPLAN_HTTP_URL env var)
    #[arg(long, env = "POSTPLAN_HTTP_URL", default_value = DEFAULT_SERVER)]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Generate post ideas for a topic
    Generate {
        /// Topic to generate ideas for, e.g. "study motivation"
        topic: String,

        /// Number of ideas (1-5)
        #[arg(short = 'n', long, default_value_t = DEFAULT_COUNT,
              value_parser = clap::value_parser!(u8).range(1..=5))]
        count: u8,

        /// Print the server's JSON response instead of formatted ideas
        #[arg(long)]
        json: bool,

        /// Write the full plan to <dir>/<topic>_social_plan.txt
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Show Postplan server status
    Status,
}

// ============================================================================
// API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct IdeaView {
    pub index: usize,
    pub description: String,
    pub caption: String,
    pub best_time: String,
    pub hashtags: String,
}

#[derive(Debug, Deserialize)]
pub struct PersistenceView {
    pub notice: String,
}

#[derive(Debug, Deserialize)]
pub struct DownloadView {
    pub file_name: String,
}

/// Successful response from POST /api/generate
#[derive(Debug, Deserialize)]
pub struct PlanResponse {
    pub topic: String,
    pub count: u8,
    pub ideas: Vec<IdeaView>,
    pub raw: String,
    pub persistence: PersistenceView,
    pub download: DownloadView,
    pub took_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

// ============================================================================
// Formatting
// ============================================================================

/// Terminal rendering of one idea.
pub fn format_idea(idea: &IdeaView) -> String {
    let mut out = format!(
        "Idea {}: {}\n  {}\n  Best time: {}",
        idea.index, idea.description, idea.caption, idea.best_time
    );
    if !idea.hashtags.is_empty() {
        out.push_str("  •  ");
        out.push_str(&idea.hashtags);
    }
    out
}

/// Message for a non-2xx response: the server's `error` field if present.
pub fn error_message(status: u16, body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(e) => e.error,
        Err(_) => format!("server returned {}: {}", status, body),
    }
}

/// Target file under `dir`. The name comes from the server and is built from
/// the topic, so path separators are flattened to keep the file inside `dir`.
pub fn export_path(dir: &Path, file_name: &str) -> PathBuf {
    let safe: String = file_name
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    dir.join(safe)
}

// ============================================================================
// HTTP Client Calls
// ============================================================================

fn do_generate(
    server: &str,
    topic: &str,
    count: u8,
    json_output: bool,
    out: Option<&Path>,
) -> anyhow::Result<()> {
    // Generation can take a while
    let client = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(180))
        .build()?;

    let url = format!("{}/api/generate", server);
    let body = serde_json::json!({
        "topic": topic,
        "count": count,
    });

    let resp = match client.post(&url).json(&body).send() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("postplan-cli: connection failed to {}: {}", url, e);
            std::process::exit(1);
        }
    };

    let status = resp.status();
    let text = resp.text()?;

    if !status.is_success() {
        eprintln!("postplan-cli: {}", error_message(status.as_u16(), &text));
        std::process::exit(1);
    }

    let plan: PlanResponse = serde_json::from_str(&text)?;

    if json_output {
        println!("{}", text);
    } else {
        println!("Here are your {} post ideas for \"{}\"!\n", plan.count, plan.topic);
        for idea in &plan.ideas {
            println!("{}\n", format_idea(idea));
        }
        eprintln!("{}", plan.persistence.notice);
        if let Some(ms) = plan.took_ms {
            eprintln!("Generated in {} ms", ms);
        }
    }

    if let Some(dir) = out {
        let path = export_path(dir, &plan.download.file_name);
        std::fs::write(&path, &plan.raw)?;
        eprintln!("Full plan written to {}", path.display());
    }

    Ok(())
}

/// Show the server status by calling GET /health.
fn do_status(server: &str) -> anyhow::Result<()> {
    let client = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(10))
        .build()?;

    let url = format!("{}/health", server);

    match client.get(&url).send() {
        Ok(r) if r.status().is_success() => {
            let body: serde_json::Value = r.json().unwrap_or_default();
            println!("Postplan server: {}", body["status"].as_str().unwrap_or("unknown"));
            println!("Version:         {}", body["version"].as_str().unwrap_or("?"));
            println!("Generator:       {}", body["generator"].as_str().unwrap_or("?"));
            let sink = if body["sink_enabled"].as_bool().unwrap_or(false) {
                "on"
            } else {
                "off"
            };
            println!("Auto-save:       {}", sink);
        }
        Ok(r) => {
            eprintln!("postplan-cli: server unhealthy (HTTP {})", r.status());
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("postplan-cli: cannot reach {}: {}", url, e);
            std::process::exit(1);
        }
    }

    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn main() {
    let cli = Cli::parse();
    let server = cli.server.trim_end_matches('/').to_string();

    let result = match cli.command {
        Commands::Generate {
            topic,
            count,
            json,
            out,
        } => do_generate(&server, &topic, count, json, out.as_deref()),
        Commands::Status => do_status(&server),
    };

    if let Err(e) = result {
        eprintln!("postplan-cli: {}", e);
        std::process::exit(1);
    }
}

// ============================================================================
// Tests
// ============================================================================
