//! Best-effort parser for the generator's free-text reply.
//!
//! The reply is split into blank-line separated blocks, one per idea. Each
//! field is read from the first line of its block that contains the field's
//! label, anywhere in the line. A label echoed inside another field's text
//! (e.g. a caption that says "Best time: now") is picked up as that field.
//! This is a known limitation of label matching and is kept as-is.
//!
//! Parsing never fails: a missing label yields the field's default.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::IdeaRecord;
use crate::prompt::{LABEL_BEST_TIME, LABEL_CAPTION, LABEL_HASHTAGS, LABEL_IDEA};

pub const DEFAULT_DESCRIPTION: &str = "Great idea";
pub const DEFAULT_CAPTION: &str = "Amazing caption!";
pub const DEFAULT_BEST_TIME: &str = "Any time";
pub const DEFAULT_HASHTAGS: &str = "";

static BLOCK_SEPARATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{2,}").expect("valid block separator regex"));

/// Parse up to `max_count` ideas from `raw`, in reply order.
pub fn parse_ideas(raw: &str, max_count: usize) -> Vec<IdeaRecord> {
    split_blocks(raw)
        .into_iter()
        .take(max_count)
        .enumerate()
        .map(|(i, block)| parse_block(i + 1, block))
        .collect()
}

/// Blank-line separated blocks, trimmed, empties dropped.
pub fn split_blocks(raw: &str) -> Vec<&str> {
    BLOCK_SEPARATOR_RE
        .split(raw)
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .collect()
}

fn parse_block(index: usize, block: &str) -> IdeaRecord {
    let lines: Vec<&str> = block.lines().map(str::trim).collect();

    IdeaRecord {
        index,
        description: field(&lines, LABEL_IDEA, DEFAULT_DESCRIPTION),
        caption: field(&lines, LABEL_CAPTION, DEFAULT_CAPTION),
        best_time: field(&lines, LABEL_BEST_TIME, DEFAULT_BEST_TIME),
        hashtags: field(&lines, LABEL_HASHTAGS, DEFAULT_HASHTAGS),
    }
}

/// Text after `label` on the first line containing it. If the label occurs
/// again on that line, the value stops there.
fn field(lines: &[&str], label: &str, default: &str) -> String {
    lines
        .iter()
        .find(|line| line.contains(label))
        .and_then(|line| line.split(label).nth(1))
        .map(|value| value.trim().to_string())
        .unwrap_or_else(|| default.to_string())
}
