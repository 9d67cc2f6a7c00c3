use chrono::NaiveDateTime;
use serde::Serialize;

use crate::sink::flatten_response;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// One appended spreadsheet row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryRow {
    pub timestamp: String,
    pub topic: String,
    pub flattened_text: String,
}

impl HistoryRow {
    pub fn new(at: NaiveDateTime, topic: &str, raw: &str) -> Self {
        Self {
            timestamp: at.format(TIMESTAMP_FORMAT).to_string(),
            topic: topic.to_string(),
            flattened_text: flatten_response(raw),
        }
    }
}

/// Outcome of the best-effort auto-save step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PersistenceStatus {
    Saved,
    Failed { message: String },
    Disabled,
}

impl PersistenceStatus {
    pub fn notice(&self) -> String {
        match self {
            PersistenceStatus::Saved => "Saved to Google Sheets!".to_string(),
            PersistenceStatus::Failed { message } => format!("Save failed: {}", message),
            PersistenceStatus::Disabled => {
                "Auto-save disabled: Google Sheets is not configured".to_string()
            }
        }
    }
}
