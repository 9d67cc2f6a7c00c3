use serde::Serialize;

pub const EXPORT_MIME: &str = "text/plain";
pub const EXPORT_SUFFIX: &str = "_social_plan.txt";

/// The raw reply offered as a download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanExport {
    pub file_name: String,
    pub mime: &'static str,
    pub content: String,
}

impl PlanExport {
    pub fn new(topic: &str, raw: &str) -> Self {
        Self {
            file_name: export_file_name(topic),
            mime: EXPORT_MIME,
            content: raw.to_string(),
        }
    }
}

/// `"study motivation"` -> `"study_motivation_social_plan.txt"`.
pub fn export_file_name(topic: &str) -> String {
    format!("{}{}", topic.replace(' ', "_"), EXPORT_SUFFIX)
}
