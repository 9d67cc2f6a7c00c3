use serde::Serialize;

use crate::error::ValidationError;

pub const ALLOWED_COUNTS: [u8; 5] = [1, 2, 3, 4, 5];
pub const DEFAULT_IDEA_COUNT: u8 = 3;

/// Validated user input for one generate action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationRequest {
    topic: String,
    count: u8,
}

impl GenerationRequest {
    pub fn new(topic: &str, count: u8) -> Result<Self, ValidationError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(ValidationError::EmptyTopic);
        }
        if !ALLOWED_COUNTS.contains(&count) {
            return Err(ValidationError::CountOutOfRange(count));
        }
        Ok(Self {
            topic: topic.to_string(),
            count,
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn count(&self) -> u8 {
        self.count
    }
}
