use serde::{Deserialize, Serialize};

/// One parsed post idea. `index` is its 1-based position in the reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdeaRecord {
    pub index: usize,
    pub description: String,
    pub caption: String,
    pub best_time: String,
    pub hashtags: String,
}
