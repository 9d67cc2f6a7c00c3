pub mod history;
pub mod idea;
pub mod request;

pub use history::{HistoryRow, PersistenceStatus};
pub use idea::IdeaRecord;
pub use request::{GenerationRequest, ALLOWED_COUNTS, DEFAULT_IDEA_COUNT};
