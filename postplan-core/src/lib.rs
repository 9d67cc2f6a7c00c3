pub mod config;
pub mod error;
pub mod export;
pub mod generation;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod prompt;
pub mod sink;

pub use config::PostplanConfig;
pub use error::{PlanError, PostplanError, ValidationError};
pub use export::{export_file_name, PlanExport, EXPORT_MIME};
pub use generation::{
    create_generator, GeminiConfig, GeminiGenerationClient, GenerationError, IdeaGenerator,
};
pub use models::{GenerationRequest, HistoryRow, IdeaRecord, PersistenceStatus};
pub use parser::parse_ideas;
pub use pipeline::{PlanOutcome, PlanPipeline};
pub use prompt::build_prompt;
pub use sink::{
    flatten_response, load_token_source, resolve_sink, AccessTokenSource, RecordSink,
    ServiceAccountTokens, SheetsRecordSink, SinkError, SpreadsheetTarget, StaticToken,
};
