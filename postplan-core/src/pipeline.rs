//! One generate action, start to finish.
//!
//! validate -> prompt -> generate -> parse -> auto-save (best effort) -> export.
//! Validation and generation failures stop the run before anything is parsed
//! or saved. Auto-save failures only change the reported `PersistenceStatus`.

use std::sync::Arc;

use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::PostplanConfig;
use crate::error::{PlanError, PostplanError};
use crate::export::PlanExport;
use crate::generation::{create_generator, IdeaGenerator};
use crate::models::{GenerationRequest, HistoryRow, IdeaRecord, PersistenceStatus};
use crate::parser::parse_ideas;
use crate::prompt::build_prompt;
use crate::sink::{resolve_sink, RecordSink};

/// Everything the presentation layer needs after a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct PlanOutcome {
    pub request_id: Uuid,
    pub request: GenerationRequest,
    pub ideas: Vec<IdeaRecord>,
    pub raw: String,
    pub persistence: PersistenceStatus,
    pub export: PlanExport,
}

#[derive(Clone)]
pub struct PlanPipeline {
    generator: Arc<dyn IdeaGenerator>,
    sink: Option<Arc<dyn RecordSink>>,
}

impl PlanPipeline {
    pub fn new(generator: Arc<dyn IdeaGenerator>, sink: Option<Arc<dyn RecordSink>>) -> Self {
        Self { generator, sink }
    }

    /// Start-up wiring: the Gemini client is required, the Sheets sink is
    /// resolved once here and fixed for the life of the pipeline.
    pub fn from_config(config: &PostplanConfig) -> Result<Self, PostplanError> {
        let generator = create_generator(&config.generation)?;
        let sink = resolve_sink(&config.sheets);
        Ok(Self::new(generator, sink))
    }

    pub fn sink_enabled(&self) -> bool {
        self.sink.is_some()
    }

    pub fn generator_name(&self) -> &str {
        self.generator.name()
    }

    pub async fn run(&self, topic: &str, count: u8) -> Result<PlanOutcome, PlanError> {
        let request = GenerationRequest::new(topic, count)?;
        let request_id = Uuid::new_v4();

        let span = tracing::info_span!(
            "plan",
            %request_id,
            topic = %request.topic(),
            count = request.count()
        );

        self.run_validated(request_id, request).instrument(span).await
    }

    async fn run_validated(
        &self,
        request_id: Uuid,
        request: GenerationRequest,
    ) -> Result<PlanOutcome, PlanError> {
        let prompt = build_prompt(request.topic(), request.count());

        let raw = match self.generator.generate(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(error = %e, generator = self.generator.name(), "Generation failed");
                return Err(PlanError::Generation(e));
            }
        };

        let ideas = parse_ideas(&raw, usize::from(request.count()));
        tracing::info!(ideas = ideas.len(), "Parsed generated plan");

        let persistence = self.persist(&request, &raw).await;
        let export = PlanExport::new(request.topic(), &raw);

        Ok(PlanOutcome {
            request_id,
            request,
            ideas,
            raw,
            persistence,
            export,
        })
    }

    async fn persist(&self, request: &GenerationRequest, raw: &str) -> PersistenceStatus {
        let Some(sink) = &self.sink else {
            return PersistenceStatus::Disabled;
        };

        let row = HistoryRow::new(chrono::Local::now().naive_local(), request.topic(), raw);
        match sink.append(&row).await {
            Ok(()) => {
                tracing::info!(sink = sink.name(), "Plan saved");
                PersistenceStatus::Saved
            }
            Err(e) => {
                tracing::warn!(error = %e, sink = sink.name(), "Auto-save failed");
                PersistenceStatus::Failed {
                    message: e.to_string(),
                }
            }
        }
    }
}
