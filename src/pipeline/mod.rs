//! Per-image analysis pipeline.
//!
//! Runs the fixed stage sequence for one image: classification, then a
//! consistency check grounded on the classification, then free-text PII
//! extraction, then structured PII extraction grounded on the free text.
//! Stage calls are the only suspension points; parallelism is applied
//! across images by the service layer, never within one image.

pub mod parse;
pub mod stage;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::llm::{CompletionBackend, LlmError};
use crate::models::{ImageRecord, ImageUnit, StageResults};
use parse::ParseOutcome;
use stage::Stage;

/// A fatal per-image failure. Parsing problems never produce one of
/// these; only a failed model call for a required stage does.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: LlmError,
    },
}

impl PipelineError {
    fn stage(stage: Stage, source: LlmError) -> Self {
        Self::Stage {
            stage: stage.name(),
            source,
        }
    }
}

/// Executes the stage sequence for single images against a completion
/// backend. Stateless; one instance can serve many images.
pub struct ImagePipeline<'a> {
    backend: &'a dyn CompletionBackend,
}

impl<'a> ImagePipeline<'a> {
    pub fn new(backend: &'a dyn CompletionBackend) -> Self {
        Self { backend }
    }

    /// Analyze one image, producing a complete record or a typed
    /// failure. A returned record always has every stage populated;
    /// the PII narrative may be empty if its call failed.
    pub async fn analyze(&self, image: &ImageUnit) -> Result<ImageRecord, PipelineError> {
        let vision = Some((image.bytes.as_slice(), image.format));

        let classification_text = self
            .backend
            .complete(stage::CLASSIFICATION_PROMPT, None, vision)
            .await
            .map_err(|e| PipelineError::stage(Stage::Classification, e))?;
        let classification = parse::parse_classification(&classification_text);

        let error_check_text = self
            .backend
            .complete(stage::ERROR_CHECK_PROMPT, Some(&classification_text), vision)
            .await
            .map_err(|e| PipelineError::stage(Stage::ErrorCheck, e))?;
        let error_check = parse::parse_error_check(&error_check_text);

        // Best-effort stage: a failure degrades to an empty narrative
        // and the structured extraction runs ungrounded.
        let pii_narrative = match self
            .backend
            .complete(stage::PII_NARRATIVE_PROMPT, None, vision)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!("PII narrative stage failed for {}: {}", image.id, e);
                String::new()
            }
        };

        let grounding = (!pii_narrative.is_empty()).then_some(pii_narrative.as_str());
        let structured_text = self
            .backend
            .complete(stage::PII_STRUCTURED_PROMPT, grounding, vision)
            .await
            .map_err(|e| PipelineError::stage(Stage::PiiStructured, e))?;
        let (identification, outcome) = parse::parse_identification(&structured_text);
        if outcome != ParseOutcome::Parsed {
            debug!(
                "Structured extraction for {} parsed {:?}",
                image.id, outcome
            );
        }

        Ok(ImageRecord {
            id: image.id.clone(),
            filename: image.path.display().to_string(),
            timestamp: Utc::now(),
            results: StageResults {
                classification,
                error_check,
                pii_narrative,
                identification: serde_json::to_string(&identification)
                    .unwrap_or_else(|_| "{}".to_string()),
            },
        })
    }
}
