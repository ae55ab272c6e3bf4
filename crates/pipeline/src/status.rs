//! Status Reporter: read-only readiness checks for polling clients.

use std::sync::Arc;
use std::time::Duration;

use promptlab_core::error::CoreError;
use promptlab_core::readiness::{
    classify_stall, is_evaluation_ready, is_output_ready, next_poll_delay, ReadinessStatus,
    StallKind,
};
use promptlab_core::types::DbId;
use serde::Serialize;

use crate::error::PipelineError;
use crate::store::PromptStore;
use crate::tasks::TaskRegistry;

/// Readiness plus polling guidance for attempt `attempt`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub evaluation: bool,
    pub output: bool,
    pub complete: bool,
    /// A pipeline run for this prompt is still in flight.
    pub processing: bool,
    /// Suggested wait before the next poll; absent once complete or stalled.
    pub next_poll_ms: Option<u64>,
    /// Set once the poll budget is exhausted without completion.
    pub stalled: Option<StallKind>,
}

pub struct StatusReporter {
    store: Arc<dyn PromptStore>,
    tasks: Arc<TaskRegistry>,
}

impl StatusReporter {
    pub fn new(store: Arc<dyn PromptStore>, tasks: Arc<TaskRegistry>) -> Self {
        Self { store, tasks }
    }

    /// Whether evaluation and output are meaningfully present.
    pub async fn status(&self, prompt_id: DbId) -> Result<ReadinessStatus, PipelineError> {
        let state = self.store.processing_state(prompt_id).await?;
        Ok(ReadinessStatus {
            evaluation: is_evaluation_ready(state.scores.as_ref()),
            output: is_output_ready(state.output_text.as_deref()),
        })
    }

    /// [`status`](Self::status) for an existing prompt, with the poll
    /// schedule and stall classification for a 0-based `attempt`.
    pub async fn report(&self, prompt_id: DbId, attempt: u32) -> Result<StatusReport, PipelineError> {
        if self.store.find_prompt(prompt_id).await?.is_none() {
            return Err(CoreError::prompt_not_found(prompt_id).into());
        }

        let status = self.status(prompt_id).await?;
        let processing = self.tasks.in_flight(prompt_id);
        let stalled = classify_stall(status, attempt, processing);
        let next_poll_ms = (!status.is_complete() && stalled.is_none())
            .then(|| duration_ms(next_poll_delay(attempt)));

        Ok(StatusReport {
            evaluation: status.evaluation,
            output: status.output,
            complete: status.is_complete(),
            processing,
            next_poll_ms,
            stalled,
        })
    }
}

fn duration_ms(d: Duration) -> u64 {
    d.as_millis() as u64
}
