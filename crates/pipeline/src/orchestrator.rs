//! Pipeline Orchestrator: runs scoring and output generation for one
//! prompt revision in the background and persists what they produce.
//!
//! `submit` returns immediately. The run spawns the two sections as
//! separate tasks, each under its own outer timeout, and joins them; a
//! panic, timeout or write failure in one section never affects the other.
//! Every write carries the revision's version number as its generation so
//! results of superseded runs are discarded by the store.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use promptlab_core::revision::FIRST_VERSION;
use promptlab_core::types::DbId;
use tokio::task::JoinHandle;

use crate::output::OutputGenerator;
use crate::scoring::ScoringEngine;
use crate::store::PromptStore;
use crate::tasks::{RunOutcome, SectionOutcome, TaskId, TaskRegistry};

/// Outer timeout around scoring plus its write.
pub const SCORING_TIMEOUT: Duration = Duration::from_secs(60);

/// Outer timeout around output generation plus its write.
pub const OUTPUT_TIMEOUT: Duration = Duration::from_secs(75);

/// Per-section outer timeouts.
#[derive(Debug, Clone, Copy)]
pub struct PipelineTimeouts {
    pub scoring: Duration,
    pub output: Duration,
}

impl Default for PipelineTimeouts {
    fn default() -> Self {
        Self {
            scoring: SCORING_TIMEOUT,
            output: OUTPUT_TIMEOUT,
        }
    }
}

/// One unit of pipeline work.
#[derive(Debug, Clone)]
pub struct ProcessRequest {
    pub prompt_id: DbId,
    pub text: String,
    /// Replace existing result rows (new version, reprocess) instead of
    /// only inserting missing ones (create, fork).
    pub replace_existing: bool,
    /// Version whose score is updated. Defaults to version 1.
    pub version_number: Option<i32>,
}

impl ProcessRequest {
    /// Generation stamped on every write of this run.
    pub fn generation(&self) -> i32 {
        self.version_number.unwrap_or(FIRST_VERSION)
    }
}

pub struct Orchestrator {
    store: Arc<dyn PromptStore>,
    scoring: Arc<ScoringEngine>,
    output: Arc<OutputGenerator>,
    tasks: Arc<TaskRegistry>,
    timeouts: PipelineTimeouts,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn PromptStore>,
        scoring: Arc<ScoringEngine>,
        output: Arc<OutputGenerator>,
        tasks: Arc<TaskRegistry>,
    ) -> Self {
        Self {
            store,
            scoring,
            output,
            tasks,
            timeouts: PipelineTimeouts::default(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: PipelineTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn tasks(&self) -> &Arc<TaskRegistry> {
        &self.tasks
    }

    pub fn scoring(&self) -> &Arc<ScoringEngine> {
        &self.scoring
    }

    /// Fire-and-forget submission. The returned id identifies the task in
    /// the registry.
    pub fn submit(self: &Arc<Self>, request: ProcessRequest) -> TaskId {
        let task_id = self.tasks.submit(request.prompt_id, request.generation());
        tracing::info!(
            task_id,
            prompt_id = %request.prompt_id,
            generation = request.generation(),
            replace_existing = request.replace_existing,
            "Pipeline run submitted",
        );

        let this = Arc::clone(self);
        self.tasks.tracker().spawn(async move {
            this.tasks.mark_running(task_id);
            let outcome = this.run(&request).await;
            this.log_outcome(task_id, &request, &outcome);
            this.tasks.settle(task_id, outcome);
        });
        task_id
    }

    /// Run both sections to completion and report what happened.
    pub async fn run(&self, request: &ProcessRequest) -> RunOutcome {
        let prompt_id = request.prompt_id;
        let generation = request.generation();
        let replace = request.replace_existing;

        let scoring_handle = {
            let store = Arc::clone(&self.store);
            let scoring = Arc::clone(&self.scoring);
            let text = request.text.clone();
            self.spawn_section(self.timeouts.scoring, async move {
                let evaluation = scoring.evaluate(&text).await;
                store
                    .record_evaluation(prompt_id, generation, &evaluation, replace)
                    .await
            })
        };

        let output_handle = {
            let store = Arc::clone(&self.store);
            let output = Arc::clone(&self.output);
            let text = request.text.clone();
            self.spawn_section(self.timeouts.output, async move {
                let output_text = output.generate(&text).await;
                store
                    .record_output(prompt_id, generation, &output_text, replace)
                    .await
            })
        };

        let cancel = self.tasks.cancellation_token();
        let scoring_abort = scoring_handle.abort_handle();
        let output_abort = output_handle.abort_handle();

        tokio::select! {
            (evaluation, output) = async {
                tokio::join!(settle_section(scoring_handle), settle_section(output_handle))
            } => RunOutcome { evaluation, output },
            _ = cancel.cancelled() => {
                scoring_abort.abort();
                output_abort.abort();
                RunOutcome {
                    evaluation: SectionOutcome::Cancelled,
                    output: SectionOutcome::Cancelled,
                }
            }
        }
    }

    fn spawn_section<F, E>(&self, limit: Duration, work: F) -> JoinHandle<SectionOutcome>
    where
        F: Future<Output = Result<bool, E>> + Send + 'static,
        E: std::fmt::Display,
    {
        self.tasks.tracker().spawn(async move {
            match tokio::time::timeout(limit, work).await {
                Ok(Ok(true)) => SectionOutcome::Saved,
                Ok(Ok(false)) => SectionOutcome::Discarded,
                Ok(Err(e)) => SectionOutcome::Failed(e.to_string()),
                Err(_) => SectionOutcome::TimedOut,
            }
        })
    }

    fn log_outcome(&self, task_id: TaskId, request: &ProcessRequest, outcome: &RunOutcome) {
        for (section, result) in [("evaluation", &outcome.evaluation), ("output", &outcome.output)] {
            match result {
                SectionOutcome::Saved => tracing::debug!(
                    task_id,
                    prompt_id = %request.prompt_id,
                    section,
                    "Section saved",
                ),
                SectionOutcome::Discarded => tracing::info!(
                    task_id,
                    prompt_id = %request.prompt_id,
                    generation = request.generation(),
                    section,
                    "Section result discarded (superseded or already present)",
                ),
                SectionOutcome::TimedOut => tracing::warn!(
                    task_id,
                    prompt_id = %request.prompt_id,
                    section,
                    "Section timed out",
                ),
                SectionOutcome::Failed(error) => tracing::error!(
                    task_id,
                    prompt_id = %request.prompt_id,
                    section,
                    error = %error,
                    "Section failed to persist",
                ),
                SectionOutcome::Panicked => tracing::error!(
                    task_id,
                    prompt_id = %request.prompt_id,
                    section,
                    "Section task panicked",
                ),
                SectionOutcome::Cancelled => tracing::warn!(
                    task_id,
                    prompt_id = %request.prompt_id,
                    section,
                    "Section cancelled by shutdown",
                ),
            }
        }
        tracing::info!(
            task_id,
            prompt_id = %request.prompt_id,
            evaluation_ok = outcome.evaluation.is_success(),
            output_ok = outcome.output.is_success(),
            "Pipeline run settled",
        );
    }
}

async fn settle_section(handle: JoinHandle<SectionOutcome>) -> SectionOutcome {
    match handle.await {
        Ok(outcome) => outcome,
        Err(e) if e.is_panic() => SectionOutcome::Panicked,
        Err(_) => SectionOutcome::Cancelled,
    }
}
