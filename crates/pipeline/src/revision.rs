//! Revision Manager: the create, fork/improve, new-version and copy flows.
//!
//! Each flow validates its input and writes the prompt/version rows
//! synchronously, so the caller gets an id right away, then hands the text
//! to the [`Orchestrator`] without waiting. Copies (and forks that change
//! nothing) clone the source's results instead, unless the source has no
//! complete results to clone.

use std::sync::Arc;

use promptlab_core::classifier::transform_intent;
use promptlab_core::error::CoreError;
use promptlab_core::readiness::{is_evaluation_ready, is_output_ready};
use promptlab_core::revision::{
    derive_title, derived_copy_title, effective_action, is_simple_copy, validate_description,
    validate_improvement_input, validate_prompt_text, validate_title, CreateMode, ForkAction,
    ForkFacts, RevisionKind, FIRST_VERSION,
};
use promptlab_core::types::DbId;
use promptlab_db::models::prompt::{CreatePrompt, Prompt};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::orchestrator::{Orchestrator, ProcessRequest};
use crate::rewrite::{RewriteOutcome, Rewriter};
use crate::store::PromptStore;

const MSG_PROCESSING: &str = "Prompt saved. Evaluation and sample output are being generated.";
const MSG_CLONED: &str = "Prompt copied with its existing evaluation and output.";
const MSG_CLONE_FALLBACK: &str =
    "Prompt copied. Its evaluation could not be copied and is being regenerated.";
const MSG_SOURCE_PENDING: &str =
    "Prompt copied. The original is still being processed, so results are being generated.";
const MSG_REPROCESS: &str = "Processing restarted.";

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct CreateRevision {
    #[serde(default)]
    pub mode: CreateMode,
    /// Free-form intent in `create` mode, the prompt text in `evaluate` mode.
    pub text: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub industry: Option<String>,
    #[serde(default)]
    pub is_public: bool,
}

/// Improvement intent shared by fork and new version.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Improvement {
    /// Ask for an LLM rewrite even without notes or suggestions.
    #[serde(default)]
    pub improve: bool,
    pub notes: Option<String>,
    #[serde(default)]
    pub applied_suggestions: Vec<String>,
}

impl Improvement {
    fn requested(&self) -> bool {
        self.improve
            || self.notes.as_deref().is_some_and(|n| !n.trim().is_empty())
            || !self.applied_suggestions.is_empty()
    }

    fn validate(&self) -> Result<(), CoreError> {
        validate_improvement_input(self.notes.as_deref(), &self.applied_suggestions)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ForkRevision {
    #[serde(default)]
    pub action: ForkAction,
    /// Edited text. Absent means the source text unchanged.
    pub prompt_text: Option<String>,
    pub title: Option<String>,
    pub is_public: Option<bool>,
    #[serde(flatten)]
    pub improvement: Improvement,
    /// `Some(false)` forces full processing; see [`is_simple_copy`].
    pub no_changes: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VersionRevision {
    /// New text. Absent means re-submitting the current text for improvement.
    pub prompt_text: Option<String>,
    #[serde(flatten)]
    pub improvement: Improvement,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CopyRevision {
    pub title: Option<String>,
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// Synchronous acknowledgement of a revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevisionOutcome {
    pub prompt_id: DbId,
    pub kind: RevisionKind,
    pub message: String,
    pub version_number: i32,
    /// A pipeline run was submitted; poll the status endpoint.
    pub processing: bool,
    /// The published text is an accepted LLM rewrite.
    pub rewritten: bool,
}

// ---------------------------------------------------------------------------
// Manager
// ---------------------------------------------------------------------------

pub struct RevisionManager {
    store: Arc<dyn PromptStore>,
    orchestrator: Arc<Orchestrator>,
    rewriter: Arc<Rewriter>,
}

impl RevisionManager {
    pub fn new(
        store: Arc<dyn PromptStore>,
        orchestrator: Arc<Orchestrator>,
        rewriter: Arc<Rewriter>,
    ) -> Self {
        Self {
            store,
            orchestrator,
            rewriter,
        }
    }

    /// Create a new prompt, from intent (`create`) or verbatim (`evaluate`).
    pub async fn create(
        &self,
        actor: Option<DbId>,
        input: CreateRevision,
    ) -> Result<RevisionOutcome, PipelineError> {
        validate_prompt_text(&input.text)?;
        if let Some(description) = &input.description {
            validate_description(description)?;
        }

        // Titles come from what the user typed, never from a template heading.
        let title = resolve_title(input.title, || derive_title(&input.text))?;
        let (prompt_text, industry) = match input.mode {
            CreateMode::Create => {
                let (category, text) = transform_intent(&input.text);
                let industry = input
                    .industry
                    .unwrap_or_else(|| category.industry_tag().to_string());
                (text, Some(industry))
            }
            CreateMode::Evaluate => (input.text, input.industry),
        };

        let create = CreatePrompt {
            title,
            description: input.description,
            industry,
            prompt_text,
            is_public: input.is_public,
            owner_id: actor,
            score: 0,
            forked_from_id: None,
        };
        self.insert_and_process(create, RevisionKind::Create, false).await
    }

    /// Fork (and optionally improve) a prompt. An owner asking for a new
    /// version is routed to [`new_version`](Self::new_version).
    pub async fn fork(
        &self,
        actor: DbId,
        source_id: DbId,
        input: ForkRevision,
    ) -> Result<RevisionOutcome, PipelineError> {
        let source = self.load_visible(source_id, Some(actor)).await?;
        let is_owner = source.is_owned_by(Some(actor));

        if effective_action(input.action, is_owner) == ForkAction::Version {
            let version = VersionRevision {
                prompt_text: input.prompt_text,
                improvement: input.improvement,
            };
            return self.new_version(actor, source_id, version).await;
        }

        let new_text = input
            .prompt_text
            .unwrap_or_else(|| source.prompt_text.clone());
        validate_prompt_text(&new_text)?;
        input.improvement.validate()?;
        let title = resolve_title(input.title, || {
            derived_copy_title(&source.title, RevisionKind::Fork)
        })?;
        let is_public = input.is_public.unwrap_or(source.is_public);

        let facts = ForkFacts {
            is_owner,
            action: ForkAction::Fork,
            improve: input.improvement.improve,
            notes: input.improvement.notes.as_deref(),
            applied_suggestions: &input.improvement.applied_suggestions,
            original_text: &source.prompt_text,
            new_text: &new_text,
            no_changes: input.no_changes,
        };
        if is_simple_copy(&facts) {
            tracing::info!(source_id = %source.id, "Fork is a simple copy, cloning results");
            return self
                .clone_or_reprocess(&source, actor, RevisionKind::Fork, title, is_public)
                .await;
        }

        let rewrite = self.maybe_rewrite(&new_text, &input.improvement).await;
        let create = CreatePrompt {
            title,
            description: source.description.clone(),
            industry: source.industry.clone(),
            prompt_text: rewrite.text,
            is_public,
            owner_id: Some(actor),
            score: 0,
            forked_from_id: Some(source.id),
        };
        let mut outcome = self
            .insert_and_process(create, RevisionKind::Fork, false)
            .await?;
        outcome.rewritten = rewrite.rewritten;
        Ok(outcome)
    }

    /// Owner-only: replace the text of a prompt with the next version.
    pub async fn new_version(
        &self,
        actor: DbId,
        prompt_id: DbId,
        input: VersionRevision,
    ) -> Result<RevisionOutcome, PipelineError> {
        let prompt = self.load_owned(prompt_id, actor).await?;
        let text = input
            .prompt_text
            .unwrap_or_else(|| prompt.prompt_text.clone());
        validate_prompt_text(&text)?;
        input.improvement.validate()?;

        let rewrite = self.maybe_rewrite(&text, &input.improvement).await;
        let version = self
            .store
            .begin_new_version(prompt_id, &rewrite.text)
            .await?
            .ok_or_else(|| CoreError::prompt_not_found(prompt_id))?;

        tracing::info!(
            prompt_id = %prompt_id,
            version_number = version.version_number,
            "New prompt version created",
        );
        self.orchestrator.submit(ProcessRequest {
            prompt_id,
            text: rewrite.text,
            replace_existing: true,
            version_number: Some(version.version_number),
        });

        Ok(RevisionOutcome {
            prompt_id,
            kind: RevisionKind::Version,
            message: MSG_PROCESSING.to_string(),
            version_number: version.version_number,
            processing: true,
            rewritten: rewrite.rewritten,
        })
    }

    /// Private duplicate with the source's results. Never re-scores.
    pub async fn copy(
        &self,
        actor: DbId,
        source_id: DbId,
        input: CopyRevision,
    ) -> Result<RevisionOutcome, PipelineError> {
        let source = self.load_visible(source_id, Some(actor)).await?;
        let title = resolve_title(input.title, || {
            derived_copy_title(&source.title, RevisionKind::Copy)
        })?;
        self.clone_or_reprocess(&source, actor, RevisionKind::Copy, title, false)
            .await
    }

    /// Owner-only: re-run the pipeline for the current text, replacing
    /// existing results.
    pub async fn reprocess(
        &self,
        actor: DbId,
        prompt_id: DbId,
    ) -> Result<RevisionOutcome, PipelineError> {
        let prompt = self.load_owned(prompt_id, actor).await?;
        let version_number = self
            .store
            .latest_version_number(prompt_id)
            .await?
            .unwrap_or(FIRST_VERSION);

        self.orchestrator.submit(ProcessRequest {
            prompt_id,
            text: prompt.prompt_text,
            replace_existing: true,
            version_number: Some(version_number),
        });

        Ok(RevisionOutcome {
            prompt_id,
            kind: RevisionKind::Version,
            message: MSG_REPROCESS.to_string(),
            version_number,
            processing: true,
            rewritten: false,
        })
    }

    // ---- private helpers ----

    async fn load_visible(&self, id: DbId, actor: Option<DbId>) -> Result<Prompt, PipelineError> {
        match self.store.find_prompt(id).await? {
            Some(prompt) if prompt.is_visible_to(actor) => Ok(prompt),
            _ => Err(CoreError::prompt_not_found(id).into()),
        }
    }

    async fn load_owned(&self, id: DbId, actor: DbId) -> Result<Prompt, PipelineError> {
        let prompt = self.load_visible(id, Some(actor)).await?;
        if !prompt.is_owned_by(Some(actor)) {
            return Err(CoreError::Forbidden("Only the owner can modify this prompt".to_string()).into());
        }
        Ok(prompt)
    }

    async fn maybe_rewrite(&self, text: &str, improvement: &Improvement) -> RewriteOutcome {
        if !improvement.requested() {
            return RewriteOutcome {
                text: text.to_string(),
                rewritten: false,
            };
        }
        self.rewriter
            .improve(
                self.orchestrator.scoring(),
                text,
                improvement.notes.as_deref(),
                &improvement.applied_suggestions,
            )
            .await
    }

    async fn insert_and_process(
        &self,
        create: CreatePrompt,
        kind: RevisionKind,
        replace_existing: bool,
    ) -> Result<RevisionOutcome, PipelineError> {
        let (prompt, version) = self.store.create_prompt(&create).await?;
        tracing::info!(prompt_id = %prompt.id, kind = ?kind, "Prompt created");

        self.orchestrator.submit(ProcessRequest {
            prompt_id: prompt.id,
            text: prompt.prompt_text,
            replace_existing,
            version_number: Some(version.version_number),
        });

        Ok(RevisionOutcome {
            prompt_id: prompt.id,
            kind,
            message: MSG_PROCESSING.to_string(),
            version_number: version.version_number,
            processing: true,
            rewritten: false,
        })
    }

    /// Clone `source` with its results. If the source has no complete
    /// results yet, or the clone fails, create a plain prompt with the same
    /// text and let the orchestrator score it.
    async fn clone_or_reprocess(
        &self,
        source: &Prompt,
        actor: DbId,
        kind: RevisionKind,
        title: String,
        is_public: bool,
    ) -> Result<RevisionOutcome, PipelineError> {
        let mut create = CreatePrompt {
            title,
            description: source.description.clone(),
            industry: source.industry.clone(),
            prompt_text: source.prompt_text.clone(),
            is_public,
            owner_id: Some(actor),
            score: source.score,
            forked_from_id: Some(source.id),
        };

        let state = self.store.processing_state(source.id).await?;
        if !is_evaluation_ready(state.scores.as_ref())
            || !is_output_ready(state.output_text.as_deref())
        {
            tracing::info!(
                source_id = %source.id,
                "Source results not ready, processing the copy instead of cloning",
            );
            create.score = 0;
            let mut outcome = self.insert_and_process(create, kind, false).await?;
            outcome.message = MSG_SOURCE_PENDING.to_string();
            return Ok(outcome);
        }

        match self.store.clone_prompt(source.id, &create).await {
            Ok((prompt, version)) => {
                tracing::info!(
                    source_id = %source.id,
                    prompt_id = %prompt.id,
                    kind = ?kind,
                    "Prompt cloned",
                );
                Ok(RevisionOutcome {
                    prompt_id: prompt.id,
                    kind,
                    message: MSG_CLONED.to_string(),
                    version_number: version.version_number,
                    processing: false,
                    rewritten: false,
                })
            }
            Err(e) => {
                tracing::warn!(
                    source_id = %source.id,
                    error = %e,
                    "Clone failed, falling back to full processing",
                );
                create.score = 0;
                let mut outcome = self.insert_and_process(create, kind, false).await?;
                outcome.message = MSG_CLONE_FALLBACK.to_string();
                Ok(outcome)
            }
        }
    }
}

/// Use the caller's title if given (validated), else the derived one.
fn resolve_title(
    requested: Option<String>,
    derive: impl FnOnce() -> String,
) -> Result<String, CoreError> {
    match requested {
        Some(title) => {
            validate_title(&title)?;
            Ok(title.trim().to_string())
        }
        None => Ok(derive()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use assert_matches::assert_matches;
    use promptlab_core::classifier::PromptCategory;
    use promptlab_core::readiness::ReadinessStatus;
    use promptlab_core::scoring::heuristic_evaluate;
    use promptlab_llm::{LlmBackend, LlmConfig};
    use uuid::Uuid;

    use super::*;
    use crate::output::OutputGenerator;
    use crate::scoring::ScoringEngine;
    use crate::status::StatusReporter;
    use crate::tasks::TaskRegistry;
    use crate::testing::{MemoryStore, ScriptedBackend};

    const STRONG: &str =
        "# Identity\nYou are a poet.\n\n# Instructions\n* Rhyme\n* Four lines\n\nDo not use cliches.";

    struct Fixture {
        store: Arc<MemoryStore>,
        backend: Arc<ScriptedBackend>,
        tasks: Arc<TaskRegistry>,
        manager: RevisionManager,
    }

    impl Fixture {
        fn new(backend: ScriptedBackend) -> Self {
            let store = Arc::new(MemoryStore::default());
            let backend = Arc::new(backend);
            let llm: Arc<dyn LlmBackend> = backend.clone();
            let config = LlmConfig::default();
            let tasks = Arc::new(TaskRegistry::new());
            let orchestrator = Arc::new(Orchestrator::new(
                store.clone(),
                Arc::new(ScoringEngine::new(Some(llm.clone()), &config)),
                Arc::new(OutputGenerator::new(Some(llm.clone()), &config)),
                tasks.clone(),
            ));
            let manager = RevisionManager::new(
                store.clone(),
                orchestrator,
                Arc::new(Rewriter::new(Some(llm), &config)),
            );
            Self {
                store,
                backend,
                tasks,
                manager,
            }
        }

        fn llm_calls(&self) -> usize {
            self.backend.calls.load(Ordering::SeqCst)
        }

        async fn status(&self, id: DbId) -> ReadinessStatus {
            StatusReporter::new(self.store.clone(), self.tasks.clone())
                .status(id)
                .await
                .unwrap()
        }

        /// Seed an owned, fully processed prompt.
        async fn processed_prompt(&self, owner: DbId, text: &str) -> Prompt {
            let prompt = self.store.seed_prompt(text, Some(owner)).await;
            self.store
                .record_evaluation(prompt.id, 1, &heuristic_evaluate(text), false)
                .await
                .unwrap();
            self.store
                .record_output(prompt.id, 1, "sample output", false)
                .await
                .unwrap();
            self.store.prompt(prompt.id).await.unwrap()
        }
    }

    fn evaluate(text: &str) -> CreateRevision {
        CreateRevision {
            mode: CreateMode::Evaluate,
            text: text.to_string(),
            title: None,
            description: None,
            industry: None,
            is_public: true,
        }
    }

    // -- create --

    #[tokio::test]
    async fn create_returns_id_and_processes_in_background() {
        let fx = Fixture::new(ScriptedBackend::failing());
        let outcome = fx.manager.create(None, evaluate("hi")).await.unwrap();

        assert_eq!(outcome.kind, RevisionKind::Create);
        assert_eq!(outcome.version_number, 1);
        assert!(outcome.processing);
        let prompt = fx.store.prompt(outcome.prompt_id).await.unwrap();
        assert_eq!(prompt.prompt_text, "hi");
        assert_eq!(prompt.title, "hi");

        fx.tasks.shutdown(Duration::from_secs(5)).await;
        assert!(fx.status(outcome.prompt_id).await.is_complete());
        assert_eq!(fx.store.prompt_score(outcome.prompt_id).await, Some(71));
    }

    #[tokio::test]
    async fn create_mode_transforms_intent() {
        let fx = Fixture::new(ScriptedBackend::hanging());
        let input = CreateRevision {
            mode: CreateMode::Create,
            ..evaluate("write a blog post about composting")
        };
        let outcome = fx.manager.create(None, input).await.unwrap();

        let prompt = fx.store.prompt(outcome.prompt_id).await.unwrap();
        assert!(prompt.prompt_text.starts_with("# Identity"));
        assert!(prompt.prompt_text.contains("write a blog post about composting"));
        assert_eq!(prompt.title, "write a blog post about composting");
        assert_eq!(
            prompt.industry.as_deref(),
            Some(PromptCategory::Content.industry_tag())
        );
        fx.tasks.shutdown(Duration::from_millis(10)).await;
    }

    #[tokio::test]
    async fn create_rejects_blank_text() {
        let fx = Fixture::new(ScriptedBackend::failing());
        assert_matches!(
            fx.manager.create(None, evaluate("   ")).await,
            Err(PipelineError::Core(CoreError::Validation(_)))
        );
        assert_eq!(fx.store.prompt_count().await, 0);
    }

    // -- fork --

    #[tokio::test]
    async fn unchanged_fork_clones_without_calling_engines() {
        let fx = Fixture::new(ScriptedBackend::failing());
        let (owner, forker) = (Uuid::new_v4(), Uuid::new_v4());
        let source = fx.processed_prompt(owner, "hi").await;

        let outcome = fx
            .manager
            .fork(forker, source.id, ForkRevision::default())
            .await
            .unwrap();

        assert!(!outcome.processing);
        assert_eq!(fx.llm_calls(), 0);
        assert_eq!(fx.tasks.active_count(), 0);
        assert!(fx.tasks.records_for(outcome.prompt_id).is_empty());

        let clone = fx.store.prompt(outcome.prompt_id).await.unwrap();
        assert_eq!(clone.score, source.score);
        assert_eq!(clone.owner_id, Some(forker));
        assert_eq!(clone.forked_from_id, Some(source.id));
        assert_eq!(fx.store.suggestions(clone.id).await, fx.store.suggestions(source.id).await);
        assert!(fx.status(clone.id).await.is_complete());
    }

    #[tokio::test]
    async fn edited_fork_is_processed_at_score_zero() {
        let fx = Fixture::new(ScriptedBackend::hanging());
        let (owner, forker) = (Uuid::new_v4(), Uuid::new_v4());
        let source = fx.processed_prompt(owner, "hi").await;

        let input = ForkRevision {
            prompt_text: Some("hi there".to_string()),
            ..Default::default()
        };
        let outcome = fx.manager.fork(forker, source.id, input).await.unwrap();

        assert_eq!(outcome.kind, RevisionKind::Fork);
        assert!(outcome.processing);
        let fork = fx.store.prompt(outcome.prompt_id).await.unwrap();
        assert_eq!(fork.score, 0);
        assert_eq!(fork.prompt_text, "hi there");
        assert!(fx.tasks.in_flight(fork.id));
        fx.tasks.shutdown(Duration::from_millis(10)).await;
    }

    #[tokio::test]
    async fn no_changes_flag_keeps_the_edited_text() {
        let fx = Fixture::new(ScriptedBackend::hanging());
        let (owner, forker) = (Uuid::new_v4(), Uuid::new_v4());
        let source = fx.processed_prompt(owner, "original text").await;

        let input = ForkRevision {
            prompt_text: Some("my edited text".to_string()),
            no_changes: Some(true),
            ..Default::default()
        };
        let outcome = fx.manager.fork(forker, source.id, input).await.unwrap();

        assert!(outcome.processing);
        let fork = fx.store.prompt(outcome.prompt_id).await.unwrap();
        assert_eq!(fork.prompt_text, "my edited text");
        fx.tasks.shutdown(Duration::from_millis(10)).await;
    }

    #[tokio::test]
    async fn improved_fork_publishes_better_rewrite() {
        let fx = Fixture::new(ScriptedBackend::replying(STRONG));
        let (owner, forker) = (Uuid::new_v4(), Uuid::new_v4());
        let source = fx.processed_prompt(owner, "write a poem").await;

        let input = ForkRevision {
            improvement: Improvement {
                notes: Some("make it structured".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let outcome = fx.manager.fork(forker, source.id, input).await.unwrap();

        assert!(outcome.rewritten);
        let fork = fx.store.prompt(outcome.prompt_id).await.unwrap();
        assert_eq!(fork.prompt_text, STRONG);
        fx.tasks.shutdown(Duration::from_secs(5)).await;
    }

    #[tokio::test]
    async fn non_owner_version_request_becomes_fork() {
        let fx = Fixture::new(ScriptedBackend::hanging());
        let (owner, other) = (Uuid::new_v4(), Uuid::new_v4());
        let source = fx.processed_prompt(owner, "hi").await;

        let input = ForkRevision {
            action: ForkAction::Version,
            prompt_text: Some("changed".to_string()),
            ..Default::default()
        };
        let outcome = fx.manager.fork(other, source.id, input).await.unwrap();

        assert_eq!(outcome.kind, RevisionKind::Fork);
        assert_ne!(outcome.prompt_id, source.id);
        assert_eq!(fx.store.version_numbers(source.id).await, vec![1]);
        fx.tasks.shutdown(Duration::from_millis(10)).await;
    }

    #[tokio::test]
    async fn private_prompt_cannot_be_forked_by_others() {
        let fx = Fixture::new(ScriptedBackend::failing());
        let owner = Uuid::new_v4();
        let source = fx
            .store
            .create_prompt(&CreatePrompt {
                title: "Private".to_string(),
                description: None,
                industry: None,
                prompt_text: "secret".to_string(),
                is_public: false,
                owner_id: Some(owner),
                score: 0,
                forked_from_id: None,
            })
            .await
            .unwrap()
            .0;

        assert_matches!(
            fx.manager.fork(Uuid::new_v4(), source.id, ForkRevision::default()).await,
            Err(PipelineError::Core(CoreError::NotFound { .. }))
        );
    }

    // -- new version --

    #[tokio::test]
    async fn new_version_zeroes_results_until_processed() {
        let fx = Fixture::new(ScriptedBackend::hanging());
        let owner = Uuid::new_v4();
        let prompt = fx.processed_prompt(owner, "v1").await;
        assert!(fx.status(prompt.id).await.is_complete());

        let input = VersionRevision {
            prompt_text: Some("v2".to_string()),
            ..Default::default()
        };
        let outcome = fx.manager.new_version(owner, prompt.id, input).await.unwrap();

        assert_eq!(outcome.kind, RevisionKind::Version);
        assert_eq!(outcome.version_number, 2);
        assert_eq!(fx.store.version_numbers(prompt.id).await, vec![1, 2]);
        assert_eq!(
            fx.status(prompt.id).await,
            ReadinessStatus { evaluation: false, output: false }
        );
        assert_eq!(fx.store.prompt_score(prompt.id).await, Some(0));
        assert!(fx.store.suggestions(prompt.id).await.is_empty());
        fx.tasks.shutdown(Duration::from_millis(10)).await;
    }

    #[tokio::test]
    async fn owner_fork_with_version_action_creates_version() {
        let fx = Fixture::new(ScriptedBackend::hanging());
        let owner = Uuid::new_v4();
        let prompt = fx.processed_prompt(owner, "v1").await;

        let input = ForkRevision {
            action: ForkAction::Version,
            prompt_text: Some("v2".to_string()),
            ..Default::default()
        };
        let outcome = fx.manager.fork(owner, prompt.id, input).await.unwrap();

        assert_eq!(outcome.prompt_id, prompt.id);
        assert_eq!(outcome.version_number, 2);
        fx.tasks.shutdown(Duration::from_millis(10)).await;
    }

    #[tokio::test]
    async fn versions_increase_by_one() {
        let fx = Fixture::new(ScriptedBackend::hanging());
        let owner = Uuid::new_v4();
        let prompt = fx.processed_prompt(owner, "v1").await;

        for n in 2..=4 {
            let input = VersionRevision {
                prompt_text: Some(format!("v{n}")),
                ..Default::default()
            };
            let outcome = fx.manager.new_version(owner, prompt.id, input).await.unwrap();
            assert_eq!(outcome.version_number, n);
        }
        assert_eq!(fx.store.version_numbers(prompt.id).await, vec![1, 2, 3, 4]);
        fx.tasks.shutdown(Duration::from_millis(10)).await;
    }

    #[tokio::test]
    async fn new_version_requires_owner() {
        let fx = Fixture::new(ScriptedBackend::failing());
        let prompt = fx.processed_prompt(Uuid::new_v4(), "v1").await;

        assert_matches!(
            fx.manager
                .new_version(Uuid::new_v4(), prompt.id, VersionRevision::default())
                .await,
            Err(PipelineError::Core(CoreError::Forbidden(_)))
        );
    }

    // -- copy --

    #[tokio::test]
    async fn copy_is_private_and_keeps_score() {
        let fx = Fixture::new(ScriptedBackend::failing());
        let (owner, copier) = (Uuid::new_v4(), Uuid::new_v4());
        let source = fx.processed_prompt(owner, "hi").await;

        let outcome = fx
            .manager
            .copy(copier, source.id, CopyRevision::default())
            .await
            .unwrap();

        assert_eq!(outcome.kind, RevisionKind::Copy);
        assert!(!outcome.processing);
        assert_eq!(fx.llm_calls(), 0);
        let copy = fx.store.prompt(outcome.prompt_id).await.unwrap();
        assert!(!copy.is_public);
        assert_eq!(copy.score, source.score);
        assert_eq!(copy.title, "Copy of Seeded");
    }

    #[tokio::test]
    async fn failed_clone_falls_back_to_processing() {
        let fx = Fixture::new(ScriptedBackend::failing());
        let (owner, copier) = (Uuid::new_v4(), Uuid::new_v4());
        let source = fx.processed_prompt(owner, "hi").await;
        fx.store.fail_clones();

        let outcome = fx
            .manager
            .copy(copier, source.id, CopyRevision::default())
            .await
            .unwrap();

        assert!(outcome.processing);
        assert_eq!(outcome.message, MSG_CLONE_FALLBACK);
        assert_eq!(fx.store.prompt_score(outcome.prompt_id).await, Some(0));
        fx.tasks.shutdown(Duration::from_secs(5)).await;
        assert!(fx.status(outcome.prompt_id).await.is_complete());
    }

    #[tokio::test]
    async fn unready_source_is_processed_instead_of_cloned() {
        let fx = Fixture::new(ScriptedBackend::failing());
        let (owner, forker) = (Uuid::new_v4(), Uuid::new_v4());
        let source = fx.store.seed_prompt("hi", Some(owner)).await;

        let outcome = fx
            .manager
            .fork(forker, source.id, ForkRevision::default())
            .await
            .unwrap();

        assert!(outcome.processing);
        assert_eq!(outcome.message, MSG_SOURCE_PENDING);
        assert_eq!(fx.store.prompt_score(outcome.prompt_id).await, Some(0));
        fx.tasks.shutdown(Duration::from_secs(5)).await;
        assert!(fx.status(outcome.prompt_id).await.is_complete());
    }

    #[tokio::test]
    async fn copy_of_version_in_progress_is_processed() {
        let fx = Fixture::new(ScriptedBackend::failing());
        let (owner, copier) = (Uuid::new_v4(), Uuid::new_v4());
        let source = fx.processed_prompt(owner, "v1").await;
        fx.store.begin_new_version(source.id, "v2").await.unwrap();

        let outcome = fx
            .manager
            .copy(copier, source.id, CopyRevision::default())
            .await
            .unwrap();

        assert!(outcome.processing);
        let copy = fx.store.prompt(outcome.prompt_id).await.unwrap();
        assert_eq!(copy.prompt_text, "v2");
        fx.tasks.shutdown(Duration::from_secs(5)).await;
        assert!(fx.status(copy.id).await.is_complete());
    }

    // -- reprocess --

    #[tokio::test]
    async fn reprocess_uses_latest_version() {
        let fx = Fixture::new(ScriptedBackend::failing());
        let owner = Uuid::new_v4();
        let prompt = fx.processed_prompt(owner, "v1").await;
        fx.store.begin_new_version(prompt.id, "v2").await.unwrap();

        let outcome = fx.manager.reprocess(owner, prompt.id).await.unwrap();
        assert_eq!(outcome.version_number, 2);

        fx.tasks.shutdown(Duration::from_secs(5)).await;
        assert!(fx.status(prompt.id).await.is_complete());
    }
}
