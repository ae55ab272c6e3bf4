//! Test doubles: a scripted LLM backend and an in-memory prompt store that
//! follows the same conflict rules as the PostgreSQL repositories.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use chrono::Utc;
use promptlab_core::revision::FIRST_VERSION;
use promptlab_core::scoring::{Evaluation, SubScores, Suggestion};
use promptlab_core::types::DbId;
use promptlab_db::models::prompt::{CreatePrompt, Prompt};
use promptlab_db::models::prompt_version::PromptVersion;
use promptlab_llm::{CompletionRequest, LlmBackend, LlmError};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::PipelineError;
use crate::store::{ProcessingState, PromptStore};

// ---------------------------------------------------------------------------
// LLM backend
// ---------------------------------------------------------------------------

enum Script {
    Reply(String),
    Fail,
    Hang,
}

pub struct ScriptedBackend {
    script: Script,
    pub calls: AtomicUsize,
    requests: StdMutex<Vec<CompletionRequest>>,
}

impl ScriptedBackend {
    fn with_script(script: Script) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
            requests: StdMutex::new(Vec::new()),
        }
    }

    pub fn replying(reply: &str) -> Self {
        Self::with_script(Script::Reply(reply.to_string()))
    }

    pub fn failing() -> Self {
        Self::with_script(Script::Fail)
    }

    pub fn hanging() -> Self {
        Self::with_script(Script::Hang)
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl LlmBackend for ScriptedBackend {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);
        match &self.script {
            Script::Reply(reply) => Ok(reply.clone()),
            Script::Fail => Err(LlmError::Api {
                status: 503,
                body: "unavailable".to_string(),
            }),
            Script::Hang => std::future::pending().await,
        }
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

// ---------------------------------------------------------------------------
// Prompt store
// ---------------------------------------------------------------------------

#[derive(Clone)]
struct StoredEvaluation {
    generation: i32,
    scores: SubScores,
}

#[derive(Clone)]
struct StoredOutput {
    generation: i32,
    text: Option<String>,
}

#[derive(Default)]
struct State {
    prompts: HashMap<DbId, Prompt>,
    versions: Vec<PromptVersion>,
    evaluations: HashMap<DbId, StoredEvaluation>,
    outputs: HashMap<DbId, StoredOutput>,
    suggestions: HashMap<DbId, Vec<Suggestion>>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    fail_output_writes: AtomicBool,
    fail_clones: AtomicBool,
}

impl MemoryStore {
    pub async fn seed_prompt(&self, text: &str, owner_id: Option<DbId>) -> Prompt {
        let input = CreatePrompt {
            title: "Seeded".to_string(),
            description: None,
            industry: None,
            prompt_text: text.to_string(),
            is_public: true,
            owner_id,
            score: 0,
            forked_from_id: None,
        };
        self.create_prompt(&input).await.unwrap().0
    }

    pub fn fail_output_writes(&self) {
        self.fail_output_writes.store(true, Ordering::SeqCst);
    }

    pub fn fail_clones(&self) {
        self.fail_clones.store(true, Ordering::SeqCst);
    }

    pub async fn prompt(&self, id: DbId) -> Option<Prompt> {
        self.state.lock().await.prompts.get(&id).cloned()
    }

    pub async fn prompt_score(&self, id: DbId) -> Option<i32> {
        self.prompt(id).await.map(|p| p.score)
    }

    pub async fn prompt_count(&self) -> usize {
        self.state.lock().await.prompts.len()
    }

    pub async fn version_numbers(&self, id: DbId) -> Vec<i32> {
        let state = self.state.lock().await;
        let mut numbers: Vec<i32> = state
            .versions
            .iter()
            .filter(|v| v.prompt_id == id)
            .map(|v| v.version_number)
            .collect();
        numbers.sort();
        numbers
    }

    pub async fn suggestions(&self, id: DbId) -> Vec<Suggestion> {
        self.state
            .lock()
            .await
            .suggestions
            .get(&id)
            .cloned()
            .unwrap_or_default()
    }

    fn insert(state: &mut State, input: &CreatePrompt) -> (Prompt, PromptVersion) {
        let now = Utc::now();
        let prompt = Prompt {
            id: Uuid::new_v4(),
            title: input.title.clone(),
            description: input.description.clone(),
            industry: input.industry.clone(),
            prompt_text: input.prompt_text.clone(),
            is_public: input.is_public,
            owner_id: input.owner_id,
            score: input.score,
            impressions: 0,
            generation: FIRST_VERSION,
            forked_from_id: input.forked_from_id,
            created_at: now,
            updated_at: now,
        };
        let version = PromptVersion {
            id: Uuid::new_v4(),
            prompt_id: prompt.id,
            version_number: FIRST_VERSION,
            prompt_text: input.prompt_text.clone(),
            score: input.score,
            created_at: now,
        };
        state.prompts.insert(prompt.id, prompt.clone());
        state.versions.push(version.clone());
        (prompt, version)
    }
}

#[async_trait]
impl PromptStore for MemoryStore {
    async fn find_prompt(&self, id: DbId) -> Result<Option<Prompt>, PipelineError> {
        Ok(self.prompt(id).await)
    }

    async fn create_prompt(
        &self,
        input: &CreatePrompt,
    ) -> Result<(Prompt, PromptVersion), PipelineError> {
        let mut state = self.state.lock().await;
        Ok(Self::insert(&mut state, input))
    }

    async fn clone_prompt(
        &self,
        source_id: DbId,
        input: &CreatePrompt,
    ) -> Result<(Prompt, PromptVersion), PipelineError> {
        if self.fail_clones.load(Ordering::SeqCst) {
            return Err(PipelineError::Database(sqlx::Error::PoolTimedOut));
        }
        let mut state = self.state.lock().await;
        let (prompt, version) = Self::insert(&mut state, input);
        if let Some(eval) = state.evaluations.get(&source_id).cloned() {
            state.evaluations.insert(
                prompt.id,
                StoredEvaluation {
                    generation: FIRST_VERSION,
                    ..eval
                },
            );
        }
        if let Some(output) = state.outputs.get(&source_id).cloned() {
            state.outputs.insert(
                prompt.id,
                StoredOutput {
                    generation: FIRST_VERSION,
                    ..output
                },
            );
        }
        if let Some(suggestions) = state.suggestions.get(&source_id).cloned() {
            state.suggestions.insert(prompt.id, suggestions);
        }
        Ok((prompt, version))
    }

    async fn begin_new_version(
        &self,
        id: DbId,
        prompt_text: &str,
    ) -> Result<Option<PromptVersion>, PipelineError> {
        let mut state = self.state.lock().await;
        if !state.prompts.contains_key(&id) {
            return Ok(None);
        }
        let next = state
            .versions
            .iter()
            .filter(|v| v.prompt_id == id)
            .map(|v| v.version_number)
            .max()
            .unwrap_or(0)
            + 1;

        if let Some(prompt) = state.prompts.get_mut(&id) {
            prompt.prompt_text = prompt_text.to_string();
            prompt.score = 0;
            prompt.generation = next;
        }
        let version = PromptVersion {
            id: Uuid::new_v4(),
            prompt_id: id,
            version_number: next,
            prompt_text: prompt_text.to_string(),
            score: 0,
            created_at: Utc::now(),
        };
        state.versions.push(version.clone());
        state.evaluations.insert(
            id,
            StoredEvaluation {
                generation: next,
                scores: SubScores::default(),
            },
        );
        state.outputs.insert(
            id,
            StoredOutput {
                generation: next,
                text: Some(String::new()),
            },
        );
        state.suggestions.remove(&id);
        Ok(Some(version))
    }

    async fn latest_version_number(&self, id: DbId) -> Result<Option<i32>, PipelineError> {
        let state = self.state.lock().await;
        Ok(state
            .versions
            .iter()
            .filter(|v| v.prompt_id == id)
            .map(|v| v.version_number)
            .max())
    }

    async fn record_evaluation(
        &self,
        prompt_id: DbId,
        generation: i32,
        evaluation: &Evaluation,
        replace_existing: bool,
    ) -> Result<bool, PipelineError> {
        let mut state = self.state.lock().await;
        let applies = match state.evaluations.get(&prompt_id) {
            None => true,
            Some(existing) => replace_existing && existing.generation <= generation,
        };
        if !applies {
            return Ok(false);
        }

        state.evaluations.insert(
            prompt_id,
            StoredEvaluation {
                generation,
                scores: evaluation.scores,
            },
        );
        state
            .suggestions
            .insert(prompt_id, evaluation.suggestions.clone());

        let aggregate = evaluation.aggregate();
        if let Some(prompt) = state.prompts.get_mut(&prompt_id) {
            if prompt.generation <= generation {
                prompt.score = aggregate;
            }
        }
        if let Some(version) = state
            .versions
            .iter_mut()
            .find(|v| v.prompt_id == prompt_id && v.version_number == generation)
        {
            version.score = aggregate;
        }
        Ok(true)
    }

    async fn record_output(
        &self,
        prompt_id: DbId,
        generation: i32,
        output_text: &str,
        replace_existing: bool,
    ) -> Result<bool, PipelineError> {
        if self.fail_output_writes.load(Ordering::SeqCst) {
            return Err(PipelineError::Database(sqlx::Error::PoolTimedOut));
        }
        let mut state = self.state.lock().await;
        let applies = match state.outputs.get(&prompt_id) {
            None => true,
            Some(existing) => replace_existing && existing.generation <= generation,
        };
        if applies {
            state.outputs.insert(
                prompt_id,
                StoredOutput {
                    generation,
                    text: Some(output_text.to_string()),
                },
            );
        }
        Ok(applies)
    }

    async fn processing_state(&self, prompt_id: DbId) -> Result<ProcessingState, PipelineError> {
        let state = self.state.lock().await;
        Ok(ProcessingState {
            scores: state.evaluations.get(&prompt_id).map(|e| e.scores),
            output_text: state
                .outputs
                .get(&prompt_id)
                .and_then(|o| o.text.clone()),
        })
    }
}
