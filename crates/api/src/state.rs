use std::sync::Arc;

use promptlab_llm::{ChatCompletionsClient, LlmBackend, LlmError};
use promptlab_pipeline::output::OutputGenerator;
use promptlab_pipeline::rewrite::Rewriter;
use promptlab_pipeline::scoring::ScoringEngine;
use promptlab_pipeline::{
    Orchestrator, PgPromptStore, PromptStore, RevisionManager, StatusReporter, TaskRegistry,
};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: promptlab_db::DbPool,
    /// Server configuration (JWT settings are read by the auth extractors).
    pub config: Arc<ServerConfig>,
    /// Create / fork / new version / copy flows.
    pub revisions: Arc<RevisionManager>,
    /// Readiness polling.
    pub status: Arc<StatusReporter>,
    /// Background pipeline runs; drained on shutdown.
    pub tasks: Arc<TaskRegistry>,
}

impl AppState {
    /// Wire the pipeline on top of `pool`.
    ///
    /// Without an LLM API key the engines run in simulation mode and never
    /// make network calls.
    pub fn new(pool: promptlab_db::DbPool, config: ServerConfig) -> Result<Self, LlmError> {
        let backend: Option<Arc<dyn LlmBackend>> = if config.llm.is_simulation() {
            tracing::warn!("LLM_API_KEY not set, running in simulation mode");
            None
        } else {
            let client = ChatCompletionsClient::from_config(&config.llm)?;
            tracing::info!(model = %config.llm.model, "LLM client configured");
            Some(Arc::new(client))
        };

        let store: Arc<dyn PromptStore> = Arc::new(PgPromptStore::new(pool.clone()));
        let tasks = Arc::new(TaskRegistry::new());
        let scoring = Arc::new(ScoringEngine::new(backend.clone(), &config.llm));
        let output = Arc::new(OutputGenerator::new(backend.clone(), &config.llm));
        let orchestrator = Arc::new(Orchestrator::new(
            Arc::clone(&store),
            scoring,
            output,
            Arc::clone(&tasks),
        ));
        let rewriter = Arc::new(Rewriter::new(backend, &config.llm));

        Ok(Self {
            pool,
            config: Arc::new(config),
            revisions: Arc::new(RevisionManager::new(
                Arc::clone(&store),
                orchestrator,
                rewriter,
            )),
            status: Arc::new(StatusReporter::new(store, Arc::clone(&tasks))),
            tasks,
        })
    }
}
