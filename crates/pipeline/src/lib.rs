//! The asynchronous prompt-processing pipeline.
//!
//! - [`scoring::ScoringEngine`] and [`output::OutputGenerator`] wrap the LLM
//!   with timeouts and deterministic fallbacks.
//! - [`orchestrator::Orchestrator`] runs both for one revision as tracked
//!   background tasks and persists the results through a [`store::PromptStore`].
//! - [`status::StatusReporter`] answers readiness polls.
//! - [`revision::RevisionManager`] implements create, fork, new version and
//!   copy on top of the above.

pub mod error;
pub mod orchestrator;
pub mod output;
pub mod revision;
pub mod rewrite;
pub mod scoring;
pub mod status;
pub mod store;
pub mod tasks;

#[cfg(test)]
mod testing;

pub use error::PipelineError;
pub use orchestrator::{Orchestrator, ProcessRequest};
pub use revision::RevisionManager;
pub use status::StatusReporter;
pub use store::{PgPromptStore, PromptStore};
pub use tasks::TaskRegistry;
