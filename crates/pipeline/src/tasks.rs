//! Lifecycle tracking for background pipeline runs.
//!
//! Every submission becomes a task record that moves through
//! `submitted -> running -> settled`. Settled records are kept in a bounded
//! history so recent outcomes stay inspectable. All spawned futures go
//! through the registry's [`TaskTracker`] so shutdown can wait for them.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use promptlab_core::types::{DbId, Timestamp};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Number of settled task records retained.
const SETTLED_HISTORY: usize = 256;

pub type TaskId = u64;

/// Outcome of one section (scoring or output) of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "detail")]
pub enum SectionOutcome {
    /// The result was written.
    Saved,
    /// The store rejected the write as stale or already present.
    Discarded,
    /// The outer timeout fired first.
    TimedOut,
    /// Persistence failed.
    Failed(String),
    /// The section's task panicked.
    Panicked,
    /// Shutdown cancelled the run.
    Cancelled,
}

impl SectionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Saved | Self::Discarded)
    }
}

/// Outcome of a whole run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunOutcome {
    pub evaluation: SectionOutcome,
    pub output: SectionOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "outcome")]
pub enum TaskState {
    Submitted,
    Running,
    Settled(RunOutcome),
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub prompt_id: DbId,
    pub generation: i32,
    pub state: TaskState,
    pub submitted_at: Timestamp,
    pub settled_at: Option<Timestamp>,
}

#[derive(Default)]
struct Records {
    active: HashMap<TaskId, TaskRecord>,
    settled: VecDeque<TaskRecord>,
}

/// Registry of pipeline tasks.
pub struct TaskRegistry {
    next_id: AtomicU64,
    records: Mutex<Records>,
    tracker: TaskTracker,
    cancel: CancellationToken,
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            records: Mutex::new(Records::default()),
            tracker: TaskTracker::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Tracker that every pipeline future is spawned on.
    pub fn tracker(&self) -> &TaskTracker {
        &self.tracker
    }

    /// Token cancelled when shutdown gives up waiting.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Record a new submission.
    pub fn submit(&self, prompt_id: DbId, generation: i32) -> TaskId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let record = TaskRecord {
            id,
            prompt_id,
            generation,
            state: TaskState::Submitted,
            submitted_at: Utc::now(),
            settled_at: None,
        };
        self.lock().active.insert(id, record);
        id
    }

    pub fn mark_running(&self, id: TaskId) {
        if let Some(record) = self.lock().active.get_mut(&id) {
            record.state = TaskState::Running;
        }
    }

    /// Move a task to the settled history.
    pub fn settle(&self, id: TaskId, outcome: RunOutcome) {
        let mut records = self.lock();
        let Some(mut record) = records.active.remove(&id) else {
            return;
        };
        record.state = TaskState::Settled(outcome);
        record.settled_at = Some(Utc::now());
        if records.settled.len() == SETTLED_HISTORY {
            records.settled.pop_front();
        }
        records.settled.push_back(record);
    }

    /// Whether a run for the prompt has been submitted but not settled.
    pub fn in_flight(&self, prompt_id: DbId) -> bool {
        self.lock()
            .active
            .values()
            .any(|r| r.prompt_id == prompt_id)
    }

    /// Number of unsettled tasks.
    pub fn active_count(&self) -> usize {
        self.lock().active.len()
    }

    /// All known records for a prompt, active first, then settled (newest first).
    pub fn records_for(&self, prompt_id: DbId) -> Vec<TaskRecord> {
        let records = self.lock();
        let mut out: Vec<TaskRecord> = records
            .active
            .values()
            .filter(|r| r.prompt_id == prompt_id)
            .cloned()
            .collect();
        out.sort_by_key(|r| r.id);
        out.extend(
            records
                .settled
                .iter()
                .rev()
                .filter(|r| r.prompt_id == prompt_id)
                .cloned(),
        );
        out
    }

    /// Stop accepting work and wait up to `grace` for in-flight runs. Runs
    /// still going after that are cancelled. Returns `true` if everything
    /// finished within the grace period.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        self.tracker.close();
        if tokio::time::timeout(grace, self.tracker.wait()).await.is_ok() {
            return true;
        }
        tracing::warn!(
            active = self.active_count(),
            "Pipeline tasks still running after grace period, cancelling",
        );
        self.cancel.cancel();
        self.tracker.wait().await;
        false
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Records> {
        // A poisoned lock only means a panic happened while holding it; the
        // records themselves are still consistent.
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}
