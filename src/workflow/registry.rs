//! Per-workflow run state with exclusive, RAII-released run slots.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use uuid::Uuid;

use super::{RunSummary, WorkflowError};

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// Observable state of one named workflow.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WorkflowState {
    /// Never run in this session.
    Idle,
    Running {
        run_id: Uuid,
        started_at: DateTime<Utc>,
    },
    Succeeded {
        run_id: Uuid,
        summary: RunSummary,
        finished_at: DateTime<Utc>,
    },
    Failed {
        run_id: Uuid,
        #[serde(serialize_with = "as_display")]
        error: WorkflowError,
        finished_at: DateTime<Utc>,
    },
}

impl WorkflowState {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running { .. } => "running",
            Self::Succeeded { .. } => "succeeded",
            Self::Failed { .. } => "failed",
        }
    }
}

fn as_display<S: Serializer>(error: &WorkflowError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

// ═══════════════════════════════════════════════════════════
// WorkflowRegistry
// ═══════════════════════════════════════════════════════════

/// Run-state map keyed by workflow name.
///
/// At most one run per name holds a [`RunGuard`]. Distinct names run
/// independently.
#[derive(Default)]
pub struct WorkflowRegistry {
    runs: Mutex<HashMap<String, WorkflowState>>,
}

impl WorkflowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the run slot for `name` without waiting.
    ///
    /// Fails with [`WorkflowError::Busy`] when a run of the same name is
    /// already in flight. The previous settled state is replaced.
    pub fn begin(&self, name: &str) -> Result<RunGuard<'_>, WorkflowError> {
        let mut runs = self.lock();
        if runs.get(name).is_some_and(WorkflowState::is_running) {
            return Err(WorkflowError::Busy(name.to_string()));
        }

        let run_id = Uuid::new_v4();
        runs.insert(
            name.to_string(),
            WorkflowState::Running {
                run_id,
                started_at: Utc::now(),
            },
        );

        Ok(RunGuard {
            registry: self,
            name: name.to_string(),
            run_id,
            settled: false,
        })
    }

    /// Current state of `name`; `Idle` if it never ran.
    pub fn state(&self, name: &str) -> WorkflowState {
        self.lock().get(name).cloned().unwrap_or(WorkflowState::Idle)
    }

    /// All workflows that have run at least once, sorted by name.
    pub fn states(&self) -> Vec<(String, WorkflowState)> {
        let mut all: Vec<_> = self
            .lock()
            .iter()
            .map(|(name, state)| (name.clone(), state.clone()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.state(name).is_running()
    }

    // ── Internal ────────────────────────────────────────────

    // Every write is a single insert, so poisoned data is still whole.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, WorkflowState>> {
        self.runs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn settle(&self, name: &str, run_id: Uuid, state: WorkflowState) {
        let mut runs = self.lock();
        let owns_slot = matches!(
            runs.get(name),
            Some(WorkflowState::Running { run_id: current, .. }) if *current == run_id
        );
        if owns_slot {
            runs.insert(name.to_string(), state);
        }
    }
}

// ═══════════════════════════════════════════════════════════
// RunGuard — RAII run slot
// ═══════════════════════════════════════════════════════════

/// Exclusive run slot for one workflow name.
///
/// Settle it with [`succeed`](Self::succeed) or [`fail`](Self::fail).
/// Dropping it unsettled (e.g. the run future was dropped) marks the run
/// failed with [`WorkflowError::Interrupted`], so the slot is released on
/// every exit path.
pub struct RunGuard<'a> {
    registry: &'a WorkflowRegistry,
    name: String,
    run_id: Uuid,
    settled: bool,
}

impl RunGuard<'_> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn succeed(mut self, summary: RunSummary) {
        self.settle(|run_id, finished_at| WorkflowState::Succeeded {
            run_id,
            summary,
            finished_at,
        });
    }

    pub fn fail(mut self, error: WorkflowError) {
        self.settle(|run_id, finished_at| WorkflowState::Failed {
            run_id,
            error,
            finished_at,
        });
    }

    fn settle<F>(&mut self, make: F)
    where
        F: FnOnce(Uuid, DateTime<Utc>) -> WorkflowState,
    {
        self.settled = true;
        let state = make(self.run_id, Utc::now());
        self.registry.settle(&self.name, self.run_id, state);
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!(workflow = %self.name, run_id = %self.run_id, "Workflow run dropped before settling");
            self.settle(|run_id, finished_at| WorkflowState::Failed {
                run_id,
                error: WorkflowError::Interrupted,
                finished_at,
            });
        }
    }
}
