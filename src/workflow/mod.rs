//! Named, exclusive backend workflows.
//!
//! A workflow is an ordered list of [`Step`]s run by the [`Orchestrator`]
//! under a per-name run lock, followed by a refresh of the cache keys the
//! steps may have dirtied. Run state per name lives in the
//! [`WorkflowRegistry`] and is queried explicitly.

pub mod catalog;
pub mod orchestrator;
pub mod registry;
pub mod steps;

pub use catalog::WorkflowSpec;
pub use orchestrator::Orchestrator;
pub use registry::{RunGuard, WorkflowRegistry, WorkflowState};
pub use steps::{RunSummary, Step, StepKind};

use crate::gateway::GatewayError;

/// Errors returned by [`Orchestrator::run`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    /// Rejected locally. No gateway call was made and run state is unchanged.
    #[error("Invalid request: {0}")]
    Validation(String),
    /// A run with the same name is in flight.
    #[error("Workflow '{0}' is already running, try again when it finishes")]
    Busy(String),
    /// A step failed; the remaining steps were skipped.
    #[error("Step '{step}' failed: {source}")]
    Step {
        step: StepKind,
        #[source]
        source: GatewayError,
    },
    /// The run was dropped before it settled.
    #[error("Workflow run was interrupted before it finished")]
    Interrupted,
}

impl WorkflowError {
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Busy(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_error_names_the_step() {
        let err = WorkflowError::Step {
            step: StepKind::AnalyzeAllDocuments,
            source: GatewayError::Server {
                status: 500,
                message: "Analysis backend offline".into(),
            },
        };
        let text = err.to_string();
        assert!(text.contains("analyze-all-documents"));
        assert!(text.contains("Analysis backend offline"));
    }

    #[test]
    fn busy_mentions_workflow_name() {
        let err = WorkflowError::Busy("run-pipeline".into());
        assert!(err.is_busy());
        assert!(err.to_string().contains("run-pipeline"));
    }
}
