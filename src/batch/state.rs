//! Batch job state machine, progress and events.

use serde::Serialize;

/// Where a batch job is in its lifecycle.
///
/// `Idle → Validating → Running → Finalizing → Done`. Validation failures
/// end the job in `Failed` before `Running`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BatchState {
    Idle,
    Validating,
    Running { row: usize, total: usize },
    Finalizing,
    Done(BatchSummary),
    Failed { error: String },
}

impl BatchState {
    pub fn is_done(&self) -> bool {
        matches!(self, BatchState::Done(_))
    }

    /// No further events follow a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchState::Done(_) | BatchState::Failed { .. })
    }
}

/// Final counts of a batch job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
    /// Artifact names in input order.
    pub artifacts: Vec<String>,
    /// Per-row failures, in input order.
    pub errors: Vec<RowFailure>,
}

impl BatchSummary {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    pub fn record(&mut self, outcome: &RowOutcome) {
        match outcome {
            RowOutcome::Succeeded { file_name, .. } => {
                self.succeeded += 1;
                self.artifacts.push(file_name.clone());
            }
            RowOutcome::Failed { row, error } => {
                self.failed += 1;
                self.errors.push(RowFailure {
                    row: *row,
                    error: error.clone(),
                });
            }
            RowOutcome::Cancelled { .. } => self.cancelled += 1,
        }
    }
}

/// One failed row (1-based).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowFailure {
    pub row: usize,
    pub error: String,
}

/// Result of one row, 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RowOutcome {
    Succeeded { row: usize, file_name: String },
    Failed { row: usize, error: String },
    Cancelled { row: usize },
}

impl RowOutcome {
    pub fn row(&self) -> usize {
        match self {
            RowOutcome::Succeeded { row, .. }
            | RowOutcome::Failed { row, .. }
            | RowOutcome::Cancelled { row } => *row,
        }
    }
}

/// Progress notifications, delivered in input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BatchEvent {
    StateChanged(BatchState),
    RowStarted { row: usize, total: usize },
    RowFinished(RowOutcome),
}
