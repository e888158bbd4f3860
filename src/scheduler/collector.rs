//! Outcome collection
//!
//! The balancer reports every finished operation to an [`OutcomeCollector`]
//! from its own thread, in completion order.

use crate::error::OperationFailure;
use crate::scheduler::operation::BalanceResult;
use parking_lot::Mutex;

/// Final result of one dispatched work item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Path of the work item
    pub path: String,

    /// What the operation returned
    pub result: Result<BalanceResult, OperationFailure>,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Receives outcomes as operations complete
pub trait OutcomeCollector: Send + Sync {
    fn record(&self, outcome: Outcome);
}

/// Collector that drops every outcome
#[derive(Debug, Default)]
pub struct DiscardCollector;

impl OutcomeCollector for DiscardCollector {
    fn record(&self, _outcome: Outcome) {}
}

/// Collector that keeps every outcome in completion order
#[derive(Debug, Default)]
pub struct RecordingCollector {
    outcomes: Mutex<Vec<Outcome>>,
}

impl RecordingCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all outcomes so far, in completion order
    pub fn outcomes(&self) -> Vec<Outcome> {
        self.outcomes.lock().clone()
    }

    /// Number of recorded outcomes
    pub fn len(&self) -> usize {
        self.outcomes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.lock().is_empty()
    }

    /// Successful results
    pub fn successes(&self) -> Vec<BalanceResult> {
        self.outcomes
            .lock()
            .iter()
            .filter_map(|o| o.result.as_ref().ok().cloned())
            .collect()
    }

    /// Failures
    pub fn failures(&self) -> Vec<OperationFailure> {
        self.outcomes
            .lock()
            .iter()
            .filter_map(|o| o.result.as_ref().err().cloned())
            .collect()
    }

    /// Paths of every recorded outcome, in completion order
    pub fn paths(&self) -> Vec<String> {
        self.outcomes.lock().iter().map(|o| o.path.clone()).collect()
    }
}

impl OutcomeCollector for RecordingCollector {
    fn record(&self, outcome: Outcome) {
        self.outcomes.lock().push(outcome);
    }
}
