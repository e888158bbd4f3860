//! Balancer run loop
//!
//! One [`Balancer`] performs exactly one run: discover every file, hand each
//! to a worker with at most `worker_count` operations in flight, drain the
//! remaining completions, then shut the pool down.

use crate::config::{BalanceConfig, Generation, NamespaceUri, PatternConfig};
use crate::discovery::Discovery;
use crate::error::{BalancerError, Result};
use crate::scheduler::collector::{DiscardCollector, Outcome, OutcomeCollector};
use crate::scheduler::interrupt::Interrupt;
use crate::scheduler::operation::{BalancingOperation, RunContext};
use crate::scheduler::pool::{Completion, WorkerPool};
use crate::storage::StorageClient;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, trace, warn, Dispatch};

/// Lifecycle of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Idle,
    Discovering,
    Dispatching,
    Draining,
    ShuttingDown,
    Terminated,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Idle => "idle",
            RunState::Discovering => "discovering",
            RunState::Dispatching => "dispatching",
            RunState::Draining => "draining",
            RunState::ShuttingDown => "shutting-down",
            RunState::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct RunCounts {
    dispatched: u64,
    succeeded: u64,
    failed: u64,
}

/// Discovers files and balances them on a fixed-size worker pool
pub struct Balancer {
    context: Arc<RunContext>,
    patterns: Vec<PatternConfig>,
    config: BalanceConfig,
    storage: Arc<dyn StorageClient>,
    operation: Arc<dyn BalancingOperation>,
    collector: Arc<dyn OutcomeCollector>,
    interrupt: Interrupt,
    dispatch: Option<Dispatch>,
    state: RunState,
    counts: RunCounts,
}

impl Balancer {
    pub fn builder() -> BalancerBuilder {
        BalancerBuilder::default()
    }

    /// Perform the run
    ///
    /// Returns once every discovered file has been dispatched and its
    /// outcome recorded. Per-file failures never fail the run; storage
    /// failures during discovery do, before anything is dispatched.
    pub fn run(self) -> Result<()> {
        match self.dispatch.clone() {
            Some(dispatch) => tracing::dispatcher::with_default(&dispatch, || self.run_inner()),
            None => self.run_inner(),
        }
    }

    fn run_inner(mut self) -> Result<()> {
        let start = Instant::now();
        let worker_count = self.config.worker_count;

        info!(
            namespace = %self.context.namespace,
            storage = %self.storage.describe(),
            patterns = self.patterns.len(),
            generations = self.context.generations.len(),
            workers = worker_count,
            "Starting balancer run"
        );

        self.transition(RunState::Discovering);
        let items = Discovery::new(Arc::clone(&self.storage)).discover(&self.patterns)?;
        info!(files = items.len(), "Discovery complete");

        self.transition(RunState::Dispatching);
        let pool = WorkerPool::spawn(
            worker_count,
            Arc::clone(&self.operation),
            Arc::clone(&self.context),
            self.dispatch.clone(),
        )?;

        let mut in_flight = 0usize;
        for item in items {
            if in_flight == pool.size() {
                let completion = pool.next_completion(&self.interrupt, self.config.poll_interval)?;
                in_flight -= 1;
                self.observe(completion);
            }
            trace!(path = %item.path(), in_flight = in_flight, "Submitting work item");
            pool.submit(item)?;
            in_flight += 1;
            self.counts.dispatched += 1;
        }

        self.transition(RunState::Draining);
        while in_flight > 0 {
            let completion = pool.next_completion(&self.interrupt, self.config.poll_interval)?;
            in_flight -= 1;
            self.observe(completion);
        }

        self.transition(RunState::ShuttingDown);
        if let Err(e) = pool.shutdown(self.config.shutdown_grace) {
            warn!(error = %e, "Worker pool shutdown did not complete");
        }

        self.transition(RunState::Terminated);
        info!(
            dispatched = self.counts.dispatched,
            succeeded = self.counts.succeeded,
            failed = self.counts.failed,
            duration_ms = start.elapsed().as_millis() as u64,
            "Balancer run complete"
        );

        Ok(())
    }

    fn observe(&mut self, completion: Completion) {
        match &completion.result {
            Ok(result) => {
                self.counts.succeeded += 1;
                trace!(worker = completion.worker, path = %result.path, "Operation succeeded");
            }
            Err(failure) => {
                self.counts.failed += 1;
                warn!(
                    worker = completion.worker,
                    path = %completion.path,
                    error = %failure,
                    "Balancing operation failed"
                );
            }
        }

        self.collector.record(Outcome {
            path: completion.path,
            result: completion.result,
        });
    }

    fn transition(&mut self, next: RunState) {
        debug!(from = %self.state, to = %next, "Balancer state change");
        self.state = next;
    }
}

/// Builder for [`Balancer`]
#[derive(Default)]
pub struct BalancerBuilder {
    namespace: Option<NamespaceUri>,
    generations: Option<Vec<Generation>>,
    patterns: Option<Vec<PatternConfig>>,
    config: Option<BalanceConfig>,
    storage: Option<Arc<dyn StorageClient>>,
    operation: Option<Arc<dyn BalancingOperation>>,
    collector: Option<Arc<dyn OutcomeCollector>>,
    interrupt: Option<Interrupt>,
    dispatch: Option<Dispatch>,
}

impl BalancerBuilder {
    pub fn namespace(mut self, namespace: NamespaceUri) -> Self {
        self.namespace = Some(namespace);
        self
    }

    pub fn generations(mut self, generations: Vec<Generation>) -> Self {
        self.generations = Some(generations);
        self
    }

    pub fn patterns(mut self, patterns: Vec<PatternConfig>) -> Self {
        self.patterns = Some(patterns);
        self
    }

    pub fn config(mut self, config: BalanceConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn storage(mut self, storage: Arc<dyn StorageClient>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn operation(mut self, operation: Arc<dyn BalancingOperation>) -> Self {
        self.operation = Some(operation);
        self
    }

    /// Collector receiving every outcome; outcomes are discarded if unset
    pub fn collector(mut self, collector: Arc<dyn OutcomeCollector>) -> Self {
        self.collector = Some(collector);
        self
    }

    /// Interrupt token polled while waiting for completions
    pub fn interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = Some(interrupt);
        self
    }

    /// Subscriber used for the run instead of the global default
    pub fn dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = Some(dispatch);
        self
    }

    pub fn build(self) -> Result<Balancer> {
        let namespace = required(self.namespace, "namespace")?;
        let generations = required(self.generations, "generations")?;
        let patterns = required(self.patterns, "patterns")?;
        let config = required(self.config, "config")?;
        let storage = required(self.storage, "storage")?;
        let operation = required(self.operation, "operation")?;

        config.validate().map_err(|e| BalancerError::InvalidArgument {
            name: "config",
            reason: e.to_string(),
        })?;

        Ok(Balancer {
            context: Arc::new(RunContext {
                namespace,
                generations,
            }),
            patterns,
            config,
            storage,
            operation,
            collector: self.collector.unwrap_or_else(|| Arc::new(DiscardCollector)),
            interrupt: self.interrupt.unwrap_or_default(),
            dispatch: self.dispatch,
            state: RunState::Idle,
            counts: RunCounts::default(),
        })
    }
}

fn required<T>(value: Option<T>, name: &'static str) -> Result<T> {
    value.ok_or_else(|| BalancerError::InvalidArgument {
        name,
        reason: "required parameter not set".into(),
    })
}
