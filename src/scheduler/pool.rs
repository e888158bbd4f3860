//! Fixed-size worker pool
//!
//! # Architecture
//!
//! ```text
//!              submit(item)                     next_completion()
//!   Balancer ──────────────► [ job channel ] ──►  ┌──────────┐
//!      ▲                                          │ Worker 1 │──┐
//!      │                                          │ Worker 2 │  │
//!      │                                          │ Worker N │  │
//!      │                                          └──────────┘  │
//!      └──────────────────── [ completion channel ] ◄───────────┘
//! ```
//!
//! Both channels are bounded by the pool size. The balancer never has more
//! than that many items outstanding, so neither side blocks on a full
//! channel. Workers signal a separate exit channel when their thread
//! function returns, which lets shutdown wait with a deadline instead of
//! an unbounded join.

use crate::discovery::WorkItem;
use crate::error::{BalancerError, OperationFailure, Result, WorkerError};
use crate::scheduler::interrupt::Interrupt;
use crate::scheduler::operation::{BalanceResult, BalancingOperation, RunContext};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn, Dispatch};

/// A finished operation as reported by a worker
#[derive(Debug)]
pub struct Completion {
    /// Worker that ran the operation
    pub worker: usize,

    /// Path of the work item
    pub path: String,

    /// What the operation returned
    pub result: std::result::Result<BalanceResult, OperationFailure>,
}

/// Sends the worker id on the exit channel when dropped
struct ExitSignal {
    id: usize,
    tx: Sender<usize>,
}

impl Drop for ExitSignal {
    fn drop(&mut self) {
        let _ = self.tx.send(self.id);
    }
}

struct PoolWorker {
    id: usize,
    handle: JoinHandle<()>,
}

/// Worker threads running balancing operations
pub struct WorkerPool {
    size: usize,
    job_tx: Option<Sender<WorkItem>>,
    completion_rx: Receiver<Completion>,
    exit_rx: Receiver<usize>,
    workers: Vec<PoolWorker>,
}

impl WorkerPool {
    /// Spawn `size` worker threads
    ///
    /// When `dispatch` is given, every worker installs it as its default
    /// subscriber so operation logs land where the caller's do.
    pub fn spawn(
        size: usize,
        operation: Arc<dyn BalancingOperation>,
        context: Arc<RunContext>,
        dispatch: Option<Dispatch>,
    ) -> std::result::Result<Self, WorkerError> {
        let (job_tx, job_rx) = bounded::<WorkItem>(size);
        let (completion_tx, completion_rx) = bounded::<Completion>(size);
        let (exit_tx, exit_rx) = bounded::<usize>(size);

        let mut workers = Vec::with_capacity(size);
        for id in 0..size {
            let job_rx = job_rx.clone();
            let completion_tx = completion_tx.clone();
            let operation = Arc::clone(&operation);
            let context = Arc::clone(&context);
            let dispatch = dispatch.clone();
            let exit = ExitSignal {
                id,
                tx: exit_tx.clone(),
            };

            let handle = thread::Builder::new()
                .name(format!("balancer-{}", id))
                .spawn(move || {
                    let _exit = exit;
                    let _subscriber = dispatch.as_ref().map(tracing::dispatcher::set_default);
                    worker_loop(id, job_rx, completion_tx, operation, context);
                })
                .map_err(|e| WorkerError::SpawnFailed {
                    id,
                    reason: e.to_string(),
                })?;

            workers.push(PoolWorker { id, handle });
        }

        debug!(workers = size, "Worker pool started");

        Ok(Self {
            size,
            job_tx: Some(job_tx),
            completion_rx,
            exit_rx,
            workers,
        })
    }

    /// Number of worker threads
    pub fn size(&self) -> usize {
        self.size
    }

    /// Hand a work item to the next free worker
    pub fn submit(&self, item: WorkItem) -> std::result::Result<(), WorkerError> {
        let tx = self.job_tx.as_ref().ok_or(WorkerError::QueueClosed)?;
        tx.send(item).map_err(|_| WorkerError::QueueClosed)
    }

    /// Block until an operation completes
    ///
    /// Checks `interrupt` every `poll_interval` while waiting and returns
    /// [`BalancerError::Interrupted`] once it is triggered.
    pub fn next_completion(&self, interrupt: &Interrupt, poll_interval: Duration) -> Result<Completion> {
        loop {
            if interrupt.is_triggered() {
                return Err(BalancerError::Interrupted);
            }
            match self.completion_rx.recv_timeout(poll_interval) {
                Ok(completion) => return Ok(completion),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(WorkerError::CompletionChannelClosed.into())
                }
            }
        }
    }

    /// Stop accepting work and wait up to `grace` for every worker to exit
    ///
    /// Workers still running after the deadline are detached and
    /// [`BalancerError::PoolShutdown`] is returned.
    pub fn shutdown(mut self, grace: Duration) -> Result<()> {
        self.job_tx.take();

        let deadline = Instant::now() + grace;
        let mut exited = 0;
        while exited < self.workers.len() {
            match self.exit_rx.recv_deadline(deadline) {
                Ok(id) => {
                    exited += 1;
                    trace!(worker = id, "Worker exited");
                }
                Err(RecvTimeoutError::Timeout) => {
                    warn!(
                        exited = exited,
                        workers = self.workers.len(),
                        grace_ms = grace.as_millis() as u64,
                        "Workers still running after grace period"
                    );
                    return Err(BalancerError::PoolShutdown { grace });
                }
                // Every exit signal has been dropped
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        for worker in self.workers.drain(..) {
            if worker.handle.join().is_err() {
                warn!(worker = worker.id, "Worker thread panicked");
            }
        }

        debug!("Worker pool shut down");
        Ok(())
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.job_tx.take();
        if !self.workers.is_empty() {
            debug!(workers = self.workers.len(), "Detaching worker threads");
        }
    }
}

fn worker_loop(
    id: usize,
    jobs: Receiver<WorkItem>,
    completions: Sender<Completion>,
    operation: Arc<dyn BalancingOperation>,
    context: Arc<RunContext>,
) {
    trace!(worker = id, "Worker starting");

    while let Ok(item) = jobs.recv() {
        let path = item.path().to_string();
        let started = Instant::now();

        let result = panic::catch_unwind(AssertUnwindSafe(|| operation.balance(&item, &context)))
            .unwrap_or_else(|payload| {
                Err(OperationFailure::Panicked {
                    path: path.clone(),
                    message: panic_message(payload.as_ref()),
                })
            });

        trace!(
            worker = id,
            path = %path,
            ok = result.is_ok(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Operation finished"
        );

        // The item is released only after its operation has returned
        drop(item);

        if completions
            .send(Completion {
                worker: id,
                path,
                result,
            })
            .is_err()
        {
            // Balancer stopped listening
            break;
        }
    }

    trace!(worker = id, "Worker exiting");
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
