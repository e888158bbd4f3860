//! Balancing operations
//!
//! The scheduler treats an operation as opaque: it hands over one work
//! item, waits for the result, and records it. What "balancing" means for
//! a file is entirely up to the implementation.

use crate::config::{Generation, NamespaceUri};
use crate::discovery::WorkItem;
use crate::error::OperationFailure;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Run-wide values every operation can see
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Namespace being balanced
    pub namespace: NamespaceUri,

    /// Generation descriptors, passed through untouched
    pub generations: Vec<Generation>,
}

/// Result of balancing one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceResult {
    /// Path of the balanced file
    pub path: String,

    /// File size in bytes
    pub size: u64,

    /// Replication before the operation
    pub from_replication: u16,

    /// Replication the operation settled on
    pub to_replication: u16,

    /// Time spent in the operation
    pub duration: Duration,
}

impl BalanceResult {
    /// Whether the operation changed anything
    pub fn changed(&self) -> bool {
        self.from_replication != self.to_replication
    }
}

/// Work performed on each discovered file
///
/// Called concurrently from every worker thread. A failure is reported
/// through the returned `Err` and affects only the file it names; a panic
/// is caught by the worker and treated the same way.
pub trait BalancingOperation: Send + Sync {
    fn balance(&self, item: &WorkItem, ctx: &RunContext) -> Result<BalanceResult, OperationFailure>;
}

impl<F> BalancingOperation for F
where
    F: Fn(&WorkItem, &RunContext) -> Result<BalanceResult, OperationFailure> + Send + Sync,
{
    fn balance(&self, item: &WorkItem, ctx: &RunContext) -> Result<BalanceResult, OperationFailure> {
        self(item, ctx)
    }
}

/// Plans replication changes without touching the namespace
///
/// Re-reads each file through the storage client it was discovered by, so
/// a file removed since discovery fails cleanly. The target replication is
/// the pattern's if it has one, otherwise the current one.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReplicationPlanner;

impl ReplicationPlanner {
    pub fn new() -> Self {
        Self
    }
}

impl BalancingOperation for ReplicationPlanner {
    fn balance(&self, item: &WorkItem, ctx: &RunContext) -> Result<BalanceResult, OperationFailure> {
        let started = Instant::now();
        let path = item.path();
        let failed = |reason: String| OperationFailure::Failed {
            path: path.to_string(),
            reason,
        };

        let current = item
            .storage()
            .stat(path)
            .map_err(|e| failed(e.to_string()))?
            .ok_or_else(|| failed("file no longer exists".into()))?;

        if !current.is_file() {
            return Err(failed(format!("expected a file, found {:?}", current.entry_type)));
        }

        let target = item.pattern().replication.unwrap_or(current.replication);

        if target != current.replication {
            info!(
                path = %path,
                from = current.replication,
                to = target,
                generations = ctx.generations.len(),
                "Replication change planned"
            );
        } else {
            debug!(path = %path, replication = target, "Replication already at target");
        }

        Ok(BalanceResult {
            path: path.to_string(),
            size: current.size,
            from_replication: current.replication,
            to_replication: target,
            duration: started.elapsed(),
        })
    }
}
