//! hadaps-balancer - Glob-driven replication balancer
//!
//! Finds files in a storage namespace by glob pattern and runs one balancing
//! operation per file on a fixed-size worker pool.
//!
//! # Features
//!
//! - **Glob Discovery**: `*`, `?`, `[...]` and `{a,b}` patterns, with matched
//!   directories flattened into the files beneath them at any depth.
//!
//! - **Deterministic Order**: each pattern's files are sorted by path before
//!   dispatch, so a fixed namespace always yields the same submission order.
//!
//! - **Bounded Concurrency**: never more than `--workers` operations in
//!   flight; the run waits for a completion before admitting the next file.
//!
//! - **Fault Isolation**: a failing or panicking operation is logged and
//!   recorded, and the run moves on.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Storage Namespace                          │
//! │                      (file:// directory)                        │
//! └─────────────────────────────┬───────────────────────────────────┘
//!                               │ resolve_glob / list_children
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Discovery                               │
//! │   pattern 1 ─► expand ─► sort ─┐                                │
//! │   pattern 2 ─► expand ─► sort ─┼─► work items, pattern order    │
//! │   pattern N ─► expand ─► sort ─┘                                │
//! └─────────────────────────────┬───────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          Balancer                               │
//! │            admit while in_flight < workers                      │
//! │  ┌─────────┐  ┌─────────┐  ┌─────────┐         ┌─────────┐      │
//! │  │Worker 1 │  │Worker 2 │  │Worker 3 │  ...    │Worker N │      │
//! │  └────┬────┘  └────┬────┘  └────┬────┘         └────┬────┘      │
//! │       └────────────┴─────┬──────┴───────────────────┘           │
//! │                          ▼                                      │
//! │               completion channel ─► OutcomeCollector            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```bash
//! # Plan replication 2 for every gzip log, 5 for hot data
//! hadaps-balancer file:///srv/data -P '/logs/*.gz=2' -P '/hot/{a,b}*=5'
//!
//! # Whole directory tree, 8 operations at a time
//! hadaps-balancer file:///srv/data -P '/archive' -w 8
//! ```

pub mod config;
pub mod discovery;
pub mod error;
pub mod progress;
pub mod scheduler;
pub mod storage;

pub use config::{BalanceConfig, BalancePlan, CliArgs, Generation, NamespaceUri, PatternConfig};
pub use discovery::{Discovery, WorkItem};
pub use error::{BalancerError, OperationFailure, Result, StorageError};
pub use scheduler::{
    BalanceResult, Balancer, BalancingOperation, Interrupt, OutcomeCollector, RecordingCollector,
    ReplicationPlanner, RunContext,
};
pub use storage::{Entry, StorageClient};
