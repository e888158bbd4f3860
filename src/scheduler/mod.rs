//! Bounded-concurrency dispatch of work items
//!
//! The [`Balancer`] owns a run: it calls discovery, feeds the sorted work
//! items to a [`WorkerPool`] while keeping at most `worker_count` in flight,
//! hands each completion to an [`OutcomeCollector`], and shuts the pool down
//! within a grace period.

pub mod balancer;
pub mod collector;
pub mod interrupt;
pub mod operation;
pub mod pool;

pub use balancer::{Balancer, BalancerBuilder};
pub use collector::{DiscardCollector, Outcome, OutcomeCollector, RecordingCollector};
pub use interrupt::Interrupt;
pub use operation::{BalanceResult, BalancingOperation, ReplicationPlanner, RunContext};
pub use pool::{Completion, WorkerPool};
