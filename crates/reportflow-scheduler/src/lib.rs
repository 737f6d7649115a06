//! # ReportFlow Scheduler
//!
//! The execution orchestrator (one report run from fetch to ledger update)
//! and the due-schedule poller that drives it on a fixed interval with
//! per-tenant mutual exclusion.

pub mod executor;
pub mod poller;

pub use executor::{ExecutionSummary, Executor, TransportFactory};
pub use poller::{PollerStatus, ReportScheduler};
