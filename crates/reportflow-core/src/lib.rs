//! # ReportFlow Core
//!
//! Shared foundation for the ReportFlow workspace: domain types, the error
//! taxonomy, configuration, the report-type catalog, and the pure scheduling
//! math (date-range resolution + recurrence).
//!
//! Everything here is I/O-free except config loading; the heavier collaborators
//! (store, fetcher, mailer, scheduler) live in their own crates.

pub mod catalog;
pub mod config;
pub mod daterange;
pub mod error;
pub mod recurrence;
pub mod types;

pub use catalog::{FieldDef, ReportTypeInfo, report_info};
pub use config::ReportFlowConfig;
pub use daterange::{DateRange, ResolvedRange};
pub use error::{ErrorCategory, ReportFlowError, Result};
pub use types::{
    ExecutionRecord, ExecutionStatus, FilterSet, FilterValue, Frequency, Recipient, ReportType,
    ScheduleDefinition,
};
