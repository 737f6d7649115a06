//! # ReportFlow Gateway
//!
//! Small axum control surface for operational diagnostics: scheduler status
//! and manual poll trigger, fire-and-forget report runs, and the execution
//! ledger. Schedule CRUD lives in the embedded app UI, not here.

pub mod routes;
pub mod server;

pub use server::{AppState, build_router, serve};
