//! # ReportFlow Store
//!
//! SQLite-backed persistence: schedule definitions with their recipient,
//! filter, and field children; the execution ledger; and the per-shop API
//! session table. Deleting a schedule cascades to everything it owns.

mod db;

pub use db::Store;
