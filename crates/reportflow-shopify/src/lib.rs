//! # ReportFlow Shopify Fetcher
//!
//! Pulls raw report data from the Admin GraphQL API: a thin transport with
//! throttle-aware exponential backoff, a search predicate builder over typed
//! filters, and per-report-type paginated fetch strategies.
//!
//! The rest of the pipeline never sees HTTP plumbing: orchestration depends on
//! the [`GraphqlTransport`] and [`CredentialProvider`] traits only.

pub mod client;
pub mod credentials;
pub mod fetch;
pub mod query;

pub use client::{AdminClient, GraphqlTransport, execute_with_retry};
pub use credentials::{CredentialProvider, StoreCredentials};
pub use fetch::{FetchOutcome, fetch_report};
