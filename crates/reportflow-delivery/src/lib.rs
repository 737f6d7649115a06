//! # ReportFlow Delivery
//!
//! Emails generated reports (success path) and diagnostic notices (failure
//! path) to schedule recipients. Every recipient is attempted independently -
//! one bad address never blocks the rest - and delivery is never retried:
//! a failed send is terminal for that recipient for that execution.

pub mod mailer;
pub mod template;

pub use mailer::{DeliveryOutcome, FailureNotice, Mailer, ReportSummary, SmtpMailer};
