//! Error taxonomy for the report pipeline.
//!
//! Every failure an execution can hit is classified here by origin so the
//! ledger and the recipient-facing diagnostic email agree on wording.

use thiserror::Error;

/// Workspace-wide result alias.
pub type Result<T> = std::result::Result<T, ReportFlowError>;

/// All errors the report pipeline can surface.
#[derive(Debug, Error)]
pub enum ReportFlowError {
    /// Admin API throttled the request. Retryable with backoff.
    #[error("rate limited by Admin API: {0}")]
    Throttled(String),

    /// Access token rejected or expired. Requires tenant re-consent.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The Admin API reported the queried resource missing.
    #[error("not found: {0}")]
    NotFound(String),

    /// Any other error returned by the Admin API.
    #[error("Admin API error: {0}")]
    Api(String),

    /// Network-level failure talking to the Admin API. Retryable.
    #[error("transport error: {0}")]
    Transport(String),

    /// Report type has no backing data source (e.g. traffic).
    #[error("no data source for report type: {0}")]
    Unsupported(String),

    /// Raw records did not have the expected shape.
    #[error("data processing error: {0}")]
    Process(String),

    /// CSV artifact could not be written.
    #[error("artifact write error: {0}")]
    Artifact(String),

    /// Recipient address failed to parse.
    #[error("invalid recipient address: {0}")]
    InvalidRecipient(String),

    /// SMTP-level delivery failure.
    #[error("email delivery error: {0}")]
    Delivery(String),

    /// Date range selector could not be resolved.
    #[error("invalid date range: {0}")]
    InvalidRange(String),

    /// Schedule misconfiguration (not found, inactive, bad fields).
    /// Never written to the execution ledger.
    #[error("configuration error: {0}")]
    Config(String),

    /// SQLite-level failure.
    #[error("storage error: {0}")]
    Store(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ReportFlowError {
    pub fn api(msg: impl Into<String>) -> Self {
        Self::Api(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Whether the fetch retry loop should spend a retry on this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Throttled(_) | Self::Transport(_))
    }

    /// Classify into the recipient-facing category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Throttled(_) => ErrorCategory::RateLimit,
            Self::Auth(_) => ErrorCategory::Auth,
            Self::NotFound(_) => ErrorCategory::DataNotFound,
            Self::Api(_) | Self::Unsupported(_) => ErrorCategory::Api,
            Self::Transport(_) => ErrorCategory::Network,
            Self::Process(_) | Self::InvalidRange(_) => ErrorCategory::Processing,
            Self::Artifact(_) | Self::Io(_) => ErrorCategory::FileGeneration,
            Self::InvalidRecipient(_) | Self::Delivery(_) => ErrorCategory::EmailDelivery,
            Self::Config(_) => ErrorCategory::Configuration,
            Self::Store(_) => ErrorCategory::Storage,
        }
    }
}

/// Recipient-facing error category. Each carries a short label for the ledger
/// and a handful of remediation hints for the failure email.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    RateLimit,
    Auth,
    DataNotFound,
    Api,
    Network,
    Processing,
    FileGeneration,
    EmailDelivery,
    Configuration,
    Storage,
    Unknown,
}

impl ErrorCategory {
    pub fn label(&self) -> &'static str {
        match self {
            Self::RateLimit => "Admin API Rate Limit",
            Self::Auth => "Store Authentication Error",
            Self::DataNotFound => "Store Data Not Found",
            Self::Api => "Admin API Error",
            Self::Network => "Network/Timeout Error",
            Self::Processing => "Data Processing Error",
            Self::FileGeneration => "File Generation Error",
            Self::EmailDelivery => "Email Delivery Error",
            Self::Configuration => "Configuration Error",
            Self::Storage => "Database Error",
            Self::Unknown => "Unknown Error",
        }
    }

    /// Concrete next steps shown in the failure notification.
    pub fn troubleshooting_tips(&self) -> &'static [&'static str] {
        match self {
            Self::RateLimit => &[
                "The store API temporarily rate-limited these requests",
                "The report will automatically retry on its next scheduled run",
                "Large date ranges trigger rate limits more often - try a smaller range",
                "Consider reducing how frequently this report runs",
            ],
            Self::Auth => &[
                "The store connection may have expired",
                "Reinstall or re-authorize the app from the store admin",
                "Ensure the app still has read access to orders, products, and customers",
            ],
            Self::DataNotFound => &[
                "The requested data may not exist in the store",
                "Check the report filters against the data actually present",
                "Verify the date range covers a period with activity",
            ],
            Self::Api => &[
                "The store API returned an unexpected error",
                "This is usually temporary - the report will retry automatically",
                "Verify the store is active and reachable",
            ],
            Self::Network => &[
                "The request timed out or could not reach the store API",
                "This is usually a transient network issue",
                "The report will automatically retry on its next scheduled run",
                "Try a smaller date range if the report pulls a lot of data",
            ],
            Self::Processing => &[
                "The data returned by the store could not be processed",
                "This can happen with unexpected record formats or missing fields",
                "Try running the report with a smaller date range",
                "Contact support with the execution ID if this keeps happening",
            ],
            Self::FileGeneration => &[
                "The report file could not be created",
                "This is usually a temporary server issue",
                "The report will automatically retry on its next scheduled run",
                "If this persists, contact support - there may be a storage problem",
            ],
            Self::EmailDelivery => &[
                "The report email could not be delivered",
                "Check the recipient list for invalid addresses",
                "Verify the SMTP settings in the service configuration",
                "The report itself was generated successfully",
            ],
            Self::Configuration => &[
                "The report configuration is incomplete or invalid",
                "Review the report's schedule, filters, and recipients",
                "Ensure all required fields are filled in",
            ],
            Self::Storage => &[
                "The service database could not be accessed",
                "This is usually temporary and resolves automatically",
                "Contact support if this error persists",
            ],
            Self::Unknown => &[
                "An unexpected error occurred during report execution",
                "The report will automatically retry on its next scheduled run",
                "Try running the report manually to see if the issue persists",
                "Contact support with the execution ID for assistance",
            ],
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classes() {
        assert!(ReportFlowError::Throttled("slow down".into()).is_retryable());
        assert!(ReportFlowError::Transport("connection reset".into()).is_retryable());
        assert!(!ReportFlowError::Api("bad query".into()).is_retryable());
        assert!(!ReportFlowError::Auth("expired".into()).is_retryable());
    }

    #[test]
    fn test_category_mapping() {
        assert_eq!(
            ReportFlowError::Throttled("x".into()).category(),
            ErrorCategory::RateLimit
        );
        assert_eq!(
            ReportFlowError::Config("missing".into()).category(),
            ErrorCategory::Configuration
        );
        assert_eq!(
            ReportFlowError::Unsupported("TRAFFIC".into()).category(),
            ErrorCategory::Api
        );
    }

    #[test]
    fn test_every_category_has_tips() {
        let all = [
            ErrorCategory::RateLimit,
            ErrorCategory::Auth,
            ErrorCategory::DataNotFound,
            ErrorCategory::Api,
            ErrorCategory::Network,
            ErrorCategory::Processing,
            ErrorCategory::FileGeneration,
            ErrorCategory::EmailDelivery,
            ErrorCategory::Configuration,
            ErrorCategory::Storage,
            ErrorCategory::Unknown,
        ];
        for cat in all {
            let tips = cat.troubleshooting_tips();
            assert!(tips.len() >= 2 && tips.len() <= 5, "{}: {}", cat, tips.len());
        }
    }
}
