//! SMTP mailer with per-recipient fault isolation.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::path::Path;

use reportflow_core::config::SmtpConfig;
use reportflow_core::error::{ErrorCategory, ReportFlowError, Result};
use reportflow_core::types::Recipient;

use crate::template;

/// Report metadata rendered into the success email.
#[derive(Debug, Clone)]
pub struct ReportSummary {
    pub report_name: String,
    pub report_type: String,
    pub record_count: u32,
    pub date_range: Option<String>,
    pub shop: String,
    pub file_size_kb: String,
}

/// Everything the failure email needs to be useful to a recipient: what broke,
/// which category, and an execution id for support correlation. No stack
/// traces leave the service.
#[derive(Debug, Clone)]
pub struct FailureNotice {
    pub report_name: String,
    pub report_type: String,
    pub error_message: String,
    pub category: ErrorCategory,
    pub execution_id: String,
    pub shop: String,
}

/// Aggregated per-recipient results for one delivery pass.
#[derive(Debug, Clone, Default)]
pub struct DeliveryOutcome {
    pub emails_sent: u32,
    pub emails_failed: u32,
    pub errors: Vec<String>,
}

impl DeliveryOutcome {
    /// Delivery counts as successful when at least one email went out.
    pub fn succeeded(&self) -> bool {
        self.emails_sent > 0
    }

    fn record(&mut self, recipient: &Recipient, result: Result<()>) {
        match result {
            Ok(()) => {
                self.emails_sent += 1;
                tracing::info!("📤 Email sent to: {}", recipient.email);
            }
            Err(e) => {
                self.emails_failed += 1;
                let message = format!("Failed to send email to {}: {e}", recipient.email);
                tracing::warn!("⚠️ {message}");
                self.errors.push(message);
            }
        }
    }
}

/// Delivery seam: the orchestrator depends on this, not on SMTP plumbing.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send the artifact to every recipient independently.
    async fn send_report(
        &self,
        recipients: &[Recipient],
        summary: &ReportSummary,
        attachment: &Path,
    ) -> DeliveryOutcome;

    /// Best-effort diagnostic notice after a failed execution.
    async fn send_failure(
        &self,
        recipients: &[Recipient],
        notice: &FailureNotice,
    ) -> DeliveryOutcome;
}

/// lettre-backed SMTP mailer (STARTTLS relay with credentials).
pub struct SmtpMailer {
    config: SmtpConfig,
}

impl SmtpMailer {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
        let creds = Credentials::new(self.config.user.clone(), self.config.password.clone());
        Ok(
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.host)
                .map_err(|e| ReportFlowError::Delivery(format!("SMTP relay: {e}")))?
                .port(self.config.port)
                .credentials(creds)
                .build(),
        )
    }

    fn from_mailbox(&self) -> Result<Mailbox> {
        format!("{} <{}>", self.config.from_name, self.config.from_email)
            .parse()
            .map_err(|e| ReportFlowError::Config(format!("Invalid from address: {e}")))
    }

    /// Probe the SMTP connection without sending anything.
    pub async fn verify(&self) -> Result<()> {
        let ok = self
            .transport()?
            .test_connection()
            .await
            .map_err(|e| ReportFlowError::Delivery(format!("SMTP connection test: {e}")))?;
        if ok {
            Ok(())
        } else {
            Err(ReportFlowError::Delivery("SMTP connection test failed".into()))
        }
    }

    async fn send_one(
        &self,
        recipient: &Recipient,
        subject: &str,
        text: String,
        html: String,
        attachment: Option<(&str, Vec<u8>)>,
    ) -> Result<()> {
        let to: Mailbox = recipient
            .email
            .parse()
            .map_err(|e| ReportFlowError::InvalidRecipient(format!("{}: {e}", recipient.email)))?;

        let builder = Message::builder()
            .from(self.from_mailbox()?)
            .to(to)
            .subject(subject);

        let body = MultiPart::alternative_plain_html(text, html);
        let message = match attachment {
            Some((filename, bytes)) => {
                let content_type = ContentType::parse("text/csv")
                    .map_err(|e| ReportFlowError::Delivery(format!("Attachment type: {e}")))?;
                builder.multipart(
                    MultiPart::mixed()
                        .multipart(body)
                        .singlepart(Attachment::new(filename.to_string()).body(bytes, content_type)),
                )
            }
            None => builder.multipart(body),
        }
        .map_err(|e| ReportFlowError::Delivery(format!("Build email: {e}")))?;

        self.transport()?
            .send(message)
            .await
            .map_err(|e| ReportFlowError::Delivery(format!("SMTP send: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_report(
        &self,
        recipients: &[Recipient],
        summary: &ReportSummary,
        attachment: &Path,
    ) -> DeliveryOutcome {
        let mut outcome = DeliveryOutcome::default();

        let bytes = match std::fs::read(attachment) {
            Ok(bytes) => bytes,
            Err(e) => {
                // No artifact means nothing can be delivered to anyone.
                outcome.emails_failed = recipients.len() as u32;
                outcome
                    .errors
                    .push(format!("Report file not found: {}: {e}", attachment.display()));
                return outcome;
            }
        };
        let filename = attachment
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| "report.csv".to_string());

        let subject = format!(
            "{} - {}",
            summary.report_name,
            chrono::Utc::now().format("%Y-%m-%d")
        );
        for recipient in recipients {
            let text = template::report_text(recipient.display_name(), summary);
            let html = template::report_html(recipient.display_name(), summary);
            let result = self
                .send_one(recipient, &subject, text, html, Some((&filename, bytes.clone())))
                .await;
            outcome.record(recipient, result);
        }
        outcome
    }

    async fn send_failure(
        &self,
        recipients: &[Recipient],
        notice: &FailureNotice,
    ) -> DeliveryOutcome {
        let mut outcome = DeliveryOutcome::default();
        let subject = format!("⚠️ Report Failed: {}", notice.report_name);
        tracing::info!(
            "📧 Sending failure notification for report: {}",
            notice.report_name
        );
        for recipient in recipients {
            let text = template::failure_text(notice);
            let html = template::failure_html(notice);
            let result = self.send_one(recipient, &subject, text, html, None).await;
            outcome.record(recipient, result);
        }
        outcome
    }
}
