//! One report execution from start to finish.
//!
//! Flow: load schedule -> ledger checkpoint (RUNNING) -> fetch -> transform ->
//! artifact -> delivery -> terminal ledger update + reschedule -> cleanup.
//! The reschedule runs exactly once per execution no matter which stage
//! failed, so a broken schedule waits for its next natural slot instead of
//! retrying every poll tick.

use chrono::Utc;
use std::path::Path;
use std::sync::Arc;

use reportflow_core::catalog::{report_info, selected_fields};
use reportflow_core::config::{FetchConfig, ReportFlowConfig};
use reportflow_core::daterange::DateRange;
use reportflow_core::error::{ReportFlowError, Result};
use reportflow_core::recurrence;
use reportflow_core::types::{ExecutionRecord, ExecutionStatus, ScheduleDefinition};
use reportflow_delivery::{FailureNotice, Mailer, ReportSummary};
use reportflow_report::{ArtifactWriter, remove_artifact, transform};
use reportflow_shopify::{AdminClient, CredentialProvider, GraphqlTransport, fetch_report};
use reportflow_store::Store;

/// Builds a transport for one tenant's credentials; injectable so tests run
/// against a fake API.
pub type TransportFactory =
    Arc<dyn Fn(&str, &str) -> Arc<dyn GraphqlTransport> + Send + Sync>;

/// Caller-facing result of one execution attempt.
#[derive(Debug, Clone)]
pub struct ExecutionSummary {
    pub execution_id: String,
    pub success: bool,
    pub record_count: u32,
    pub emails_sent: u32,
    pub error: Option<String>,
}

/// Orchestrates report executions against injected collaborators.
pub struct Executor {
    store: Arc<Store>,
    credentials: Arc<dyn CredentialProvider>,
    mailer: Arc<dyn Mailer>,
    transport_factory: TransportFactory,
    fetch_cfg: FetchConfig,
    artifacts: ArtifactWriter,
}

impl Executor {
    pub fn new(
        store: Arc<Store>,
        credentials: Arc<dyn CredentialProvider>,
        mailer: Arc<dyn Mailer>,
        config: &ReportFlowConfig,
    ) -> Self {
        let api = config.api.clone();
        let transport_factory: TransportFactory = Arc::new(move |shop, token| {
            Arc::new(AdminClient::new(shop, token, &api)) as Arc<dyn GraphqlTransport>
        });
        Self {
            store,
            credentials,
            mailer,
            transport_factory,
            fetch_cfg: config.fetch.clone(),
            artifacts: ArtifactWriter::new(config.storage.artifacts_dir.clone()),
        }
    }

    /// Swap the transport factory (tests, alternate API backends).
    pub fn with_transport_factory(mut self, factory: TransportFactory) -> Self {
        self.transport_factory = factory;
        self
    }

    /// Execute one schedule now.
    ///
    /// Schedule-not-found / inactive / wrong-tenant are configuration errors
    /// and fail before any ledger record exists. Once the RUNNING record is
    /// written, every path ends in a terminal ledger state.
    pub async fn execute(&self, schedule_id: &str, shop: &str) -> Result<ExecutionSummary> {
        let schedule = self
            .store
            .get_schedule(schedule_id)?
            .ok_or_else(|| ReportFlowError::Config(format!("schedule not found: {schedule_id}")))?;
        if schedule.shop != shop {
            return Err(ReportFlowError::Config(format!(
                "schedule {schedule_id} does not belong to {shop}"
            )));
        }
        if !schedule.active {
            return Err(ReportFlowError::Config(format!(
                "schedule is not active: {schedule_id}"
            )));
        }

        let mut record = ExecutionRecord::start(&schedule.id);
        self.store.insert_execution(&record)?;
        tracing::info!(
            "🏃 Execution {} started for '{}' ({})",
            record.id,
            schedule.name,
            schedule.shop
        );

        let outcome = self.run_stages(&schedule, &mut record).await;

        // Terminal ledger update, artifact cleanup, and the one reschedule.
        let now = Utc::now();
        record.completed_at = Some(now);
        match &outcome {
            Ok(()) => record.status = ExecutionStatus::Success,
            Err(err) => {
                record.status = ExecutionStatus::Failed;
                record.error_message = Some(err.to_string());
                record.error_category = Some(err.category().label().to_string());
            }
        }
        if let Some(path) = record.file_path.take() {
            remove_artifact(Path::new(&path));
        }
        if let Err(e) = self.store.update_execution(&record) {
            tracing::error!("💥 Failed to finalize execution {}: {e}", record.id);
        }

        let next_run = recurrence::next_run_for(&schedule, now);
        match self.store.set_run_times(&schedule.id, now, next_run) {
            Ok(()) => tracing::info!("📅 Next run for '{}': {next_run}", schedule.name),
            Err(e) => tracing::error!("💥 Failed to reschedule '{}': {e}", schedule.name),
        }

        if let Err(err) = &outcome {
            tracing::warn!("⚠️ Execution {} failed: {err}", record.id);
            let notice = FailureNotice {
                report_name: schedule.name.clone(),
                report_type: report_info(schedule.report_type).name.to_string(),
                error_message: err.to_string(),
                category: err.category(),
                execution_id: record.id.clone(),
                shop: schedule.shop.clone(),
            };
            let sent = self.mailer.send_failure(&schedule.recipients, &notice).await;
            if !sent.succeeded() && !schedule.recipients.is_empty() {
                tracing::warn!(
                    "⚠️ Failure notification for execution {} could not be delivered",
                    record.id
                );
            }
        } else {
            tracing::info!("✅ Execution {} completed", record.id);
        }

        Ok(ExecutionSummary {
            execution_id: record.id.clone(),
            success: outcome.is_ok(),
            record_count: record.record_count.unwrap_or(0),
            emails_sent: record.emails_sent,
            error: outcome.err().map(|e| e.to_string()),
        })
    }

    /// Fetch, transform, write, deliver. Fills ledger counters as stages
    /// complete; any error aborts the remaining stages.
    async fn run_stages(
        &self,
        schedule: &ScheduleDefinition,
        record: &mut ExecutionRecord,
    ) -> Result<()> {
        let token = self.credentials.access_token(&schedule.shop).await?;
        let transport = (self.transport_factory)(&schedule.shop, &token);
        let fetched = fetch_report(
            transport.as_ref(),
            schedule.report_type,
            &schedule.filters,
            &self.fetch_cfg,
        )
        .await?;
        tracing::info!(
            "📥 Fetched {} record(s) for '{}'",
            fetched.record_count,
            schedule.name
        );

        let rows = transform(schedule.report_type, &fetched.records, &schedule.filters)?;
        record.record_count = Some(rows.len() as u32);

        let fields = selected_fields(schedule.report_type, &schedule.fields);
        let artifact = self.artifacts.write(&schedule.name, &fields, &rows)?;
        record.file_size = Some(artifact.size);
        record.file_path = Some(artifact.path.to_string_lossy().into_owned());

        let summary = ReportSummary {
            report_name: schedule.name.clone(),
            report_type: report_info(schedule.report_type).name.to_string(),
            record_count: rows.len() as u32,
            date_range: schedule
                .filters
                .get_str("dateRange")
                .map(|tag| DateRange::from_tag(tag).label().to_string()),
            shop: schedule.shop.clone(),
            file_size_kb: format!("{:.2}", artifact.size as f64 / 1024.0),
        };
        // Full email failure does not revert a successful export to FAILED.
        let delivery = self
            .mailer
            .send_report(&schedule.recipients, &summary, &artifact.path)
            .await;
        record.emails_sent = delivery.emails_sent;
        record.emails_failed = delivery.emails_failed;
        tracing::info!(
            "📧 Emails sent: {}, failed: {}",
            delivery.emails_sent,
            delivery.emails_failed
        );
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use async_trait::async_trait;
    use reportflow_delivery::DeliveryOutcome;
    use reportflow_core::types::Recipient;
    use serde_json::{Value, json};
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Static-token provider.
    pub struct FixedCredentials;

    #[async_trait]
    impl CredentialProvider for FixedCredentials {
        async fn access_token(&self, _shop: &str) -> Result<String> {
            Ok("shpat_test".into())
        }
    }

    /// One empty page of orders, optionally after a delay or as a failure.
    pub struct FakeApi {
        pub delay: Duration,
        pub fail_with: Option<fn(String) -> ReportFlowError>,
    }

    #[async_trait]
    impl GraphqlTransport for FakeApi {
        async fn execute(&self, _document: &str, _variables: Value) -> Result<Value> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if let Some(make) = self.fail_with {
                return Err(make("fake API failure".into()));
            }
            Ok(json!({
                "orders": {
                    "edges": [{"node": {
                        "id": "gid://order/1",
                        "name": "#1001",
                        "createdAt": "2026-04-02T10:00:00Z",
                        "totalPriceSet": {"shopMoney": {"amount": "100.00"}},
                        "totalDiscountsSet": {"shopMoney": {"amount": "0"}},
                        "totalTaxSet": {"shopMoney": {"amount": "0"}}
                    }}],
                    "pageInfo": {"hasNextPage": false, "endCursor": null}
                }
            }))
        }
    }

    /// Records every delivery call; scripted addresses fail.
    #[derive(Default)]
    pub struct RecordingMailer {
        pub fail_addresses: HashSet<String>,
        pub reports: Mutex<Vec<ReportSummary>>,
        pub failures: Mutex<Vec<FailureNotice>>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send_report(
            &self,
            recipients: &[Recipient],
            summary: &ReportSummary,
            _attachment: &Path,
        ) -> DeliveryOutcome {
            self.reports.lock().unwrap().push(summary.clone());
            let mut outcome = DeliveryOutcome::default();
            for r in recipients {
                if self.fail_addresses.contains(&r.email) {
                    outcome.emails_failed += 1;
                    outcome.errors.push(format!("Failed to send email to {}", r.email));
                } else {
                    outcome.emails_sent += 1;
                }
            }
            outcome
        }

        async fn send_failure(
            &self,
            recipients: &[Recipient],
            notice: &FailureNotice,
        ) -> DeliveryOutcome {
            self.failures.lock().unwrap().push(notice.clone());
            DeliveryOutcome {
                emails_sent: recipients.len() as u32,
                ..Default::default()
            }
        }
    }

    /// Executor wired to fakes, plus the store and mailer for assertions.
    pub fn test_executor(
        api: fn(&str) -> FakeApi,
        mailer: RecordingMailer,
    ) -> (Executor, Arc<Store>, Arc<RecordingMailer>) {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let mailer = Arc::new(mailer);
        let mut config = ReportFlowConfig::default();
        config.storage.artifacts_dir = std::env::temp_dir()
            .join(format!("reportflow-exec-{}", uuid_suffix()))
            .to_string_lossy()
            .into_owned();
        config.fetch.initial_delay_ms = 1;
        config.fetch.max_delay_ms = 2;

        let executor = Executor::new(
            store.clone(),
            Arc::new(FixedCredentials),
            mailer.clone(),
            &config,
        )
        .with_transport_factory(Arc::new(move |shop, _token| {
            Arc::new(api(shop)) as Arc<dyn GraphqlTransport>
        }));
        (executor, store, mailer)
    }

    fn uuid_suffix() -> String {
        use std::time::{SystemTime, UNIX_EPOCH};
        let t = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
        format!("{:x}{:x}", t.as_secs(), t.subsec_nanos())
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use reportflow_core::types::{FilterValue, Recipient, ReportType};
    use std::time::Duration;

    fn schedule_with_recipients(store: &Store, emails: &[&str]) -> ScheduleDefinition {
        let mut s = ScheduleDefinition::new("demo.myshopify.com", "Daily Sales", ReportType::Sales);
        s.filters
            .insert("dateRange", FilterValue::Str("LAST_7_DAYS".into()));
        for email in emails {
            s.recipients.push(Recipient::new(*email));
        }
        s.next_run_at = Some(Utc::now() - chrono::Duration::minutes(1));
        store.insert_schedule(&s).unwrap();
        s
    }

    fn ok_api(_shop: &str) -> FakeApi {
        FakeApi {
            delay: Duration::ZERO,
            fail_with: None,
        }
    }

    fn throttled_api(_shop: &str) -> FakeApi {
        FakeApi {
            delay: Duration::ZERO,
            fail_with: Some(ReportFlowError::Throttled),
        }
    }

    #[tokio::test]
    async fn test_success_path_cleans_artifact_and_counts_emails() {
        let (executor, store, mailer) = test_executor(ok_api, RecordingMailer::default());
        let schedule = schedule_with_recipients(&store, &["a@example.com", "b@example.com"]);

        let summary = executor
            .execute(&schedule.id, "demo.myshopify.com")
            .await
            .unwrap();
        assert!(summary.success);
        assert_eq!(summary.record_count, 1);
        assert_eq!(summary.emails_sent, 2);

        let record = store.get_execution(&summary.execution_id).unwrap().unwrap();
        assert_eq!(record.status, ExecutionStatus::Success);
        assert_eq!(record.emails_sent + record.emails_failed, 2);
        // Artifact path is cleared and the file itself is gone.
        assert!(record.file_path.is_none());
        assert!(record.file_size.unwrap() > 0);
        assert_eq!(mailer.reports.lock().unwrap().len(), 1);

        let updated = store.get_schedule(&schedule.id).unwrap().unwrap();
        assert!(updated.next_run_at.unwrap() > Utc::now());
        assert!(updated.last_run_at.is_some());
    }

    #[tokio::test]
    async fn test_fetch_failure_records_failed_and_still_reschedules() {
        let (executor, store, mailer) = test_executor(throttled_api, RecordingMailer::default());
        let schedule = schedule_with_recipients(&store, &["a@example.com"]);

        let summary = executor
            .execute(&schedule.id, "demo.myshopify.com")
            .await
            .unwrap();
        assert!(!summary.success);

        let records = store.list_executions(&schedule.id, 10).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, ExecutionStatus::Failed);
        assert_eq!(records[0].error_category.as_deref(), Some("Admin API Rate Limit"));
        assert!(records[0].file_path.is_none());

        // Reschedule happened despite the failure.
        let updated = store.get_schedule(&schedule.id).unwrap().unwrap();
        assert!(updated.next_run_at.unwrap() > Utc::now());

        // Failure path notified the same recipients.
        let failures = mailer.failures.lock().unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].execution_id, records[0].id);
    }

    #[tokio::test]
    async fn test_config_errors_never_reach_the_ledger() {
        let (executor, store, _mailer) = test_executor(ok_api, RecordingMailer::default());

        let err = executor
            .execute("missing-id", "demo.myshopify.com")
            .await
            .unwrap_err();
        assert!(matches!(err, ReportFlowError::Config(_)));

        let mut inactive =
            ScheduleDefinition::new("demo.myshopify.com", "Paused", ReportType::Orders);
        inactive.active = false;
        store.insert_schedule(&inactive).unwrap();
        let err = executor
            .execute(&inactive.id, "demo.myshopify.com")
            .await
            .unwrap_err();
        assert!(matches!(err, ReportFlowError::Config(_)));
        assert!(store.list_executions(&inactive.id, 10).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_wrong_tenant_is_a_config_error() {
        let (executor, store, _mailer) = test_executor(ok_api, RecordingMailer::default());
        let schedule = schedule_with_recipients(&store, &[]);
        let err = executor
            .execute(&schedule.id, "other.myshopify.com")
            .await
            .unwrap_err();
        assert!(matches!(err, ReportFlowError::Config(_)));
    }

    #[tokio::test]
    async fn test_recipient_isolation_two_sent_one_failed() {
        let mailer = RecordingMailer {
            fail_addresses: ["bad@example.com".to_string()].into_iter().collect(),
            ..Default::default()
        };
        let (executor, store, _mailer) = test_executor(ok_api, mailer);
        let schedule = schedule_with_recipients(
            &store,
            &["a@example.com", "bad@example.com", "c@example.com"],
        );

        let summary = executor
            .execute(&schedule.id, "demo.myshopify.com")
            .await
            .unwrap();
        let record = store.get_execution(&summary.execution_id).unwrap().unwrap();
        assert_eq!(record.emails_sent, 2);
        assert_eq!(record.emails_failed, 1);
        assert_eq!(record.status, ExecutionStatus::Success);
    }

    #[tokio::test]
    async fn test_total_email_failure_keeps_execution_success() {
        let mailer = RecordingMailer {
            fail_addresses: ["a@example.com".to_string()].into_iter().collect(),
            ..Default::default()
        };
        let (executor, store, _mailer) = test_executor(ok_api, mailer);
        let schedule = schedule_with_recipients(&store, &["a@example.com"]);

        let summary = executor
            .execute(&schedule.id, "demo.myshopify.com")
            .await
            .unwrap();
        assert!(summary.success);
        let record = store.get_execution(&summary.execution_id).unwrap().unwrap();
        assert_eq!(record.status, ExecutionStatus::Success);
        assert_eq!(record.emails_failed, 1);
    }
}
