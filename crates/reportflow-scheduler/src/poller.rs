//! Due-schedule poller with per-tenant mutual exclusion.
//!
//! A single interval drives the poll loop. Each tick groups due schedules by
//! shop and spawns one background batch per shop; the tick itself never waits
//! on report execution. A shop whose previous batch is still running is
//! skipped for the tick - its schedules simply wait for the next one.

use chrono::Utc;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

use reportflow_core::types::ScheduleDefinition;
use reportflow_store::Store;

use crate::executor::Executor;

/// Operational snapshot for the control surface.
#[derive(Debug, Clone, Serialize)]
pub struct PollerStatus {
    pub running: bool,
    pub active_shops: Vec<String>,
}

struct Inner {
    store: Arc<Store>,
    executor: Arc<Executor>,
    poll_interval: Duration,
    running: AtomicBool,
    /// Shops with an in-flight batch. The only cross-tenant shared state.
    active_shops: Mutex<HashSet<String>>,
}

/// The background scheduler component. Constructed once at process start;
/// start/stop/status are methods, not module state, so tests can drive ticks
/// directly.
#[derive(Clone)]
pub struct ReportScheduler {
    inner: Arc<Inner>,
}

impl ReportScheduler {
    pub fn new(store: Arc<Store>, executor: Arc<Executor>, poll_interval: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                executor,
                poll_interval,
                running: AtomicBool::new(false),
                active_shops: Mutex::new(HashSet::new()),
            }),
        }
    }

    /// Start the poll loop as a background task. Idempotent.
    pub fn start(&self) {
        if self.inner.running.swap(true, Ordering::SeqCst) {
            tracing::info!("Scheduler already running");
            return;
        }
        tracing::info!(
            "⏰ Scheduler started (check every {}s)",
            self.inner.poll_interval.as_secs()
        );
        let inner = self.inner.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(inner.poll_interval);
            loop {
                interval.tick().await;
                if !inner.running.load(Ordering::SeqCst) {
                    tracing::info!("⏹ Scheduler stopped");
                    break;
                }
                Self::run_tick(&inner).await;
            }
        });
    }

    /// Stop polling after the current tick. In-flight batches run to
    /// completion; there is no cancellation of a started execution.
    pub fn stop(&self) {
        self.inner.running.store(false, Ordering::SeqCst);
    }

    /// Manual tick for operational use; independent of the interval loop.
    pub async fn trigger_now(&self) {
        tracing::info!("🔔 Manual scheduler trigger requested");
        Self::run_tick(&self.inner).await;
    }

    pub async fn status(&self) -> PollerStatus {
        let mut active: Vec<String> = self
            .inner
            .active_shops
            .lock()
            .await
            .iter()
            .cloned()
            .collect();
        active.sort();
        PollerStatus {
            running: self.inner.running.load(Ordering::SeqCst),
            active_shops: active,
        }
    }

    /// One poll cycle: find due schedules, group by shop, dispatch batches.
    /// Never propagates a tenant's failure to other tenants or the next tick.
    async fn run_tick(inner: &Arc<Inner>) {
        let now = Utc::now();
        let due = match inner.store.due_schedules(now) {
            Ok(due) => due,
            Err(e) => {
                tracing::error!("💥 Due-schedule query failed: {e}");
                return;
            }
        };
        if due.is_empty() {
            tracing::debug!("😴 No reports due");
            return;
        }
        tracing::info!("📋 Found {} report(s) due to run", due.len());

        let mut by_shop: HashMap<String, Vec<ScheduleDefinition>> = HashMap::new();
        for schedule in due {
            by_shop.entry(schedule.shop.clone()).or_default().push(schedule);
        }

        for (shop, batch) in by_shop {
            let mut active = inner.active_shops.lock().await;
            if active.contains(&shop) {
                tracing::info!("⏭ Skipping {shop} - previous batch still running");
                continue;
            }
            active.insert(shop.clone());
            drop(active);

            let inner = inner.clone();
            tokio::spawn(async move {
                run_shop_batch(&inner, &shop, batch).await;
                inner.active_shops.lock().await.remove(&shop);
            });
        }
    }
}

/// Execute a shop's due schedules strictly sequentially, in due-query order,
/// so one tenant never runs concurrent fetches against its own API quota.
async fn run_shop_batch(inner: &Inner, shop: &str, batch: Vec<ScheduleDefinition>) {
    tracing::info!("🏪 Executing {} report(s) for {shop}", batch.len());
    let mut succeeded = 0u32;
    let mut failed = 0u32;
    for schedule in batch {
        match inner.executor.execute(&schedule.id, shop).await {
            Ok(summary) if summary.success => succeeded += 1,
            Ok(_) => failed += 1,
            Err(e) => {
                tracing::error!("💥 Could not execute '{}': {e}", schedule.name);
                failed += 1;
            }
        }
    }
    tracing::info!("✅ Completed for {shop}: {succeeded} succeeded, {failed} failed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::test_support::{FakeApi, RecordingMailer, test_executor};
    use chrono::Duration as ChronoDuration;
    use reportflow_core::types::{FilterValue, ReportType, ScheduleDefinition};
    use reportflow_core::error::ReportFlowError;

    fn due_schedule(store: &Store, shop: &str, name: &str) -> ScheduleDefinition {
        let mut s = ScheduleDefinition::new(shop, name, ReportType::Sales);
        s.filters
            .insert("dateRange", FilterValue::Str("TODAY".into()));
        s.next_run_at = Some(Utc::now() - ChronoDuration::minutes(1));
        store.insert_schedule(&s).unwrap();
        s
    }

    fn make_due_again(store: &Store, schedule_id: &str) {
        store
            .set_run_times(
                schedule_id,
                Utc::now() - ChronoDuration::hours(1),
                Utc::now() - ChronoDuration::minutes(1),
            )
            .unwrap();
    }

    /// Shop A's API is slow; shop B's is instant.
    fn split_api(shop: &str) -> FakeApi {
        FakeApi {
            delay: if shop.starts_with("slow") {
                std::time::Duration::from_millis(300)
            } else {
                std::time::Duration::ZERO
            },
            fail_with: None,
        }
    }

    #[tokio::test]
    async fn test_slow_tenant_skipped_while_running() {
        let (executor, store, _mailer) = test_executor(split_api, RecordingMailer::default());
        let scheduler =
            ReportScheduler::new(store.clone(), Arc::new(executor), Duration::from_secs(300));

        let slow = due_schedule(&store, "slow.myshopify.com", "Slow report");
        let fast = due_schedule(&store, "fast.myshopify.com", "Fast report");

        scheduler.trigger_now().await;
        // Give the fast batch time to finish; the slow one is still sleeping.
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        let status = scheduler.status().await;
        assert_eq!(status.active_shops, vec!["slow.myshopify.com"]);

        // Both schedules come due again; the slow shop must be skipped.
        make_due_again(&store, &slow.id);
        make_due_again(&store, &fast.id);
        scheduler.trigger_now().await;

        // Let everything drain.
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;

        assert_eq!(store.list_executions(&slow.id, 10).unwrap().len(), 1);
        assert_eq!(store.list_executions(&fast.id, 10).unwrap().len(), 2);
        assert!(scheduler.status().await.active_shops.is_empty());
    }

    #[tokio::test]
    async fn test_within_shop_batch_is_sequential() {
        let (executor, store, _mailer) = test_executor(split_api, RecordingMailer::default());
        let scheduler =
            ReportScheduler::new(store.clone(), Arc::new(executor), Duration::from_secs(300));

        let first = due_schedule(&store, "fast.myshopify.com", "First");
        let second = due_schedule(&store, "fast.myshopify.com", "Second");

        scheduler.trigger_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;

        let a = store.latest_execution(&first.id).unwrap().unwrap();
        let b = store.latest_execution(&second.id).unwrap().unwrap();
        // Sequential within a shop: whichever ran second started only after
        // the other completed. Batch order follows the due query, not names.
        let (earlier, later) = if a.started_at <= b.started_at { (a, b) } else { (b, a) };
        assert!(later.started_at >= earlier.completed_at.unwrap());
    }

    #[tokio::test]
    async fn test_one_tenant_failure_does_not_block_others() {
        fn failing_for_bad(shop: &str) -> FakeApi {
            FakeApi {
                delay: std::time::Duration::ZERO,
                fail_with: if shop.starts_with("bad") {
                    Some(ReportFlowError::Api)
                } else {
                    None
                },
            }
        }
        let (executor, store, _mailer) =
            test_executor(failing_for_bad, RecordingMailer::default());
        let scheduler =
            ReportScheduler::new(store.clone(), Arc::new(executor), Duration::from_secs(300));

        let bad = due_schedule(&store, "bad.myshopify.com", "Broken");
        let good = due_schedule(&store, "good.myshopify.com", "Working");

        scheduler.trigger_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;

        use reportflow_core::types::ExecutionStatus;
        assert_eq!(
            store.latest_execution(&bad.id).unwrap().unwrap().status,
            ExecutionStatus::Failed
        );
        assert_eq!(
            store.latest_execution(&good.id).unwrap().unwrap().status,
            ExecutionStatus::Success
        );
    }

    #[tokio::test]
    async fn test_start_stop_status() {
        let (executor, store, _mailer) = test_executor(split_api, RecordingMailer::default());
        let scheduler =
            ReportScheduler::new(store.clone(), Arc::new(executor), Duration::from_secs(300));

        assert!(!scheduler.status().await.running);
        scheduler.start();
        assert!(scheduler.status().await.running);
        scheduler.start(); // idempotent
        scheduler.stop();
        assert!(!scheduler.status().await.running);
    }
}
