//! Admin GraphQL transport with throttle-aware retry.
//!
//! The API signals rate limiting through an error extension code rather than a
//! status, so throttling is detected in the response body and mapped to a
//! retryable error class. Everything else surfaces immediately.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::Duration;

use reportflow_core::config::{AdminApiConfig, FetchConfig};
use reportflow_core::error::{ReportFlowError, Result};

/// Executes GraphQL documents against one tenant's Admin API.
///
/// Implementations must map throttling to [`ReportFlowError::Throttled`] and
/// network-level failures to [`ReportFlowError::Transport`] so the retry loop
/// can tell them apart from permanent errors.
#[async_trait]
pub trait GraphqlTransport: Send + Sync {
    /// Execute one document and return the `data` payload.
    async fn execute(&self, document: &str, variables: Value) -> Result<Value>;
}

/// reqwest-backed transport for one shop + access token.
pub struct AdminClient {
    http: reqwest::Client,
    endpoint: String,
    access_token: String,
    timeout: Duration,
}

impl AdminClient {
    pub fn new(shop: &str, access_token: &str, api: &AdminApiConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: format!("https://{shop}/admin/api/{}/graphql.json", api.api_version),
            access_token: access_token.to_string(),
            timeout: Duration::from_secs(api.timeout_secs),
        }
    }
}

#[async_trait]
impl GraphqlTransport for AdminClient {
    async fn execute(&self, document: &str, variables: Value) -> Result<Value> {
        let resp = self
            .http
            .post(&self.endpoint)
            .header("X-Shopify-Access-Token", &self.access_token)
            .json(&json!({ "query": document, "variables": variables }))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ReportFlowError::Transport(format!("GraphQL request failed: {e}")))?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(ReportFlowError::Auth(format!(
                "Admin API rejected the access token ({status})"
            )));
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ReportFlowError::Throttled(format!("HTTP {status}")));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ReportFlowError::Api(format!("HTTP {status}: {body}")));
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| ReportFlowError::Api(format!("Invalid response body: {e}")))?;

        if let Some(errors) = body.get("errors").and_then(Value::as_array)
            && !errors.is_empty()
        {
            let throttled = errors.iter().any(|err| {
                err.pointer("/extensions/code").and_then(Value::as_str) == Some("THROTTLED")
            });
            let message = errors[0]
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown GraphQL error")
                .to_string();
            return if throttled {
                Err(ReportFlowError::Throttled(message))
            } else {
                Err(ReportFlowError::Api(message))
            };
        }

        Ok(body.get("data").cloned().unwrap_or(Value::Null))
    }
}

/// Execute with exponential backoff: throttle and transport failures consume
/// the retry budget; everything else surfaces at once. Never retries forever.
pub async fn execute_with_retry(
    transport: &dyn GraphqlTransport,
    document: &str,
    variables: Value,
    cfg: &FetchConfig,
) -> Result<Value> {
    let mut attempt: u32 = 0;
    loop {
        match transport.execute(document, variables.clone()).await {
            Ok(data) => return Ok(data),
            Err(err) if err.is_retryable() && attempt < cfg.max_retries => {
                let delay = backoff_delay(cfg, attempt);
                attempt += 1;
                tracing::warn!(
                    "⏳ {err} - retrying in {}ms (attempt {attempt}/{})",
                    delay.as_millis(),
                    cfg.max_retries
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Delay doubles per attempt, starting at `initial_delay_ms`, capped at
/// `max_delay_ms`.
fn backoff_delay(cfg: &FetchConfig, attempt: u32) -> Duration {
    let ms = cfg
        .initial_delay_ms
        .saturating_mul(2u64.saturating_pow(attempt))
        .min(cfg.max_delay_ms);
    Duration::from_millis(ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails with the scripted errors, then succeeds.
    struct ScriptedTransport {
        calls: AtomicU32,
        failures: u32,
        error: fn(String) -> ReportFlowError,
    }

    impl ScriptedTransport {
        fn throttled(failures: u32) -> Self {
            Self {
                calls: AtomicU32::new(0),
                failures,
                error: ReportFlowError::Throttled,
            }
        }
    }

    #[async_trait]
    impl GraphqlTransport for ScriptedTransport {
        async fn execute(&self, _document: &str, _variables: Value) -> Result<Value> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err((self.error)("scripted failure".into()))
            } else {
                Ok(json!({"ok": true}))
            }
        }
    }

    fn fast_cfg() -> FetchConfig {
        FetchConfig {
            initial_delay_ms: 1,
            max_delay_ms: 4,
            ..FetchConfig::default()
        }
    }

    #[tokio::test]
    async fn test_throttled_twice_then_succeeds() {
        let transport = ScriptedTransport::throttled(2);
        let out = execute_with_retry(&transport, "query {}", Value::Null, &fast_cfg())
            .await
            .unwrap();
        assert_eq!(out, json!({"ok": true}));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_budget_exhausted_surfaces_throttle() {
        let transport = ScriptedTransport::throttled(u32::MAX);
        let err = execute_with_retry(&transport, "query {}", Value::Null, &fast_cfg())
            .await
            .unwrap_err();
        assert!(matches!(err, ReportFlowError::Throttled(_)));
        // Initial attempt + the full retry budget.
        assert_eq!(transport.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_non_retryable_does_not_consume_budget() {
        let transport = ScriptedTransport {
            calls: AtomicU32::new(0),
            failures: u32::MAX,
            error: ReportFlowError::Api,
        };
        let err = execute_with_retry(&transport, "query {}", Value::Null, &fast_cfg())
            .await
            .unwrap_err();
        assert!(matches!(err, ReportFlowError::Api(_)));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let cfg = FetchConfig::default();
        assert_eq!(backoff_delay(&cfg, 0), Duration::from_millis(1000));
        assert_eq!(backoff_delay(&cfg, 1), Duration::from_millis(2000));
        assert_eq!(backoff_delay(&cfg, 2), Duration::from_millis(4000));
        assert_eq!(backoff_delay(&cfg, 5), Duration::from_millis(10_000));
    }
}
