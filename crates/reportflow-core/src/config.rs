//! ReportFlow configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ReportFlowError, Result};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReportFlowConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub smtp: SmtpConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub api: AdminApiConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
}

impl ReportFlowConfig {
    /// Load config from `REPORTFLOW_CONFIG` or the default path
    /// (~/.reportflow/config.toml). Missing file yields defaults.
    pub fn load() -> Result<Self> {
        let path = std::env::var("REPORTFLOW_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::default_path());
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ReportFlowError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| ReportFlowError::Config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| ReportFlowError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the ReportFlow home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".reportflow")
    }
}

/// Database and artifact locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
    /// Where generated CSVs live between generation and delivery.
    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: String,
}

fn default_db_path() -> String {
    ReportFlowConfig::home_dir()
        .join("reportflow.db")
        .to_string_lossy()
        .into_owned()
}
fn default_artifacts_dir() -> String {
    ReportFlowConfig::home_dir()
        .join("artifacts")
        .to_string_lossy()
        .into_owned()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            artifacts_dir: default_artifacts_dir(),
        }
    }
}

/// Outbound SMTP configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    #[serde(default = "default_smtp_host")]
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_from_email")]
    pub from_email: String,
    #[serde(default = "default_from_name")]
    pub from_name: String,
}

fn default_smtp_host() -> String {
    "smtp.gmail.com".into()
}
fn default_smtp_port() -> u16 {
    587
}
fn default_from_email() -> String {
    "noreply@reportflow.app".into()
}
fn default_from_name() -> String {
    "Report Flow".into()
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: default_smtp_host(),
            port: default_smtp_port(),
            user: String::new(),
            password: String::new(),
            from_email: default_from_email(),
            from_name: default_from_name(),
        }
    }
}

/// Due-schedule poller tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds between due-schedule checks.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

fn default_poll_interval() -> u64 {
    300
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
        }
    }
}

/// Admin API fetch tuning: page sizes, ceilings, and the retry budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Records requested per page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Hard ceiling on pages per fetch; results past it are silently truncated.
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    /// Retries after the initial attempt for throttle/transport failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_page_size() -> u32 {
    250
}
fn default_max_pages() -> u32 {
    20
}
fn default_max_retries() -> u32 {
    3
}
fn default_initial_delay_ms() -> u64 {
    1000
}
fn default_max_delay_ms() -> u64 {
    10_000
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_pages: default_max_pages(),
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

/// Admin GraphQL API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminApiConfig {
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_version() -> String {
    "2024-10".into()
}
fn default_timeout_secs() -> u64 {
    30
}

impl Default for AdminApiConfig {
    fn default() -> Self {
        Self {
            api_version: default_api_version(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Control-surface HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_gateway_port")]
    pub port: u16,
}

fn default_bind() -> String {
    "127.0.0.1".into()
}
fn default_gateway_port() -> u16 {
    8790
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_gateway_port(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = ReportFlowConfig::default();
        assert_eq!(cfg.fetch.page_size, 250);
        assert_eq!(cfg.fetch.max_pages, 20);
        assert_eq!(cfg.fetch.max_retries, 3);
        assert_eq!(cfg.scheduler.poll_interval_secs, 300);
        assert_eq!(cfg.smtp.port, 587);
    }

    #[test]
    fn test_partial_toml() {
        let cfg: ReportFlowConfig = toml::from_str(
            r#"
            [fetch]
            max_pages = 5

            [smtp]
            host = "mail.example.com"
            user = "reports"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.fetch.max_pages, 5);
        assert_eq!(cfg.fetch.page_size, 250);
        assert_eq!(cfg.smtp.host, "mail.example.com");
        assert_eq!(cfg.smtp.from_name, "Report Flow");
    }
}
