//! Domain types: schedules, typed filters, recipients, and the execution ledger.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// All report types the catalog knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportType {
    Sales,
    Orders,
    Products,
    Customers,
    Inventory,
    Traffic,
    Discounts,
    FinanceSummary,
}

impl ReportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sales => "SALES",
            Self::Orders => "ORDERS",
            Self::Products => "PRODUCTS",
            Self::Customers => "CUSTOMERS",
            Self::Inventory => "INVENTORY",
            Self::Traffic => "TRAFFIC",
            Self::Discounts => "DISCOUNTS",
            Self::FinanceSummary => "FINANCE_SUMMARY",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "SALES" => Some(Self::Sales),
            "ORDERS" => Some(Self::Orders),
            "PRODUCTS" => Some(Self::Products),
            "CUSTOMERS" => Some(Self::Customers),
            "INVENTORY" => Some(Self::Inventory),
            "TRAFFIC" => Some(Self::Traffic),
            "DISCOUNTS" => Some(Self::Discounts),
            "FINANCE_SUMMARY" => Some(Self::FinanceSummary),
            _ => None,
        }
    }
}

impl std::fmt::Display for ReportType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recurrence frequency for a schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Custom,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "DAILY",
            Self::Weekly => "WEEKLY",
            Self::Monthly => "MONTHLY",
            Self::Custom => "CUSTOM",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "DAILY" => Some(Self::Daily),
            "WEEKLY" => Some(Self::Weekly),
            "MONTHLY" => Some(Self::Monthly),
            "CUSTOM" => Some(Self::Custom),
            _ => None,
        }
    }
}

/// A typed filter value. Validated at the schedule-management boundary so the
/// fetcher and transformer never see loose JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FilterValue {
    Str(String),
    List(Vec<String>),
    Date(NaiveDate),
    Bool(bool),
}

impl FilterValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Multi-value view: a single string counts as a one-element group.
    pub fn as_list(&self) -> Vec<&str> {
        match self {
            Self::Str(s) => vec![s.as_str()],
            Self::List(v) => v.iter().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(d) => Some(*d),
            Self::Str(s) => s.parse().ok(),
            _ => None,
        }
    }
}

/// Named filter set attached to a schedule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSet(HashMap<String, FilterValue>);

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: FilterValue) {
        self.0.insert(key.into(), value);
    }

    pub fn with(mut self, key: impl Into<String>, value: FilterValue) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&FilterValue> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(FilterValue::as_str)
    }

    /// Values for a multi-select filter; empty if absent.
    pub fn get_list(&self, key: &str) -> Vec<&str> {
        self.0.get(key).map(FilterValue::as_list).unwrap_or_default()
    }

    pub fn get_date(&self, key: &str) -> Option<NaiveDate> {
        self.0.get(key).and_then(FilterValue::as_date)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FilterValue)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// An email recipient of a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipient {
    pub email: String,
    pub name: Option<String>,
}

impl Recipient {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: None,
        }
    }

    /// Display name: configured name, or the mailbox part of the address.
    pub fn display_name(&self) -> &str {
        match &self.name {
            Some(n) if !n.is_empty() => n,
            _ => self.email.split('@').next().unwrap_or(&self.email),
        }
    }
}

/// A configured report schedule: what to run, how often, and who receives it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleDefinition {
    pub id: String,
    /// Owning tenant (store domain).
    pub shop: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub report_type: ReportType,
    pub frequency: Frequency,
    /// Time of day as "HH:MM" in the schedule's timezone.
    pub time_of_day: String,
    /// 0 = Sunday .. 6 = Saturday; weekly schedules only.
    #[serde(default)]
    pub day_of_week: Option<u8>,
    /// 1..31, or -1 for the last day of the month; monthly schedules only.
    #[serde(default)]
    pub day_of_month: Option<i8>,
    /// IANA timezone identifier, e.g. "America/New_York".
    pub timezone: String,
    pub active: bool,
    /// Ordered output field keys; empty means the full catalog schema.
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub filters: FilterSet,
    #[serde(default)]
    pub recipients: Vec<Recipient>,
    #[serde(default)]
    pub last_run_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub next_run_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ScheduleDefinition {
    /// Create a new daily schedule with defaults suitable for the store layer.
    pub fn new(shop: impl Into<String>, name: impl Into<String>, report_type: ReportType) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            shop: shop.into(),
            name: name.into(),
            description: None,
            report_type,
            frequency: Frequency::Daily,
            time_of_day: "09:00".into(),
            day_of_week: None,
            day_of_month: None,
            timezone: "UTC".into(),
            active: true,
            fields: Vec::new(),
            filters: FilterSet::new(),
            recipients: Vec::new(),
            last_run_at: None,
            next_run_at: None,
            created_at: Utc::now(),
        }
    }

    /// Whether this schedule is due at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.active && self.next_run_at.is_some_and(|next| next <= now)
    }
}

/// Terminal and in-flight execution states. Transitions are one-way:
/// Running -> Success | Failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    Running,
    Success,
    Failed,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "RUNNING",
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "RUNNING" => Some(Self::Running),
            "SUCCESS" => Some(Self::Success),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// One execution attempt in the audit ledger. Created RUNNING at orchestration
/// start and moved to exactly one terminal state; only schedule deletion
/// removes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub id: String,
    pub schedule_id: String,
    pub status: ExecutionStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub record_count: Option<u32>,
    #[serde(default)]
    pub file_size: Option<u64>,
    /// Transient: set while the artifact exists, cleared after delivery.
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub error_category: Option<String>,
    #[serde(default)]
    pub emails_sent: u32,
    #[serde(default)]
    pub emails_failed: u32,
}

impl ExecutionRecord {
    /// Fresh RUNNING record for a schedule.
    pub fn start(schedule_id: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            schedule_id: schedule_id.into(),
            status: ExecutionStatus::Running,
            started_at: Utc::now(),
            completed_at: None,
            record_count: None,
            file_size: None,
            file_path: None,
            error_message: None,
            error_category: None,
            emails_sent: 0,
            emails_failed: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_type_roundtrip() {
        for rt in [
            ReportType::Sales,
            ReportType::Orders,
            ReportType::Products,
            ReportType::Customers,
            ReportType::Inventory,
            ReportType::Traffic,
            ReportType::Discounts,
            ReportType::FinanceSummary,
        ] {
            assert_eq!(ReportType::parse(rt.as_str()), Some(rt));
        }
        assert_eq!(ReportType::parse("BOGUS"), None);
    }

    #[test]
    fn test_filter_value_views() {
        let single = FilterValue::Str("online_store".into());
        assert_eq!(single.as_list(), vec!["online_store"]);

        let multi = FilterValue::List(vec!["pos".into(), "mobile".into()]);
        assert_eq!(multi.as_list(), vec!["pos", "mobile"]);

        let date = FilterValue::Str("2026-03-01".into());
        assert_eq!(
            date.as_date(),
            NaiveDate::from_ymd_opt(2026, 3, 1)
        );
    }

    #[test]
    fn test_recipient_display_name() {
        let named = Recipient {
            email: "ops@example.com".into(),
            name: Some("Ops Team".into()),
        };
        assert_eq!(named.display_name(), "Ops Team");

        let bare = Recipient::new("ana@example.com");
        assert_eq!(bare.display_name(), "ana");
    }

    #[test]
    fn test_schedule_due() {
        let mut s = ScheduleDefinition::new("demo.myshopify.com", "Daily sales", ReportType::Sales);
        let now = Utc::now();
        assert!(!s.is_due(now));

        s.next_run_at = Some(now - chrono::Duration::minutes(1));
        assert!(s.is_due(now));

        s.active = false;
        assert!(!s.is_due(now));
    }
}
