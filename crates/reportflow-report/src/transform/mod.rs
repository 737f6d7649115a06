//! Report-type transformation strategies.
//!
//! One strategy per report type, resolved once: the catalog schema plus a pure
//! shaping function over raw records. New report types plug in here without
//! touching orchestration code.

mod customers;
mod discounts;
mod finance;
mod inventory;
mod orders;
mod products;
mod sales;

use serde_json::Value;

use reportflow_core::catalog::{FieldDef, report_info};
use reportflow_core::error::Result;
use reportflow_core::types::{FilterSet, ReportType};

use crate::row::Row;

/// Resolved transformation strategy for one report type.
#[derive(Clone, Copy)]
pub struct Strategy {
    pub schema: &'static [FieldDef],
    pub run: fn(&[Value], &FilterSet) -> Result<Vec<Row>>,
}

/// Strategy lookup.
pub fn strategy_for(report_type: ReportType) -> Strategy {
    let run = match report_type {
        ReportType::Sales => sales::transform,
        ReportType::Orders => orders::transform,
        ReportType::Products => products::transform,
        ReportType::Customers => customers::transform,
        ReportType::Inventory => inventory::transform,
        ReportType::Traffic => traffic_transform,
        ReportType::Discounts => discounts::transform,
        ReportType::FinanceSummary => finance::transform,
    };
    Strategy {
        schema: report_info(report_type).fields,
        run,
    }
}

/// Transform raw records into rows for a report type.
pub fn transform(
    report_type: ReportType,
    records: &[Value],
    filters: &FilterSet,
) -> Result<Vec<Row>> {
    (strategy_for(report_type).run)(records, filters)
}

/// Traffic has no data source; the fetcher fails before this runs, but the
/// strategy table stays total.
fn traffic_transform(_records: &[Value], _filters: &FilterSet) -> Result<Vec<Row>> {
    Ok(Vec::new())
}

// ─── Shared formatting helpers ────────────────────────────────

/// Fixed-point currency string with two decimals.
pub(crate) fn money(value: f64) -> String {
    format!("{value:.2}")
}

/// Numeric value at a JSON pointer; API money amounts arrive as strings.
pub(crate) fn number_at(record: &Value, pointer: &str) -> f64 {
    opt_number_at(record, pointer).unwrap_or(0.0)
}

pub(crate) fn opt_number_at(record: &Value, pointer: &str) -> Option<f64> {
    match record.pointer(pointer) {
        Some(Value::String(s)) => s.parse().ok(),
        Some(Value::Number(n)) => n.as_f64(),
        _ => None,
    }
}

pub(crate) fn int_at(record: &Value, pointer: &str) -> i64 {
    match record.pointer(pointer) {
        Some(Value::String(s)) => s.parse().unwrap_or(0),
        Some(Value::Number(n)) => n.as_i64().unwrap_or(0),
        _ => 0,
    }
}

pub(crate) fn str_at<'a>(record: &'a Value, pointer: &str) -> Option<&'a str> {
    record.pointer(pointer).and_then(Value::as_str)
}

/// `YYYY-MM-DD` from an RFC 3339 timestamp; empty string when absent.
pub(crate) fn date_str(raw: Option<&str>) -> String {
    format_ts(raw, "%Y-%m-%d")
}

/// `YYYY-MM-DD HH:MM:SS` from an RFC 3339 timestamp; empty string when absent.
pub(crate) fn datetime_str(raw: Option<&str>) -> String {
    format_ts(raw, "%Y-%m-%d %H:%M:%S")
}

fn format_ts(raw: Option<&str>, fmt: &str) -> String {
    let Some(raw) = raw else {
        return String::new();
    };
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|d| d.format(fmt).to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_money_formatting() {
        assert_eq!(money(150.5), "150.50");
        assert_eq!(money(0.0), "0.00");
        assert_eq!(money(12.3), "12.30");
    }

    #[test]
    fn test_number_at_handles_strings_and_numbers() {
        let record = json!({"a": {"amount": "12.34"}, "b": 7});
        assert_eq!(number_at(&record, "/a/amount"), 12.34);
        assert_eq!(number_at(&record, "/b"), 7.0);
        assert_eq!(number_at(&record, "/missing"), 0.0);
    }

    #[test]
    fn test_date_formats() {
        assert_eq!(date_str(Some("2026-03-05T14:30:45Z")), "2026-03-05");
        assert_eq!(datetime_str(Some("2026-03-05T14:30:45Z")), "2026-03-05 14:30:45");
        assert_eq!(date_str(None), "");
        assert_eq!(date_str(Some("garbage")), "");
    }

    #[test]
    fn test_every_type_resolves_a_strategy() {
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
            assert!(!strategy_for(rt).schema.is_empty());
        }
    }
}
