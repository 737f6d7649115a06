//! Sales report: orders bucketed by calendar day.

use serde_json::Value;
use std::collections::BTreeMap;

use reportflow_core::error::{ReportFlowError, Result};
use reportflow_core::types::FilterSet;

use super::{date_str, money, number_at, opt_number_at, str_at};
use crate::row::Row;

#[derive(Default)]
struct DayBucket {
    order_count: u32,
    total_sales: f64,
    total_discounts: f64,
    total_tax: f64,
    net_sales: f64,
}

/// Group orders by creation day and accumulate totals. A bucket only exists
/// when at least one order landed in it, so the average-order-value
/// denominator is always >= 1. Output is sorted ascending by date.
pub fn transform(records: &[Value], _filters: &FilterSet) -> Result<Vec<Row>> {
    let mut by_date: BTreeMap<String, DayBucket> = BTreeMap::new();

    for order in records {
        let date = date_str(str_at(order, "/createdAt"));
        if date.is_empty() {
            return Err(ReportFlowError::Process(
                "order record missing createdAt".into(),
            ));
        }
        let total = number_at(order, "/totalPriceSet/shopMoney/amount");
        let discounts = number_at(order, "/totalDiscountsSet/shopMoney/amount");
        let tax = number_at(order, "/totalTaxSet/shopMoney/amount");
        let net = opt_number_at(order, "/netPaymentSet/shopMoney/amount").unwrap_or(total);

        let bucket = by_date.entry(date).or_default();
        bucket.order_count += 1;
        bucket.total_sales += total;
        bucket.total_discounts += discounts;
        bucket.total_tax += tax;
        bucket.net_sales += net;
    }

    Ok(by_date
        .into_iter()
        .map(|(date, day)| {
            Row::new()
                .with("date", date)
                .with("orderCount", day.order_count.to_string())
                .with("totalSales", money(day.total_sales))
                .with(
                    "averageOrderValue",
                    money(day.total_sales / f64::from(day.order_count)),
                )
                .with("totalDiscounts", money(day.total_discounts))
                .with("totalTax", money(day.total_tax))
                .with("netSales", money(day.net_sales))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn order(created_at: &str, total: &str, discounts: &str) -> Value {
        json!({
            "id": "gid://order/1",
            "createdAt": created_at,
            "totalPriceSet": {"shopMoney": {"amount": total}},
            "totalDiscountsSet": {"shopMoney": {"amount": discounts}},
            "totalTaxSet": {"shopMoney": {"amount": "0"}},
        })
    }

    #[test]
    fn test_same_day_aggregation() {
        let records = vec![
            order("2026-04-02T08:00:00Z", "100.00", "10.00"),
            order("2026-04-02T19:30:00Z", "50.50", "0"),
        ];
        let rows = transform(&records, &FilterSet::new()).unwrap();
        assert_eq!(rows.len(), 1);
        let day = &rows[0];
        assert_eq!(day.get("date"), Some("2026-04-02"));
        assert_eq!(day.get("orderCount"), Some("2"));
        assert_eq!(day.get("totalSales"), Some("150.50"));
        assert_eq!(day.get("averageOrderValue"), Some("75.25"));
        assert_eq!(day.get("totalDiscounts"), Some("10.00"));
    }

    #[test]
    fn test_output_sorted_by_date_ascending() {
        let records = vec![
            order("2026-04-03T08:00:00Z", "10.00", "0"),
            order("2026-04-01T08:00:00Z", "20.00", "0"),
            order("2026-04-02T08:00:00Z", "30.00", "0"),
        ];
        let rows = transform(&records, &FilterSet::new()).unwrap();
        let dates: Vec<_> = rows.iter().map(|r| r.value_or_empty("date")).collect();
        assert_eq!(dates, vec!["2026-04-01", "2026-04-02", "2026-04-03"]);
    }

    #[test]
    fn test_net_sales_falls_back_to_total() {
        let records = vec![order("2026-04-02T08:00:00Z", "80.00", "0")];
        let rows = transform(&records, &FilterSet::new()).unwrap();
        assert_eq!(rows[0].get("netSales"), Some("80.00"));
    }

    #[test]
    fn test_missing_created_at_is_a_processing_error() {
        let records = vec![json!({"totalPriceSet": {"shopMoney": {"amount": "5.00"}}})];
        let err = transform(&records, &FilterSet::new()).unwrap_err();
        assert!(matches!(err, ReportFlowError::Process(_)));
    }
}
