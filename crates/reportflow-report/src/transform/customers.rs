//! Customers report: one row per customer with lifetime value metrics.

use serde_json::Value;

use reportflow_core::error::Result;
use reportflow_core::types::FilterSet;

use super::{date_str, int_at, money, number_at, str_at};
use crate::row::Row;

pub fn transform(records: &[Value], _filters: &FilterSet) -> Result<Vec<Row>> {
    Ok(records.iter().map(customer_row).collect())
}

fn customer_row(customer: &Value) -> Row {
    let total_spent = number_at(customer, "/amountSpent/amount");
    let total_orders = int_at(customer, "/numberOfOrders");
    let average_order_value = if total_orders > 0 {
        total_spent / total_orders as f64
    } else {
        0.0
    };

    let first = str_at(customer, "/firstName").unwrap_or("");
    let last = str_at(customer, "/lastName").unwrap_or("");
    let name = format!("{first} {last}").trim().to_string();

    Row::new()
        .with("customerName", if name.is_empty() { "N/A".into() } else { name })
        .with("email", str_at(customer, "/email").unwrap_or(""))
        .with("totalOrders", total_orders.to_string())
        .with("totalSpent", money(total_spent))
        .with("averageOrderValue", money(average_order_value))
        .with("firstOrderDate", date_str(str_at(customer, "/createdAt")))
        .with(
            "lastOrderDate",
            date_str(str_at(customer, "/lastOrder/createdAt")),
        )
        .with("customerSince", date_str(str_at(customer, "/createdAt")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_customer_metrics() {
        let customer = json!({
            "firstName": "Linh",
            "lastName": "Pham",
            "email": "linh@example.com",
            "createdAt": "2024-11-20T10:00:00Z",
            "numberOfOrders": "4",
            "amountSpent": {"amount": "500.00"},
            "lastOrder": {"createdAt": "2026-03-01T08:00:00Z"}
        });
        let rows = transform(&[customer], &FilterSet::new()).unwrap();
        let row = &rows[0];
        assert_eq!(row.get("customerName"), Some("Linh Pham"));
        assert_eq!(row.get("totalOrders"), Some("4"));
        assert_eq!(row.get("totalSpent"), Some("500.00"));
        assert_eq!(row.get("averageOrderValue"), Some("125.00"));
        assert_eq!(row.get("firstOrderDate"), Some("2024-11-20"));
        assert_eq!(row.get("lastOrderDate"), Some("2026-03-01"));
    }

    #[test]
    fn test_nameless_customer_with_no_orders() {
        let customer = json!({
            "email": "anon@example.com",
            "createdAt": "2026-01-01T00:00:00Z",
            "numberOfOrders": 0,
            "amountSpent": {"amount": "0.00"}
        });
        let rows = transform(&[customer], &FilterSet::new()).unwrap();
        let row = &rows[0];
        assert_eq!(row.get("customerName"), Some("N/A"));
        assert_eq!(row.get("averageOrderValue"), Some("0.00"));
        assert_eq!(row.get("lastOrderDate"), Some(""));
    }
}
