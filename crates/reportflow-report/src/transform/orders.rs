//! Orders report: one output row per order.

use serde_json::Value;

use reportflow_core::error::Result;
use reportflow_core::types::FilterSet;

use super::{datetime_str, int_at, money, number_at, str_at};
use crate::row::Row;

pub fn transform(records: &[Value], _filters: &FilterSet) -> Result<Vec<Row>> {
    Ok(records.iter().map(order_row).collect())
}

fn order_row(order: &Value) -> Row {
    let item_count: i64 = order
        .pointer("/lineItems/edges")
        .and_then(Value::as_array)
        .map(|edges| edges.iter().map(|e| int_at(e, "/node/quantity")).sum())
        .unwrap_or(0);

    // Guest checkout leaves the customer object null entirely.
    let customer_name = match order.get("customer") {
        Some(customer) if !customer.is_null() => {
            let first = str_at(customer, "/firstName").unwrap_or("");
            let last = str_at(customer, "/lastName").unwrap_or("");
            format!("{first} {last}").trim().to_string()
        }
        _ => "Guest".to_string(),
    };

    let order_status = if order.get("cancelledAt").is_some_and(|v| !v.is_null()) {
        "CANCELLED"
    } else {
        "OPEN"
    };

    Row::new()
        .with("orderNumber", str_at(order, "/name").unwrap_or(""))
        .with("orderDate", datetime_str(str_at(order, "/createdAt")))
        .with("customerName", customer_name)
        .with(
            "customerEmail",
            str_at(order, "/customer/email").unwrap_or(""),
        )
        .with(
            "totalPrice",
            money(number_at(order, "/totalPriceSet/shopMoney/amount")),
        )
        .with("orderStatus", order_status)
        .with(
            "fulfillmentStatus",
            str_at(order, "/displayFulfillmentStatus").unwrap_or("UNFULFILLED"),
        )
        .with(
            "financialStatus",
            str_at(order, "/displayFinancialStatus").unwrap_or("PENDING"),
        )
        .with("itemCount", item_count.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_full_order_row() {
        let order = json!({
            "name": "#1042",
            "createdAt": "2026-04-02T14:05:09Z",
            "displayFinancialStatus": "PAID",
            "displayFulfillmentStatus": "FULFILLED",
            "cancelledAt": null,
            "totalPriceSet": {"shopMoney": {"amount": "120.00"}},
            "customer": {"firstName": "Mai", "lastName": "Tran", "email": "mai@example.com"},
            "lineItems": {"edges": [
                {"node": {"quantity": 2}},
                {"node": {"quantity": 1}}
            ]}
        });
        let rows = transform(&[order], &FilterSet::new()).unwrap();
        let row = &rows[0];
        assert_eq!(row.get("orderNumber"), Some("#1042"));
        assert_eq!(row.get("orderDate"), Some("2026-04-02 14:05:09"));
        assert_eq!(row.get("customerName"), Some("Mai Tran"));
        assert_eq!(row.get("totalPrice"), Some("120.00"));
        assert_eq!(row.get("orderStatus"), Some("OPEN"));
        assert_eq!(row.get("itemCount"), Some("3"));
    }

    #[test]
    fn test_guest_and_cancelled_order() {
        let order = json!({
            "name": "#1043",
            "createdAt": "2026-04-02T15:00:00Z",
            "cancelledAt": "2026-04-03T09:00:00Z",
            "totalPriceSet": {"shopMoney": {"amount": "10.00"}},
            "customer": null
        });
        let rows = transform(&[order], &FilterSet::new()).unwrap();
        let row = &rows[0];
        assert_eq!(row.get("customerName"), Some("Guest"));
        assert_eq!(row.get("customerEmail"), Some(""));
        assert_eq!(row.get("orderStatus"), Some("CANCELLED"));
        assert_eq!(row.get("fulfillmentStatus"), Some("UNFULFILLED"));
        assert_eq!(row.get("financialStatus"), Some("PENDING"));
    }

    #[test]
    fn test_source_order_preserved() {
        let mk = |name: &str| {
            json!({
                "name": name,
                "createdAt": "2026-04-02T15:00:00Z",
                "totalPriceSet": {"shopMoney": {"amount": "1.00"}},
                "customer": null
            })
        };
        let rows = transform(&[mk("#3"), mk("#1"), mk("#2")], &FilterSet::new()).unwrap();
        let names: Vec<_> = rows.iter().map(|r| r.value_or_empty("orderNumber")).collect();
        assert_eq!(names, vec!["#3", "#1", "#2"]);
    }
}
