//! Discounts report: one row per discount code node.

use serde_json::Value;

use reportflow_core::error::Result;
use reportflow_core::types::FilterSet;

use super::{date_str, int_at, money, str_at};
use crate::row::Row;

pub fn transform(records: &[Value], _filters: &FilterSet) -> Result<Vec<Row>> {
    Ok(records.iter().map(discount_row).collect())
}

fn discount_row(node: &Value) -> Row {
    let discount = node.get("codeDiscount").unwrap_or(&Value::Null);
    let code = str_at(discount, "/codes/edges/0/node/code").unwrap_or("");

    let type_name = str_at(discount, "/__typename").unwrap_or("");
    let discount_type = if type_name.contains("Basic") {
        "PERCENTAGE"
    } else if type_name.contains("Bxgy") {
        "BUY_X_GET_Y"
    } else if type_name.contains("FreeShipping") {
        "FREE_SHIPPING"
    } else {
        "UNKNOWN"
    };

    Row::new()
        .with("discountCode", code)
        .with("discountType", discount_type)
        .with("timesUsed", int_at(discount, "/usageCount").to_string())
        .with("totalRevenue", money(0.0))
        .with("totalDiscountAmount", money(0.0))
        .with("averageOrderValue", money(0.0))
        .with("status", str_at(discount, "/status").unwrap_or("UNKNOWN"))
        .with("startDate", date_str(str_at(discount, "/startsAt")))
        .with("endDate", date_str(str_at(discount, "/endsAt")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_basic_code_discount() {
        let node = json!({
            "codeDiscount": {
                "__typename": "DiscountCodeBasic",
                "codes": {"edges": [{"node": {"code": "SPRING20"}}]},
                "startsAt": "2026-03-01T00:00:00Z",
                "endsAt": "2026-03-31T23:59:59Z",
                "status": "ACTIVE",
                "usageCount": 37
            }
        });
        let rows = transform(&[node], &FilterSet::new()).unwrap();
        let row = &rows[0];
        assert_eq!(row.get("discountCode"), Some("SPRING20"));
        assert_eq!(row.get("discountType"), Some("PERCENTAGE"));
        assert_eq!(row.get("timesUsed"), Some("37"));
        assert_eq!(row.get("status"), Some("ACTIVE"));
        assert_eq!(row.get("startDate"), Some("2026-03-01"));
    }

    #[test]
    fn test_free_shipping_without_usage_count() {
        let node = json!({
            "codeDiscount": {
                "__typename": "DiscountCodeFreeShipping",
                "codes": {"edges": [{"node": {"code": "SHIPFREE"}}]},
                "status": "EXPIRED"
            }
        });
        let rows = transform(&[node], &FilterSet::new()).unwrap();
        let row = &rows[0];
        assert_eq!(row.get("discountType"), Some("FREE_SHIPPING"));
        assert_eq!(row.get("timesUsed"), Some("0"));
        assert_eq!(row.get("endDate"), Some(""));
    }
}
