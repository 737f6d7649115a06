//! Products report: fan-out to one row per variant, carrying parent fields.

use serde_json::Value;

use reportflow_core::error::Result;
use reportflow_core::types::FilterSet;

use super::{int_at, money, number_at, str_at};
use crate::row::Row;

// TODO: join order line items over the report range so unitsSold/totalRevenue
// reflect actual sales instead of zero.
pub fn transform(records: &[Value], _filters: &FilterSet) -> Result<Vec<Row>> {
    let mut rows = Vec::new();
    for product in records {
        let Some(variants) = product.pointer("/variants/edges").and_then(Value::as_array) else {
            continue;
        };
        for edge in variants {
            let Some(variant) = edge.get("node") else {
                continue;
            };
            rows.push(
                Row::new()
                    .with("productTitle", str_at(product, "/title").unwrap_or(""))
                    .with("sku", str_at(variant, "/sku").unwrap_or(""))
                    .with("vendor", str_at(product, "/vendor").unwrap_or(""))
                    .with("productType", str_at(product, "/productType").unwrap_or(""))
                    .with("unitsSold", "0")
                    .with("totalRevenue", money(0.0))
                    .with("averagePrice", money(number_at(variant, "/price")))
                    .with(
                        "inventoryQuantity",
                        int_at(variant, "/inventoryQuantity").to_string(),
                    ),
            );
        }
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_three_variants_three_rows_with_parent_fields() {
        let product = json!({
            "title": "Trail Shoe",
            "vendor": "Acme",
            "productType": "Shoes",
            "variants": {"edges": [
                {"node": {"sku": "TS-8", "price": "89.00", "inventoryQuantity": 4}},
                {"node": {"sku": "TS-9", "price": "89.00", "inventoryQuantity": 2}},
                {"node": {"sku": "TS-10", "price": "95.00", "inventoryQuantity": 0}}
            ]}
        });
        let rows = transform(&[product], &FilterSet::new()).unwrap();
        assert_eq!(rows.len(), 3);
        for row in &rows {
            assert_eq!(row.get("productTitle"), Some("Trail Shoe"));
            assert_eq!(row.get("vendor"), Some("Acme"));
        }
        assert_eq!(rows[2].get("averagePrice"), Some("95.00"));
        assert_eq!(rows[2].get("inventoryQuantity"), Some("0"));
    }

    #[test]
    fn test_product_without_variants_produces_no_rows() {
        let product = json!({"title": "Gift Card", "vendor": "Acme"});
        let rows = transform(&[product], &FilterSet::new()).unwrap();
        assert!(rows.is_empty());
    }
}
