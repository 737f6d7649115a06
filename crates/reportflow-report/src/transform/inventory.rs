//! Inventory report: rows from variant-level items flattened by the fetcher.

use serde_json::Value;

use reportflow_core::error::Result;
use reportflow_core::types::FilterSet;

use super::{int_at, money, number_at, str_at};
use crate::row::Row;

pub fn transform(records: &[Value], _filters: &FilterSet) -> Result<Vec<Row>> {
    Ok(records
        .iter()
        .map(|item| {
            let quantity = int_at(item, "/inventoryQuantity");
            let unit_cost = number_at(item, "/unitCost");
            Row::new()
                .with("productTitle", str_at(item, "/productTitle").unwrap_or(""))
                .with("sku", str_at(item, "/sku").unwrap_or(""))
                .with("vendor", str_at(item, "/vendor").unwrap_or(""))
                .with("location", "Default")
                .with("quantityAvailable", quantity.to_string())
                .with("quantityOnHand", quantity.to_string())
                .with("quantityCommitted", "0")
                .with("inventoryValue", money(quantity as f64 * unit_cost))
        })
        .collect())
}
