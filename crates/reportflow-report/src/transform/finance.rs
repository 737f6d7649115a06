//! Finance summary: day-bucketed financial breakdown with gross profit.
//!
//! Per-line-item amounts split into "cost recorded" vs "no cost recorded"
//! buckets; gross profit is net sales with cost minus cost of goods sold.
//! Only successful SALE transactions on a Shopify Payments gateway count
//! toward the gateway subtotal - anything else contributes zero.

use serde_json::Value;
use std::collections::BTreeMap;

use reportflow_core::error::{ReportFlowError, Result};
use reportflow_core::types::FilterSet;

use super::{date_str, money, number_at, opt_number_at, str_at};
use crate::row::Row;

#[derive(Default)]
struct DayBucket {
    gross_sales: f64,
    discounts: f64,
    returns: f64,
    net_sales: f64,
    shipping_charges: f64,
    return_fees: f64,
    taxes: f64,
    total_sales: f64,
    net_sales_without_cost: f64,
    net_sales_with_cost: f64,
    cost_of_goods_sold: f64,
    gross_profit: f64,
    net_payments: f64,
    gross_payments_shopify: f64,
    net_sales_gift_cards: f64,
    outstanding_gift_card_balance: f64,
    tips: f64,
}

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
        let shipping = number_at(order, "/totalShippingPriceSet/shopMoney/amount");
        let net_payment = opt_number_at(order, "/netPaymentSet/shopMoney/amount").unwrap_or(total);
        let refunded = number_at(order, "/totalRefundedSet/shopMoney/amount");
        let refunded_shipping = number_at(order, "/totalRefundedShippingSet/shopMoney/amount");
        let current_total =
            opt_number_at(order, "/currentTotalPriceSet/shopMoney/amount").unwrap_or(total);

        let gross_sales = total + discounts;
        let net_sales = current_total - tax - shipping;

        let mut cost_of_goods_sold = 0.0;
        let mut net_sales_with_cost = 0.0;
        let mut net_sales_without_cost = net_sales;
        if let Some(edges) = order.pointer("/lineItems/edges").and_then(Value::as_array) {
            for edge in edges {
                let Some(line) = edge.get("node") else {
                    continue;
                };
                let quantity = number_at(line, "/quantity");
                let unit_cost = number_at(line, "/variant/inventoryItem/unitCost/amount");
                let line_price = number_at(line, "/discountedUnitPriceSet/shopMoney/amount");
                if unit_cost > 0.0 {
                    cost_of_goods_sold += unit_cost * quantity;
                    net_sales_with_cost += line_price * quantity;
                } else {
                    net_sales_without_cost += line_price * quantity;
                }
            }
        }
        let gross_profit = net_sales_with_cost - cost_of_goods_sold;

        let mut shopify_payments = 0.0;
        if let Some(transactions) = order.get("transactions").and_then(Value::as_array) {
            for tx in transactions {
                let gateway_matches = str_at(tx, "/gateway")
                    .is_some_and(|g| g.to_lowercase().contains("shopify"));
                if gateway_matches
                    && str_at(tx, "/status") == Some("SUCCESS")
                    && str_at(tx, "/kind") == Some("SALE")
                {
                    shopify_payments += number_at(tx, "/amountSet/shopMoney/amount");
                }
            }
        }

        let bucket = by_date.entry(date).or_default();
        bucket.gross_sales += gross_sales;
        bucket.discounts += discounts;
        bucket.returns += refunded;
        bucket.net_sales += net_sales;
        bucket.shipping_charges += shipping;
        bucket.return_fees += refunded_shipping;
        bucket.taxes += tax;
        bucket.total_sales += current_total;
        bucket.net_sales_without_cost += net_sales_without_cost;
        bucket.net_sales_with_cost += net_sales_with_cost;
        bucket.cost_of_goods_sold += cost_of_goods_sold;
        bucket.gross_profit += gross_profit;
        bucket.net_payments += net_payment;
        bucket.gross_payments_shopify += shopify_payments;
        // Gift card and tip figures need separate API resources; kept at zero.
    }

    Ok(by_date
        .into_iter()
        .map(|(date, day)| {
            Row::new()
                .with("date", date)
                .with("grossSales", money(day.gross_sales))
                .with("discounts", money(day.discounts))
                .with("returns", money(day.returns))
                .with("netSales", money(day.net_sales))
                .with("shippingCharges", money(day.shipping_charges))
                .with("returnFees", money(day.return_fees))
                .with("taxes", money(day.taxes))
                .with("totalSales", money(day.total_sales))
                .with("netSalesWithoutCost", money(day.net_sales_without_cost))
                .with("netSalesWithCost", money(day.net_sales_with_cost))
                .with("costOfGoodsSold", money(day.cost_of_goods_sold))
                .with("grossProfit", money(day.gross_profit))
                .with("netPayments", money(day.net_payments))
                .with(
                    "grossPaymentsShopifyPayments",
                    money(day.gross_payments_shopify),
                )
                .with("netSalesFromGiftCards", money(day.net_sales_gift_cards))
                .with(
                    "outstandingGiftCardBalance",
                    money(day.outstanding_gift_card_balance),
                )
                .with("tips", money(day.tips))
        })
        .collect())
}
