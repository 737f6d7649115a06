//! Per-report-type data fetching.
//!
//! Each report type maps to a GraphQL document, a connection root, and a
//! predicate built from the schedule's typed filters. Pages are pulled until
//! the server reports no more or the page ceiling is hit; past the ceiling the
//! result is silently truncated rather than failed.

use serde_json::{Value, json};

use reportflow_core::config::FetchConfig;
use reportflow_core::daterange::{DateRange, resolve};
use reportflow_core::error::{ReportFlowError, Result};
use reportflow_core::types::{FilterSet, ReportType};

use crate::client::{GraphqlTransport, execute_with_retry};
use crate::query::{SearchQuery, date_clause, or_group, quoted_or_group};

/// Accumulated raw records for one fetch.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub records: Vec<Value>,
    pub record_count: usize,
    /// True when the page ceiling cut the result short.
    pub truncated: bool,
}

const ORDERS_SALES_QUERY: &str = r#"
query GetOrders($first: Int!, $query: String, $cursor: String) {
  orders(first: $first, query: $query, after: $cursor) {
    edges {
      node {
        id
        name
        createdAt
        totalPriceSet { shopMoney { amount currencyCode } }
        totalDiscountsSet { shopMoney { amount } }
        totalTaxSet { shopMoney { amount } }
        netPaymentSet { shopMoney { amount } }
      }
    }
    pageInfo { hasNextPage endCursor }
  }
}"#;

const ORDERS_DETAIL_QUERY: &str = r#"
query GetOrderDetails($first: Int!, $query: String, $cursor: String) {
  orders(first: $first, query: $query, after: $cursor) {
    edges {
      node {
        id
        name
        createdAt
        displayFinancialStatus
        displayFulfillmentStatus
        cancelledAt
        totalPriceSet { shopMoney { amount currencyCode } }
        customer { firstName lastName email }
        lineItems(first: 100) {
          edges { node { id quantity } }
        }
      }
    }
    pageInfo { hasNextPage endCursor }
  }
}"#;

const ORDERS_FINANCE_QUERY: &str = r#"
query GetOrderFinancials($first: Int!, $query: String, $cursor: String) {
  orders(first: $first, query: $query, after: $cursor) {
    edges {
      node {
        id
        name
        createdAt
        totalPriceSet { shopMoney { amount } }
        totalDiscountsSet { shopMoney { amount } }
        totalTaxSet { shopMoney { amount } }
        totalShippingPriceSet { shopMoney { amount } }
        netPaymentSet { shopMoney { amount } }
        totalRefundedSet { shopMoney { amount } }
        totalRefundedShippingSet { shopMoney { amount } }
        currentTotalPriceSet { shopMoney { amount } }
        lineItems(first: 100) {
          edges {
            node {
              quantity
              discountedUnitPriceSet { shopMoney { amount } }
              variant { inventoryItem { unitCost { amount } } }
            }
          }
        }
        transactions { gateway status kind amountSet { shopMoney { amount } } }
      }
    }
    pageInfo { hasNextPage endCursor }
  }
}"#;

const PRODUCTS_QUERY: &str = r#"
query GetProducts($first: Int!, $query: String, $cursor: String) {
  products(first: $first, query: $query, after: $cursor) {
    edges {
      node {
        id
        title
        vendor
        productType
        variants(first: 100) {
          edges { node { id sku price inventoryQuantity } }
        }
      }
    }
    pageInfo { hasNextPage endCursor }
  }
}"#;

const INVENTORY_QUERY: &str = r#"
query GetInventory($first: Int!, $query: String, $cursor: String) {
  products(first: $first, query: $query, after: $cursor) {
    edges {
      node {
        id
        title
        vendor
        productType
        variants(first: 100) {
          edges {
            node {
              id
              sku
              price
              inventoryQuantity
              inventoryItem { id unitCost { amount } }
            }
          }
        }
      }
    }
    pageInfo { hasNextPage endCursor }
  }
}"#;

const CUSTOMERS_QUERY: &str = r#"
query GetCustomers($first: Int!, $query: String, $cursor: String) {
  customers(first: $first, query: $query, after: $cursor) {
    edges {
      node {
        id
        firstName
        lastName
        email
        createdAt
        numberOfOrders
        amountSpent { amount currencyCode }
        lastOrder { createdAt }
      }
    }
    pageInfo { hasNextPage endCursor }
  }
}"#;

const DISCOUNTS_QUERY: &str = r#"
query GetDiscounts($first: Int!, $query: String, $cursor: String) {
  codeDiscountNodes(first: $first, query: $query, after: $cursor) {
    edges {
      node {
        id
        codeDiscount {
          __typename
          ... on DiscountCodeBasic {
            title
            codes(first: 1) { edges { node { code } } }
            startsAt
            endsAt
            status
            usageCount
          }
          ... on DiscountCodeBxgy {
            title
            codes(first: 1) { edges { node { code } } }
            startsAt
            endsAt
            status
            usageCount
          }
          ... on DiscountCodeFreeShipping {
            title
            codes(first: 1) { edges { node { code } } }
            startsAt
            endsAt
            status
          }
        }
      }
    }
    pageInfo { hasNextPage endCursor }
  }
}"#;

/// Fetch all raw records for one report type and filter set.
///
/// Traffic has no Admin API data source; it always fails with `Unsupported`
/// so callers can tell "cannot fetch" from "no data".
pub async fn fetch_report(
    transport: &dyn GraphqlTransport,
    report_type: ReportType,
    filters: &FilterSet,
    cfg: &FetchConfig,
) -> Result<FetchOutcome> {
    match report_type {
        ReportType::Sales => {
            let predicate = SearchQuery::new()
                .and(date_clause(&resolve_filter_range(filters)?))
                .and_group(or_group("sales_channel", &filters.get_list("salesChannel")))
                .build();
            fetch_pages(transport, ORDERS_SALES_QUERY, "orders", predicate, cfg).await
        }
        ReportType::Orders => {
            let predicate = SearchQuery::new()
                .and(date_clause(&resolve_filter_range(filters)?))
                .and_group(or_group("status", &filters.get_list("orderStatus")))
                .and_group(or_group(
                    "fulfillment_status",
                    &filters.get_list("fulfillmentStatus"),
                ))
                .and_group(or_group(
                    "financial_status",
                    &filters.get_list("financialStatus"),
                ))
                .build();
            fetch_pages(transport, ORDERS_DETAIL_QUERY, "orders", predicate, cfg).await
        }
        ReportType::FinanceSummary => {
            let predicate = SearchQuery::new()
                .and(date_clause(&resolve_filter_range(filters)?))
                .and_group(or_group("sales_channel", &filters.get_list("salesChannel")))
                .build();
            fetch_pages(transport, ORDERS_FINANCE_QUERY, "orders", predicate, cfg).await
        }
        ReportType::Products => {
            let predicate = SearchQuery::new()
                .and_group(quoted_or_group("product_type", &filters.get_list("productType")))
                .and_group(quoted_or_group("vendor", &filters.get_list("vendor")))
                .build();
            fetch_pages(transport, PRODUCTS_QUERY, "products", predicate, cfg).await
        }
        ReportType::Customers => {
            let predicate = match filters.get_str("customerType") {
                Some("NEW") => SearchQuery::new()
                    .and(date_clause(&resolve_filter_range(filters)?))
                    .build(),
                Some("RETURNING") => SearchQuery::new().and("orders_count:>1").build(),
                _ => None,
            };
            fetch_pages(transport, CUSTOMERS_QUERY, "customers", predicate, cfg).await
        }
        ReportType::Inventory => {
            let predicate = SearchQuery::new()
                .and_group(quoted_or_group("product_type", &filters.get_list("productType")))
                .and_group(quoted_or_group("vendor", &filters.get_list("vendor")))
                .build();
            let outcome =
                fetch_pages(transport, INVENTORY_QUERY, "products", predicate, cfg).await?;
            Ok(flatten_inventory(outcome, filters.get_str("stockLevel")))
        }
        ReportType::Discounts => {
            fetch_pages(transport, DISCOUNTS_QUERY, "codeDiscountNodes", None, cfg).await
        }
        ReportType::Traffic => Err(ReportFlowError::Unsupported(
            "traffic data is not exposed by the Admin GraphQL API".into(),
        )),
    }
}

/// Resolve the schedule's date-range filter (default: last 30 days).
fn resolve_filter_range(
    filters: &FilterSet,
) -> Result<reportflow_core::daterange::ResolvedRange> {
    let range = filters
        .get_str("dateRange")
        .map(DateRange::from_tag)
        .unwrap_or(DateRange::Last30Days);
    resolve(
        range,
        filters.get_date("customStartDate"),
        filters.get_date("customEndDate"),
    )
}

/// Cursor loop shared by every strategy.
async fn fetch_pages(
    transport: &dyn GraphqlTransport,
    document: &str,
    root: &str,
    predicate: Option<String>,
    cfg: &FetchConfig,
) -> Result<FetchOutcome> {
    let mut records: Vec<Value> = Vec::new();
    let mut cursor: Option<String> = None;
    let mut pages: u32 = 0;

    loop {
        let variables = json!({
            "first": cfg.page_size,
            "query": predicate,
            "cursor": cursor,
        });
        let data = execute_with_retry(transport, document, variables, cfg).await?;

        let connection = data
            .get(root)
            .ok_or_else(|| ReportFlowError::Process(format!("missing '{root}' in response")))?;
        let edges = connection
            .get("edges")
            .and_then(Value::as_array)
            .ok_or_else(|| ReportFlowError::Process(format!("missing edges under '{root}'")))?;
        for edge in edges {
            if let Some(node) = edge.get("node") {
                records.push(node.clone());
            }
        }

        let page_info = connection.get("pageInfo");
        let has_next = page_info
            .and_then(|p| p.get("hasNextPage"))
            .and_then(Value::as_bool)
            .unwrap_or(false);
        cursor = page_info
            .and_then(|p| p.get("endCursor"))
            .and_then(Value::as_str)
            .map(String::from);
        pages += 1;

        if !has_next {
            return Ok(FetchOutcome {
                record_count: records.len(),
                records,
                truncated: false,
            });
        }
        if pages >= cfg.max_pages {
            tracing::warn!(
                "📄 Page ceiling ({}) reached for '{root}', truncating at {} records",
                cfg.max_pages,
                records.len()
            );
            return Ok(FetchOutcome {
                record_count: records.len(),
                records,
                truncated: true,
            });
        }
    }
}

/// Explode product records into one item per variant, then apply the
/// stock-level filter.
fn flatten_inventory(outcome: FetchOutcome, stock_level: Option<&str>) -> FetchOutcome {
    let mut items: Vec<Value> = Vec::new();
    for product in &outcome.records {
        let variants = product
            .pointer("/variants/edges")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        for edge in variants {
            let Some(variant) = edge.get("node") else {
                continue;
            };
            items.push(json!({
                "productId": product.get("id"),
                "productTitle": product.get("title"),
                "vendor": product.get("vendor"),
                "productType": product.get("productType"),
                "variantId": variant.get("id"),
                "sku": variant.get("sku"),
                "price": variant.get("price"),
                "inventoryQuantity": variant.get("inventoryQuantity"),
                "unitCost": variant.pointer("/inventoryItem/unitCost/amount"),
            }));
        }
    }

    let quantity = |item: &Value| {
        item.get("inventoryQuantity")
            .and_then(Value::as_i64)
            .unwrap_or(0)
    };
    let filtered: Vec<Value> = match stock_level {
        Some("IN_STOCK") => items.into_iter().filter(|i| quantity(i) > 0).collect(),
        Some("LOW_STOCK") => items
            .into_iter()
            .filter(|i| {
                let q = quantity(i);
                q > 0 && q < 10
            })
            .collect(),
        Some("OUT_OF_STOCK") => items.into_iter().filter(|i| quantity(i) == 0).collect(),
        _ => items,
    };

    FetchOutcome {
        record_count: filtered.len(),
        records: filtered,
        truncated: outcome.truncated,
    }
}
