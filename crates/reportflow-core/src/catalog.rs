//! Report-type catalog: the declared output schema for every report type.
//!
//! The transformer produces rows keyed by these field keys and the artifact
//! writer emits the labels as the CSV header, so the catalog is the single
//! source of truth for column order.

use crate::types::ReportType;

/// One output column of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub key: &'static str,
    pub label: &'static str,
}

/// Static metadata for a report type.
#[derive(Debug, Clone, Copy)]
pub struct ReportTypeInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub fields: &'static [FieldDef],
}

const fn field(key: &'static str, label: &'static str) -> FieldDef {
    FieldDef { key, label }
}

static SALES: ReportTypeInfo = ReportTypeInfo {
    name: "Sales Report",
    description: "Analyze sales performance, revenue, and trends over time",
    fields: &[
        field("date", "Date"),
        field("orderCount", "Orders"),
        field("totalSales", "Total Sales"),
        field("averageOrderValue", "Average Order Value"),
        field("totalDiscounts", "Total Discounts"),
        field("totalTax", "Total Tax"),
        field("netSales", "Net Sales"),
    ],
};

static ORDERS: ReportTypeInfo = ReportTypeInfo {
    name: "Orders Report",
    description: "Track order details, status, and fulfillment information",
    fields: &[
        field("orderNumber", "Order Number"),
        field("orderDate", "Order Date"),
        field("customerName", "Customer Name"),
        field("customerEmail", "Customer Email"),
        field("totalPrice", "Total Price"),
        field("orderStatus", "Order Status"),
        field("fulfillmentStatus", "Fulfillment Status"),
        field("financialStatus", "Financial Status"),
        field("itemCount", "Item Count"),
    ],
};

static PRODUCTS: ReportTypeInfo = ReportTypeInfo {
    name: "Products Report",
    description: "View product performance, sales, and inventory metrics",
    fields: &[
        field("productTitle", "Product Title"),
        field("sku", "SKU"),
        field("vendor", "Vendor"),
        field("productType", "Product Type"),
        field("unitsSold", "Units Sold"),
        field("totalRevenue", "Total Revenue"),
        field("averagePrice", "Average Price"),
        field("inventoryQuantity", "Current Inventory"),
    ],
};

static CUSTOMERS: ReportTypeInfo = ReportTypeInfo {
    name: "Customers Report",
    description: "Analyze customer behavior, lifetime value, and segmentation",
    fields: &[
        field("customerName", "Customer Name"),
        field("email", "Email"),
        field("totalOrders", "Total Orders"),
        field("totalSpent", "Total Spent"),
        field("averageOrderValue", "Average Order Value"),
        field("firstOrderDate", "First Order Date"),
        field("lastOrderDate", "Last Order Date"),
        field("customerSince", "Customer Since"),
    ],
};

static INVENTORY: ReportTypeInfo = ReportTypeInfo {
    name: "Inventory Report",
    description: "Monitor stock levels, inventory value, and product availability",
    fields: &[
        field("productTitle", "Product Title"),
        field("sku", "SKU"),
        field("vendor", "Vendor"),
        field("location", "Location"),
        field("quantityAvailable", "Quantity Available"),
        field("quantityOnHand", "Quantity On Hand"),
        field("quantityCommitted", "Quantity Committed"),
        field("inventoryValue", "Inventory Value"),
    ],
};

static TRAFFIC: ReportTypeInfo = ReportTypeInfo {
    name: "Traffic Report",
    description: "Track website traffic, sessions, and conversion metrics",
    fields: &[
        field("date", "Date"),
        field("sessions", "Sessions"),
        field("uniqueVisitors", "Unique Visitors"),
        field("pageViews", "Page Views"),
        field("conversionRate", "Conversion Rate"),
        field("addedToCart", "Added to Cart"),
        field("reachedCheckout", "Reached Checkout"),
        field("completedPurchase", "Completed Purchase"),
    ],
};

static DISCOUNTS: ReportTypeInfo = ReportTypeInfo {
    name: "Discounts Report",
    description: "Analyze discount code usage, performance, and ROI",
    fields: &[
        field("discountCode", "Discount Code"),
        field("discountType", "Discount Type"),
        field("timesUsed", "Times Used"),
        field("totalRevenue", "Total Revenue"),
        field("totalDiscountAmount", "Total Discount Amount"),
        field("averageOrderValue", "Average Order Value"),
        field("status", "Status"),
        field("startDate", "Start Date"),
        field("endDate", "End Date"),
    ],
};

static FINANCE_SUMMARY: ReportTypeInfo = ReportTypeInfo {
    name: "Finance Summary",
    description: "Financial breakdown with gross profit, payments, and gift cards",
    fields: &[
        field("date", "Date"),
        field("grossSales", "Gross Sales"),
        field("discounts", "Discounts"),
        field("returns", "Returns"),
        field("netSales", "Net Sales"),
        field("shippingCharges", "Shipping Charges"),
        field("returnFees", "Return Fees"),
        field("taxes", "Taxes"),
        field("totalSales", "Total Sales"),
        field("netSalesWithoutCost", "Net Sales Without Cost Recorded"),
        field("netSalesWithCost", "Net Sales With Cost Recorded"),
        field("costOfGoodsSold", "Cost of Goods Sold"),
        field("grossProfit", "Gross Profit"),
        field("netPayments", "Net Payments"),
        field("grossPaymentsShopifyPayments", "Gross Payments from Shopify Payments"),
        field("netSalesFromGiftCards", "Net Sales from Gift Cards"),
        field("outstandingGiftCardBalance", "Outstanding Gift Card Balance"),
        field("tips", "Tips"),
    ],
};

/// Catalog lookup.
pub fn report_info(report_type: ReportType) -> &'static ReportTypeInfo {
    match report_type {
        ReportType::Sales => &SALES,
        ReportType::Orders => &ORDERS,
        ReportType::Products => &PRODUCTS,
        ReportType::Customers => &CUSTOMERS,
        ReportType::Inventory => &INVENTORY,
        ReportType::Traffic => &TRAFFIC,
        ReportType::Discounts => &DISCOUNTS,
        ReportType::FinanceSummary => &FINANCE_SUMMARY,
    }
}

/// Resolve a schedule's selected fields against the catalog, falling back to
/// the full schema when the selection is empty. Unknown keys are dropped.
pub fn selected_fields(report_type: ReportType, selection: &[String]) -> Vec<FieldDef> {
    let info = report_info(report_type);
    if selection.is_empty() {
        return info.fields.to_vec();
    }
    selection
        .iter()
        .filter_map(|key| info.fields.iter().find(|f| f.key == key).copied())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_type_has_schema() {
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
            let info = report_info(rt);
            assert!(!info.fields.is_empty(), "{rt} has no fields");
            assert!(!info.name.is_empty());
        }
    }

    #[test]
    fn test_finance_summary_width() {
        assert_eq!(report_info(ReportType::FinanceSummary).fields.len(), 18);
    }

    #[test]
    fn test_selected_fields_order_and_fallback() {
        let all = selected_fields(ReportType::Sales, &[]);
        assert_eq!(all.len(), 7);
        assert_eq!(all[0].key, "date");

        let picked = selected_fields(
            ReportType::Sales,
            &["totalSales".into(), "date".into(), "nope".into()],
        );
        assert_eq!(picked.len(), 2);
        assert_eq!(picked[0].key, "totalSales");
        assert_eq!(picked[1].key, "date");
    }
}
