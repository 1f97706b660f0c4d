//! Daily sales domain module.
//!
//! This crate contains the daily sales aggregation rules: how ledger totals are
//! normalized, how net figures are derived from gross sales and returns, and the
//! data-source boundary ([`SalesLedger`]) that ledger implementations provide.
//! It performs no IO of its own.

pub mod aggregate;
pub mod aggregator;
pub mod breakdown;
pub mod ledger;
pub mod report;
pub mod voucher;

pub use aggregate::DailyAggregate;
pub use aggregator::{
    compute_branch_sales, compute_breakdown, compute_daily_aggregate, compute_net_sales_report,
    compute_top_products, DEFAULT_TOP_PRODUCTS,
};
pub use breakdown::{BranchSales, DailySalesBreakdown, ProductSales};
pub use ledger::{
    BranchSalesRow, LedgerError, LedgerResult, LedgerTotalsRow, ProductSalesRow, SalesLedger,
};
pub use report::NetSalesReport;
pub use voucher::VoucherType;
