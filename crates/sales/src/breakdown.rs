//! Per-product and per-branch detail shown under the net sales summary.

use rust_decimal::Decimal;
use serde::Serialize;

use erpsales_core::{BranchId, ValueObject};

use crate::ledger::{BranchSalesRow, LedgerError, ProductSalesRow};
use crate::report::NetSalesReport;

/// Quantity and amount sold of one product description on the day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductSales {
    /// `None` when the ledger line carries no description.
    pub description: Option<String>,
    pub quantity: Decimal,
    pub amount: Decimal,
}

impl ValueObject for ProductSales {}

impl From<ProductSalesRow> for ProductSales {
    fn from(row: ProductSalesRow) -> Self {
        Self {
            description: row.description.filter(|d| !d.trim().is_empty()),
            quantity: row.quantity.unwrap_or(Decimal::ZERO),
            amount: row.amount.unwrap_or(Decimal::ZERO),
        }
    }
}

/// Sales invoices of one branch on the day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchSales {
    pub branch: BranchId,
    pub bill_count: i64,
    pub amount: Decimal,
}

impl ValueObject for BranchSales {}

impl TryFrom<BranchSalesRow> for BranchSales {
    type Error = LedgerError;

    fn try_from(row: BranchSalesRow) -> Result<Self, Self::Error> {
        let branch = BranchId::from_nullable(row.branch_id);
        let bill_count = row.bill_count.unwrap_or(0);
        if bill_count < 0 {
            return Err(LedgerError::malformed(format!(
                "branch {branch}: negative bill count {bill_count}"
            )));
        }
        Ok(Self {
            branch,
            bill_count,
            amount: row.amount.unwrap_or(Decimal::ZERO),
        })
    }
}

impl BranchSales {
    /// This branch's share of `total` in `[0, 1]`, or `None` when `total` is
    /// not positive or the quotient is out of range.
    pub fn share_of(&self, total: Decimal) -> Option<Decimal> {
        if total <= Decimal::ZERO {
            return None;
        }
        self.amount
            .checked_div(total)
            .map(|share| share.clamp(Decimal::ZERO, Decimal::ONE))
    }
}

/// The complete daily report: net summary plus product and branch detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailySalesBreakdown {
    pub summary: NetSalesReport,
    pub top_products: Vec<ProductSales>,
    pub branches: Vec<BranchSales>,
}

impl ValueObject for DailySalesBreakdown {}

impl DailySalesBreakdown {
    /// A breakdown carrying only the summary (detail queries skipped).
    pub fn summary_only(summary: NetSalesReport) -> Self {
        Self {
            summary,
            top_products: Vec::new(),
            branches: Vec::new(),
        }
    }
}
