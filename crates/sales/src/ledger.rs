//! Data-source boundary for the daily sales report.
//!
//! A [`SalesLedger`] answers the read-only aggregate queries the report needs.
//! Implementations return rows exactly as the data source produced them,
//! including SQL `NULL`s; normalization to report figures happens in this crate
//! (see [`crate::DailyAggregate::from_row`]) so every backend shares one set of
//! rules.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::voucher::VoucherType;

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Ledger query failure.
///
/// Neither variant is recovered locally: the report is either complete or not
/// produced at all.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The data source could not be reached or the query could not run
    /// (connection refused, credentials rejected, connection dropped, SQL error).
    #[error("data source error: {0}")]
    DataSource(String),

    /// The query ran but returned a shape that does not match the expected
    /// aggregate (wrong column count/type, negative count, too many rows).
    #[error("malformed result: {0}")]
    MalformedResult(String),
}

impl LedgerError {
    pub fn data_source(msg: impl Into<String>) -> Self {
        Self::DataSource(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResult(msg.into())
    }

    pub fn is_data_source(&self) -> bool {
        matches!(self, LedgerError::DataSource(_))
    }
}

/// Raw result of the per-voucher totals query
/// (`COUNT(*)`, `SUM(grand_total)`, `SUM(vat_amount)`, `SUM(total_discount)`).
///
/// Sums are `None` when no record matched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerTotalsRow {
    pub bill_count: Option<i64>,
    pub amount: Option<Decimal>,
    pub tax: Option<Decimal>,
    pub discount: Option<Decimal>,
}

/// Raw result row of the top-products query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductSalesRow {
    pub description: Option<String>,
    pub quantity: Option<Decimal>,
    pub amount: Option<Decimal>,
}

/// Raw result row of the per-branch query. `branch_id` is already coalesced
/// to `0` by well-behaved backends but `NULL` is tolerated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchSalesRow {
    pub branch_id: Option<i32>,
    pub bill_count: Option<i64>,
    pub amount: Option<Decimal>,
}

/// Read-only access to the transaction ledger.
///
/// ## Query semantics
///
/// Every query filters on the transaction timestamp **truncated to a date**
/// (in the data source's native time zone) and on the voucher-type code.
/// Filter values must be bound as parameters, never interpolated into the
/// query text.
///
/// ## Implementation Requirements
///
/// - `daily_totals` returns `Ok(None)` only when the data source returned no
///   row at all; an aggregate over zero records is `Some` row with `NULL` sums
/// - `top_products` orders by total quantity descending and returns at most
///   `limit` rows
/// - `branch_sales` orders by amount descending
/// - no retries: failures surface immediately as [`LedgerError`]
#[async_trait::async_trait]
pub trait SalesLedger: Send + Sync {
    /// Count and sums of all records of `voucher` on `date`.
    async fn daily_totals(
        &self,
        date: NaiveDate,
        voucher: VoucherType,
    ) -> LedgerResult<Option<LedgerTotalsRow>>;

    /// Line-item quantities and amounts of the day's sales invoices, grouped
    /// by product description.
    async fn top_products(&self, date: NaiveDate, limit: u32) -> LedgerResult<Vec<ProductSalesRow>>;

    /// The day's sales invoices grouped by branch.
    async fn branch_sales(&self, date: NaiveDate) -> LedgerResult<Vec<BranchSalesRow>>;
}

#[async_trait::async_trait]
impl<L> SalesLedger for Arc<L>
where
    L: SalesLedger + ?Sized,
{
    async fn daily_totals(
        &self,
        date: NaiveDate,
        voucher: VoucherType,
    ) -> LedgerResult<Option<LedgerTotalsRow>> {
        (**self).daily_totals(date, voucher).await
    }

    async fn top_products(&self, date: NaiveDate, limit: u32) -> LedgerResult<Vec<ProductSalesRow>> {
        (**self).top_products(date, limit).await
    }

    async fn branch_sales(&self, date: NaiveDate) -> LedgerResult<Vec<BranchSalesRow>> {
        (**self).branch_sales(date).await
    }
}
