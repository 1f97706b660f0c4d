//! Daily sales aggregation procedure.
//!
//! Every function takes the ledger explicitly; there is no ambient connection.
//! Failures propagate unmodified and no partial result is ever returned.

use chrono::NaiveDate;
use tracing::{debug, instrument};

use crate::aggregate::DailyAggregate;
use crate::breakdown::{BranchSales, DailySalesBreakdown, ProductSales};
use crate::ledger::{LedgerError, LedgerResult, SalesLedger};
use crate::report::NetSalesReport;
use crate::voucher::VoucherType;

/// Number of products listed in the breakdown unless the caller asks otherwise.
pub const DEFAULT_TOP_PRODUCTS: u32 = 10;

/// Totals of `voucher` on `date`, with missing aggregates normalized to zero.
#[instrument(skip(ledger), err)]
pub async fn compute_daily_aggregate<L>(
    date: NaiveDate,
    voucher: VoucherType,
    ledger: &L,
) -> LedgerResult<DailyAggregate>
where
    L: SalesLedger + ?Sized,
{
    let row = ledger.daily_totals(date, voucher).await?;
    if row.is_none() {
        debug!("ledger returned no totals row; treating as zero");
    }
    DailyAggregate::from_row(voucher, row)
}

/// Gross sales (`SI`), gross returns (`SR`) and their net for `date`.
///
/// The two totals queries are independent and run concurrently; both must
/// succeed before the net is computed.
#[instrument(skip(ledger), err)]
pub async fn compute_net_sales_report<L>(date: NaiveDate, ledger: &L) -> LedgerResult<NetSalesReport>
where
    L: SalesLedger + ?Sized,
{
    let (gross_sales, returns) = tokio::try_join!(
        compute_daily_aggregate(date, VoucherType::SalesInvoice, ledger),
        compute_daily_aggregate(date, VoucherType::SalesReturn, ledger),
    )?;

    let report = NetSalesReport::new(date, gross_sales, returns)?;
    debug!(
        net_bills = report.net_bill_count(),
        net_amount = %report.net_amount(),
        "net sales computed"
    );
    Ok(report)
}

/// Best-selling products of `date` by quantity, at most `limit` of them.
#[instrument(skip(ledger), err)]
pub async fn compute_top_products<L>(
    date: NaiveDate,
    limit: u32,
    ledger: &L,
) -> LedgerResult<Vec<ProductSales>>
where
    L: SalesLedger + ?Sized,
{
    if limit == 0 {
        return Ok(Vec::new());
    }

    let rows = ledger.top_products(date, limit).await?;
    if rows.len() > limit as usize {
        return Err(LedgerError::malformed(format!(
            "top products: asked for at most {limit} rows, got {}",
            rows.len()
        )));
    }
    Ok(rows.into_iter().map(ProductSales::from).collect())
}

/// Sales invoices of `date` grouped by branch, largest amount first.
#[instrument(skip(ledger), err)]
pub async fn compute_branch_sales<L>(date: NaiveDate, ledger: &L) -> LedgerResult<Vec<BranchSales>>
where
    L: SalesLedger + ?Sized,
{
    ledger
        .branch_sales(date)
        .await?
        .into_iter()
        .map(BranchSales::try_from)
        .collect()
}

/// Net summary plus product and branch detail for `date`.
///
/// The summary is computed first; if it fails, no detail query is issued.
pub async fn compute_breakdown<L>(
    date: NaiveDate,
    top_limit: u32,
    ledger: &L,
) -> LedgerResult<DailySalesBreakdown>
where
    L: SalesLedger + ?Sized,
{
    let summary = compute_net_sales_report(date, ledger).await?;
    let (top_products, branches) = tokio::try_join!(
        compute_top_products(date, top_limit, ledger),
        compute_branch_sales(date, ledger),
    )?;

    Ok(DailySalesBreakdown {
        summary,
        top_products,
        branches,
    })
}
