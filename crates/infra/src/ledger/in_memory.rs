use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

use erpsales_sales::{
    BranchSalesRow, LedgerError, LedgerResult, LedgerTotalsRow, ProductSalesRow, SalesLedger,
    VoucherType,
};

/// One line item of a ledger transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerLine {
    pub description: Option<String>,
    pub quantity: Option<Decimal>,
    pub net_amount: Option<Decimal>,
}

impl LedgerLine {
    pub fn new(description: impl Into<String>, quantity: Decimal, net_amount: Decimal) -> Self {
        Self {
            description: Some(description.into()),
            quantity: Some(quantity),
            net_amount: Some(net_amount),
        }
    }
}

/// One ledger transaction, mirroring a row of `inv_transaction_master` plus
/// its detail lines. Monetary columns are nullable as in the real table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerRecord {
    pub transaction_date: NaiveDateTime,
    /// Raw voucher-type code; the ledger holds more types than `SI`/`SR`.
    pub voucher_code: String,
    pub grand_total: Option<Decimal>,
    pub vat_amount: Option<Decimal>,
    pub total_discount: Option<Decimal>,
    pub branch_id: Option<i32>,
    pub lines: Vec<LedgerLine>,
}

impl LedgerRecord {
    pub fn new(
        transaction_date: NaiveDateTime,
        voucher_code: impl Into<String>,
        grand_total: Decimal,
        vat_amount: Decimal,
    ) -> Self {
        Self {
            transaction_date,
            voucher_code: voucher_code.into(),
            grand_total: Some(grand_total),
            vat_amount: Some(vat_amount),
            total_discount: None,
            branch_id: None,
            lines: Vec::new(),
        }
    }

    pub fn sale(transaction_date: NaiveDateTime, grand_total: Decimal, vat_amount: Decimal) -> Self {
        Self::new(
            transaction_date,
            VoucherType::SalesInvoice.code(),
            grand_total,
            vat_amount,
        )
    }

    pub fn sales_return(
        transaction_date: NaiveDateTime,
        grand_total: Decimal,
        vat_amount: Decimal,
    ) -> Self {
        Self::new(
            transaction_date,
            VoucherType::SalesReturn.code(),
            grand_total,
            vat_amount,
        )
    }

    pub fn with_discount(mut self, discount: Decimal) -> Self {
        self.total_discount = Some(discount);
        self
    }

    pub fn with_branch(mut self, branch_id: i32) -> Self {
        self.branch_id = Some(branch_id);
        self
    }

    pub fn with_line(mut self, line: LedgerLine) -> Self {
        self.lines.push(line);
        self
    }

    fn matches(&self, date: NaiveDate, voucher: VoucherType) -> bool {
        self.transaction_date.date() == date && self.voucher_code == voucher.code()
    }
}

/// In-memory transaction ledger.
///
/// Intended for tests/dev. Answers the report queries with the same semantics
/// as the SQL backend, including SQL `SUM` yielding `NULL` over zero (or only
/// `NULL`) inputs. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemorySalesLedger {
    records: RwLock<Vec<LedgerRecord>>,
    outage: RwLock<Option<String>>,
}

impl InMemorySalesLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = LedgerRecord>) -> Self {
        Self {
            records: RwLock::new(records.into_iter().collect()),
            outage: RwLock::new(None),
        }
    }

    pub fn insert(&self, record: LedgerRecord) -> LedgerResult<()> {
        self.records
            .write()
            .map_err(|_| LedgerError::data_source("lock poisoned"))?
            .push(record);
        Ok(())
    }

    /// Make every subsequent query fail with `DataSource(reason)`, or restore
    /// service with `None`.
    pub fn set_outage(&self, reason: Option<&str>) -> LedgerResult<()> {
        *self
            .outage
            .write()
            .map_err(|_| LedgerError::data_source("lock poisoned"))? = reason.map(str::to_string);
        Ok(())
    }

    fn check_available(&self) -> LedgerResult<()> {
        let outage = self
            .outage
            .read()
            .map_err(|_| LedgerError::data_source("lock poisoned"))?;
        match outage.as_ref() {
            Some(reason) => Err(LedgerError::data_source(reason.clone())),
            None => Ok(()),
        }
    }

    fn matching(&self, date: NaiveDate, voucher: VoucherType) -> LedgerResult<Vec<LedgerRecord>> {
        self.check_available()?;
        let records = self
            .records
            .read()
            .map_err(|_| LedgerError::data_source("lock poisoned"))?;
        Ok(records
            .iter()
            .filter(|r| r.matches(date, voucher))
            .cloned()
            .collect())
    }
}

/// SQL `SUM`: `NULL`s are skipped, and the result is `NULL` when nothing
/// non-null was summed.
fn sql_sum<I>(values: I) -> Option<Decimal>
where
    I: IntoIterator<Item = Option<Decimal>>,
{
    values
        .into_iter()
        .flatten()
        .fold(None, |acc, v| Some(acc.unwrap_or(Decimal::ZERO) + v))
}

/// `DESC NULLS LAST`
fn desc_nulls_last(a: Option<Decimal>, b: Option<Decimal>) -> std::cmp::Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    }
}

#[async_trait]
impl SalesLedger for InMemorySalesLedger {
    async fn daily_totals(
        &self,
        date: NaiveDate,
        voucher: VoucherType,
    ) -> LedgerResult<Option<LedgerTotalsRow>> {
        let records = self.matching(date, voucher)?;
        Ok(Some(LedgerTotalsRow {
            bill_count: Some(records.len() as i64),
            amount: sql_sum(records.iter().map(|r| r.grand_total)),
            tax: sql_sum(records.iter().map(|r| r.vat_amount)),
            discount: sql_sum(records.iter().map(|r| r.total_discount)),
        }))
    }

    async fn top_products(&self, date: NaiveDate, limit: u32) -> LedgerResult<Vec<ProductSalesRow>> {
        let records = self.matching(date, VoucherType::SalesInvoice)?;

        // `None` sorts first in a BTreeMap; ordering is re-established below.
        let mut groups: BTreeMap<Option<String>, Vec<&LedgerLine>> = BTreeMap::new();
        for line in records.iter().flat_map(|r| r.lines.iter()) {
            groups.entry(line.description.clone()).or_default().push(line);
        }

        let mut rows: Vec<ProductSalesRow> = groups
            .into_iter()
            .map(|(description, lines)| ProductSalesRow {
                description,
                quantity: sql_sum(lines.iter().map(|l| l.quantity)),
                amount: sql_sum(lines.iter().map(|l| l.net_amount)),
            })
            .collect();

        // ORDER BY quantity DESC NULLS LAST, description ASC (NULLS LAST)
        rows.sort_by(|a, b| {
            desc_nulls_last(a.quantity, b.quantity).then_with(|| {
                match (&a.description, &b.description) {
                    (Some(a), Some(b)) => a.cmp(b),
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => std::cmp::Ordering::Equal,
                }
            })
        });
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn branch_sales(&self, date: NaiveDate) -> LedgerResult<Vec<BranchSalesRow>> {
        let records = self.matching(date, VoucherType::SalesInvoice)?;

        let mut groups: BTreeMap<i32, Vec<&LedgerRecord>> = BTreeMap::new();
        for record in &records {
            groups
                .entry(record.branch_id.unwrap_or(0))
                .or_default()
                .push(record);
        }

        let mut rows: Vec<BranchSalesRow> = groups
            .into_iter()
            .map(|(branch_id, records)| BranchSalesRow {
                branch_id: Some(branch_id),
                bill_count: Some(records.len() as i64),
                amount: sql_sum(records.iter().map(|r| r.grand_total)),
            })
            .collect();

        // ORDER BY amount DESC NULLS LAST, branch_id ASC
        rows.sort_by(|a, b| desc_nulls_last(a.amount, b.amount).then(a.branch_id.cmp(&b.branch_id)));
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use erpsales_sales::{
        compute_breakdown, compute_daily_aggregate, compute_net_sales_report, DailyAggregate,
    };

    fn d(v: i64) -> Decimal {
        Decimal::from(v)
    }

    fn day_x() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, 26).unwrap()
    }

    fn at(date: NaiveDate, h: u32, m: u32, s: u32) -> NaiveDateTime {
        date.and_hms_opt(h, m, s).unwrap()
    }

    fn noon() -> NaiveDateTime {
        at(day_x(), 12, 0, 0)
    }

    #[test]
    fn sql_sum_follows_sql_null_rules() {
        assert_eq!(sql_sum(Vec::<Option<Decimal>>::new()), None);
        assert_eq!(sql_sum(vec![None, None]), None);
        assert_eq!(sql_sum(vec![None, Some(d(2)), Some(d(3))]), Some(d(5)));
    }

    #[tokio::test]
    async fn empty_day_yields_null_sums_and_zero_count() {
        let ledger = InMemorySalesLedger::new();
        let row = ledger
            .daily_totals(day_x(), VoucherType::SalesInvoice)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.bill_count, Some(0));
        assert_eq!(row.amount, None);
        assert_eq!(row.tax, None);

        let report = compute_net_sales_report(day_x(), &ledger).await.unwrap();
        assert!(report.is_empty());
        assert_eq!(*report.gross_sales(), DailyAggregate::zero());
        assert_eq!(*report.returns(), DailyAggregate::zero());
        assert_eq!(report.net_bill_count(), 0);
        assert_eq!(report.net_amount(), Decimal::ZERO);
        assert_eq!(report.net_tax(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn date_filter_truncates_timestamps() {
        let prev = day_x().pred_opt().unwrap();
        let next = day_x().succ_opt().unwrap();
        let ledger = InMemorySalesLedger::with_records([
            LedgerRecord::sale(at(day_x(), 0, 0, 0), d(10), d(1)),
            LedgerRecord::sale(at(day_x(), 23, 59, 59), d(20), d(1)),
            LedgerRecord::sale(at(prev, 23, 59, 59), d(1000), d(1)),
            LedgerRecord::sale(at(next, 0, 0, 0), d(1000), d(1)),
        ]);

        let agg = compute_daily_aggregate(day_x(), VoucherType::SalesInvoice, &ledger)
            .await
            .unwrap();
        assert_eq!(agg.bill_count(), 2);
        assert_eq!(agg.amount(), d(30));
        assert_eq!(agg.tax(), d(2));
    }

    #[tokio::test]
    async fn other_voucher_types_are_ignored() {
        let ledger = InMemorySalesLedger::with_records([
            LedgerRecord::sale(noon(), d(100), d(5)),
            LedgerRecord::new(noon(), "PI", d(900), d(45)),
            LedgerRecord::new(noon(), "si", d(900), d(45)),
        ]);
        let report = compute_net_sales_report(day_x(), &ledger).await.unwrap();
        assert_eq!(report.gross_sales().bill_count(), 1);
        assert_eq!(report.returns().bill_count(), 0);
        assert_eq!(report.net_amount(), d(100));
    }

    #[tokio::test]
    async fn scenario_sales_only() {
        let ledger = InMemorySalesLedger::with_records([
            LedgerRecord::sale(noon(), d(100), d(5)),
            LedgerRecord::sale(noon(), d(200), d(5)),
            LedgerRecord::sale(noon(), d(300), d(5)),
        ]);
        let report = compute_net_sales_report(day_x(), &ledger).await.unwrap();

        let gross = report.gross_sales();
        assert_eq!((gross.bill_count(), gross.amount(), gross.tax()), (3, d(600), d(15)));
        assert_eq!(*report.returns(), DailyAggregate::zero());
        assert_eq!(report.net_bill_count(), 3);
        assert_eq!(report.net_amount(), d(600));
        assert_eq!(report.net_tax(), d(15));
    }

    #[tokio::test]
    async fn scenario_sales_and_returns() {
        let mut records: Vec<LedgerRecord> = [150, 250, 200, 300, 100]
            .into_iter()
            .map(|amount| LedgerRecord::sale(noon(), d(amount), d(10)))
            .collect();
        records.push(LedgerRecord::sales_return(noon(), d(100), d(5)));
        records.push(LedgerRecord::sales_return(noon(), d(200), d(10)));
        let ledger = InMemorySalesLedger::with_records(records);

        let report = compute_net_sales_report(day_x(), &ledger).await.unwrap();
        assert_eq!(report.gross_sales().amount(), d(1000));
        assert_eq!(report.gross_sales().tax(), d(50));
        assert_eq!(report.returns().amount(), d(300));
        assert_eq!(report.returns().tax(), d(15));
        assert_eq!(report.net_bill_count(), 3);
        assert_eq!(report.net_amount(), d(700));
        assert_eq!(report.net_tax(), d(35));
    }

    #[tokio::test]
    async fn scenario_returns_exceed_sales() {
        let ledger = InMemorySalesLedger::with_records([
            LedgerRecord::sale(noon(), d(50), d(0)),
            LedgerRecord::sales_return(noon(), d(120), d(0)),
            LedgerRecord::sales_return(noon(), d(80), d(0)),
        ]);
        let report = compute_net_sales_report(day_x(), &ledger).await.unwrap();
        assert_eq!(report.net_bill_count(), -1);
        assert_eq!(report.net_amount(), d(-150));
    }

    #[tokio::test]
    async fn null_amounts_normalize_to_zero() {
        let mut record = LedgerRecord::sale(noon(), d(0), d(0));
        record.grand_total = None;
        record.vat_amount = None;
        let ledger = InMemorySalesLedger::with_records([record]);

        let agg = compute_daily_aggregate(day_x(), VoucherType::SalesInvoice, &ledger)
            .await
            .unwrap();
        assert_eq!(agg.bill_count(), 1);
        assert_eq!(agg.amount(), Decimal::ZERO);
        assert_eq!(agg.tax(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn repeated_reports_are_identical() {
        let ledger = InMemorySalesLedger::with_records([
            LedgerRecord::sale(noon(), d(75), d(3)).with_discount(d(5)),
            LedgerRecord::sales_return(noon(), d(25), d(1)),
        ]);
        let first = compute_breakdown(day_x(), 10, &ledger).await.unwrap();
        let second = compute_breakdown(day_x(), 10, &ledger).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.summary.gross_sales().discount(), d(5));
    }

    #[tokio::test]
    async fn outage_fails_without_partial_report() {
        let ledger = InMemorySalesLedger::with_records([LedgerRecord::sale(noon(), d(75), d(3))]);
        ledger.set_outage(Some("connection refused")).unwrap();

        let err = compute_net_sales_report(day_x(), &ledger).await.unwrap_err();
        assert_eq!(err, LedgerError::data_source("connection refused"));

        ledger.set_outage(None).unwrap();
        let report = compute_net_sales_report(day_x(), &ledger).await.unwrap();
        assert_eq!(report.net_amount(), d(75));
    }

    #[tokio::test]
    async fn top_products_order_and_limit() {
        let ledger = InMemorySalesLedger::with_records([
            LedgerRecord::sale(noon(), d(100), d(5))
                .with_line(LedgerLine::new("Bread", d(3), d(9)))
                .with_line(LedgerLine::new("Milk 1L", d(2), d(10))),
            LedgerRecord::sale(noon(), d(50), d(2))
                .with_line(LedgerLine::new("Milk 1L", d(4), d(20)))
                .with_line(LedgerLine {
                    description: None,
                    quantity: Some(d(1)),
                    net_amount: Some(d(7)),
                }),
            // Returned lines never count as sold.
            LedgerRecord::sales_return(noon(), d(40), d(2))
                .with_line(LedgerLine::new("Eggs", d(40), d(40))),
        ]);

        let rows = ledger.top_products(day_x(), 10).await.unwrap();
        let names: Vec<_> = rows.iter().map(|r| r.description.as_deref()).collect();
        assert_eq!(names, vec![Some("Milk 1L"), Some("Bread"), None]);
        assert_eq!(rows[0].quantity, Some(d(6)));
        assert_eq!(rows[0].amount, Some(d(30)));

        let rows = ledger.top_products(day_x(), 1).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn branch_sales_group_null_branch_with_main() {
        let ledger = InMemorySalesLedger::with_records([
            LedgerRecord::sale(noon(), d(100), d(5)),
            LedgerRecord::sale(noon(), d(50), d(2)).with_branch(0),
            LedgerRecord::sale(noon(), d(400), d(20)).with_branch(3),
            LedgerRecord::sales_return(noon(), d(999), d(0)).with_branch(4),
        ]);

        let rows = ledger.branch_sales(day_x()).await.unwrap();
        assert_eq!(
            rows,
            vec![
                BranchSalesRow {
                    branch_id: Some(3),
                    bill_count: Some(1),
                    amount: Some(d(400)),
                },
                BranchSalesRow {
                    branch_id: Some(0),
                    bill_count: Some(2),
                    amount: Some(d(150)),
                },
            ]
        );
    }
}
