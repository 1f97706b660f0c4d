use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use erpsales_core::ValueObject;

use crate::aggregate::DailyAggregate;
use crate::ledger::{LedgerError, LedgerResult};

/// Net sales for one day: gross sales, gross returns and their difference.
///
/// The net fields are computed once, in [`NetSalesReport::new`], as
/// `gross - returns` for bill count, amount and tax. They cannot be set any
/// other way. Negative net values are valid (a day where returns exceed
/// sales). A difference outside the `Decimal` range is a
/// [`LedgerError::MalformedResult`], since no real ledger produces one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetSalesReport {
    date: NaiveDate,
    gross_sales: DailyAggregate,
    returns: DailyAggregate,
    net_bill_count: i64,
    net_amount: Decimal,
    net_tax: Decimal,
}

impl ValueObject for NetSalesReport {}

impl NetSalesReport {
    pub fn new(
        date: NaiveDate,
        gross_sales: DailyAggregate,
        returns: DailyAggregate,
    ) -> LedgerResult<Self> {
        let overflow = |field: &str| {
            LedgerError::malformed(format!("net {field} for {date} is out of range"))
        };

        Ok(Self {
            date,
            net_bill_count: gross_sales
                .bill_count()
                .checked_sub(returns.bill_count())
                .ok_or_else(|| overflow("bill count"))?,
            net_amount: gross_sales
                .amount()
                .checked_sub(returns.amount())
                .ok_or_else(|| overflow("amount"))?,
            net_tax: gross_sales
                .tax()
                .checked_sub(returns.tax())
                .ok_or_else(|| overflow("tax"))?,
            gross_sales,
            returns,
        })
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn gross_sales(&self) -> &DailyAggregate {
        &self.gross_sales
    }

    pub fn returns(&self) -> &DailyAggregate {
        &self.returns
    }

    pub fn net_bill_count(&self) -> i64 {
        self.net_bill_count
    }

    pub fn net_amount(&self) -> Decimal {
        self.net_amount
    }

    pub fn net_tax(&self) -> Decimal {
        self.net_tax
    }

    /// True when neither sales nor returns were recorded.
    pub fn is_empty(&self) -> bool {
        self.gross_sales.is_zero() && self.returns.is_zero()
    }
}
