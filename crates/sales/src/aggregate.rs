use rust_decimal::Decimal;
use serde::Serialize;

use erpsales_core::{DomainError, ValueObject};

use crate::ledger::{LedgerError, LedgerTotalsRow};
use crate::voucher::VoucherType;

/// Totals of one voucher type on one day.
///
/// Every field is a concrete number: absence of matching records is zero,
/// never "unknown". Built only through [`DailyAggregate::new`] or
/// [`DailyAggregate::from_row`], both of which reject a negative bill count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DailyAggregate {
    bill_count: i64,
    amount: Decimal,
    tax: Decimal,
    discount: Decimal,
}

impl ValueObject for DailyAggregate {}

impl DailyAggregate {
    pub fn new(
        bill_count: i64,
        amount: Decimal,
        tax: Decimal,
        discount: Decimal,
    ) -> Result<Self, DomainError> {
        if bill_count < 0 {
            return Err(DomainError::invariant(format!(
                "bill count must be non-negative, got {bill_count}"
            )));
        }
        Ok(Self {
            bill_count,
            amount,
            tax,
            discount,
        })
    }

    /// A day with no matching records.
    pub fn zero() -> Self {
        Self::default()
    }

    /// Normalize a raw ledger totals row.
    ///
    /// - no row at all: every field is zero
    /// - `NULL` sums (no matching records): zero
    /// - negative count: [`LedgerError::MalformedResult`]
    pub fn from_row(voucher: VoucherType, row: Option<LedgerTotalsRow>) -> Result<Self, LedgerError> {
        let Some(row) = row else {
            return Ok(Self::zero());
        };

        Self::new(
            row.bill_count.unwrap_or(0),
            row.amount.unwrap_or(Decimal::ZERO),
            row.tax.unwrap_or(Decimal::ZERO),
            row.discount.unwrap_or(Decimal::ZERO),
        )
        .map_err(|e| LedgerError::malformed(format!("{voucher} totals: {e}")))
    }

    pub fn bill_count(&self) -> i64 {
        self.bill_count
    }

    /// Sum of grand totals.
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    /// Sum of VAT.
    pub fn tax(&self) -> Decimal {
        self.tax
    }

    /// Sum of discounts granted. Reported, not netted.
    pub fn discount(&self) -> Decimal {
        self.discount
    }

    pub fn is_zero(&self) -> bool {
        self.bill_count == 0
            && self.amount.is_zero()
            && self.tax.is_zero()
            && self.discount.is_zero()
    }
}
