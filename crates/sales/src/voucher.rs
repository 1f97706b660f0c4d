use serde::{Deserialize, Serialize};

/// Voucher-type discriminator of a ledger transaction.
///
/// Only the two sales voucher types take part in the daily report; the ledger
/// holds other types (purchases, transfers, ...) which are never queried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoucherType {
    /// `SI`
    #[serde(rename = "SI")]
    SalesInvoice,
    /// `SR`
    #[serde(rename = "SR")]
    SalesReturn,
}

impl VoucherType {
    /// Code stored in the ledger's voucher-type column.
    pub fn code(&self) -> &'static str {
        match self {
            VoucherType::SalesInvoice => "SI",
            VoucherType::SalesReturn => "SR",
        }
    }
}

impl core::fmt::Display for VoucherType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}
