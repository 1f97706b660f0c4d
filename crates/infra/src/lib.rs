//! Infrastructure layer: ledger backends and connection configuration.

/// Configuration loading and representation.
pub mod config;

/// `SalesLedger` implementations (Postgres, in-memory).
pub mod ledger;

pub use config::{ConfigError, LedgerConfig};
pub use ledger::{InMemorySalesLedger, LedgerLine, LedgerRecord, PostgresSalesLedger};
