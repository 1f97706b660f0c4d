//! Transaction ledger backends.
//!
//! Both backends implement [`erpsales_sales::SalesLedger`] with the same query
//! semantics: Postgres for real invocations, in-memory for tests and benches.

pub mod in_memory;
pub mod postgres;

pub use in_memory::{InMemorySalesLedger, LedgerLine, LedgerRecord};
pub use postgres::PostgresSalesLedger;
