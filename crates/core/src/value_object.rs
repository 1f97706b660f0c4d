//! Value object trait: equality by value, not identity.
//!
//! Report figures (daily aggregates, net reports, breakdown rows) have **no
//! identity**: two aggregates with the same count and sums are the same figure.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. A `DailyAggregate`
/// for one day is produced once from a ledger query and never modified; a new
/// query produces a new value.
///
/// ## Design Constraints
///
/// The trait requires:
/// - **Clone**: values are copied freely between the aggregator and presentation
/// - **PartialEq**: two figures compare by their fields (idempotence checks rely on this)
/// - **Debug**: figures show up in logs and test failures
///
/// ## Usage Pattern
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq, Eq)]
/// struct BillTotals {
///     bills: i64,
///     amount: Decimal,
/// }
///
/// impl ValueObject for BillTotals {}
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
