//! Strongly-typed identifiers used across the domain.

use serde::{Deserialize, Serialize};

/// Identifier of a store branch in the transaction ledger.
///
/// The ledger allows transactions without a branch; those are reported under
/// [`BranchId::MAIN`] (id `0`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BranchId(i32);

impl BranchId {
    /// The main branch, also used for transactions with no branch recorded.
    pub const MAIN: BranchId = BranchId(0);

    pub fn new(id: i32) -> Self {
        Self(id)
    }

    /// Map a nullable ledger column onto a branch, `NULL` becoming the main branch.
    pub fn from_nullable(id: Option<i32>) -> Self {
        id.map(Self).unwrap_or(Self::MAIN)
    }

    pub fn is_main(&self) -> bool {
        *self == Self::MAIN
    }
}

impl core::fmt::Display for BranchId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_branch_is_main() {
        assert_eq!(BranchId::from_nullable(None), BranchId::MAIN);
        assert!(BranchId::from_nullable(None).is_main());
        assert_eq!(BranchId::from_nullable(Some(3)), BranchId::new(3));
        assert!(!BranchId::from_nullable(Some(3)).is_main());
    }

    #[test]
    fn displays_bare_number() {
        assert_eq!(BranchId::new(12).to_string(), "12");
    }
}
