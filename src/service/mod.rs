pub mod issuer;
pub mod matcher;
pub mod money;

pub use issuer::{BranchGuard, BranchLocks, InvoiceIssuer};
pub use matcher::{find_selection, MatchOutcome, SubsetMatcher};
