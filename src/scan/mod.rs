pub mod outcome;
pub mod scanner;

pub use outcome::{Outcome, ScanSummary};
pub use scanner::{has_no_commits, BrokenPrScanner, SuspicionPredicate};
