// Tue Jan 13 2026 - Alex

pub mod background;
pub mod card_table;
pub mod report;
pub mod verifier;

pub use background::{BackgroundCheck, BackgroundMarks};
pub use card_table::CardTable;
pub use report::{IssueSeverity, VerificationReport, VerificationSummary};
pub use verifier::{IssueKind, ObjectIssue, ObjectVerifier};
