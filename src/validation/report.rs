// Tue Jan 13 2026 - Alex

use crate::gc::HeapError;
use crate::memory::Address;
use crate::validation::{IssueKind, ObjectIssue};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IssueSeverity {
    Error,
    Warning,
}

impl IssueSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueSeverity::Error => "ERROR",
            IssueSeverity::Warning => "WARNING",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct VerificationSummary {
    pub objects_checked: u64,
    pub objects_with_issues: u64,
    pub error_count: usize,
    pub warning_count: usize,
    pub missing_cards: usize,
}

impl VerificationSummary {
    fn add_issue(&mut self, issue: &ObjectIssue) {
        match issue.severity() {
            IssueSeverity::Error => self.error_count += 1,
            IssueSeverity::Warning => self.warning_count += 1,
        }
        if issue.kind == IssueKind::MissingCard {
            self.missing_cards += 1;
        }
    }

    pub fn total_issues(&self) -> usize {
        self.error_count + self.warning_count
    }
}

/// Issues collected over one verifying traversal. Every issue is counted;
/// only the first `max_issues` are kept.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationReport {
    pub summary: VerificationSummary,
    issues: Vec<ObjectIssue>,
    max_issues: usize,
    truncated: bool,
}

impl VerificationReport {
    pub fn new(max_issues: usize) -> Self {
        Self {
            summary: VerificationSummary::default(),
            issues: Vec::new(),
            max_issues,
            truncated: false,
        }
    }

    pub fn record(&mut self, object: Address, issues: Vec<ObjectIssue>) {
        self.summary.objects_checked += 1;
        if issues.is_empty() {
            return;
        }
        log::trace!("{} issue(s) in {}", issues.len(), object);
        self.summary.objects_with_issues += 1;
        for issue in issues {
            self.summary.add_issue(&issue);
            if self.issues.len() < self.max_issues {
                self.issues.push(issue);
            } else {
                self.truncated = true;
            }
        }
    }

    pub fn objects_checked(&self) -> u64 {
        self.summary.objects_checked
    }

    pub fn issues(&self) -> &[ObjectIssue] {
        &self.issues
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn is_clean(&self) -> bool {
        self.summary.total_issues() == 0
    }

    pub fn errors(&self) -> impl Iterator<Item = HeapError> + '_ {
        self.issues
            .iter()
            .filter(|i| i.severity() == IssueSeverity::Error)
            .map(|i| i.to_error())
    }

    pub fn format_report(&self) -> String {
        let mut output = String::new();

        output.push_str("=== Verification Report ===\n");
        output.push_str(&format!("Objects checked: {}\n", self.summary.objects_checked));
        output.push_str(&format!("Objects with issues: {}\n", self.summary.objects_with_issues));
        output.push_str("\nSummary:\n");
        output.push_str(&format!("  Errors: {}\n", self.summary.error_count));
        output.push_str(&format!("  Warnings: {}\n", self.summary.warning_count));
        output.push_str(&format!("  Missing cards: {}\n", self.summary.missing_cards));

        for severity in [IssueSeverity::Error, IssueSeverity::Warning] {
            let matching: Vec<_> = self.issues.iter().filter(|i| i.severity() == severity).collect();
            if matching.is_empty() {
                continue;
            }
            output.push_str(&format!("\n  [{}S]\n", severity.as_str()));
            for issue in matching {
                output.push_str(&format!("    - {}\n", issue));
            }
        }
        if self.truncated {
            output.push_str(&format!("\n  (only the first {} issues are listed)\n", self.max_issues));
        }

        output
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

impl Default for VerificationReport {
    fn default() -> Self {
        Self::new(usize::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(object: u64, kind: IssueKind) -> ObjectIssue {
        ObjectIssue {
            object: Address::new(object),
            offset: 8,
            target: Address::new(0x30_0000),
            kind,
        }
    }

    #[test]
    fn test_counts_every_issue_but_keeps_cap() {
        let mut report = VerificationReport::new(2);
        report.record(Address::new(0x1000), Vec::new());
        report.record(
            Address::new(0x2000),
            vec![issue(0x2000, IssueKind::MissingCard), issue(0x2000, IssueKind::UnreadableMember)],
        );
        report.record(Address::new(0x3000), vec![issue(0x3000, IssueKind::BadMember)]);

        assert_eq!(report.objects_checked(), 3);
        assert_eq!(report.summary.objects_with_issues, 2);
        assert_eq!(report.summary.error_count, 2);
        assert_eq!(report.summary.warning_count, 1);
        assert_eq!(report.summary.missing_cards, 1);
        assert_eq!(report.issues().len(), 2);
        assert!(report.is_truncated());
        assert!(!report.is_clean());
        assert_eq!(report.errors().count(), 1);
    }

    #[test]
    fn test_format_report() {
        let mut report = VerificationReport::new(10);
        report.record(Address::new(0x2000), vec![issue(0x2000, IssueKind::FreeMember)]);
        let text = report.format_report();
        assert!(text.contains("Objects checked: 1"));
        assert!(text.contains("[ERRORS]"));
        assert!(text.contains("free member"));
        assert!(!text.contains("[WARNINGS]"));

        let json = report.to_json();
        assert!(json.contains("\"FreeMember\""));
    }
}
