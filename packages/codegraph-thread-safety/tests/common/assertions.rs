//! Custom assertions for test verification
//!
//! This module provides domain-specific assertions for thread-safety reports.

use codegraph_thread_safety::{CheckReport, Diagnostic, IssueKind};

/// Diagnostics of `kind` reported on method `method`
pub fn violations<'a>(report: &'a CheckReport, kind: IssueKind, method: &str) -> Vec<&'a Diagnostic> {
    report
        .diagnostics
        .iter()
        .filter(|d| d.kind == kind && d.proc_name.method_name == method)
        .collect()
}

/// Assert that the report is empty
pub fn assert_no_violations(report: &CheckReport) {
    assert!(
        report.diagnostics.is_empty(),
        "Expected no violations, got: {:#?}",
        report
            .diagnostics
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
    );
}

/// Assert the number of violations of `kind` on `method`
pub fn assert_violation_count(report: &CheckReport, kind: IssueKind, method: &str, expected: usize) {
    let found = violations(report, kind, method);
    assert_eq!(
        found.len(),
        expected,
        "Expected {expected} {kind} on `{method}`, got: {:#?}",
        found.iter().map(|d| d.to_string()).collect::<Vec<_>>()
    );
}
