//! Run result models
//!
//! Per-case outcomes, suite summaries and the durable result record.

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use super::suite::{ExpectedOutput, TestAssertion, TestCase, TestInput};
use crate::metrics::SuiteMetrics;

/// Outcome of a single case
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseStatus {
    Passed,
    Failed,
    Error,
    Skipped,
}

impl CaseStatus {
    pub fn symbol(&self) -> &'static str {
        match self {
            CaseStatus::Passed => "✓",
            CaseStatus::Failed => "✗",
            CaseStatus::Skipped => "○",
            CaseStatus::Error => "!",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CaseStatus::Passed)
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaseStatus::Passed => write!(f, "PASS"),
            CaseStatus::Failed => write!(f, "FAIL"),
            CaseStatus::Skipped => write!(f, "SKIP"),
            CaseStatus::Error => write!(f, "ERROR"),
        }
    }
}

/// Overall verdict of one run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Passed,
    Failed,
    Error,
    Skipped,
}

impl ResultStatus {
    /// Precedence: any error wins, then any failure, else passed.
    pub fn from_cases(results: &[TestCaseResult]) -> Self {
        if results.iter().any(|r| r.status == CaseStatus::Error) {
            ResultStatus::Error
        } else if results.iter().any(|r| r.status == CaseStatus::Failed) {
            ResultStatus::Failed
        } else {
            ResultStatus::Passed
        }
    }
}

impl fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResultStatus::Passed => "passed",
            ResultStatus::Failed => "failed",
            ResultStatus::Error => "error",
            ResultStatus::Skipped => "skipped",
        };
        write!(f, "{s}")
    }
}

/// Verdict for one declared assertion
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AssertionOutcome {
    pub assertion: TestAssertion,
    pub passed: bool,
    pub message: String,
    pub actual: Value,
    pub expected: Value,
}

/// Per-case measurements
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct CaseMetrics {
    /// Wall time of the final attempt in milliseconds
    pub response_time_ms: u64,
}

/// Outcome of one case in one run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestCaseResult {
    pub case_id: String,
    pub name: String,
    pub status: CaseStatus,
    pub input: TestInput,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_output: Option<Value>,

    pub expected_output: ExpectedOutput,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assertions: Vec<AssertionOutcome>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub logs: Vec<String>,

    pub metrics: CaseMetrics,

    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl TestCaseResult {
    /// Result for a case that never started
    pub fn skipped(case: &TestCase, reason: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            case_id: case.id.clone(),
            name: case.name.clone(),
            status: CaseStatus::Skipped,
            input: case.input.clone(),
            actual_output: None,
            expected_output: case.expected_output.clone(),
            assertions: Vec::new(),
            error: None,
            logs: vec![reason.into()],
            metrics: CaseMetrics::default(),
            started_at: now,
            completed_at: now,
            duration_ms: 0,
        }
    }

    /// Result for a case whose worker task died before reporting
    pub fn lost(case: &TestCase, error: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            case_id: case.id.clone(),
            name: case.name.clone(),
            status: CaseStatus::Error,
            input: case.input.clone(),
            actual_output: None,
            expected_output: case.expected_output.clone(),
            assertions: Vec::new(),
            error: Some(error.into()),
            logs: Vec::new(),
            metrics: CaseMetrics::default(),
            started_at: now,
            completed_at: now,
            duration_ms: 0,
        }
    }

    /// True when the case actually ran to a verdict
    pub fn executed(&self) -> bool {
        !matches!(self.status, CaseStatus::Skipped)
    }
}

impl fmt::Display for TestCaseResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} [{}ms]",
            self.status.symbol(),
            self.name,
            self.duration_ms
        )?;
        if let Some(err) = &self.error {
            write!(f, " - {err}")?;
        }
        Ok(())
    }
}

/// Counts over one run's case results
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct TestSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub skipped: usize,
    pub pass_rate: f64,
}

impl TestSummary {
    pub fn from_results(results: &[TestCaseResult]) -> Self {
        let total = results.len();
        let passed = results
            .iter()
            .filter(|r| r.status == CaseStatus::Passed)
            .count();
        let failed = results
            .iter()
            .filter(|r| r.status == CaseStatus::Failed)
            .count();
        let errors = results
            .iter()
            .filter(|r| r.status == CaseStatus::Error)
            .count();
        let skipped = results
            .iter()
            .filter(|r| r.status == CaseStatus::Skipped)
            .count();
        let pass_rate = if total == 0 {
            0.0
        } else {
            (passed as f64 / total as f64) * 100.0
        };

        Self {
            total,
            passed,
            failed,
            errors,
            skipped,
            pass_rate,
        }
    }

    pub fn is_all_passed(&self) -> bool {
        self.passed == self.total
    }
}

/// Durable record of one completed run. Immutable once written.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestResults {
    pub id: String,
    pub suite_id: String,
    pub status: ResultStatus,
    pub summary: TestSummary,
    pub case_results: Vec<TestCaseResult>,
    pub metrics: SuiteMetrics,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<String>,

    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl fmt::Display for TestResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Run {} - suite {}", self.id, self.suite_id)?;
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        for result in &self.case_results {
            writeln!(f, "  {result}")?;
        }
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        writeln!(
            f,
            "Total: {} | Pass: {} | Fail: {} | Skip: {} | Error: {}",
            self.summary.total,
            self.summary.passed,
            self.summary.failed,
            self.summary.skipped,
            self.summary.errors
        )?;
        writeln!(
            f,
            "Pass Rate: {:.1}% | Duration: {}ms",
            self.summary.pass_rate, self.duration_ms
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::suite::TestInput;

    fn case(id: &str) -> TestCase {
        TestCase::new(id, id, TestInput::text("x"))
    }

    fn result_with_status(id: &str, status: CaseStatus) -> TestCaseResult {
        let mut r = TestCaseResult::skipped(&case(id), "seed");
        r.status = status;
        r
    }

    #[test]
    fn result_status_precedence() {
        let results = vec![
            result_with_status("a", CaseStatus::Passed),
            result_with_status("b", CaseStatus::Failed),
            result_with_status("c", CaseStatus::Error),
        ];
        assert_eq!(ResultStatus::from_cases(&results), ResultStatus::Error);

        let results = vec![
            result_with_status("a", CaseStatus::Passed),
            result_with_status("b", CaseStatus::Failed),
        ];
        assert_eq!(ResultStatus::from_cases(&results), ResultStatus::Failed);

        let results = vec![result_with_status("a", CaseStatus::Passed)];
        assert_eq!(ResultStatus::from_cases(&results), ResultStatus::Passed);
    }

    #[test]
    fn empty_run_is_trivially_passing() {
        assert_eq!(ResultStatus::from_cases(&[]), ResultStatus::Passed);
        let summary = TestSummary::from_results(&[]);
        assert_eq!(summary.total, 0);
        assert_eq!(summary.pass_rate, 0.0);
    }

    #[test]
    fn summary_counts() {
        let results = vec![
            result_with_status("a", CaseStatus::Passed),
            result_with_status("b", CaseStatus::Failed),
            result_with_status("c", CaseStatus::Skipped),
            result_with_status("d", CaseStatus::Passed),
        ];
        let summary = TestSummary::from_results(&results);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.passed, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.errors, 0);
        assert!((summary.pass_rate - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn skipped_result_carries_reason() {
        let r = TestCaseResult::skipped(&case("c9"), "cancelled before start");
        assert_eq!(r.status, CaseStatus::Skipped);
        assert_eq!(r.duration_ms, 0);
        assert_eq!(r.logs, vec!["cancelled before start".to_string()]);
        assert!(!r.executed());
    }
}
