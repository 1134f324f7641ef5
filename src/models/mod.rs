//! Data models for suite execution
//!
//! This module contains all data structures used throughout the application.

mod result;
mod suite;

pub use result::{
    AssertionOutcome, CaseMetrics, CaseStatus, ResultStatus, TestCaseResult, TestResults,
    TestSummary,
};
pub use suite::{
    AssertionType, CasePriority, CaseType, ExpectedOutput, InputType, SuiteStatus, TargetType,
    TestAssertion, TestCase, TestConfiguration, TestInput, TestSuite,
};

use chrono::Utc;

/// Generate a unique id with the given prefix
pub fn generate_id(prefix: &str) -> String {
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let random: u32 = rand::random::<u32>() % 10000;
    format!("{prefix}_{timestamp}_{random:04}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique() {
        let a = generate_id("run");
        let b = generate_id("run");
        assert!(a.starts_with("run_"));
        assert_ne!(a, b);
    }
}
