//! Output formatters for run results
//!
//! Provides JSON, Table, CSV and summary output formats.

#![allow(dead_code)]

use crate::models::{CaseStatus, TestCaseResult, TestResults};

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    JsonPretty,
    Csv,
    Summary,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "table" => Some(OutputFormat::Table),
            "json" => Some(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Some(OutputFormat::JsonPretty),
            "csv" => Some(OutputFormat::Csv),
            "summary" => Some(OutputFormat::Summary),
            _ => None,
        }
    }
}

/// Result formatter
pub struct ResultFormatter {
    format: OutputFormat,
    colorize: bool,
}

impl ResultFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            colorize: true,
        }
    }

    pub fn no_color(mut self) -> Self {
        self.colorize = false;
        self
    }

    fn status_str(&self, status: CaseStatus) -> &'static str {
        if self.colorize {
            match status {
                CaseStatus::Passed => "\x1b[32m✓ PASS\x1b[0m",
                CaseStatus::Failed => "\x1b[31m✗ FAIL\x1b[0m",
                CaseStatus::Skipped => "\x1b[33m○ SKIP\x1b[0m",
                CaseStatus::Error => "\x1b[31m! ERROR\x1b[0m",
            }
        } else {
            match status {
                CaseStatus::Passed => "✓ PASS",
                CaseStatus::Failed => "✗ FAIL",
                CaseStatus::Skipped => "○ SKIP",
                CaseStatus::Error => "! ERROR",
            }
        }
    }

    fn format_case_table(&self, result: &TestCaseResult) -> String {
        let mut line = format!(
            "{:24} {} [{:>6}ms]",
            result.name,
            self.status_str(result.status),
            result.duration_ms
        );
        if let Some(err) = &result.error {
            line.push_str(&format!(" - {err}"));
        } else if let Some(failed) = result.assertions.iter().find(|a| !a.passed) {
            line.push_str(&format!(" - {}", failed.message));
        }
        line
    }

    fn format_case_csv(&self, result: &TestCaseResult) -> String {
        format!(
            "{},{},{},{},\"{}\"",
            result.case_id,
            result.name,
            result.status,
            result.duration_ms,
            result.error.as_deref().unwrap_or("").replace('"', "\"\"")
        )
    }

    /// Format a full run
    pub fn format_results(&self, results: &TestResults) -> String {
        match self.format {
            OutputFormat::Table => self.format_results_table(results),
            OutputFormat::Json => serde_json::to_string(results).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(results).unwrap_or_default(),
            OutputFormat::Csv => self.format_results_csv(results),
            OutputFormat::Summary => self.format_results_brief(results),
        }
    }

    fn format_results_table(&self, results: &TestResults) -> String {
        let mut output = String::new();
        output.push_str(&format!(
            "\nRun {} - suite {} [{}]\n",
            results.id, results.suite_id, results.status
        ));
        output.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");

        for case in &results.case_results {
            output.push_str(&format!("  {}\n", self.format_case_table(case)));
        }

        output.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
        output.push_str(&format!(
            "Total: {} | Pass: {} | Fail: {} | Skip: {} | Error: {}\n",
            results.summary.total,
            results.summary.passed,
            results.summary.failed,
            results.summary.skipped,
            results.summary.errors
        ));
        output.push_str(&format!(
            "Pass Rate: {:.1}% | Error Rate: {:.1}% | Duration: {}ms\n",
            results.summary.pass_rate, results.metrics.error_rate, results.duration_ms
        ));
        output.push_str(&format!(
            "Response Time: {}\n",
            results.metrics.response_time.format_summary()
        ));
        output
    }

    fn format_results_csv(&self, results: &TestResults) -> String {
        let mut output = String::from("case_id,name,status,duration_ms,error\n");
        for case in &results.case_results {
            output.push_str(&self.format_case_csv(case));
            output.push('\n');
        }
        output
    }

    fn format_results_brief(&self, results: &TestResults) -> String {
        format!(
            "{}: {}/{} passed ({:.1}%) in {}ms",
            results.status,
            results.summary.passed,
            results.summary.total,
            results.summary.pass_rate,
            results.duration_ms
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::SuiteMetrics;
    use crate::models::{ResultStatus, TestCase, TestInput, TestSummary};
    use chrono::Utc;
    use std::time::Duration;

    fn sample_results() -> TestResults {
        let case = TestCase::new("c1", "first case", TestInput::text("x"));
        let mut case_result = TestCaseResult::skipped(&case, "seed");
        case_result.status = CaseStatus::Passed;
        case_result.duration_ms = 42;

        let case_results = vec![case_result];
        TestResults {
            id: "run_1".to_string(),
            suite_id: "suite_1".to_string(),
            status: ResultStatus::Passed,
            summary: TestSummary::from_results(&case_results),
            case_results,
            metrics: SuiteMetrics::from_results(&[], Duration::ZERO),
            artifacts: Vec::new(),
            started_at: Utc::now(),
            completed_at: Utc::now(),
            duration_ms: 42,
        }
    }

    #[test]
    fn format_parsing() {
        assert_eq!(OutputFormat::from_str("table"), Some(OutputFormat::Table));
        assert_eq!(
            OutputFormat::from_str("json-pretty"),
            Some(OutputFormat::JsonPretty)
        );
        assert_eq!(OutputFormat::from_str("xml"), None);
    }

    #[test]
    fn table_output_includes_counts() {
        let formatter = ResultFormatter::new(OutputFormat::Table).no_color();
        let text = formatter.format_results(&sample_results());
        assert!(text.contains("Total: 1 | Pass: 1"));
        assert!(text.contains("first case"));
    }

    #[test]
    fn json_output_round_trips() {
        let formatter = ResultFormatter::new(OutputFormat::Json);
        let text = formatter.format_results(&sample_results());
        let parsed: TestResults = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.id, "run_1");
    }

    #[test]
    fn csv_escapes_quotes() {
        let formatter = ResultFormatter::new(OutputFormat::Csv);
        let mut results = sample_results();
        results.case_results[0].error = Some("said \"no\"".to_string());
        let text = formatter.format_results(&results);
        assert!(text.contains("\"said \"\"no\"\"\""));
    }

    #[test]
    fn brief_output() {
        let formatter = ResultFormatter::new(OutputFormat::Summary);
        let text = formatter.format_results(&sample_results());
        assert!(text.contains("1/1 passed"));
    }
}
