//! Case execution
//!
//! Runs exactly one enabled test case against the target adapter and
//! produces its result. Adapter failures and panics become data on the
//! result; nothing escapes to the orchestrator.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::adapter::{AdapterError, TargetAdapter};
use crate::assertion::{evaluate_assertions, validate_expected};
use crate::models::{
    CaseMetrics, CaseStatus, TargetType, TestCase, TestCaseResult,
};
use crate::utils::Timer;

/// Executes single cases for one suite's target
pub struct CaseRunner {
    adapter: Arc<dyn TargetAdapter>,
    target_type: TargetType,
    target_id: String,
}

impl CaseRunner {
    pub fn new(
        adapter: Arc<dyn TargetAdapter>,
        target_type: TargetType,
        target_id: impl Into<String>,
    ) -> Self {
        Self {
            adapter,
            target_type,
            target_id: target_id.into(),
        }
    }

    /// Run one case, honoring its retry budget.
    ///
    /// Only the final attempt is reported; intermediate attempts are
    /// discarded. Cancellation between attempts stops retrying and returns
    /// whatever the last attempt produced.
    pub async fn run(&self, case: &TestCase, cancel: &CancellationToken) -> TestCaseResult {
        let attempts = case.retries.saturating_add(1);
        let mut last: Option<TestCaseResult> = None;

        for attempt in 1..=attempts {
            if cancel.is_cancelled() {
                return match last {
                    Some(result) => result,
                    None => TestCaseResult::skipped(case, "cancelled before start"),
                };
            }

            let result = self.attempt(case, cancel).await;

            // A cancelled attempt never counts as a verdict
            if result.status == CaseStatus::Skipped {
                return result;
            }

            let passed = result.status == CaseStatus::Passed;
            last = Some(result);

            if passed {
                break;
            }
            if attempt < attempts {
                debug!(
                    case = %case.id,
                    attempt,
                    remaining = attempts - attempt,
                    "case did not pass, retrying"
                );
            }
        }

        last.expect("at least one attempt ran")
    }

    async fn attempt(&self, case: &TestCase, cancel: &CancellationToken) -> TestCaseResult {
        let started_at = Utc::now();
        let timer = Timer::start(&case.name);
        let deadline = Instant::now() + Duration::from_millis(case.timeout_ms);
        let mut logs = Vec::new();

        let outcome = self.invoke_adapter(case, deadline, cancel).await;

        let (status, actual_output, assertions, error) = match outcome {
            Err(AdapterError::Cancelled) => {
                logs.push("cancelled while executing".to_string());
                (CaseStatus::Skipped, None, Vec::new(), None)
            }
            Err(e) => {
                error!(case = %case.id, error = %e, "target execution failed");
                logs.push(format!("adapter error: {e}"));
                (CaseStatus::Error, None, Vec::new(), Some(e.to_string()))
            }
            Ok(output) => {
                let assertions = evaluate_assertions(&output, &case.assertions);

                let status = if let Some(failed) = assertions.iter().find(|a| !a.passed) {
                    logs.push(format!("assertion failed: {}", failed.message));
                    CaseStatus::Failed
                } else {
                    match validate_expected(&output, &case.expected_output) {
                        Ok(()) => CaseStatus::Passed,
                        Err(message) => {
                            logs.push(format!("output validation failed: {message}"));
                            CaseStatus::Failed
                        }
                    }
                };

                (status, Some(output), assertions, None)
            }
        };

        let duration_ms = timer.elapsed_ms();

        TestCaseResult {
            case_id: case.id.clone(),
            name: case.name.clone(),
            status,
            input: case.input.clone(),
            actual_output,
            expected_output: case.expected_output.clone(),
            assertions,
            error,
            logs,
            metrics: CaseMetrics {
                response_time_ms: duration_ms,
            },
            started_at,
            completed_at: Utc::now(),
            duration_ms,
        }
    }

    /// Invoke the adapter in its own task so a panicking backend surfaces
    /// as an execution error instead of unwinding through the run.
    async fn invoke_adapter(
        &self,
        case: &TestCase,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> Result<serde_json::Value, AdapterError> {
        let adapter = Arc::clone(&self.adapter);
        let target_type = self.target_type;
        let target_id = self.target_id.clone();
        let input = case.input.clone();
        let cancel = cancel.clone();

        let handle = tokio::spawn(async move {
            adapter
                .execute(target_type, &target_id, &input, deadline, &cancel)
                .await
        });

        match handle.await {
            Ok(result) => result,
            Err(join_err) => Err(AdapterError::execution(format!(
                "adapter task aborted: {join_err}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{CaseScript, EchoAdapter, ScriptedAdapter};
    use crate::models::{AssertionType, ExpectedOutput, TestAssertion, TestInput};
    use serde_json::json;

    fn runner(adapter: Arc<dyn TargetAdapter>) -> CaseRunner {
        CaseRunner::new(adapter, TargetType::Agent, "agent-1")
    }

    #[tokio::test]
    async fn passing_case() {
        let case = TestCase::new("c1", "echo hello", TestInput::text("hello")).with_assertion(
            TestAssertion::new(AssertionType::Contains, "content", json!("hello")),
        );

        let result = runner(Arc::new(EchoAdapter::new()))
            .run(&case, &CancellationToken::new())
            .await;

        assert_eq!(result.status, CaseStatus::Passed);
        assert!(result.actual_output.is_some());
        assert_eq!(result.metrics.response_time_ms, result.duration_ms);
    }

    #[tokio::test]
    async fn case_sensitive_contains_fails() {
        // Adapter replies "Hello there"; asserting on lowercase "hello" must fail.
        let adapter = ScriptedAdapter::new()
            .with_script("Hello", CaseScript::ok(json!({"content": "Hello there"})));
        let case = TestCase::new("c1", "greeting", TestInput::text("Hello")).with_assertion(
            TestAssertion::new(AssertionType::Contains, "content", json!("hello")),
        );

        let result = runner(Arc::new(adapter))
            .run(&case, &CancellationToken::new())
            .await;

        assert_eq!(result.status, CaseStatus::Failed);
        assert!(!result.assertions[0].passed);
    }

    #[tokio::test]
    async fn adapter_error_yields_error_status() {
        let adapter =
            ScriptedAdapter::new().with_script("boom", CaseScript::failing("backend exploded"));
        let case = TestCase::new("c1", "boom", TestInput::text("boom")).with_assertion(
            TestAssertion::new(AssertionType::Equals, "content", json!("x")),
        );

        let result = runner(Arc::new(adapter))
            .run(&case, &CancellationToken::new())
            .await;

        assert_eq!(result.status, CaseStatus::Error);
        assert!(result.actual_output.is_none());
        assert!(result.assertions.is_empty());
        assert!(result.error.as_deref().unwrap().contains("backend exploded"));
    }

    #[tokio::test]
    async fn retries_until_success() {
        // Fails twice, succeeds on the third call; final result is the pass.
        let adapter = ScriptedAdapter::new()
            .with_script("flaky", CaseScript::ok(json!({"content": "ok"})).failures(2));
        let adapter = Arc::new(adapter);
        let case = TestCase::new("c1", "flaky", TestInput::text("flaky"))
            .with_retries(2)
            .with_assertion(TestAssertion::new(
                AssertionType::Equals,
                "content",
                json!("ok"),
            ));

        let result = runner(adapter.clone())
            .run(&case, &CancellationToken::new())
            .await;

        assert_eq!(result.status, CaseStatus::Passed);
        assert_eq!(adapter.call_count(), 3);
    }

    #[tokio::test]
    async fn retry_budget_exhausted_reports_final_attempt() {
        let adapter = ScriptedAdapter::new()
            .with_script("flaky", CaseScript::ok(json!({"content": "ok"})).failures(5));
        let adapter = Arc::new(adapter);
        let case = TestCase::new("c1", "flaky", TestInput::text("flaky")).with_retries(1);

        let result = runner(adapter.clone())
            .run(&case, &CancellationToken::new())
            .await;

        assert_eq!(result.status, CaseStatus::Error);
        assert_eq!(adapter.call_count(), 2);
    }

    #[tokio::test]
    async fn timeout_becomes_error_result() {
        let adapter = ScriptedAdapter::new().with_script(
            "slow",
            CaseScript::ok(json!("late")).with_delay(Duration::from_secs(10)),
        );
        let case = TestCase::new("c1", "slow", TestInput::text("slow")).with_timeout_ms(20);

        let result = runner(Arc::new(adapter))
            .run(&case, &CancellationToken::new())
            .await;

        assert_eq!(result.status, CaseStatus::Error);
        assert!(result.error.as_deref().unwrap().contains("deadline"));
    }

    #[tokio::test]
    async fn implicit_validation_runs_after_assertions() {
        let adapter = ScriptedAdapter::new()
            .with_script("q", CaseScript::ok(json!({"content": "result: 42"})));
        let case = TestCase::new("c1", "implicit", TestInput::text("q"))
            .with_assertion(TestAssertion::new(
                AssertionType::Contains,
                "content",
                json!("result"),
            ))
            .with_expected(ExpectedOutput {
                not_contains: vec!["42".to_string()],
                ..Default::default()
            });

        let result = runner(Arc::new(adapter))
            .run(&case, &CancellationToken::new())
            .await;

        // Declared assertion passes, implicit validation rejects the output.
        assert_eq!(result.status, CaseStatus::Failed);
        assert!(result.assertions[0].passed);
        assert!(result.logs.iter().any(|l| l.contains("output validation")));
    }

    #[tokio::test]
    async fn pre_cancelled_case_is_skipped() {
        let token = CancellationToken::new();
        token.cancel();

        let case = TestCase::new("c1", "never runs", TestInput::text("x"));
        let result = runner(Arc::new(EchoAdapter::new())).run(&case, &token).await;

        assert_eq!(result.status, CaseStatus::Skipped);
    }
}
