//! Suite execution orchestration
//!
//! Owns the suite lifecycle: admission, case scheduling (sequential or
//! bounded-parallel), cancellation, summary and metrics composition, result
//! persistence and notification. One run per suite may be in flight at a
//! time; the engine itself serves many suites concurrently.

#![allow(dead_code)]

use chrono::Utc;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::adapter::TargetAdapter;
use crate::metrics::SuiteMetrics;
use crate::models::{
    self, CaseStatus, ResultStatus, SuiteStatus, TargetType, TestCase, TestCaseResult,
    TestConfiguration, TestResults, TestSuite, TestSummary,
};
use crate::notify::Notifier;
use crate::runner::CaseRunner;
use crate::store::{StoreError, SuiteStore};
use crate::utils::Timer;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("suite not found: {id}")]
    SuiteNotFound { id: String },

    #[error("suite is already running: {id}")]
    SuiteBusy { id: String },

    #[error("suite is not running: {id}")]
    NotRunning { id: String },

    #[error("results not found: {id}")]
    ResultsNotFound { id: String },

    #[error("invalid suite: {message}")]
    Invalid { message: String },

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::SuiteNotFound { id } => EngineError::SuiteNotFound { id },
            StoreError::ResultsNotFound { id } => EngineError::ResultsNotFound { id },
            other => EngineError::Store(other),
        }
    }
}

/// The orchestrator. Constructed with its collaborators injected; no global
/// state, so tests can run isolated instances side by side.
pub struct ExecutionEngine {
    store: Arc<dyn SuiteStore>,
    adapter: Arc<dyn TargetAdapter>,
    notifier: Arc<dyn Notifier>,
    active: Mutex<HashMap<String, CancellationToken>>,
}

impl ExecutionEngine {
    pub fn new(
        store: Arc<dyn SuiteStore>,
        adapter: Arc<dyn TargetAdapter>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            adapter,
            notifier,
            active: Mutex::new(HashMap::new()),
        }
    }

    /// Create and persist a new suite. Validation happens here; a suite
    /// that stores successfully is ready to run.
    pub async fn create_suite(
        &self,
        owner: impl Into<String>,
        name: impl Into<String>,
        target_type: TargetType,
        target_id: impl Into<String>,
        test_cases: Vec<TestCase>,
        configuration: TestConfiguration,
    ) -> Result<TestSuite, EngineError> {
        let mut suite = TestSuite::new(owner, name, target_type, target_id)
            .with_cases(test_cases)
            .with_configuration(configuration);
        suite
            .validate()
            .map_err(|message| EngineError::Invalid { message })?;
        suite.status = SuiteStatus::Ready;

        self.store.save(&suite).await?;
        Ok(suite)
    }

    /// Register an externally built suite (e.g. loaded from a file).
    pub async fn import_suite(&self, mut suite: TestSuite) -> Result<TestSuite, EngineError> {
        suite
            .validate()
            .map_err(|message| EngineError::Invalid { message })?;
        if suite.status == SuiteStatus::Running {
            suite.status = SuiteStatus::Ready;
        }
        self.store.save(&suite).await?;
        Ok(suite)
    }

    pub async fn get_suite(&self, suite_id: &str) -> Result<TestSuite, EngineError> {
        Ok(self.store.load(suite_id).await?)
    }

    pub async fn list_suites(&self, owner: &str) -> Result<Vec<TestSuite>, EngineError> {
        Ok(self.store.list_by_owner(owner).await?)
    }

    pub async fn get_results(&self, results_id: &str) -> Result<TestResults, EngineError> {
        Ok(self.store.load_results(results_id).await?)
    }

    /// Signal cancellation of an in-flight run.
    ///
    /// Sequential runs observe the signal between cases; parallel runs are
    /// best-effort and may let already-started adapter calls finish.
    pub fn cancel_suite(&self, suite_id: &str) -> Result<(), EngineError> {
        let active = self.active.lock().unwrap();
        match active.get(suite_id) {
            Some(token) => {
                info!(suite = suite_id, "cancellation requested");
                token.cancel();
                Ok(())
            }
            None => Err(EngineError::NotRunning {
                id: suite_id.to_string(),
            }),
        }
    }

    /// Execute one run of a suite and return its durable result record.
    ///
    /// Rejects a suite that already has a run in flight. A run that finishes
    /// with failed or errored cases is still a successful call; the verdict
    /// lives in the returned record.
    pub async fn run_suite(&self, suite_id: &str) -> Result<TestResults, EngineError> {
        let mut suite = self.get_suite(suite_id).await?;

        let token = {
            let mut active = self.active.lock().unwrap();
            if active.contains_key(suite_id) {
                return Err(EngineError::SuiteBusy {
                    id: suite_id.to_string(),
                });
            }
            let token = CancellationToken::new();
            active.insert(suite_id.to_string(), token.clone());
            token
        };

        let run_result = self.execute_run(&mut suite, &token).await;

        self.active.lock().unwrap().remove(suite_id);

        let results = match run_result {
            Ok(results) => results,
            Err(e) => {
                // The run aborted without producing a record; the suite did
                // not complete.
                suite.status = SuiteStatus::Failed;
                suite.updated_at = Utc::now();
                if let Err(save_err) = self.store.save(&suite).await {
                    warn!(suite = suite_id, error = %save_err, "failed to persist suite after aborted run");
                }
                return Err(e);
            }
        };

        if suite.configuration.notifications {
            if let Err(e) = self.notifier.notify(&suite, &results).await {
                warn!(suite = suite_id, error = %e, "notification dispatch failed");
            }
        }

        Ok(results)
    }

    async fn execute_run(
        &self,
        suite: &mut TestSuite,
        token: &CancellationToken,
    ) -> Result<TestResults, EngineError> {
        let now = Utc::now();
        suite.status = SuiteStatus::Running;
        suite.last_run_at = Some(now);
        suite.updated_at = now;
        self.store
            .update_status(&suite.id, SuiteStatus::Running)
            .await?;

        let enabled: Vec<TestCase> = suite.enabled_cases().into_iter().cloned().collect();
        info!(
            suite = %suite.id,
            target = %suite.target_type,
            cases = enabled.len(),
            parallel = suite.configuration.parallel,
            "starting suite run"
        );

        let started_at = Utc::now();
        let timer = Timer::start(&suite.name);
        let runner = Arc::new(CaseRunner::new(
            Arc::clone(&self.adapter),
            suite.target_type,
            suite.target_id.clone(),
        ));

        let case_results = if suite.configuration.parallel {
            self.run_parallel(runner, &enabled, &suite.configuration, token)
                .await
        } else {
            self.run_sequential(runner, &enabled, &suite.configuration, token)
                .await
        };

        let wall_time = timer.elapsed();
        let cancelled = token.is_cancelled();

        let summary = TestSummary::from_results(&case_results);
        let status = ResultStatus::from_cases(&case_results);
        let metrics = SuiteMetrics::from_results(&case_results, wall_time);

        let mut results = TestResults {
            id: models::generate_id("run"),
            suite_id: suite.id.clone(),
            status,
            summary,
            case_results,
            metrics,
            artifacts: Vec::new(),
            started_at,
            completed_at: Utc::now(),
            duration_ms: wall_time.as_millis() as u64,
        };

        // Best-effort durability: a failed write must not lose the run's
        // data, but the caller has to learn about it.
        if let Err(e) = self.store.save_results(&results).await {
            warn!(suite = %suite.id, error = %e, "failed to persist results");
            results.artifacts.push(format!("persistence-failed: {e}"));
        }

        suite.status = if cancelled {
            SuiteStatus::Cancelled
        } else {
            SuiteStatus::Completed
        };
        suite.last_results = Some(results.clone());
        suite.updated_at = Utc::now();
        if let Err(e) = self.store.save(&suite).await {
            warn!(suite = %suite.id, error = %e, "failed to persist suite bookkeeping");
        }

        info!(
            suite = %suite.id,
            status = %results.status,
            passed = results.summary.passed,
            failed = results.summary.failed,
            errors = results.summary.errors,
            skipped = results.summary.skipped,
            duration_ms = results.duration_ms,
            "suite run finished"
        );

        Ok(results)
    }

    /// Declared order, cancellation checked between cases, fail-fast on the
    /// first failed (not errored) case.
    async fn run_sequential(
        &self,
        runner: Arc<CaseRunner>,
        cases: &[TestCase],
        configuration: &TestConfiguration,
        token: &CancellationToken,
    ) -> Vec<TestCaseResult> {
        let mut results = Vec::with_capacity(cases.len());

        for (index, case) in cases.iter().enumerate() {
            if token.is_cancelled() {
                for remaining in &cases[index..] {
                    results.push(TestCaseResult::skipped(remaining, "run cancelled"));
                }
                break;
            }

            let result = runner.run(case, token).await;
            info!("  {result}");

            let fail_fast_hit =
                configuration.fail_fast && result.status == CaseStatus::Failed;
            let cancelled_mid_case =
                result.status == CaseStatus::Skipped && token.is_cancelled();
            results.push(result);

            if cancelled_mid_case {
                for remaining in &cases[index + 1..] {
                    results.push(TestCaseResult::skipped(remaining, "run cancelled"));
                }
                break;
            }

            if fail_fast_hit {
                for remaining in &cases[index + 1..] {
                    results.push(TestCaseResult::skipped(remaining, "fail-fast"));
                }
                break;
            }
        }

        results
    }

    /// Fan-out/fan-in with a semaphore capping in-flight adapter calls.
    ///
    /// Every enabled case yields exactly one result; a worker that dies is
    /// reported as an errored case rather than dropped. Fail-fast is
    /// deliberately not applied here.
    async fn run_parallel(
        &self,
        runner: Arc<CaseRunner>,
        cases: &[TestCase],
        configuration: &TestConfiguration,
        token: &CancellationToken,
    ) -> Vec<TestCaseResult> {
        let semaphore = Arc::new(Semaphore::new(configuration.max_concurrency.max(1)));

        let mut handles = Vec::with_capacity(cases.len());
        for case in cases {
            let semaphore = Arc::clone(&semaphore);
            let runner = Arc::clone(&runner);
            let token = token.clone();
            let case = case.clone();

            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire().await.unwrap();
                runner.run(&case, &token).await
            }));
        }

        join_all(handles)
            .await
            .into_iter()
            .zip(cases.iter())
            .map(|(joined, case)| match joined {
                Ok(result) => result,
                Err(e) => TestCaseResult::lost(case, format!("case worker failed: {e}")),
            })
            .collect()
    }
}
