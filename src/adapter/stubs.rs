//! In-process stub adapters
//!
//! Used by the CLI for dry runs and by tests to make timing, retries and
//! cancellation observable without a real backend.

#![allow(dead_code)]

use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{sleep, sleep_until, Instant};
use tokio_util::sync::CancellationToken;

use super::{AdapterError, TargetAdapter};
use crate::models::{TargetType, TestInput};

/// Scripted behavior for one input
#[derive(Clone, Debug)]
pub struct CaseScript {
    /// Output returned once the script stops failing
    pub output: Value,

    /// Simulated execution time
    pub delay: Duration,

    /// Number of attempts that error before the first success
    pub failures_before_success: u32,

    /// Message carried by the scripted failures
    pub failure_message: String,
}

impl CaseScript {
    pub fn ok(output: Value) -> Self {
        Self {
            output,
            delay: Duration::ZERO,
            failures_before_success: 0,
            failure_message: "scripted failure".to_string(),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            output: Value::Null,
            delay: Duration::ZERO,
            failures_before_success: u32::MAX,
            failure_message: message.into(),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failures(mut self, count: u32) -> Self {
        self.failures_before_success = count;
        self
    }
}

/// Adapter whose responses are declared per input key
///
/// Scripts are keyed by the stringified input content. Attempt counts are
/// tracked per key so `failures_before_success` makes retry behavior
/// observable. The in-flight high-water mark is recorded for concurrency
/// tests.
pub struct ScriptedAdapter {
    scripts: HashMap<String, CaseScript>,
    attempts: Mutex<HashMap<String, u32>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
}

impl ScriptedAdapter {
    pub fn new() -> Self {
        Self {
            scripts: HashMap::new(),
            attempts: Mutex::new(HashMap::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_script(mut self, key: impl Into<String>, script: CaseScript) -> Self {
        self.scripts.insert(key.into(), script);
        self
    }

    /// Highest number of simultaneously in-flight calls observed
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Total number of execute calls, including failed attempts
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn key_for(input: &TestInput) -> String {
        match &input.content {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl Default for ScriptedAdapter {
    fn default() -> Self {
        Self::new()
    }
}

struct InFlightGuard<'a> {
    counter: &'a AtomicUsize,
}

impl<'a> InFlightGuard<'a> {
    fn enter(counter: &'a AtomicUsize, high_water: &AtomicUsize) -> Self {
        let now = counter.fetch_add(1, Ordering::SeqCst) + 1;
        high_water.fetch_max(now, Ordering::SeqCst);
        Self { counter }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl TargetAdapter for ScriptedAdapter {
    async fn execute(
        &self,
        _target_type: TargetType,
        _target_id: &str,
        input: &TestInput,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> Result<Value, AdapterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if cancel.is_cancelled() {
            return Err(AdapterError::Cancelled);
        }
        if Instant::now() >= deadline {
            return Err(AdapterError::Timeout);
        }

        let key = Self::key_for(input);
        let script = self
            .scripts
            .get(&key)
            .ok_or_else(|| AdapterError::unreachable(format!("no script for input '{key}'")))?;

        let _guard = InFlightGuard::enter(&self.in_flight, &self.max_in_flight);

        tokio::select! {
            _ = sleep(script.delay) => {}
            _ = sleep_until(deadline) => return Err(AdapterError::Timeout),
            _ = cancel.cancelled() => return Err(AdapterError::Cancelled),
        }

        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            let entry = attempts.entry(key).or_insert(0);
            *entry += 1;
            *entry
        };

        if attempt <= script.failures_before_success {
            return Err(AdapterError::execution(script.failure_message.clone()));
        }

        Ok(script.output.clone())
    }
}

/// Adapter that reflects the input back as the subject's output
///
/// Useful for dry-running a suite definition without any backend: assertions
/// against `content` see the original input text.
pub struct EchoAdapter {
    delay: Duration,
}

impl EchoAdapter {
    pub fn new() -> Self {
        Self {
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl Default for EchoAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TargetAdapter for EchoAdapter {
    async fn execute(
        &self,
        target_type: TargetType,
        target_id: &str,
        input: &TestInput,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> Result<Value, AdapterError> {
        if cancel.is_cancelled() {
            return Err(AdapterError::Cancelled);
        }
        if Instant::now() >= deadline {
            return Err(AdapterError::Timeout);
        }

        tokio::select! {
            _ = sleep(self.delay) => {}
            _ = sleep_until(deadline) => return Err(AdapterError::Timeout),
            _ = cancel.cancelled() => return Err(AdapterError::Cancelled),
        }

        Ok(json!({
            "content": input.content,
            "target": { "type": target_type.name(), "id": target_id },
            "actions": [],
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn deadline_in(ms: u64) -> Instant {
        Instant::now() + Duration::from_millis(ms)
    }

    #[tokio::test]
    async fn echo_reflects_input() {
        let adapter = EchoAdapter::new();
        let input = TestInput::text("hello");
        let token = CancellationToken::new();

        let output = adapter
            .execute(TargetType::Agent, "agent-1", &input, deadline_in(1000), &token)
            .await
            .unwrap();

        assert_eq!(output["content"], json!("hello"));
        assert_eq!(output["target"]["id"], json!("agent-1"));
    }

    #[tokio::test]
    async fn scripted_fails_then_succeeds() {
        let adapter = ScriptedAdapter::new()
            .with_script("ping", CaseScript::ok(json!({"content": "pong"})).failures(2));
        let input = TestInput::text("ping");
        let token = CancellationToken::new();

        for _ in 0..2 {
            let err = adapter
                .execute(TargetType::Agent, "a", &input, deadline_in(1000), &token)
                .await
                .unwrap_err();
            assert!(matches!(err, AdapterError::Execution { .. }));
        }

        let output = adapter
            .execute(TargetType::Agent, "a", &input, deadline_in(1000), &token)
            .await
            .unwrap();
        assert_eq!(output["content"], json!("pong"));
        assert_eq!(adapter.call_count(), 3);
    }

    #[tokio::test]
    async fn deadline_cuts_off_slow_script() {
        let adapter = ScriptedAdapter::new().with_script(
            "slow",
            CaseScript::ok(json!("late")).with_delay(Duration::from_secs(5)),
        );
        let input = TestInput::text("slow");
        let token = CancellationToken::new();

        let err = adapter
            .execute(TargetType::Workflow, "w", &input, deadline_in(20), &token)
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::Timeout));
    }

    #[tokio::test]
    async fn past_deadline_returns_timeout_immediately() {
        let adapter = EchoAdapter::new();
        let input = TestInput::text("x");
        let token = CancellationToken::new();

        let err = adapter
            .execute(TargetType::Persona, "p", &input, Instant::now(), &token)
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::Timeout));
    }

    #[tokio::test]
    async fn cancellation_aborts_in_flight_call() {
        let adapter = ScriptedAdapter::new().with_script(
            "work",
            CaseScript::ok(json!("done")).with_delay(Duration::from_secs(5)),
        );
        let input = TestInput::text("work");
        let token = CancellationToken::new();

        let cancel = token.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(20)).await;
            cancel.cancel();
        });

        let err = adapter
            .execute(TargetType::Deployment, "d", &input, deadline_in(10_000), &token)
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::Cancelled));
    }
}
