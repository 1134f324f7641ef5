//! Suite and test case models
//!
//! Defines test suites, cases, inputs, expectations and configuration.

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use super::result::TestResults;

/// Kind of subject a suite runs against
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Agent,
    Workflow,
    Deployment,
    Persona,
}

impl TargetType {
    pub fn name(&self) -> &'static str {
        match self {
            TargetType::Agent => "agent",
            TargetType::Workflow => "workflow",
            TargetType::Deployment => "deployment",
            TargetType::Persona => "persona",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "agent" => Some(TargetType::Agent),
            "workflow" => Some(TargetType::Workflow),
            "deployment" => Some(TargetType::Deployment),
            "persona" => Some(TargetType::Persona),
            _ => None,
        }
    }

    pub fn all() -> Vec<TargetType> {
        vec![
            TargetType::Agent,
            TargetType::Workflow,
            TargetType::Deployment,
            TargetType::Persona,
        ]
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Suite lifecycle status
///
/// Transitions: draft -> ready -> running -> {completed | failed | cancelled}.
/// A suite may be re-run from any terminal state. `completed` means the run
/// finished, not that it succeeded; inspect the results for the verdict.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuiteStatus {
    Draft,
    Ready,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl SuiteStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SuiteStatus::Completed | SuiteStatus::Failed | SuiteStatus::Cancelled
        )
    }

    pub fn can_run(&self) -> bool {
        !matches!(self, SuiteStatus::Running)
    }
}

impl fmt::Display for SuiteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SuiteStatus::Draft => "draft",
            SuiteStatus::Ready => "ready",
            SuiteStatus::Running => "running",
            SuiteStatus::Completed => "completed",
            SuiteStatus::Failed => "failed",
            SuiteStatus::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

/// Test case category. Informational only; execution is identical for all.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CaseType {
    Unit,
    #[default]
    Integration,
    EndToEnd,
    Performance,
    Security,
    Accessibility,
    Usability,
    Regression,
}

/// Kind of input payload handed to the target
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    #[default]
    Text,
    Voice,
    Image,
    File,
    Structured,
}

/// Input for a single case. Opaque to the engine; passed verbatim to the
/// target adapter.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestInput {
    #[serde(rename = "type", default)]
    pub input_type: InputType,

    pub content: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<BTreeMap<String, Value>>,
}

impl TestInput {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            input_type: InputType::Text,
            content: Value::String(content.into()),
            metadata: None,
            context: None,
            variables: None,
        }
    }

    pub fn structured(content: Value) -> Self {
        Self {
            input_type: InputType::Structured,
            content,
            metadata: None,
            context: None,
            variables: None,
        }
    }
}

/// Expected output descriptor
///
/// Used both for display alongside results and for the implicit validation
/// pass that runs after all declared assertions succeed.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ExpectedOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,

    /// Regular expressions the stringified output must match
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patterns: Vec<String>,

    /// Substrings that must appear in the stringified output
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contains: Vec<String>,

    /// Substrings that must not appear
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub not_contains: Vec<String>,

    /// Actions the output should report performing
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<String>,
}

impl ExpectedOutput {
    pub fn is_empty(&self) -> bool {
        self.content.is_none()
            && self.patterns.is_empty()
            && self.contains.is_empty()
            && self.not_contains.is_empty()
            && self.actions.is_empty()
    }
}

/// Declared assertion kind
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssertionType {
    Equals,
    Contains,
    Matches,
    Range,
    Custom,
}

impl fmt::Display for AssertionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AssertionType::Equals => "equals",
            AssertionType::Contains => "contains",
            AssertionType::Matches => "matches",
            AssertionType::Range => "range",
            AssertionType::Custom => "custom",
        };
        write!(f, "{s}")
    }
}

/// A single declared check against a field of the actual output
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestAssertion {
    #[serde(rename = "type")]
    pub assertion_type: AssertionType,

    /// Dot-separated path into the actual output
    pub field: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,

    pub value: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TestAssertion {
    pub fn new(assertion_type: AssertionType, field: impl Into<String>, value: Value) -> Self {
        Self {
            assertion_type,
            field: field.into(),
            operator: None,
            value,
            message: None,
        }
    }
}

/// Case priority
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CasePriority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

/// One executable scenario
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestCase {
    pub id: String,
    pub name: String,

    #[serde(rename = "type", default)]
    pub case_type: CaseType,

    pub input: TestInput,

    #[serde(default)]
    pub expected_output: ExpectedOutput,

    #[serde(default)]
    pub assertions: Vec<TestAssertion>,

    /// Per-case deadline in milliseconds, enforced at the adapter boundary
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Extra attempts after the first failed or errored one
    #[serde(default)]
    pub retries: u32,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(default)]
    pub priority: CasePriority,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_enabled() -> bool {
    true
}

impl TestCase {
    pub fn new(id: impl Into<String>, name: impl Into<String>, input: TestInput) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            case_type: CaseType::default(),
            input,
            expected_output: ExpectedOutput::default(),
            assertions: Vec::new(),
            timeout_ms: default_timeout_ms(),
            retries: 0,
            tags: Vec::new(),
            priority: CasePriority::default(),
            enabled: true,
        }
    }

    pub fn with_assertion(mut self, assertion: TestAssertion) -> Self {
        self.assertions.push(assertion);
        self
    }

    pub fn with_expected(mut self, expected: ExpectedOutput) -> Self {
        self.expected_output = expected;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.id.is_empty() {
            return Err("test case id must not be empty".to_string());
        }
        if self.timeout_ms == 0 {
            return Err(format!("case '{}': timeout must be greater than 0", self.id));
        }
        Ok(())
    }
}

/// Suite-level run configuration. Read-only while a run is in flight.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestConfiguration {
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Run enabled cases concurrently instead of in declared order
    #[serde(default)]
    pub parallel: bool,

    /// Cap on simultaneous in-flight adapter calls in parallel mode
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Default case deadline, applied when a case does not set its own
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Default retry budget for cases that do not set their own
    #[serde(default)]
    pub retries: u32,

    /// Sequential mode only: stop after the first failed (not errored) case.
    /// Parallel mode ignores this; stopping in-flight concurrent work would
    /// defeat the point of running concurrently.
    #[serde(default)]
    pub fail_fast: bool,

    #[serde(default)]
    pub coverage: bool,

    #[serde(default = "default_enabled")]
    pub reporting: bool,

    #[serde(default)]
    pub notifications: bool,
}

fn default_environment() -> String {
    "default".to_string()
}

fn default_max_concurrency() -> usize {
    4
}

impl Default for TestConfiguration {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            parallel: false,
            max_concurrency: default_max_concurrency(),
            timeout_ms: default_timeout_ms(),
            retries: 0,
            fail_fast: false,
            coverage: false,
            reporting: true,
            notifications: false,
        }
    }
}

/// A named, versioned collection of test cases bound to one subject
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestSuite {
    pub id: String,
    pub owner: String,
    pub name: String,

    #[serde(default)]
    pub description: String,

    pub target_type: TargetType,
    pub target_id: String,

    #[serde(default)]
    pub test_cases: Vec<TestCase>,

    #[serde(default)]
    pub configuration: TestConfiguration,

    #[serde(default = "default_suite_status")]
    pub status: SuiteStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_results: Option<TestResults>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run_at: Option<DateTime<Utc>>,
}

fn default_suite_status() -> SuiteStatus {
    SuiteStatus::Draft
}

impl TestSuite {
    pub fn new(
        owner: impl Into<String>,
        name: impl Into<String>,
        target_type: TargetType,
        target_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: super::generate_id("suite"),
            owner: owner.into(),
            name: name.into(),
            description: String::new(),
            target_type,
            target_id: target_id.into(),
            test_cases: Vec::new(),
            configuration: TestConfiguration::default(),
            status: SuiteStatus::Draft,
            last_results: None,
            created_at: now,
            updated_at: now,
            last_run_at: None,
        }
    }

    pub fn with_cases(mut self, cases: Vec<TestCase>) -> Self {
        self.test_cases = cases;
        self
    }

    pub fn with_configuration(mut self, configuration: TestConfiguration) -> Self {
        self.configuration = configuration;
        self
    }

    /// Cases that participate in a run, in declared order
    pub fn enabled_cases(&self) -> Vec<&TestCase> {
        self.test_cases.iter().filter(|c| c.enabled).collect()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("suite name must not be empty".to_string());
        }
        if self.target_id.is_empty() {
            return Err("suite target_id must not be empty".to_string());
        }
        for case in &self.test_cases {
            case.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_type_round_trip() {
        for t in TargetType::all() {
            assert_eq!(TargetType::from_str(t.name()), Some(t));
        }
        assert_eq!(TargetType::from_str("robot"), None);
    }

    #[test]
    fn suite_status_transitions() {
        assert!(SuiteStatus::Draft.can_run());
        assert!(SuiteStatus::Completed.can_run());
        assert!(!SuiteStatus::Running.can_run());
        assert!(SuiteStatus::Cancelled.is_terminal());
        assert!(!SuiteStatus::Ready.is_terminal());
    }

    #[test]
    fn enabled_cases_excludes_disabled() {
        let suite = TestSuite::new("alice", "smoke", TargetType::Agent, "agent-1").with_cases(vec![
            TestCase::new("c1", "first", TestInput::text("hi")),
            TestCase::new("c2", "second", TestInput::text("hi")).disabled(),
            TestCase::new("c3", "third", TestInput::text("hi")),
        ]);

        let enabled = suite.enabled_cases();
        assert_eq!(enabled.len(), 2);
        assert_eq!(enabled[0].id, "c1");
        assert_eq!(enabled[1].id, "c3");
    }

    #[test]
    fn case_validation_rejects_zero_timeout() {
        let case = TestCase::new("c1", "bad", TestInput::text("x")).with_timeout_ms(0);
        assert!(case.validate().is_err());
    }

    #[test]
    fn suite_serializes_to_json() {
        let suite = TestSuite::new("bob", "api checks", TargetType::Workflow, "wf-9");
        let json = serde_json::to_string(&suite).unwrap();
        assert!(json.contains("\"target_type\":\"workflow\""));
        assert!(json.contains("\"status\":\"draft\""));
    }
}
