//! Assertion evaluation
//!
//! Two pure passes over a case's actual output: the declared assertion list,
//! then (only when every declared assertion holds) the implicit structural
//! validation derived from the expected-output descriptor. Neither pass ever
//! propagates an error; malformed patterns and expressions become failed
//! assertions carrying the error text.

mod expr;
mod path;

pub use expr::{eval_predicate, looks_like_expression, ExprError};
pub use path::get_by_path;

use regex::Regex;
use serde_json::Value;
use tracing::warn;

use crate::models::{AssertionOutcome, AssertionType, ExpectedOutput, TestAssertion};

/// Stringify a value the way assertion comparisons see it: strings lose
/// their quotes, everything else is compact JSON.
fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// Evaluate every declared assertion against the actual output.
pub fn evaluate_assertions(output: &Value, assertions: &[TestAssertion]) -> Vec<AssertionOutcome> {
    assertions
        .iter()
        .map(|assertion| {
            let actual = get_by_path(output, &assertion.field);
            let (passed, detail) = check(assertion, &actual);
            let message = assertion
                .message
                .clone()
                .filter(|_| !passed)
                .unwrap_or(detail);

            AssertionOutcome {
                assertion: assertion.clone(),
                passed,
                message,
                actual,
                expected: assertion.value.clone(),
            }
        })
        .collect()
}

fn check(assertion: &TestAssertion, actual: &Value) -> (bool, String) {
    match assertion.assertion_type {
        AssertionType::Equals => {
            if actual == &assertion.value {
                (true, format!("{} equals expected value", assertion.field))
            } else {
                (
                    false,
                    format!(
                        "{}: expected {}, got {}",
                        assertion.field,
                        assertion.value,
                        actual
                    ),
                )
            }
        }

        AssertionType::Contains => {
            let haystack = stringify(actual);
            let needle = stringify(&assertion.value);
            if haystack.contains(&needle) {
                (true, format!("{} contains '{needle}'", assertion.field))
            } else {
                (
                    false,
                    format!("{}: '{haystack}' does not contain '{needle}'", assertion.field),
                )
            }
        }

        AssertionType::Matches => {
            let pattern = stringify(&assertion.value);
            match Regex::new(&pattern) {
                Ok(re) => {
                    let text = stringify(actual);
                    if re.is_match(&text) {
                        (true, format!("{} matches /{pattern}/", assertion.field))
                    } else {
                        (
                            false,
                            format!("{}: '{text}' does not match /{pattern}/", assertion.field),
                        )
                    }
                }
                Err(e) => (false, format!("invalid pattern /{pattern}/: {e}")),
            }
        }

        AssertionType::Range => check_range(assertion, actual),

        AssertionType::Custom => check_custom(assertion, actual),
    }
}

fn check_range(assertion: &TestAssertion, actual: &Value) -> (bool, String) {
    let bounds = match assertion.value.as_array() {
        Some(items) if items.len() == 2 => items,
        _ => {
            return (
                false,
                format!(
                    "{}: range value must be a [min, max] pair, got {}",
                    assertion.field, assertion.value
                ),
            )
        }
    };

    let (min, max) = match (bounds[0].as_f64(), bounds[1].as_f64()) {
        (Some(min), Some(max)) => (min, max),
        _ => {
            return (
                false,
                format!("{}: range bounds must be numbers", assertion.field),
            )
        }
    };

    let Some(number) = actual.as_f64() else {
        return (
            false,
            format!("{}: {} is not a number", assertion.field, actual),
        );
    };

    if number >= min && number <= max {
        (
            true,
            format!("{} = {number} within [{min}, {max}]", assertion.field),
        )
    } else {
        (
            false,
            format!("{} = {number} outside [{min}, {max}]", assertion.field),
        )
    }
}

fn check_custom(assertion: &TestAssertion, actual: &Value) -> (bool, String) {
    let Some(expression) = assertion.value.as_str() else {
        warn!(
            field = %assertion.field,
            "custom assertion value is not an expression string; treating as pass"
        );
        return (true, "custom rule not recognized, treated as pass".to_string());
    };

    if !looks_like_expression(expression) {
        warn!(
            field = %assertion.field,
            rule = expression,
            "unknown custom rule; treating as pass"
        );
        return (true, "custom rule not recognized, treated as pass".to_string());
    }

    match eval_predicate(expression, actual) {
        Ok(true) => (true, format!("{} satisfies '{expression}'", assertion.field)),
        Ok(false) => (
            false,
            format!(
                "{} = {} does not satisfy '{expression}'",
                assertion.field, actual
            ),
        ),
        Err(e) => (false, format!("custom expression '{expression}': {e}")),
    }
}

/// Implicit structural validation from the expected-output descriptor.
///
/// Runs only after all declared assertions pass. Returns the first failure's
/// explanation, or `Ok` when every check holds.
pub fn validate_expected(output: &Value, expected: &ExpectedOutput) -> Result<(), String> {
    let text = stringify(output);

    for item in &expected.contains {
        if !text.contains(item.as_str()) {
            return Err(format!("expected output to contain '{item}'"));
        }
    }

    for item in &expected.not_contains {
        if text.contains(item.as_str()) {
            return Err(format!("expected output not to contain '{item}'"));
        }
    }

    for pattern in &expected.patterns {
        let re = Regex::new(pattern).map_err(|e| format!("invalid pattern /{pattern}/: {e}"))?;
        if !re.is_match(&text) {
            return Err(format!("output does not match /{pattern}/"));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TestAssertion;
    use serde_json::json;

    fn assertion(t: AssertionType, field: &str, value: Value) -> TestAssertion {
        TestAssertion::new(t, field, value)
    }

    #[test]
    fn equals_is_strict() {
        let output = json!({"count": 5});
        let outcomes = evaluate_assertions(
            &output,
            &[assertion(AssertionType::Equals, "count", json!(5))],
        );
        assert!(outcomes[0].passed);

        let outcomes = evaluate_assertions(
            &output,
            &[assertion(AssertionType::Equals, "count", json!("5"))],
        );
        assert!(!outcomes[0].passed);
    }

    #[test]
    fn contains_is_case_sensitive() {
        // "Hello there" does not contain "hello"
        let output = json!({"content": "Hello there"});
        let outcomes = evaluate_assertions(
            &output,
            &[assertion(AssertionType::Contains, "content", json!("hello"))],
        );
        assert!(!outcomes[0].passed);

        let outcomes = evaluate_assertions(
            &output,
            &[assertion(AssertionType::Contains, "content", json!("Hello"))],
        );
        assert!(outcomes[0].passed);
    }

    #[test]
    fn matches_compiles_value_as_regex() {
        let output = json!({"content": "order #1234 confirmed"});
        let outcomes = evaluate_assertions(
            &output,
            &[assertion(
                AssertionType::Matches,
                "content",
                json!(r"#\d{4}"),
            )],
        );
        assert!(outcomes[0].passed);
    }

    #[test]
    fn invalid_regex_fails_instead_of_panicking() {
        let output = json!({"content": "x"});
        let outcomes = evaluate_assertions(
            &output,
            &[assertion(AssertionType::Matches, "content", json!("(unclosed"))],
        );
        assert!(!outcomes[0].passed);
        assert!(outcomes[0].message.contains("invalid pattern"));
    }

    #[test]
    fn range_is_inclusive() {
        let output = json!({"latency": 250});
        let inside = evaluate_assertions(
            &output,
            &[assertion(AssertionType::Range, "latency", json!([100, 250]))],
        );
        assert!(inside[0].passed);

        let outside = evaluate_assertions(
            &output,
            &[assertion(AssertionType::Range, "latency", json!([0, 100]))],
        );
        assert!(!outside[0].passed);
    }

    #[test]
    fn range_rejects_malformed_bounds() {
        let output = json!({"latency": 250});
        let outcomes = evaluate_assertions(
            &output,
            &[assertion(AssertionType::Range, "latency", json!([100]))],
        );
        assert!(!outcomes[0].passed);
        assert!(outcomes[0].message.contains("[min, max]"));
    }

    #[test]
    fn missing_field_extracts_null() {
        let output = json!({});
        let outcomes = evaluate_assertions(
            &output,
            &[assertion(AssertionType::Equals, "a.b.c", json!(1))],
        );
        assert!(!outcomes[0].passed);
        assert_eq!(outcomes[0].actual, Value::Null);
    }

    #[test]
    fn custom_expression_evaluates() {
        let output = json!({"score": 87});
        let outcomes = evaluate_assertions(
            &output,
            &[assertion(
                AssertionType::Custom,
                "score",
                json!("actual >= 80"),
            )],
        );
        assert!(outcomes[0].passed);
    }

    #[test]
    fn unknown_custom_rule_passes_with_note() {
        let output = json!({"score": 87});
        let outcomes = evaluate_assertions(
            &output,
            &[assertion(
                AssertionType::Custom,
                "score",
                json!("is-polite"),
            )],
        );
        assert!(outcomes[0].passed);
        assert!(outcomes[0].message.contains("treated as pass"));
    }

    #[test]
    fn custom_expression_error_fails_assertion() {
        let output = json!({"score": "not a number"});
        let outcomes = evaluate_assertions(
            &output,
            &[assertion(
                AssertionType::Custom,
                "score",
                json!("actual > 10"),
            )],
        );
        assert!(!outcomes[0].passed);
        assert!(outcomes[0].message.contains("not a number"));
    }

    #[test]
    fn declared_message_overrides_on_failure() {
        let output = json!({"content": "nope"});
        let mut a = assertion(AssertionType::Contains, "content", json!("yes"));
        a.message = Some("greeting missing".to_string());
        let outcomes = evaluate_assertions(&output, &[a]);
        assert!(!outcomes[0].passed);
        assert_eq!(outcomes[0].message, "greeting missing");
    }

    #[test]
    fn implicit_validation_contains() {
        let output = json!({"content": "booking confirmed for Tuesday"});
        let expected = ExpectedOutput {
            contains: vec!["confirmed".to_string()],
            ..Default::default()
        };
        assert!(validate_expected(&output, &expected).is_ok());

        let expected = ExpectedOutput {
            contains: vec!["cancelled".to_string()],
            ..Default::default()
        };
        let err = validate_expected(&output, &expected).unwrap_err();
        assert!(err.contains("cancelled"));
    }

    #[test]
    fn implicit_validation_not_contains_and_patterns() {
        let output = json!("status: OK (code 200)");
        let expected = ExpectedOutput {
            not_contains: vec!["error".to_string()],
            patterns: vec![r"code \d+".to_string()],
            ..Default::default()
        };
        assert!(validate_expected(&output, &expected).is_ok());

        let expected = ExpectedOutput {
            not_contains: vec!["OK".to_string()],
            ..Default::default()
        };
        assert!(validate_expected(&output, &expected).is_err());
    }

    #[test]
    fn implicit_validation_bad_pattern_is_a_failure() {
        let output = json!("anything");
        let expected = ExpectedOutput {
            patterns: vec!["(broken".to_string()],
            ..Default::default()
        };
        let err = validate_expected(&output, &expected).unwrap_err();
        assert!(err.contains("invalid pattern"));
    }
}
