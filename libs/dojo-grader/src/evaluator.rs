//! Test Evaluator - Language-Agnostic Comparison Logic
//!
//! **Core Responsibility:**
//! Decide pass/fail for one test case from the sandbox's raw output.
//!
//! **Critical Properties:**
//! - Knows nothing about HTTP or the execution service
//! - Knows nothing about language runtimes
//! - Total: malformed JSON falls back to string comparison, never errors
//!
//! **Comparison Modes:**
//! - Expected-error (`expected` starts with `"Error:"`): the fragment after
//!   `"Error: "` must appear somewhere in the trimmed stderr
//! - Normal: trimmed stdout against trimmed expected; when both parse as
//!   JSON they are compared structurally, otherwise as exact strings
//!
//! **Normalization Rules:**
//! - Trim leading and trailing whitespace: YES
//! - Case sensitivity: YES
//! - JSON arrays: order-sensitive
//! - JSON objects: key order significant (serialized form)
//! - JSON numbers: compared by value (`1` equals `1.0`)

use dojo_common::types::{ExecutionResult, GradingReport, TestCase, TestResult};
use serde_json::{Number, Value};
use tracing::debug;

const ERROR_SENTINEL: &str = "Error:";
const ERROR_PREFIX: &str = "Error: ";

fn normalize_output(output: &str) -> &str {
    output.trim()
}

/// Whether a test case expects the program to fail
pub fn expects_error(expected: &str) -> bool {
    normalize_output(expected).starts_with(ERROR_SENTINEL)
}

/// Structural comparison when both sides are JSON, exact text otherwise
pub fn outputs_match(actual: &str, expected: &str) -> bool {
    match (
        serde_json::from_str::<Value>(actual),
        serde_json::from_str::<Value>(expected),
    ) {
        (Ok(actual), Ok(expected)) => json_equivalent(&actual, &expected),
        _ => actual == expected,
    }
}

fn json_equivalent(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => numbers_equal(x, y),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| json_equivalent(l, r))
        }
        // keys compared in serialized order, as the runtime prints them
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .zip(y)
                    .all(|((ka, va), (kb, vb))| ka == kb && json_equivalent(va, vb))
        }
        _ => a == b,
    }
}

fn numbers_equal(x: &Number, y: &Number) -> bool {
    if x.is_f64() || y.is_f64() {
        x.as_f64() == y.as_f64()
    } else {
        x == y
    }
}

/// Evaluate a single test case against its execution output
pub fn evaluate_test(test_case: &TestCase, output: &ExecutionResult) -> TestResult {
    let expected = normalize_output(&test_case.expected);

    let (actual, passed, error) = if expects_error(expected) {
        let actual = normalize_output(&output.stderr);
        let fragment = expected.replacen(ERROR_PREFIX, "", 1);
        let passed = actual.contains(fragment.as_str());
        (actual, passed, String::new())
    } else {
        let actual = normalize_output(&output.stdout);
        let passed = outputs_match(actual, expected);
        (actual, passed, output.stderr.clone())
    };

    TestResult {
        name: test_case.name.clone(),
        passed,
        expected: expected.to_string(),
        actual: actual.to_string(),
        error,
    }
}

/// Fold per-test results into the submission report
pub fn aggregate_results(test_results: Vec<TestResult>) -> GradingReport {
    let report = GradingReport::from_results(test_results);

    debug!(
        total = report.test_results.len(),
        passed = report.passed_count(),
        all_passed = report.all_passed,
        "Evaluation complete"
    );

    report
}
