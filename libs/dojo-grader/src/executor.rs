//! Grading Pipeline - High-Level Orchestration
//!
//! **Responsibility:**
//! For each test case, in order: build the harness, execute it, evaluate the
//! output; then fold everything into one `GradingReport`.
//!
//! **Ordering:**
//! `report.test_results[i]` always belongs to `challenge.test_cases[i]`,
//! for the sequential path and for the bounded concurrent path alike.
//!
//! **Failure Semantics:**
//! `GradeError` from any test case aborts the run with no partial report.
//! Dropping the returned future abandons the in-flight execution call.

use crate::engine::ExecutionEngine;
use crate::error::Result;
use crate::evaluator::{aggregate_results, evaluate_test};
use crate::harness::build_harness;
use dojo_common::types::{Challenge, GradingReport, Language, TestCase, TestResult};
use futures_util::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, instrument};

/// Grade one submission, one test case at a time
#[instrument(
    skip(engine, code, challenge),
    fields(challenge_id = %challenge.id, language = %challenge.language, test_count = challenge.test_cases.len())
)]
pub async fn grade_submission(
    engine: &dyn ExecutionEngine,
    code: &str,
    challenge: &Challenge,
) -> Result<GradingReport> {
    let language: Language = challenge.language.parse()?;
    let mut test_results = Vec::with_capacity(challenge.test_cases.len());

    for test_case in &challenge.test_cases {
        let result = grade_test_case(engine, code, language, &challenge.function_name, test_case).await?;
        test_results.push(result);
    }

    Ok(aggregate_results(test_results))
}

/// Grade one submission with up to `max_parallel` executions in flight
///
/// Results are reassembled in test case order. `max_parallel <= 1` behaves
/// like [`grade_submission`].
#[instrument(
    skip(engine, code, challenge),
    fields(challenge_id = %challenge.id, language = %challenge.language, test_count = challenge.test_cases.len())
)]
pub async fn grade_submission_concurrent(
    engine: &dyn ExecutionEngine,
    code: &str,
    challenge: &Challenge,
    max_parallel: usize,
) -> Result<GradingReport> {
    let language: Language = challenge.language.parse()?;
    let function_name = challenge.function_name.as_str();

    let pending: Vec<_> = challenge
        .test_cases
        .iter()
        .map(|test_case| grade_test_case(engine, code, language, function_name, test_case))
        .collect();
    let test_results: Vec<TestResult> = stream::iter(pending)
        .buffered(max_parallel.max(1))
        .try_collect()
        .await?;

    Ok(aggregate_results(test_results))
}

async fn grade_test_case(
    engine: &dyn ExecutionEngine,
    code: &str,
    language: Language,
    function_name: &str,
    test_case: &TestCase,
) -> Result<TestResult> {
    let program = build_harness(code, language, function_name, &test_case.input);
    let output = engine.execute(&program, language).await?;
    let result = evaluate_test(test_case, &output);

    debug!(
        test = %result.name,
        status = ?output.status,
        passed = result.passed,
        "Test case graded"
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GradeError;
    use async_trait::async_trait;
    use dojo_common::types::{Difficulty, ExecutionResult, ExecutionStatus};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use uuid::Uuid;

    type Script = Box<dyn Fn(&str) -> Result<ExecutionResult> + Send + Sync>;

    /// Engine that answers from a closure and records every program it saw
    struct ScriptedEngine {
        script: Script,
        programs: Mutex<Vec<String>>,
        delay_for: fn(&str) -> Duration,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl ScriptedEngine {
        fn new(script: impl Fn(&str) -> Result<ExecutionResult> + Send + Sync + 'static) -> Self {
            Self {
                script: Box::new(script),
                programs: Mutex::new(Vec::new()),
                delay_for: |_| Duration::ZERO,
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }

        fn with_delay(mut self, delay_for: fn(&str) -> Duration) -> Self {
            self.delay_for = delay_for;
            self
        }

        fn programs(&self) -> Vec<String> {
            self.programs.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ExecutionEngine for ScriptedEngine {
        async fn execute(&self, program: &str, _language: Language) -> Result<ExecutionResult> {
            self.programs.lock().unwrap().push(program.to_string());
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            let delay = (self.delay_for)(program);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            (self.script)(program)
        }
    }

    fn ok(stdout: &str) -> Result<ExecutionResult> {
        Ok(ExecutionResult {
            stdout: format!("{stdout}\n"),
            stderr: String::new(),
            status: ExecutionStatus::Accepted,
        })
    }

    fn crashed(stderr: &str) -> Result<ExecutionResult> {
        Ok(ExecutionResult {
            stdout: String::new(),
            stderr: stderr.to_string(),
            status: ExecutionStatus::RuntimeError,
        })
    }

    fn service_down() -> Result<ExecutionResult> {
        Err(GradeError::ExecutionServiceStatus {
            status: reqwest::StatusCode::BAD_GATEWAY,
            url: "http://piston/api/v2/execute".to_string(),
            body: "bad gateway".to_string(),
        })
    }

    fn test_case(name: &str, input: &str, expected: &str) -> TestCase {
        TestCase {
            name: name.to_string(),
            input: input.to_string(),
            expected: expected.to_string(),
            description: None,
        }
    }

    fn challenge(language: &str, function_name: &str, test_cases: Vec<TestCase>) -> Challenge {
        Challenge {
            id: Uuid::new_v4(),
            title: "test challenge".to_string(),
            description: String::new(),
            difficulty: Difficulty::Easy,
            language: language.to_string(),
            function_name: function_name.to_string(),
            starter_code: String::new(),
            test_cases,
            hints: None,
        }
    }

    /// Pulls the argument text out of `print(double(<arg>))`
    fn python_arg(program: &str) -> i64 {
        let call = program.rsplit("double(").next().unwrap();
        call.trim_end_matches("))").parse().unwrap()
    }

    fn doubling_engine() -> ScriptedEngine {
        ScriptedEngine::new(|program| ok(&(python_arg(program) * 2).to_string()))
    }

    #[tokio::test]
    async fn test_python_double_scenario() {
        let engine = doubling_engine();
        let code = "def double(n): return n*2";
        let challenge = challenge("python", "double", vec![test_case("basic", "5", "10")]);

        let report = grade_submission(&engine, code, &challenge).await.unwrap();

        assert!(report.all_passed);
        assert_eq!(
            report.test_results[0],
            TestResult {
                name: "basic".to_string(),
                passed: true,
                expected: "10".to_string(),
                actual: "10".to_string(),
                error: String::new(),
            }
        );
        assert_eq!(engine.programs(), vec![format!("{code}\n\nprint(double(5))")]);
    }

    #[tokio::test]
    async fn test_javascript_sum_scenario() {
        let engine = ScriptedEngine::new(|program| {
            if program.ends_with("console.log(JSON.stringify(sum(...[2,3])))") {
                ok("5")
            } else {
                crashed("unexpected harness")
            }
        });
        let challenge = challenge("javascript", "sum", vec![test_case("pair", "[2,3]", "5")]);

        let report = grade_submission(&engine, "function sum(a,b){return a+b}", &challenge)
            .await
            .unwrap();

        assert!(report.all_passed);
        assert_eq!(report.test_results[0].actual, "5");
    }

    #[tokio::test]
    async fn test_expected_error_scenario() {
        let engine = ScriptedEngine::new(|_| {
            crashed("Traceback (most recent call last):\nIndexError: list index out of range\n")
        });
        let challenge = challenge(
            "python",
            "first",
            vec![test_case("empty", "[]", "Error: list index out of range")],
        );

        let report = grade_submission(&engine, "def first(xs): return xs[0]", &challenge)
            .await
            .unwrap();

        let result = &report.test_results[0];
        assert!(result.passed);
        assert_eq!(
            result.actual,
            "Traceback (most recent call last):\nIndexError: list index out of range"
        );
        assert_eq!(result.error, "");
    }

    #[tokio::test]
    async fn test_results_follow_test_case_order() {
        let engine = doubling_engine();
        let names = ["first", "second", "third", "fourth"];
        let cases = names
            .iter()
            .enumerate()
            .map(|(i, name)| test_case(name, &i.to_string(), &(i * 2).to_string()))
            .collect();
        let challenge = challenge("python", "double", cases);

        let report = grade_submission(&engine, "", &challenge).await.unwrap();

        let got: Vec<_> = report.test_results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(got, names);
        assert!(report.all_passed);
    }

    #[tokio::test]
    async fn test_empty_test_list_is_vacuous_pass() {
        let engine = doubling_engine();
        let challenge = challenge("python", "double", vec![]);

        let report = grade_submission(&engine, "", &challenge).await.unwrap();

        assert!(report.all_passed);
        assert!(report.test_results.is_empty());
        assert!(engine.programs().is_empty());
    }

    #[tokio::test]
    async fn test_single_failure_flips_all_passed() {
        let engine = doubling_engine();
        let challenge = challenge(
            "python",
            "double",
            vec![
                test_case("a", "1", "2"),
                test_case("b", "2", "5"),
                test_case("c", "3", "6"),
            ],
        );

        let report = grade_submission(&engine, "", &challenge).await.unwrap();

        assert!(!report.all_passed);
        let passed: Vec<_> = report.test_results.iter().map(|r| r.passed).collect();
        assert_eq!(passed, [true, false, true]);
    }

    #[tokio::test]
    async fn test_unsupported_language_aborts_before_execution() {
        let engine = doubling_engine();
        let challenge = challenge("cobol", "double", vec![test_case("a", "1", "2")]);

        let err = grade_submission(&engine, "", &challenge).await.unwrap_err();

        assert!(matches!(err, GradeError::UnsupportedLanguage(_)));
        assert!(!err.is_execution_service());
        assert!(engine.programs().is_empty());
    }

    #[tokio::test]
    async fn test_execution_service_error_aborts_whole_run() {
        let engine = ScriptedEngine::new(|program| {
            if program.ends_with("print(double(2))") {
                service_down()
            } else {
                ok("2")
            }
        });
        let challenge = challenge(
            "python",
            "double",
            vec![
                test_case("a", "1", "2"),
                test_case("b", "2", "4"),
                test_case("c", "3", "6"),
            ],
        );

        let err = grade_submission(&engine, "", &challenge).await.unwrap_err();

        assert!(err.is_execution_service());
        // sequential: the third test case is never dispatched
        assert_eq!(engine.programs().len(), 2);
    }

    #[tokio::test]
    async fn test_grading_is_deterministic() {
        let engine = doubling_engine();
        let challenge = challenge(
            "python",
            "double",
            vec![test_case("a", "1", "2"), test_case("b", "4", "9")],
        );

        let first = grade_submission(&engine, "", &challenge).await.unwrap();
        let second = grade_submission(&engine, "", &challenge).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_concurrent_grading_preserves_order() {
        // Earlier test cases take longer, so they finish last
        let engine = doubling_engine()
            .with_delay(|program| Duration::from_millis(60 - 10 * python_arg(program) as u64));
        let cases = (0..6)
            .map(|i| test_case(&format!("case-{i}"), &i.to_string(), &(i * 2).to_string()))
            .collect();
        let challenge = challenge("python", "double", cases);

        let report = grade_submission_concurrent(&engine, "", &challenge, 3).await.unwrap();

        let got: Vec<_> = report.test_results.iter().map(|r| r.name.clone()).collect();
        let want: Vec<_> = (0..6).map(|i| format!("case-{i}")).collect();
        assert_eq!(got, want);
        assert!(report.all_passed);
        assert!(engine.max_in_flight.load(Ordering::SeqCst) <= 3);
        assert!(engine.max_in_flight.load(Ordering::SeqCst) > 1);
    }

    #[tokio::test]
    async fn test_concurrent_matches_sequential_report() {
        let challenge = challenge(
            "python",
            "double",
            vec![
                test_case("a", "1", "2"),
                test_case("b", "2", "[4]"),
                test_case("c", "3", "6"),
            ],
        );

        let sequential = grade_submission(&doubling_engine(), "", &challenge).await.unwrap();
        let concurrent = grade_submission_concurrent(&doubling_engine(), "", &challenge, 8)
            .await
            .unwrap();

        assert_eq!(sequential, concurrent);
    }

    #[tokio::test]
    async fn test_concurrent_execution_error_aborts() {
        let engine = ScriptedEngine::new(|program| {
            if program.ends_with("print(double(1))") {
                service_down()
            } else {
                ok("0")
            }
        });
        let challenge = challenge(
            "python",
            "double",
            vec![test_case("a", "0", "0"), test_case("b", "1", "2")],
        );

        let err = grade_submission_concurrent(&engine, "", &challenge, 2)
            .await
            .unwrap_err();

        assert!(err.is_execution_service());
    }

    #[tokio::test]
    async fn test_concurrent_zero_parallelism_runs_sequentially() {
        let engine = doubling_engine().with_delay(|_| Duration::from_millis(5));
        let challenge = challenge(
            "python",
            "double",
            vec![test_case("a", "1", "2"), test_case("b", "2", "4")],
        );

        let report = grade_submission_concurrent(&engine, "", &challenge, 0).await.unwrap();

        assert!(report.all_passed);
        assert_eq!(engine.max_in_flight.load(Ordering::SeqCst), 1);
    }
}
