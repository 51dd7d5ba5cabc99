use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Languages the harness generator knows how to wrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::Python, Language::JavaScript, Language::TypeScript];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A challenge names a language the grader cannot wrap.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unsupported language: {0}")]
pub struct UnsupportedLanguage(pub String);

impl FromStr for Language {
    type Err = UnsupportedLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "python" => Ok(Language::Python),
            "javascript" => Ok(Language::JavaScript),
            "typescript" => Ok(Language::TypeScript),
            _ => Err(UnsupportedLanguage(s.to_string())),
        }
    }
}

/// One unit of grading input.
///
/// `expected` starting with `"Error:"` marks an expected-error case; anything
/// else is a literal expected output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub name: String,
    #[serde(deserialize_with = "literal_text")]
    pub input: String,
    #[serde(deserialize_with = "literal_text")]
    pub expected: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Catalog files may spell inputs as JSON values (`[2, 3]`) instead of
/// strings (`"[2, 3]"`). Non-string values are kept as compact JSON text.
fn literal_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackHint {
    pub hint: String,
    #[serde(rename = "type")]
    pub hint_type: String,
}

/// A gradable challenge. `language` stays the raw configured string so that
/// a misconfigured challenge fails at grading time rather than at parse time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub difficulty: Difficulty,
    pub language: String,
    pub function_name: String,
    #[serde(default)]
    pub starter_code: String,
    pub test_cases: Vec<TestCase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hints: Option<Vec<FallbackHint>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    Accepted,
    RuntimeError,
    CompilationError,
}

/// Raw outcome of running one harnessed program on the execution service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub status: ExecutionStatus,
}

/// One graded test case. Immutable once produced by the evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub passed: bool,
    pub expected: String,
    pub actual: String,
    pub error: String,
}

/// Aggregate for one submission; `test_results[i]` belongs to `test_cases[i]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingReport {
    pub test_results: Vec<TestResult>,
    pub all_passed: bool,
}

impl GradingReport {
    /// Builds the report; an empty result list is a vacuous pass.
    pub fn from_results(test_results: Vec<TestResult>) -> Self {
        let all_passed = test_results.iter().all(|r| r.passed);
        Self {
            test_results,
            all_passed,
        }
    }

    /// Failing results only, in grading order. Hint generation consumes these.
    pub fn failed_tests(&self) -> Vec<&TestResult> {
        self.test_results.iter().filter(|r| !r.passed).collect()
    }

    pub fn passed_count(&self) -> usize {
        self.test_results.iter().filter(|r| r.passed).count()
    }
}

/// One persisted submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub id: Uuid,
    pub challenge_id: Uuid,
    pub code: String,
    pub passed: bool,
    pub test_results: Vec<TestResult>,
    pub execution_time_ms: u64,
    pub created_at: DateTime<Utc>,
}

impl AttemptRecord {
    pub fn new(challenge_id: Uuid, code: String, report: &GradingReport, execution_time_ms: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            challenge_id,
            code,
            passed: report.all_passed,
            test_results: report.test_results.clone(),
            execution_time_ms,
            created_at: Utc::now(),
        }
    }
}
