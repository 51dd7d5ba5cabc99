//! Execution Engine - Remote Sandbox Client
//!
//! **Core Responsibility:**
//! Send one harnessed program to the execution service and hand back the
//! captured stdout/stderr with a status classification.
//!
//! **Critical Architectural Boundary:**
//! - Engine knows HOW to reach the sandbox (Piston over HTTP)
//! - Engine does NOT know test cases or expected values
//! - Engine returns raw outputs for the Evaluator to judge
//!
//! **Failure Classification:**
//! - Non-2xx status, connection failure, undecodable body: `GradeError`,
//!   fatal to the whole submission
//! - User code crashing or failing to compile: a normal `ExecutionResult`

use crate::config::{LanguageConfigManager, RuntimeSelector};
use crate::error::{GradeError, Result};
use async_trait::async_trait;
use dojo_common::types::{ExecutionResult, ExecutionStatus, Language, UnsupportedLanguage};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Anything that can run a complete program and report its output streams.
#[async_trait]
pub trait ExecutionEngine: Send + Sync {
    async fn execute(&self, program: &str, language: Language) -> Result<ExecutionResult>;
}

#[derive(Debug, Serialize)]
struct PistonFile<'a> {
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct PistonRequest<'a> {
    language: &'a str,
    version: &'a str,
    files: Vec<PistonFile<'a>>,
    stdin: &'a str,
    args: Vec<&'a str>,
}

/// One stage (`compile` or `run`) of a Piston response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PistonStage {
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    /// `null` when the process was killed by a signal
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub signal: Option<String>,
    #[serde(default)]
    pub output: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PistonResponse {
    #[serde(default)]
    pub run: Option<PistonStage>,
    #[serde(default)]
    pub compile: Option<PistonStage>,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub version: String,
}

/// Map a decoded Piston response onto an `ExecutionResult`
///
/// - A compile stage with a non-zero code wins: empty stdout, compiler
///   diagnostics on stderr (falling back to the combined output)
/// - Otherwise the run stage decides: exit code 0 is Accepted, anything
///   else, including a signal kill, is a RuntimeError
pub fn into_execution_result(response: PistonResponse) -> ExecutionResult {
    if let Some(compile) = response.compile {
        if compile.code != Some(0) {
            let stderr = if compile.stderr.is_empty() {
                compile.output
            } else {
                compile.stderr
            };
            return ExecutionResult {
                stdout: String::new(),
                stderr,
                status: ExecutionStatus::CompilationError,
            };
        }
    }

    let run = response.run.unwrap_or_default();
    let status = if run.code == Some(0) {
        ExecutionStatus::Accepted
    } else {
        ExecutionStatus::RuntimeError
    };

    ExecutionResult {
        stdout: run.stdout,
        stderr: run.stderr,
        status,
    }
}

/// Piston-backed execution engine
///
/// Stateless per call: every `execute` is one POST to `/api/v2/execute`.
/// The reqwest client is shared and holds the per-request timeout.
#[derive(Debug, Clone)]
pub struct PistonEngine {
    client: reqwest::Client,
    execute_url: String,
    runtimes: LanguageConfigManager,
}

impl PistonEngine {
    pub fn new(base_url: &str, runtimes: LanguageConfigManager, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            execute_url: format!("{}/api/v2/execute", base_url.trim_end_matches('/')),
            runtimes,
        })
    }

    pub fn execute_url(&self) -> &str {
        &self.execute_url
    }

    fn selector(&self, language: Language) -> Result<&RuntimeSelector> {
        self.runtimes
            .get_config(language)
            .map_err(|_| GradeError::from(UnsupportedLanguage(language.to_string())))
    }
}

#[async_trait]
impl ExecutionEngine for PistonEngine {
    async fn execute(&self, program: &str, language: Language) -> Result<ExecutionResult> {
        let selector = self.selector(language)?;
        let request = PistonRequest {
            language: &selector.language,
            version: &selector.version,
            files: vec![PistonFile { content: program }],
            stdin: "",
            args: vec![],
        };

        debug!(
            runtime = %selector.language,
            version = %selector.version,
            program_bytes = program.len(),
            "Dispatching program to execution service"
        );

        let response = self.client.post(&self.execute_url).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GradeError::ExecutionServiceStatus {
                status,
                url: self.execute_url.clone(),
                body,
            });
        }

        let decoded: PistonResponse = response.json().await?;
        let result = into_execution_result(decoded);

        debug!(
            status = ?result.status,
            stdout_bytes = result.stdout.len(),
            stderr_bytes = result.stderr.len(),
            "Execution service responded"
        );

        Ok(result)
    }
}
