use dojo_common::types::UnsupportedLanguage;
use reqwest::StatusCode;

pub type Result<T> = ::std::result::Result<T, GradeError>;

/// Failures that abort a whole grading run.
///
/// A failing test is not an error: it is a `TestResult` with `passed = false`.
#[derive(thiserror::Error, Debug)]
pub enum GradeError {
    /// The challenge names a language the harness generator cannot wrap.
    #[error(transparent)]
    UnsupportedLanguage(#[from] UnsupportedLanguage),

    /// The execution service answered with a non-2xx status.
    #[error("Execution service error: {status} while requesting {url}: {body}")]
    ExecutionServiceStatus {
        status: StatusCode,
        url: String,
        body: String,
    },

    /// The execution service could not be reached or sent an unreadable body.
    #[error("Execution service error: {0}")]
    ExecutionServiceTransport(#[from] reqwest::Error),
}

impl GradeError {
    /// True when the grading substrate is unavailable, as opposed to a
    /// misconfigured challenge.
    pub fn is_execution_service(&self) -> bool {
        matches!(
            self,
            GradeError::ExecutionServiceStatus { .. } | GradeError::ExecutionServiceTransport(_)
        )
    }
}
