//! Grading core: wrap submitted code in a harness, run it on the execution
//! service, compare each outcome and fold the results into one report.

pub mod config;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod harness;

pub use config::LanguageConfigManager;
pub use engine::{ExecutionEngine, PistonEngine};
pub use error::GradeError;
pub use executor::{grade_submission, grade_submission_concurrent};
