// Prometheus metrics for the grading API, exposed on GET /metrics

use dojo_common::types::GradingReport;
use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Encoder, Histogram,
    IntCounter, IntCounterVec, TextEncoder,
};

lazy_static! {
    /// Submissions by outcome: passed, failed or error
    pub static ref SUBMISSIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "dojo_submissions_total",
        "Graded submissions by outcome",
        &["outcome"]
    )
    .expect("dojo_submissions_total registers once");

    pub static ref TEST_CASES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "dojo_test_cases_total",
        "Evaluated test cases by result",
        &["result"]
    )
    .expect("dojo_test_cases_total registers once");

    pub static ref GRADING_DURATION_SECONDS: Histogram = register_histogram!(
        "dojo_grading_duration_seconds",
        "Wall-clock time spent grading one submission",
        vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]
    )
    .expect("dojo_grading_duration_seconds registers once");

    pub static ref RATE_LIMITED_TOTAL: IntCounter = register_int_counter!(
        "dojo_rate_limited_total",
        "Submissions rejected by the rate limiter"
    )
    .expect("dojo_rate_limited_total registers once");
}

pub fn record_report(report: &GradingReport, seconds: f64) {
    let outcome = if report.all_passed { "passed" } else { "failed" };
    SUBMISSIONS_TOTAL.with_label_values(&[outcome]).inc();

    let passed = report.passed_count() as u64;
    let failed = report.test_results.len() as u64 - passed;
    TEST_CASES_TOTAL.with_label_values(&["passed"]).inc_by(passed);
    TEST_CASES_TOTAL.with_label_values(&["failed"]).inc_by(failed);

    GRADING_DURATION_SECONDS.observe(seconds);
}

pub fn record_error() {
    SUBMISSIONS_TOTAL.with_label_values(&["error"]).inc();
}

/// Text exposition of every registered metric
pub fn render() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&prometheus::gather(), &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
