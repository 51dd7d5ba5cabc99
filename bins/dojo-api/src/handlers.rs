// HTTP route handlers for the Dojo API

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use dojo_common::redis as attempts;
use dojo_common::types::{AttemptRecord, Challenge, Difficulty, GradingReport, TestResult};
use dojo_grader::{grade_submission, grade_submission_concurrent, GradeError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::rate_limit::client_identifier;
use crate::{metrics, AppState};

pub const MAX_CODE_CHARS: usize = 100_000;
const RECENT_ATTEMPTS_LIMIT: isize = 20;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    #[serde(default)]
    pub challenge_id: String,
    #[serde(default)]
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub success: bool,
    pub passed: bool,
    pub test_results: Vec<TestResult>,
    pub attempt_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeSummary {
    pub id: Uuid,
    pub title: String,
    pub difficulty: Difficulty,
    pub language: String,
    pub test_count: usize,
}

impl From<&Challenge> for ChallengeSummary {
    fn from(challenge: &Challenge) -> Self {
        Self {
            id: challenge.id,
            title: challenge.title.clone(),
            difficulty: challenge.difficulty,
            language: challenge.language.clone(),
            test_count: challenge.test_cases.len(),
        }
    }
}

/// Only the canonical 8-4-4-4-12 form; braced, urn and bare hex are rejected
fn parse_hyphenated_uuid(value: &str) -> Option<Uuid> {
    if value.len() != 36 {
        return None;
    }
    Uuid::parse_str(value).ok()
}

/// Check the submit body; every failed rule is listed in `details`
pub fn validate_submission(request: &SubmitRequest) -> Result<Uuid, ApiError> {
    let mut details = Vec::new();

    let challenge_id = parse_hyphenated_uuid(&request.challenge_id);
    if challenge_id.is_none() {
        details.push("challengeId: Invalid challenge ID".to_string());
    }

    let code_chars = request.code.chars().count();
    if code_chars == 0 {
        details.push("code: Code cannot be empty".to_string());
    } else if code_chars > MAX_CODE_CHARS {
        details.push("code: Code too large".to_string());
    }

    match challenge_id {
        Some(id) if details.is_empty() => Ok(id),
        _ => Err(ApiError::Validation {
            message: "Invalid request body".to_string(),
            details,
        }),
    }
}

async fn grade(state: &AppState, code: &str, challenge: &Challenge) -> Result<GradingReport, GradeError> {
    let engine = state.engine.as_ref();
    if state.max_parallel_tests > 1 {
        grade_submission_concurrent(engine, code, challenge, state.max_parallel_tests).await
    } else {
        grade_submission(engine, code, challenge).await
    }
}

/// POST /api/submit - Grade code against a challenge
pub async fn submit_code(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<SubmitRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let client = client_identifier(&headers);
    let decision = state.rate_limiter.check(&client).await;
    if !decision.allowed {
        metrics::RATE_LIMITED_TOTAL.inc();
        warn!(client = %client, retry_after = ?decision.retry_after_secs, "Submission rate limited");
        return Err(ApiError::RateLimited(decision));
    }

    let Json(payload) =
        payload.map_err(|e| ApiError::validation(format!("Invalid JSON in request body: {}", e.body_text())))?;
    let challenge_id = validate_submission(&payload)?;

    let challenge = state
        .catalog
        .get(&challenge_id)
        .ok_or(ApiError::NotFound { resource: "Challenge" })?;

    let started = Instant::now();
    let report = match tokio::time::timeout(state.grading_timeout, grade(&state, &payload.code, challenge)).await {
        Ok(Ok(report)) => report,
        Ok(Err(e)) => {
            metrics::record_error();
            error!(challenge_id = %challenge_id, error = %e, "Grading failed");
            return Err(e.into());
        }
        Err(_) => {
            metrics::record_error();
            let limit_ms = state.grading_timeout.as_millis() as u64;
            error!(challenge_id = %challenge_id, timeout_ms = limit_ms, "Grading timed out");
            return Err(ApiError::GradingTimeout(limit_ms));
        }
    };
    let elapsed = started.elapsed();
    metrics::record_report(&report, elapsed.as_secs_f64());

    let attempt = AttemptRecord::new(challenge_id, payload.code, &report, elapsed.as_millis() as u64);
    if let Some(redis) = &state.redis {
        let mut conn = redis.clone();
        if let Err(e) = attempts::store_attempt(&mut conn, &attempt).await {
            warn!(attempt_id = %attempt.id, error = %e, "Failed to persist attempt");
        }
    }

    info!(
        attempt_id = %attempt.id,
        challenge_id = %challenge_id,
        passed = report.all_passed,
        passed_tests = report.passed_count(),
        total_tests = report.test_results.len(),
        elapsed_ms = attempt.execution_time_ms,
        "Submission graded"
    );

    let body = SubmitResponse {
        success: true,
        passed: report.all_passed,
        test_results: report.test_results,
        attempt_id: attempt.id,
    };

    Ok((decision.headers(), Json(body)).into_response())
}

/// GET /api/challenges - Catalog listing
pub async fn list_challenges(State(state): State<Arc<AppState>>) -> Json<Vec<ChallengeSummary>> {
    Json(state.catalog.challenges().iter().map(ChallengeSummary::from).collect())
}

/// GET /api/challenges/{id} - One challenge with its test cases
pub async fn get_challenge(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Challenge>, ApiError> {
    let id = Uuid::parse_str(&id).map_err(|_| ApiError::validation("Invalid challenge ID format"))?;

    state
        .catalog
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or(ApiError::NotFound { resource: "Challenge" })
}

/// GET /api/attempts/{id} - A persisted attempt
pub async fn get_attempt(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<AttemptRecord>, ApiError> {
    let id = Uuid::parse_str(&id).map_err(|_| ApiError::validation("Invalid attempt ID format"))?;

    let Some(redis) = &state.redis else {
        return Err(ApiError::Unavailable(
            "Attempt persistence is not configured".to_string(),
        ));
    };

    let mut conn = redis.clone();
    match attempts::get_attempt(&mut conn, &id).await {
        Ok(Some(attempt)) => Ok(Json(attempt)),
        Ok(None) => Err(ApiError::NotFound { resource: "Attempt" }),
        Err(e) => {
            error!(attempt_id = %id, error = %e, "Failed to fetch attempt");
            Err(ApiError::Internal(format!("Failed to fetch attempt: {}", e)))
        }
    }
}

/// GET /api/challenges/{id}/attempts - Recent attempt ids, newest first
pub async fn list_challenge_attempts(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Uuid>>, ApiError> {
    let id = Uuid::parse_str(&id).map_err(|_| ApiError::validation("Invalid challenge ID format"))?;
    if state.catalog.get(&id).is_none() {
        return Err(ApiError::NotFound { resource: "Challenge" });
    }

    let Some(redis) = &state.redis else {
        return Err(ApiError::Unavailable(
            "Attempt persistence is not configured".to_string(),
        ));
    };

    let mut conn = redis.clone();
    attempts::recent_attempt_ids(&mut conn, &id, RECENT_ATTEMPTS_LIMIT)
        .await
        .map(Json)
        .map_err(|e| {
            error!(challenge_id = %id, error = %e, "Failed to list attempts");
            ApiError::Internal(format!("Failed to list attempts: {}", e))
        })
}

/// GET /status - Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /metrics - Prometheus exposition
pub async fn metrics_handler() -> Result<Response, ApiError> {
    let body = metrics::render().map_err(|e| ApiError::Internal(format!("Failed to encode metrics: {}", e)))?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
        .into_response())
}
