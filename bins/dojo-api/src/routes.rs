use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::handlers;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/submit", post(handlers::submit_code))
        .route("/api/challenges", get(handlers::list_challenges))
        .route("/api/challenges/:id", get(handlers::get_challenge))
        .route("/api/challenges/:id/attempts", get(handlers::list_challenge_attempts))
        .route("/api/attempts/:id", get(handlers::get_attempt))
        .route("/status", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_handler))
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new().merge(routes()).with_state(state)
}
