pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::interview::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Interview pipeline
        .route("/api/v1/resume", post(handlers::handle_upload_resume))
        .route("/api/v1/interviews", post(handlers::handle_setup_interview))
        .route(
            "/api/v1/interviews/answers",
            post(handlers::handle_submit_answer),
        )
        .route(
            "/api/v1/interviews/assessment",
            get(handlers::handle_get_assessment),
        )
        // Exam-integrity supervisor endpoints
        .route("/api/v1/security/events", post(handlers::handle_log_event))
        .route("/api/v1/security/policy", get(handlers::handle_get_policy))
        .with_state(state)
}
