use sqlx::PgPool;

use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::proctor::violation::SecurityPolicy;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub llm: LlmClient,
    pub config: Config,
    /// Exam-integrity thresholds served to the client-side supervisor.
    /// Central so policy tuning never requires a client release.
    pub policy: SecurityPolicy,
}
