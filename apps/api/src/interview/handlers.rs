use axum::{
    extract::{Multipart, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::errors::AppError;
use crate::interview::{assessment, evaluation, ingest, questions};
use crate::models::interview::{
    AnswerEvaluation, AnswerRow, Assessment, CandidateProfile, InterviewQuestion,
    InterviewSessionRow,
};
use crate::state::AppState;

/// Header carrying the interview session identity. Mock auth: the session
/// id is the identity, there is no login.
const SESSION_HEADER: &str = "x-session-id";

#[derive(Serialize)]
pub struct UploadResumeResponse {
    pub message: String,
    pub candidate_profile: CandidateProfile,
    pub session_id: Uuid,
}

#[derive(Deserialize)]
pub struct SetupInterviewRequest {
    pub position_role: String,
}

#[derive(Serialize)]
pub struct SetupInterviewResponse {
    pub message: String,
    pub questions: Vec<InterviewQuestion>,
    pub is_coding_role: bool,
}

#[derive(Deserialize)]
pub struct SubmitAnswerRequest {
    pub question_id: String,
    #[serde(default)]
    pub response_text: String,
    #[serde(default)]
    pub code_submission: Option<String>,
    #[serde(default)]
    pub duration_secs: u32,
    #[serde(default)]
    pub auto_submitted: bool,
}

#[derive(Serialize)]
pub struct SubmitAnswerResponse {
    pub message: String,
    pub evaluation: AnswerEvaluation,
}

#[derive(Serialize)]
pub struct AssessmentResponse {
    pub message: String,
    pub assessment: Assessment,
}

#[derive(Deserialize)]
pub struct LogEventRequest {
    pub category: String,
    #[serde(default)]
    pub detail: Value,
    pub timestamp: DateTime<Utc>,
}

/// POST /api/v1/resume
/// Multipart upload (`resume` field, PDF). Creates the session if the
/// client did not send one yet.
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<UploadResumeResponse>, AppError> {
    let session_id = session_id_from_headers(&headers).unwrap_or_else(Uuid::new_v4);

    let mut data: Option<Bytes> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart payload: {e}")))?
    {
        if field.name() == Some("resume") {
            data = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read upload: {e}")))?,
            );
        }
    }
    let data = data.ok_or_else(|| AppError::Validation("No resume file provided".to_string()))?;

    let resume_text = ingest::extract_resume_text(data).await?;
    let profile = ingest::extract_profile(&resume_text, &state.llm).await?;

    let profile_json = serde_json::to_value(&profile)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("profile serialization: {e}")))?;

    sqlx::query(
        r#"
        INSERT INTO interview_sessions (id, candidate_profile, created_at, updated_at)
        VALUES ($1, $2, now(), now())
        ON CONFLICT (id) DO UPDATE SET candidate_profile = $2, updated_at = now()
        "#,
    )
    .bind(session_id)
    .bind(&profile_json)
    .execute(&state.db)
    .await?;

    Ok(Json(UploadResumeResponse {
        message: "Resume processed".to_string(),
        candidate_profile: profile,
        session_id,
    }))
}

/// POST /api/v1/interviews
/// Generates the question set for the session. This is the
/// question-generation readiness check of the preflight checklist.
pub async fn handle_setup_interview(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SetupInterviewRequest>,
) -> Result<Json<SetupInterviewResponse>, AppError> {
    if req.position_role.trim().is_empty() {
        return Err(AppError::Validation("Position role is required".to_string()));
    }

    let session_id = require_session(&headers)?;
    let session = load_session(&state, session_id).await?;
    let profile: CandidateProfile = serde_json::from_value(session.candidate_profile)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("corrupt candidate profile: {e}")))?;

    let generated = questions::generate_questions(&profile, &req.position_role, &state.llm).await?;
    let questions_json = serde_json::to_value(&generated)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("question serialization: {e}")))?;

    sqlx::query(
        r#"
        UPDATE interview_sessions
        SET position_role = $2, questions = $3, updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(session_id)
    .bind(&req.position_role)
    .bind(&questions_json)
    .execute(&state.db)
    .await?;

    Ok(Json(SetupInterviewResponse {
        message: "Questions generated".to_string(),
        is_coding_role: questions::is_coding_role(&req.position_role),
        questions: generated,
    }))
}

/// POST /api/v1/interviews/answers
/// Evaluates and persists one answer. `auto_submitted` marks answers the
/// supervisor forced on timer expiry or termination.
pub async fn handle_submit_answer(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SubmitAnswerRequest>,
) -> Result<Json<SubmitAnswerResponse>, AppError> {
    let session_id = require_session(&headers)?;
    let session = load_session(&state, session_id).await?;

    let question_set: Vec<InterviewQuestion> = session
        .questions
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| AppError::Internal(anyhow::anyhow!("corrupt question set: {e}")))?
        .unwrap_or_default();

    let question = question_set
        .iter()
        .find(|q| q.id == req.question_id)
        .ok_or_else(|| AppError::NotFound(format!("Question {} not found", req.question_id)))?;

    let evaluation = evaluation::evaluate_answer(
        &question.question,
        &req.response_text,
        req.code_submission.as_deref(),
        &state.llm,
    )
    .await?;

    let evaluation_json = serde_json::to_value(&evaluation)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("evaluation serialization: {e}")))?;

    sqlx::query(
        r#"
        INSERT INTO interview_answers
            (id, session_id, question_id, question_text, response_text,
             code_submission, duration_secs, auto_submitted, evaluation, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, now())
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(session_id)
    .bind(&req.question_id)
    .bind(&question.question)
    .bind(&req.response_text)
    .bind(&req.code_submission)
    .bind(req.duration_secs as i32)
    .bind(req.auto_submitted)
    .bind(&evaluation_json)
    .execute(&state.db)
    .await?;

    Ok(Json(SubmitAnswerResponse {
        message: "Answer evaluated".to_string(),
        evaluation,
    }))
}

/// GET /api/v1/interviews/assessment
/// Final report for the session. Works for completed and terminated exams
/// alike — the supervisor calls this on every exit path.
pub async fn handle_get_assessment(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<AssessmentResponse>, AppError> {
    let session_id = require_session(&headers)?;
    let session = load_session(&state, session_id).await?;
    let profile: CandidateProfile = serde_json::from_value(session.candidate_profile)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("corrupt candidate profile: {e}")))?;

    let answers: Vec<AnswerRow> = sqlx::query_as(
        "SELECT * FROM interview_answers WHERE session_id = $1 ORDER BY created_at",
    )
    .bind(session_id)
    .fetch_all(&state.db)
    .await?;

    if answers.is_empty() {
        return Err(AppError::Validation(
            "No responses to assess".to_string(),
        ));
    }

    let assessment = assessment::generate_assessment(&profile, &answers, &state.llm).await;

    Ok(Json(AssessmentResponse {
        message: "Assessment generated".to_string(),
        assessment,
    }))
}

/// POST /api/v1/security/events
/// Best-effort sink for supervisor violation/lifecycle events.
pub async fn handle_log_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<LogEventRequest>,
) -> Result<StatusCode, AppError> {
    let session_id = require_session(&headers)?;

    sqlx::query(
        r#"
        INSERT INTO security_events (id, session_id, category, detail, created_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(session_id)
    .bind(&req.category)
    .bind(&req.detail)
    .bind(req.timestamp)
    .execute(&state.db)
    .await?;

    Ok(StatusCode::ACCEPTED)
}

/// GET /api/v1/security/policy
/// Serves the exam-integrity thresholds to the client-side supervisor.
pub async fn handle_get_policy(State(state): State<AppState>) -> Json<Value> {
    Json(serde_json::to_value(&state.policy).unwrap_or_default())
}

fn session_id_from_headers(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
}

fn require_session(headers: &HeaderMap) -> Result<Uuid, AppError> {
    session_id_from_headers(headers)
        .ok_or_else(|| AppError::Validation("Missing or invalid X-Session-Id header".to_string()))
}

async fn load_session(state: &AppState, session_id: Uuid) -> Result<InterviewSessionRow, AppError> {
    let session: Option<InterviewSessionRow> =
        sqlx::query_as("SELECT * FROM interview_sessions WHERE id = $1")
            .bind(session_id)
            .fetch_optional(&state.db)
            .await?;

    session.ok_or_else(|| AppError::Validation("Invalid session".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_session_id_from_headers_valid_uuid() {
        let mut headers = HeaderMap::new();
        let id = Uuid::new_v4();
        headers.insert(
            SESSION_HEADER,
            HeaderValue::from_str(&id.to_string()).unwrap(),
        );
        assert_eq!(session_id_from_headers(&headers), Some(id));
    }

    #[test]
    fn test_session_id_from_headers_rejects_garbage() {
        let mut headers = HeaderMap::new();
        headers.insert(SESSION_HEADER, HeaderValue::from_static("not-a-uuid"));
        assert_eq!(session_id_from_headers(&headers), None);
    }

    #[test]
    fn test_require_session_missing_header_is_validation_error() {
        let headers = HeaderMap::new();
        assert!(matches!(
            require_session(&headers),
            Err(AppError::Validation(_))
        ));
    }
}
