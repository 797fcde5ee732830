//! HTTP-backed capability impls — the supervisor's view of the platform
//! API.
//!
//! [`RemoteClient`] implements [`EventSink`] and [`InterviewBackend`]
//! against the `/api/v1` surface, authenticating with the session id
//! header. Event logging is strictly best-effort: a short timeout and a
//! warning on failure, never an error to the caller.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;
use uuid::Uuid;

use crate::interview::questions::is_coding_question;
use crate::models::interview::InterviewQuestion;
use crate::proctor::capabilities::{
    CandidateAnswer, CapabilityError, EventSink, ExamQuestion, InterviewBackend,
};

const SESSION_HEADER: &str = "x-session-id";
const EVENT_TIMEOUT: Duration = Duration::from_secs(2);
/// Question generation and evaluation sit on an LLM round trip.
const BACKEND_TIMEOUT: Duration = Duration::from_secs(90);

pub struct RemoteClient {
    http: reqwest::Client,
    base_url: String,
    session_id: Uuid,
}

impl RemoteClient {
    pub fn new(base_url: &str, session_id: Uuid) -> Result<Self, CapabilityError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| CapabilityError::Unavailable(format!("http client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            session_id,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[derive(Deserialize)]
struct SetupResponse {
    questions: Vec<InterviewQuestion>,
}

fn to_exam_question(q: &InterviewQuestion) -> ExamQuestion {
    ExamQuestion {
        id: q.id.clone(),
        prompt: q.question.clone(),
        is_coding: is_coding_question(q),
    }
}

#[async_trait]
impl InterviewBackend for RemoteClient {
    async fn generate_questions(&self, role: &str) -> Result<Vec<ExamQuestion>, CapabilityError> {
        let resp = self
            .http
            .post(self.url("/api/v1/interviews"))
            .header(SESSION_HEADER, self.session_id.to_string())
            .timeout(BACKEND_TIMEOUT)
            .json(&json!({ "position_role": role }))
            .send()
            .await
            .map_err(|e| CapabilityError::Unavailable(format!("interview setup: {e}")))?
            .error_for_status()
            .map_err(|e| CapabilityError::Unavailable(format!("interview setup: {e}")))?;

        let setup: SetupResponse = resp
            .json()
            .await
            .map_err(|e| CapabilityError::Unavailable(format!("interview setup body: {e}")))?;
        Ok(setup.questions.iter().map(to_exam_question).collect())
    }

    async fn submit_answer(&self, answer: &CandidateAnswer) -> Result<(), CapabilityError> {
        self.http
            .post(self.url("/api/v1/interviews/answers"))
            .header(SESSION_HEADER, self.session_id.to_string())
            .timeout(BACKEND_TIMEOUT)
            .json(&json!({
                "question_id": answer.question_id,
                "response_text": answer.response_text,
                "code_submission": answer.code_submission,
                "duration_secs": answer.duration_secs,
                "auto_submitted": answer.auto_submitted,
            }))
            .send()
            .await
            .map_err(|e| CapabilityError::Unavailable(format!("answer submission: {e}")))?
            .error_for_status()
            .map_err(|e| CapabilityError::Unavailable(format!("answer submission: {e}")))?;
        Ok(())
    }

    async fn generate_assessment(&self) -> Result<(), CapabilityError> {
        self.http
            .get(self.url("/api/v1/interviews/assessment"))
            .header(SESSION_HEADER, self.session_id.to_string())
            .timeout(BACKEND_TIMEOUT)
            .send()
            .await
            .map_err(|e| CapabilityError::Unavailable(format!("assessment: {e}")))?
            .error_for_status()
            .map_err(|e| CapabilityError::Unavailable(format!("assessment: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl EventSink for RemoteClient {
    async fn log_event(&self, category: &str, detail: Value) {
        let result = self
            .http
            .post(self.url("/api/v1/security/events"))
            .header(SESSION_HEADER, self.session_id.to_string())
            .timeout(EVENT_TIMEOUT)
            .json(&json!({
                "category": category,
                "detail": detail,
                "timestamp": Utc::now(),
            }))
            .send()
            .await;
        if let Err(e) = result {
            warn!(category, error = %e, "event log dropped");
        }
    }
}
