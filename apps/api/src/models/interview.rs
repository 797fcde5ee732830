#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// Structured candidate profile extracted from a resume by the LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub name: String,
    pub email: String,
    pub experience: String,
    pub key_skills: Vec<String>,
    pub inferred_position: String,
}

/// A single generated interview question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewQuestion {
    pub id: String,
    pub question: String,
    pub tags: Vec<String>,
}

/// LLM evaluation of one answer. `score` is the rounded mean of the three
/// dimensions, computed server-side — never trusted from the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerEvaluation {
    pub technical_score: u32,
    pub communication_score: u32,
    pub relevance_score: u32,
    pub feedback: String,
    #[serde(default)]
    pub score: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailedScores {
    pub technical_skills: u32,
    pub communication: u32,
    pub soft_skills: u32,
}

/// Per-question breakdown attached to the final assessment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionAnalysis {
    pub question: String,
    pub score: u32,
    pub technical_score: u32,
    pub communication_score: u32,
    pub relevance_score: u32,
}

/// Final interview assessment report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assessment {
    pub overall_score: u32,
    pub recommendation: String,
    pub key_strengths: Vec<String>,
    pub areas_for_improvement: Vec<String>,
    pub detailed_scores: DetailedScores,
    #[serde(default)]
    pub detailed_question_analysis: Vec<QuestionAnalysis>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InterviewSessionRow {
    pub id: Uuid,
    pub candidate_profile: Value,
    pub position_role: Option<String>,
    pub questions: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AnswerRow {
    pub id: Uuid,
    pub session_id: Uuid,
    pub question_id: String,
    pub question_text: String,
    pub response_text: String,
    pub code_submission: Option<String>,
    pub duration_secs: i32,
    pub auto_submitted: bool,
    pub evaluation: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SecurityEventRow {
    pub id: Uuid,
    pub session_id: Uuid,
    pub category: String,
    pub detail: Value,
    pub created_at: DateTime<Utc>,
}
