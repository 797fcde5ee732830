//! Final assessment report — aggregates per-answer evaluations into the
//! hiring recommendation.
//!
//! The LLM writes the narrative report; if that call fails the candidate
//! still gets a deterministic fallback derived from the average score, so
//! assessment generation never errors out of the request path.

use serde_json::Value;
use tracing::warn;

use crate::llm_client::prompts::{ASSESSMENT_PROMPT_TEMPLATE, ASSESSMENT_SYSTEM};
use crate::llm_client::LlmClient;
use crate::models::interview::{
    AnswerRow, Assessment, CandidateProfile, DetailedScores, QuestionAnalysis,
};

/// How many per-question lines go into the LLM summary.
const SUMMARY_QUESTION_LIMIT: usize = 5;

/// Generates the final assessment. Falls back to a deterministic report on
/// any LLM failure — by this point the exam is over and the candidate must
/// receive a result.
pub async fn generate_assessment(
    profile: &CandidateProfile,
    answers: &[AnswerRow],
    llm: &LlmClient,
) -> Assessment {
    let avg = average_score(answers);
    let name = if profile.name.is_empty() {
        "the candidate"
    } else {
        &profile.name
    };

    let prompt = ASSESSMENT_PROMPT_TEMPLATE
        .replace("{name}", name)
        .replace("{avg_score}", &format!("{avg:.1}"))
        .replace("{count}", &answers.len().to_string())
        .replace("{summary}", &summary_lines(answers));

    let mut assessment = match llm.call_json::<Assessment>(&prompt, ASSESSMENT_SYSTEM).await {
        Ok(assessment) => assessment,
        Err(e) => {
            warn!("Assessment LLM call failed, using fallback: {e}");
            fallback_assessment(avg)
        }
    };

    assessment.detailed_question_analysis = question_analysis(answers);
    assessment
}

/// Mean of the combined per-answer scores. Zero when nothing was answered.
pub fn average_score(answers: &[AnswerRow]) -> f64 {
    if answers.is_empty() {
        return 0.0;
    }
    let total: u32 = answers.iter().map(|a| eval_score(&a.evaluation)).sum();
    total as f64 / answers.len() as f64
}

/// Deterministic report used when the LLM is unavailable.
pub fn fallback_assessment(avg: f64) -> Assessment {
    let rounded = avg.round() as u32;
    Assessment {
        overall_score: rounded,
        recommendation: if avg >= 70.0 {
            "Recommended".to_string()
        } else {
            "Needs Improvement".to_string()
        },
        key_strengths: vec!["Completed the interview".to_string()],
        areas_for_improvement: vec!["Review the per-question feedback".to_string()],
        detailed_scores: DetailedScores {
            technical_skills: rounded,
            communication: rounded,
            soft_skills: rounded,
        },
        detailed_question_analysis: vec![],
    }
}

/// Per-question score breakdown attached to every assessment.
pub fn question_analysis(answers: &[AnswerRow]) -> Vec<QuestionAnalysis> {
    answers
        .iter()
        .map(|a| QuestionAnalysis {
            question: a.question_text.clone(),
            score: eval_score(&a.evaluation),
            technical_score: eval_field(&a.evaluation, "technical_score"),
            communication_score: eval_field(&a.evaluation, "communication_score"),
            relevance_score: eval_field(&a.evaluation, "relevance_score"),
        })
        .collect()
}

fn summary_lines(answers: &[AnswerRow]) -> String {
    answers
        .iter()
        .take(SUMMARY_QUESTION_LIMIT)
        .map(|a| {
            let question: String = a.question_text.chars().take(80).collect();
            format!("Q: {}... Score: {}%", question, eval_score(&a.evaluation))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn eval_score(evaluation: &Value) -> u32 {
    eval_field(evaluation, "score")
}

fn eval_field(evaluation: &Value, field: &str) -> u32 {
    evaluation
        .get(field)
        .and_then(|v| v.as_u64())
        .unwrap_or(0) as u32
}
