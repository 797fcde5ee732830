//! Answer evaluation — scores one answer across three dimensions via the LLM.

use crate::errors::AppError;
use crate::llm_client::prompts::{
    EVALUATE_CODE_SECTION, EVALUATE_PROMPT_TEMPLATE, EVALUATE_SYSTEM,
};
use crate::llm_client::LlmClient;
use crate::models::interview::AnswerEvaluation;

/// Evaluates a candidate answer. The combined `score` is always recomputed
/// here from the three dimension scores — the LLM's own arithmetic is not
/// trusted.
pub async fn evaluate_answer(
    question: &str,
    answer: &str,
    code: Option<&str>,
    llm: &LlmClient,
) -> Result<AnswerEvaluation, AppError> {
    let code_section = match code {
        Some(code) if !code.trim().is_empty() => EVALUATE_CODE_SECTION.replace("{code}", code),
        _ => String::new(),
    };

    let prompt = EVALUATE_PROMPT_TEMPLATE
        .replace("{question}", question)
        .replace("{answer}", answer)
        .replace("{code_section}", &code_section);

    let mut evaluation: AnswerEvaluation = llm
        .call_json(&prompt, EVALUATE_SYSTEM)
        .await
        .map_err(|e| AppError::Llm(format!("Failed to evaluate answer: {e}")))?;

    evaluation.score = combined_score(
        evaluation.technical_score,
        evaluation.communication_score,
        evaluation.relevance_score,
    );

    Ok(evaluation)
}

/// Rounded mean of the three dimension scores, clamped to 0..=100.
pub fn combined_score(technical: u32, communication: u32, relevance: u32) -> u32 {
    let mean = (technical.min(100) + communication.min(100) + relevance.min(100)) as f64 / 3.0;
    mean.round() as u32
}
