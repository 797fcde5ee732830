//! Question generation — builds the tailored question set for a session.
//!
//! The LLM produces the questions; the pure helpers here (coding-role and
//! coding-question classification) drive per-question timer durations and
//! are deterministic and unit-tested.

use serde::Deserialize;

use crate::errors::AppError;
use crate::llm_client::prompts::{
    QUESTION_GEN_CODING_INSTRUCTIONS, QUESTION_GEN_PROMPT_TEMPLATE, QUESTION_GEN_SYSTEM,
};
use crate::llm_client::LlmClient;
use crate::models::interview::{CandidateProfile, InterviewQuestion};

#[derive(Debug, Deserialize)]
struct QuestionSet {
    questions: Vec<InterviewQuestion>,
}

/// Generates the interview question set for a candidate and target role.
pub async fn generate_questions(
    profile: &CandidateProfile,
    position: &str,
    llm: &LlmClient,
) -> Result<Vec<InterviewQuestion>, AppError> {
    let coding = is_coding_role(position);
    let name = if profile.name.is_empty() {
        "the candidate"
    } else {
        &profile.name
    };

    let prompt = QUESTION_GEN_PROMPT_TEMPLATE
        .replace("{name}", name)
        .replace("{position}", position)
        .replace("{experience}", &profile.experience)
        .replace("{skills}", &profile.key_skills.join(", "))
        .replace(
            "{coding_instructions}",
            if coding {
                QUESTION_GEN_CODING_INSTRUCTIONS
            } else {
                ""
            },
        );

    let set: QuestionSet = llm
        .call_json(&prompt, QUESTION_GEN_SYSTEM)
        .await
        .map_err(|e| AppError::Llm(format!("Failed to generate questions: {e}")))?;

    if set.questions.is_empty() {
        return Err(AppError::Llm("LLM returned no questions".to_string()));
    }

    Ok(set.questions)
}

/// Whether a target role warrants coding-challenge questions (and their
/// 20-minute timers). Keyword heuristic over the position string.
pub fn is_coding_role(position: &str) -> bool {
    const CODING_MARKERS: [&str; 7] = [
        "engineer",
        "developer",
        "programmer",
        "swe",
        "sde",
        "full stack",
        "fullstack",
    ];
    let lower = position.to_lowercase();
    CODING_MARKERS.iter().any(|m| lower.contains(m))
}

/// Whether a question is a coding challenge. Drives the long-form timer
/// and the embedded code editor on the client.
pub fn is_coding_question(question: &InterviewQuestion) -> bool {
    question
        .tags
        .iter()
        .any(|t| t == "coding" || t == "programming")
        || question.id.contains("code")
}
