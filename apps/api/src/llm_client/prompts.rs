#![allow(dead_code)]

// All LLM prompt constants for the interview pipeline.
// Every prompt demands JSON-only output so `call_json` can deserialize directly.

/// System prompt for resume profile extraction — enforces JSON-only output.
pub const PROFILE_EXTRACT_SYSTEM: &str =
    "You are an expert technical recruiter analyzing candidate resumes. \
    Extract a structured candidate profile from raw resume text. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Resume profile prompt template. Replace `{resume_text}` before sending.
pub const PROFILE_EXTRACT_PROMPT_TEMPLATE: &str = r#"Analyze the following resume and extract the candidate profile.

Return a JSON object with this EXACT schema (no extra fields):
{
  "name": "Jane Doe",
  "email": "jane@example.com",
  "experience": "Concise summary of professional experience (2-3 sentences)",
  "key_skills": ["Rust", "PostgreSQL", "Distributed Systems"],
  "inferred_position": "Backend Engineer"
}

Rules:
- "key_skills" MUST be an array of short skill names, most relevant first.
- "inferred_position" is the role this resume most plausibly targets.
- Use empty strings for fields that cannot be determined. Never invent contact details.

Resume text:
{resume_text}"#;

/// System prompt for interview question generation.
pub const QUESTION_GEN_SYSTEM: &str =
    "You are a senior interviewer designing a structured screening interview. \
    Generate questions tailored to the candidate and target role. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// Question generation template. Replace `{name}`, `{position}`, `{experience}`,
/// `{skills}` and `{coding_instructions}` before sending.
pub const QUESTION_GEN_PROMPT_TEMPLATE: &str = r#"Generate 10 interview questions for {name} applying for the position of '{position}'.

Candidate experience: {experience}
Candidate skills: {skills}

Composition:
- 6 Technical questions (tag: "technical") probing the listed skills in depth
- 2 Soft Skills questions (tag: "soft-skills")
- 2 Communication questions (tag: "communication")
{coding_instructions}

Return a JSON object with this EXACT schema:
{
  "questions": [
    {"id": "q1", "question": "...", "tags": ["technical"]}
  ]
}

Rules:
- Ids are "q1" through "q10" in order.
- Each question must be answerable verbally in under 3 minutes (coding challenges excepted).
- Never reference the resume document itself, only its content."#;

/// Extra composition rule appended for coding roles.
pub const QUESTION_GEN_CODING_INSTRUCTIONS: &str =
    "- Exactly 2 of the technical questions must be small coding challenges \
    (tags: [\"technical\", \"coding\"]) solvable in under 20 minutes.";

/// System prompt for answer evaluation.
pub const EVALUATE_SYSTEM: &str =
    "You are a strict but fair technical interviewer scoring a candidate's answer. \
    Score each dimension 0-100. Be rigorous: vague or evasive answers score low. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// Answer evaluation template. Replace `{question}`, `{answer}` and `{code_section}`.
pub const EVALUATE_PROMPT_TEMPLATE: &str = r#"Evaluate this interview response strictly.

Question: {question}

Answer: {answer}
{code_section}
Return a JSON object with this EXACT schema:
{
  "technical_score": 85,
  "communication_score": 90,
  "relevance_score": 88,
  "feedback": "Two to three sentences of concrete feedback."
}"#;

/// Code section fragment for coding answers. Replace `{code}`.
pub const EVALUATE_CODE_SECTION: &str = "\nSubmitted code:\n```\n{code}\n```\n";

/// System prompt for the final assessment report.
pub const ASSESSMENT_SYSTEM: &str =
    "You are a hiring committee member writing the final assessment for a screening interview. \
    Base every judgement strictly on the per-question scores and summaries provided. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// Assessment template. Replace `{name}`, `{avg_score}`, `{count}` and `{summary}`.
pub const ASSESSMENT_PROMPT_TEMPLATE: &str = r#"Generate the final assessment for candidate {name}.

Average score: {avg_score}%
Questions answered: {count}
Per-question summary:
{summary}

Return a JSON object with this EXACT schema:
{
  "overall_score": 85,
  "recommendation": "Recommended",
  "key_strengths": ["..."],
  "areas_for_improvement": ["..."],
  "detailed_scores": {
    "technical_skills": 85,
    "communication": 80,
    "soft_skills": 78
  }
}

Rules:
- "recommendation" is one of: "Highly Recommended", "Recommended", "Needs Improvement", "Not Recommended".
- "overall_score" must be consistent with the per-question scores, not inflated."#;
