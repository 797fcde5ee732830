//! Resume ingestion — PDF text extraction and LLM profile parsing.
//!
//! PDF parsing is CPU-bound, so extraction runs under `spawn_blocking` to
//! keep the tokio scheduler unblocked. The uploaded bytes are written to a
//! temp file because `pdf_extract` works on paths.

use std::io::Write;

use bytes::Bytes;

use crate::errors::AppError;
use crate::llm_client::prompts::{PROFILE_EXTRACT_PROMPT_TEMPLATE, PROFILE_EXTRACT_SYSTEM};
use crate::llm_client::LlmClient;
use crate::models::interview::CandidateProfile;

/// Resumes longer than this are truncated before the LLM call.
const MAX_RESUME_CHARS: usize = 8_000;

/// Extracts plain text from an uploaded PDF.
/// Returns a validation error when the document yields no text at all
/// (scanned image PDFs, corrupt uploads).
pub async fn extract_resume_text(data: Bytes) -> Result<String, AppError> {
    let text = tokio::task::spawn_blocking(move || -> anyhow::Result<String> {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(&data)?;
        let text = pdf_extract::extract_text(file.path())
            .map_err(|e| anyhow::anyhow!("PDF extraction failed: {e:?}"))?;
        Ok(text)
    })
    .await
    .map_err(|e| AppError::Internal(anyhow::anyhow!("spawn_blocking failed in ingest: {e}")))??;

    if text.trim().is_empty() {
        return Err(AppError::Validation(
            "Could not extract text from PDF".to_string(),
        ));
    }

    Ok(text)
}

/// Parses resume text into a structured `CandidateProfile` via the LLM.
pub async fn extract_profile(
    resume_text: &str,
    llm: &LlmClient,
) -> Result<CandidateProfile, AppError> {
    let truncated = truncate_chars(resume_text, MAX_RESUME_CHARS);
    let prompt = PROFILE_EXTRACT_PROMPT_TEMPLATE.replace("{resume_text}", truncated);

    llm.call_json::<CandidateProfile>(&prompt, PROFILE_EXTRACT_SYSTEM)
        .await
        .map_err(|e| AppError::Llm(format!("Failed to parse resume: {e}")))
}

/// Truncates to at most `max` characters on a char boundary.
fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
