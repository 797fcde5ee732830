// Interview pipeline: resume ingestion, question generation, answer
// evaluation, and the final assessment report.
// All LLM calls go through llm_client — no direct Anthropic SDK calls here.

pub mod assessment;
pub mod evaluation;
pub mod handlers;
pub mod ingest;
pub mod questions;
