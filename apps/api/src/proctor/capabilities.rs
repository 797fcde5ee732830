//! Capability traits — every piece of ambient browser state the supervisor
//! touches, abstracted behind an injected trait so monitors never read
//! globals and tests can drive them with fakes.
//!
//! Carried as `Arc<dyn Trait>` by the controller and monitors, the same
//! seam pattern the interview pipeline uses for its pluggable services.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::proctor::violation::KeyCombo;

/// Opaque camera frame. The supervisor never inspects pixels; it only
/// hands frames to the face-detection capability.
#[derive(Debug, Clone)]
pub struct VideoFrame(pub Bytes);

/// Opaque microphone buffer, handed to the loudness capability.
#[derive(Debug, Clone)]
pub struct AudioBuffer(pub Bytes);

/// Failures at a capability boundary.
#[derive(Debug, Clone, Error)]
pub enum CapabilityError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("capability unavailable: {0}")]
    Unavailable(String),
}

/// Page-level events the embedding intercepts and forwards. Interception
/// (preventDefault) happens at the embedding layer; the supervisor decides
/// what each intercepted event means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEvent {
    /// The document became hidden (tab switched away or window minimized).
    VisibilityHidden,
    /// The window lost input focus.
    WindowBlur,
    ContextMenu,
    Copy,
    Cut,
    Paste,
    KeyCombo(KeyCombo),
    FullscreenExit,
}

/// Subscription to page events plus synchronous focus queries.
pub trait PageSignals: Send + Sync {
    fn subscribe(&self) -> mpsc::UnboundedReceiver<PageEvent>;
    /// Whether the document currently holds input focus.
    fn has_focus(&self) -> bool;
    /// Whether focus sits inside the embedded code-execution frame —
    /// legitimate interaction, never a tab switch.
    fn focus_in_code_frame(&self) -> bool;
}

/// Actions the gatekeeper can take against the page.
pub trait LockdownActions: Send + Sync {
    fn enter_fullscreen(&self);
}

/// Camera + microphone acquisition. Acquired once on entry to the active
/// exam, released unconditionally on every exit path.
#[async_trait]
pub trait MediaDevices: Send + Sync {
    async fn acquire(&self) -> Result<Arc<dyn MediaFeed>, CapabilityError>;
}

/// A live camera/microphone stream pair.
#[async_trait]
pub trait MediaFeed: Send + Sync {
    async fn video_frame(&self) -> Result<VideoFrame, CapabilityError>;
    async fn audio_buffer(&self) -> Result<AudioBuffer, CapabilityError>;
    /// Stops all tracks. Idempotent.
    fn release(&self);
}

/// Opaque face-detection model: frame in, face count out.
#[async_trait]
pub trait FaceDetector: Send + Sync {
    async fn detect_faces(&self, frame: &VideoFrame) -> Result<u32, CapabilityError>;
}

/// Opaque loudness model: buffer in, level 0-100 out.
#[async_trait]
pub trait LoudnessSampler: Send + Sync {
    async fn sample_loudness(&self, buffer: &AudioBuffer) -> Result<u8, CapabilityError>;
}

/// Versioned DOM fingerprint rules for AI-assistant extensions.
/// Inherently heuristic — a best-effort gate, not a guarantee.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerprintRules {
    pub version: u32,
    pub patterns: Vec<String>,
}

impl Default for FingerprintRules {
    fn default() -> Self {
        Self {
            version: 1,
            patterns: vec![
                "chatgpt".to_string(),
                "copilot".to_string(),
                "grammarly".to_string(),
                "quillbot".to_string(),
                "jasper".to_string(),
                "writesonic".to_string(),
                "claude".to_string(),
                "bard".to_string(),
            ],
        }
    }
}

/// Browser identity and extension probing, evaluated before entry.
#[async_trait]
pub trait EnvironmentProbe: Send + Sync {
    /// Raw user-agent-derived identity string.
    fn browser_identity(&self) -> String;
    /// Ids of fingerprint patterns that matched the DOM.
    async fn detect_extensions(&self, rules: &FingerprintRules) -> Vec<String>;
}

/// UI surface for warnings and live indicators. Side effects only —
/// nothing here participates in the violation contract.
pub trait NoticeSink: Send + Sync {
    /// Toast-style notice that fades on its own.
    fn transient(&self, message: &str);
    /// Blocking overlay the candidate must acknowledge.
    fn critical(&self, message: &str);
    /// Live face-count indicator next to the camera preview.
    fn face_count(&self, count: u32);
    /// Live microphone level bar.
    fn audio_level(&self, level: u8);
    /// Countdown display, once per second.
    fn countdown(&self, remaining_secs: u64);
}

/// Best-effort event log. Implementations must never block the caller
/// beyond a short timeout and must swallow failures.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn log_event(&self, category: &str, detail: Value);
}

/// A generated exam question as the supervisor sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamQuestion {
    pub id: String,
    pub prompt: String,
    pub is_coding: bool,
}

/// An answer payload handed to the platform for evaluation/persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateAnswer {
    pub question_id: String,
    pub response_text: String,
    pub code_submission: Option<String>,
    pub duration_secs: u64,
    pub auto_submitted: bool,
}

/// The LLM-backed interview platform, seen only at its boundary: the
/// supervisor needs success/failure and nothing about prompts or scores.
#[async_trait]
pub trait InterviewBackend: Send + Sync {
    async fn generate_questions(&self, role: &str) -> Result<Vec<ExamQuestion>, CapabilityError>;
    async fn submit_answer(&self, answer: &CandidateAnswer) -> Result<(), CapabilityError>;
    async fn generate_assessment(&self) -> Result<(), CapabilityError>;
}
