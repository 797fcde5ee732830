//! Violation model — categories, events, decisions, and the tunable
//! [`SecurityPolicy`] every monitor and the coordinator read from.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One independently-tracked channel of rule-breaking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationCategory {
    TabSwitch,
    Lockdown,
    NoFace,
    MultipleFaces,
    AudioNoise,
}

impl ViolationCategory {
    pub const ALL: [ViolationCategory; 5] = [
        ViolationCategory::TabSwitch,
        ViolationCategory::Lockdown,
        ViolationCategory::NoFace,
        ViolationCategory::MultipleFaces,
        ViolationCategory::AudioNoise,
    ];

    /// Stable wire name, used for event logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationCategory::TabSwitch => "tab_switch",
            ViolationCategory::Lockdown => "lockdown",
            ViolationCategory::NoFace => "no_face",
            ViolationCategory::MultipleFaces => "multiple_faces",
            ViolationCategory::AudioNoise => "audio_noise",
        }
    }
}

/// Immutable violation record. Produced by exactly one monitor, consumed
/// exactly once by the coordinator.
#[derive(Debug, Clone, Serialize)]
pub struct ViolationEvent {
    pub category: ViolationCategory,
    pub detail: Value,
    pub timestamp: DateTime<Utc>,
}

impl ViolationEvent {
    pub fn new(category: ViolationCategory, detail: Value) -> Self {
        Self {
            category,
            detail,
            timestamp: Utc::now(),
        }
    }
}

/// Why a session ended early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    Violation(ViolationCategory),
    UserExit,
}

/// Outcome of reporting one violation to the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Session not active — event discarded without touching any counter.
    Ignored,
    /// Counted; `remaining` warnings left before termination.
    Warned { remaining: u32 },
    /// Threshold crossed. The controller must run teardown now.
    Terminated { reason: TerminationReason },
}

/// A keyboard combination blocked during the exam.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyCombo {
    pub ctrl: bool,
    pub shift: bool,
    pub key: String,
}

impl KeyCombo {
    pub fn new(ctrl: bool, shift: bool, key: &str) -> Self {
        Self {
            ctrl,
            shift,
            key: key.to_string(),
        }
    }
}

/// Every tunable threshold of the exam-integrity subsystem.
///
/// Policy is data, not code: monitors and the coordinator read it at
/// construction, so tuning never touches monitor logic. The API serves
/// the current policy at `/api/v1/security/policy`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityPolicy {
    /// Warnings per category before termination (unless overridden below).
    pub default_max_warnings: u32,
    /// Per-category overrides of `default_max_warnings`.
    #[serde(default)]
    pub max_warnings_overrides: HashMap<ViolationCategory, u32>,

    /// Continuous no-face time before a `NoFace` violation counts.
    pub no_face_dwell_ms: u64,
    /// Camera sampling period.
    pub face_sample_interval_ms: u64,

    /// Loudness level (0-100) above which a sample is suspicious.
    pub audio_loudness_threshold: u8,
    /// Microphone sampling period.
    pub audio_sample_interval_ms: u64,
    /// Accumulated suspicious time that fires an `AudioNoise` violation.
    pub audio_bucket_limit_ms: u64,

    /// Delay before a window-blur is re-checked and reported.
    pub blur_debounce_ms: u64,

    /// Per-question durations and mid-countdown warning marks.
    pub standard_question_secs: u64,
    pub coding_question_secs: u64,
    pub standard_warning_mark_secs: u64,
    pub coding_warning_mark_secs: u64,

    /// Lowercase browser names allowed to enter the exam.
    pub allowed_browsers: Vec<String>,
    /// Key combinations intercepted while the exam is active.
    pub blocked_key_combos: Vec<KeyCombo>,
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        Self {
            default_max_warnings: 2,
            max_warnings_overrides: HashMap::new(),
            no_face_dwell_ms: 3_000,
            face_sample_interval_ms: 1_000,
            audio_loudness_threshold: 30,
            audio_sample_interval_ms: 500,
            audio_bucket_limit_ms: 2_000,
            blur_debounce_ms: 100,
            standard_question_secs: 180,
            coding_question_secs: 1_200,
            standard_warning_mark_secs: 30,
            coding_warning_mark_secs: 120,
            allowed_browsers: vec![
                "chrome".to_string(),
                "edge".to_string(),
                "brave".to_string(),
                "opera".to_string(),
            ],
            blocked_key_combos: vec![
                // Devtools / view-source
                KeyCombo::new(false, false, "F12"),
                KeyCombo::new(true, true, "I"),
                KeyCombo::new(true, true, "J"),
                KeyCombo::new(true, false, "u"),
                // Clipboard
                KeyCombo::new(true, false, "c"),
                KeyCombo::new(true, false, "v"),
                KeyCombo::new(true, false, "x"),
            ],
        }
    }
}

impl SecurityPolicy {
    /// Warnings allowed for a category before termination.
    pub fn max_warnings(&self, category: ViolationCategory) -> u32 {
        self.max_warnings_overrides
            .get(&category)
            .copied()
            .unwrap_or(self.default_max_warnings)
    }

    pub fn question_duration(&self, is_coding: bool) -> Duration {
        Duration::from_secs(if is_coding {
            self.coding_question_secs
        } else {
            self.standard_question_secs
        })
    }

    pub fn warning_mark_secs(&self, is_coding: bool) -> u64 {
        if is_coding {
            self.coding_warning_mark_secs
        } else {
            self.standard_warning_mark_secs
        }
    }

    pub fn is_blocked_combo(&self, combo: &KeyCombo) -> bool {
        self.blocked_key_combos.contains(combo)
    }
}
