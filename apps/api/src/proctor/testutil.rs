//! Channel-backed fake capabilities shared by the proctor tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::proctor::capabilities::{
    AudioBuffer, CandidateAnswer, CapabilityError, EnvironmentProbe, EventSink, ExamQuestion,
    FaceDetector, FingerprintRules, InterviewBackend, LockdownActions, LoudnessSampler, MediaFeed,
    MediaDevices, NoticeSink, PageEvent, PageSignals, VideoFrame,
};

#[derive(Default)]
pub(crate) struct FakePage {
    senders: Mutex<Vec<mpsc::UnboundedSender<PageEvent>>>,
    focused: AtomicBool,
    in_code_frame: AtomicBool,
}

impl FakePage {
    pub fn new() -> Arc<Self> {
        let page = Self::default();
        page.focused.store(true, Ordering::SeqCst);
        Arc::new(page)
    }

    pub fn emit(&self, event: PageEvent) {
        for tx in self.senders.lock().unwrap().iter() {
            let _ = tx.send(event.clone());
        }
    }

    pub fn set_focus(&self, focused: bool) {
        self.focused.store(focused, Ordering::SeqCst);
    }

    pub fn set_in_code_frame(&self, in_frame: bool) {
        self.in_code_frame.store(in_frame, Ordering::SeqCst);
    }
}

impl PageSignals for FakePage {
    fn subscribe(&self) -> mpsc::UnboundedReceiver<PageEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.lock().unwrap().push(tx);
        rx
    }

    fn has_focus(&self) -> bool {
        self.focused.load(Ordering::SeqCst)
    }

    fn focus_in_code_frame(&self) -> bool {
        self.in_code_frame.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub(crate) struct FakeActions {
    pub fullscreen_entries: AtomicU32,
}

impl LockdownActions for FakeActions {
    fn enter_fullscreen(&self) {
        self.fullscreen_entries.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub(crate) struct FakeNotices {
    pub transient: Mutex<Vec<String>>,
    pub critical: Mutex<Vec<String>>,
    pub face_counts: Mutex<Vec<u32>>,
    pub audio_levels: Mutex<Vec<u8>>,
    pub countdown_calls: AtomicU32,
}

impl NoticeSink for FakeNotices {
    fn transient(&self, message: &str) {
        self.transient.lock().unwrap().push(message.to_string());
    }

    fn critical(&self, message: &str) {
        self.critical.lock().unwrap().push(message.to_string());
    }

    fn face_count(&self, count: u32) {
        self.face_counts.lock().unwrap().push(count);
    }

    fn audio_level(&self, level: u8) {
        self.audio_levels.lock().unwrap().push(level);
    }

    fn countdown(&self, _remaining_secs: u64) {
        self.countdown_calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub(crate) struct FakeFeed {
    pub releases: AtomicU32,
}

#[async_trait]
impl MediaFeed for FakeFeed {
    async fn video_frame(&self) -> Result<VideoFrame, CapabilityError> {
        Ok(VideoFrame(Bytes::new()))
    }

    async fn audio_buffer(&self) -> Result<AudioBuffer, CapabilityError> {
        Ok(AudioBuffer(Bytes::new()))
    }

    fn release(&self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

pub(crate) struct FakeMedia {
    pub deny: AtomicBool,
    pub acquisitions: AtomicU32,
    pub feed: Arc<FakeFeed>,
}

impl FakeMedia {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            deny: AtomicBool::new(false),
            acquisitions: AtomicU32::new(0),
            feed: Arc::new(FakeFeed::default()),
        })
    }
}

#[async_trait]
impl MediaDevices for FakeMedia {
    async fn acquire(&self) -> Result<Arc<dyn MediaFeed>, CapabilityError> {
        if self.deny.load(Ordering::SeqCst) {
            return Err(CapabilityError::PermissionDenied(
                "camera/microphone access denied".to_string(),
            ));
        }
        self.acquisitions.fetch_add(1, Ordering::SeqCst);
        Ok(self.feed.clone())
    }
}

/// Face detector that replays a scripted sequence, then repeats `default`.
pub(crate) struct ScriptedDetector {
    counts: Mutex<VecDeque<u32>>,
    default: u32,
    pub fail: AtomicBool,
}

impl ScriptedDetector {
    pub fn new(counts: &[u32], default: u32) -> Arc<Self> {
        Arc::new(Self {
            counts: Mutex::new(counts.iter().copied().collect()),
            default,
            fail: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl FaceDetector for ScriptedDetector {
    async fn detect_faces(&self, _frame: &VideoFrame) -> Result<u32, CapabilityError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(CapabilityError::Unavailable("model not loaded".to_string()));
        }
        Ok(self
            .counts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.default))
    }
}

/// Loudness sampler that replays a scripted sequence, then repeats `default`.
pub(crate) struct ScriptedLoudness {
    levels: Mutex<VecDeque<u8>>,
    default: u8,
    pub fail: AtomicBool,
}

impl ScriptedLoudness {
    pub fn new(levels: &[u8], default: u8) -> Arc<Self> {
        Arc::new(Self {
            levels: Mutex::new(levels.iter().copied().collect()),
            default,
            fail: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl LoudnessSampler for ScriptedLoudness {
    async fn sample_loudness(&self, _buffer: &AudioBuffer) -> Result<u8, CapabilityError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(CapabilityError::Unavailable(
                "analyser graph closed".to_string(),
            ));
        }
        Ok(self
            .levels
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.default))
    }
}

pub(crate) struct FakeProbe {
    pub identity: Mutex<String>,
    pub extensions: Mutex<Vec<String>>,
}

impl FakeProbe {
    pub fn new(identity: &str) -> Arc<Self> {
        Arc::new(Self {
            identity: Mutex::new(identity.to_string()),
            extensions: Mutex::new(vec![]),
        })
    }
}

#[async_trait]
impl EnvironmentProbe for FakeProbe {
    fn browser_identity(&self) -> String {
        self.identity.lock().unwrap().clone()
    }

    async fn detect_extensions(&self, _rules: &FingerprintRules) -> Vec<String> {
        self.extensions.lock().unwrap().clone()
    }
}

#[derive(Default)]
pub(crate) struct FakeSink {
    pub events: Mutex<Vec<String>>,
}

#[async_trait]
impl EventSink for FakeSink {
    async fn log_event(&self, category: &str, _detail: Value) {
        self.events.lock().unwrap().push(category.to_string());
    }
}

pub(crate) struct FakeBackend {
    pub questions: Mutex<Vec<ExamQuestion>>,
    pub fail_questions: AtomicBool,
    pub submitted: Mutex<Vec<CandidateAnswer>>,
    pub assessments: AtomicU32,
}

impl FakeBackend {
    pub fn with_questions(count: usize) -> Arc<Self> {
        let questions = (1..=count)
            .map(|i| ExamQuestion {
                id: format!("q{i}"),
                prompt: format!("Question {i}"),
                is_coding: false,
            })
            .collect();
        Arc::new(Self {
            questions: Mutex::new(questions),
            fail_questions: AtomicBool::new(false),
            submitted: Mutex::new(vec![]),
            assessments: AtomicU32::new(0),
        })
    }
}

#[async_trait]
impl InterviewBackend for FakeBackend {
    async fn generate_questions(&self, _role: &str) -> Result<Vec<ExamQuestion>, CapabilityError> {
        if self.fail_questions.load(Ordering::SeqCst) {
            return Err(CapabilityError::Unavailable(
                "question generation failed".to_string(),
            ));
        }
        Ok(self.questions.lock().unwrap().clone())
    }

    async fn submit_answer(&self, answer: &CandidateAnswer) -> Result<(), CapabilityError> {
        self.submitted.lock().unwrap().push(answer.clone());
        Ok(())
    }

    async fn generate_assessment(&self) -> Result<(), CapabilityError> {
        self.assessments.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
