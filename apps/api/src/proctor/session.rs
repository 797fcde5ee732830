//! Exam session lifecycle — preflight, activation, the event loop, and
//! single-shot teardown.
//!
//! States move strictly forward: NotStarted → Preflight → Active →
//! Terminated | Completed. Preflight may repeat until it passes;
//! activation acquires the media feed, spawns the monitors and hands the
//! session to a single event loop. That loop is the only consumer of
//! violations, timer events and candidate commands, and the only caller
//! of teardown, so every exit path releases the media feed and reports
//! exactly one final notice.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use serde_json::json;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::proctor::audio::spawn_audio_monitor;
use crate::proctor::capabilities::{
    CandidateAnswer, CapabilityError, EnvironmentProbe, EventSink, ExamQuestion, FaceDetector,
    FingerprintRules, InterviewBackend, LockdownActions, LoudnessSampler, MediaDevices, MediaFeed,
    NoticeSink, PageSignals,
};
use crate::proctor::coordinator::SecurityCoordinator;
use crate::proctor::face::spawn_face_monitor;
use crate::proctor::gatekeeper::{self, PreflightError, PreflightReport};
use crate::proctor::tab_focus::spawn_tab_focus_monitor;
use crate::proctor::timer::{QuestionTimer, TimerEvent};
use crate::proctor::violation::{
    Decision, SecurityPolicy, TerminationReason, ViolationCategory, ViolationEvent,
};
use crate::proctor::MonitorHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NotStarted,
    Preflight,
    Active,
    Terminated,
    Completed,
}

/// Session state shared between the controller and the spawned event loop.
/// The loop is the only writer once the session is active.
#[derive(Clone)]
struct StateCell(Arc<AtomicU8>);

impl StateCell {
    fn new() -> Self {
        Self(Arc::new(AtomicU8::new(SessionState::NotStarted as u8)))
    }

    fn get(&self) -> SessionState {
        match self.0.load(Ordering::SeqCst) {
            0 => SessionState::NotStarted,
            1 => SessionState::Preflight,
            2 => SessionState::Active,
            3 => SessionState::Terminated,
            _ => SessionState::Completed,
        }
    }

    fn set(&self, state: SessionState) {
        self.0.store(state as u8, Ordering::SeqCst);
    }
}

/// Every capability the supervisor needs, injected at construction.
#[derive(Clone)]
pub struct ProctorDeps {
    pub signals: Arc<dyn PageSignals>,
    pub actions: Arc<dyn LockdownActions>,
    pub media: Arc<dyn MediaDevices>,
    pub face_detector: Arc<dyn FaceDetector>,
    pub loudness: Arc<dyn LoudnessSampler>,
    pub probe: Arc<dyn EnvironmentProbe>,
    pub notices: Arc<dyn NoticeSink>,
    pub events: Arc<dyn EventSink>,
    pub backend: Arc<dyn InterviewBackend>,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("operation not valid in the {0:?} state")]
    InvalidState(SessionState),

    #[error("preflight checks have not passed")]
    PreflightIncomplete,

    #[error(transparent)]
    Media(#[from] CapabilityError),
}

/// Candidate-driven commands into the active session.
#[derive(Debug, Clone)]
pub enum ExamCommand {
    Submit {
        response_text: String,
        code_submission: Option<String>,
    },
    /// In-progress answer text, kept so expiry and termination can flush
    /// whatever was typed.
    Draft(String),
    UserExit,
}

/// Outward notifications about session progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionNotice {
    ViolationWarning {
        category: ViolationCategory,
        remaining: u32,
    },
    Terminated {
        reason: TerminationReason,
    },
    Completed,
}

pub struct ExamSessionController {
    deps: ProctorDeps,
    policy: SecurityPolicy,
    rules: FingerprintRules,
    state: StateCell,
    questions: Vec<ExamQuestion>,
    preflight_passed: bool,
    notice_tx: mpsc::UnboundedSender<SessionNotice>,
}

impl ExamSessionController {
    pub fn new(
        deps: ProctorDeps,
        policy: SecurityPolicy,
    ) -> (Self, mpsc::UnboundedReceiver<SessionNotice>) {
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();
        (
            Self {
                deps,
                policy,
                rules: FingerprintRules::default(),
                state: StateCell::new(),
                questions: Vec::new(),
                preflight_passed: false,
                notice_tx,
            },
            notice_rx,
        )
    }

    pub fn state(&self) -> SessionState {
        self.state.get()
    }

    pub fn questions(&self) -> &[ExamQuestion] {
        &self.questions
    }

    /// Full reset back to `NotStarted` — the only way out of a finished
    /// session. Refused while the session loop is still running.
    pub fn reset(&mut self) -> Result<(), SessionError> {
        if self.state.get() == SessionState::Active {
            return Err(SessionError::InvalidState(SessionState::Active));
        }
        self.state.set(SessionState::NotStarted);
        self.questions.clear();
        self.preflight_passed = false;
        Ok(())
    }

    /// Runs the environment checks and prepares the question set.
    /// Callable repeatedly until it passes; a recheck is the same call.
    pub async fn run_preflight(&mut self, role: &str) -> Result<PreflightReport, SessionError> {
        match self.state.get() {
            SessionState::NotStarted | SessionState::Preflight => {}
            state => return Err(SessionError::InvalidState(state)),
        }
        self.state.set(SessionState::Preflight);

        let mut report = gatekeeper::run_preflight(
            self.deps.probe.as_ref(),
            self.deps.media.as_ref(),
            &self.rules,
            &self.policy,
        )
        .await;

        if self.questions.is_empty() {
            match self.deps.backend.generate_questions(role).await {
                Ok(questions) if !questions.is_empty() => {
                    info!(count = questions.len(), "question set prepared");
                    self.questions = questions;
                }
                Ok(_) => {
                    report
                        .failures
                        .push(PreflightError::QuestionGeneration("empty set".to_string()));
                }
                Err(e) => {
                    warn!(error = %e, "question generation failed during preflight");
                    report
                        .failures
                        .push(PreflightError::QuestionGeneration(e.to_string()));
                }
            }
        }

        self.preflight_passed = report.passed();
        Ok(report)
    }

    /// Enters the active exam: acquires media, locks the page down, spawns
    /// the monitors and the event loop.
    pub async fn activate(&mut self) -> Result<SessionHandle, SessionError> {
        if self.state.get() != SessionState::Preflight {
            return Err(SessionError::InvalidState(self.state.get()));
        }
        if !self.preflight_passed || self.questions.is_empty() {
            return Err(SessionError::PreflightIncomplete);
        }

        let feed = self.deps.media.acquire().await?;
        self.deps.actions.enter_fullscreen();

        let (violation_tx, violation_rx) = mpsc::unbounded_channel();
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let monitors = vec![
            spawn_tab_focus_monitor(
                self.deps.signals.clone(),
                &self.policy,
                violation_tx.clone(),
            ),
            gatekeeper::spawn_lockdown_monitor(
                self.deps.signals.clone(),
                self.deps.actions.clone(),
                self.deps.notices.clone(),
                &self.policy,
                violation_tx.clone(),
            ),
            spawn_face_monitor(
                feed.clone(),
                self.deps.face_detector.clone(),
                self.deps.notices.clone(),
                &self.policy,
                violation_tx.clone(),
            ),
            spawn_audio_monitor(
                feed.clone(),
                self.deps.loudness.clone(),
                self.deps.notices.clone(),
                &self.policy,
                violation_tx.clone(),
            ),
        ];

        let mut coordinator = SecurityCoordinator::new(self.policy.clone());
        coordinator.activate();

        let first = &self.questions[0];
        let timer = QuestionTimer::start(
            0,
            first.is_coding,
            &self.policy,
            self.deps.notices.clone(),
            timer_tx.clone(),
        );

        let events = self.deps.events.clone();
        let question_count = self.questions.len();
        tokio::spawn(async move {
            events
                .log_event("session_started", json!({ "questions": question_count }))
                .await;
        });

        let exam = ActiveExam {
            deps: self.deps.clone(),
            policy: self.policy.clone(),
            coordinator,
            questions: self.questions.clone(),
            feed,
            monitors,
            timer: Some(timer),
            timer_tx,
            question_index: 0,
            question_started: Instant::now(),
            draft: None,
            notice_tx: self.notice_tx.clone(),
            state: self.state.clone(),
        };
        let task = tokio::spawn(exam.run(violation_rx, timer_rx, command_rx));

        self.state.set(SessionState::Active);
        info!("exam session active");
        Ok(SessionHandle {
            commands: command_tx,
            task,
        })
    }
}

/// Command channel into a running session plus its join handle.
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<ExamCommand>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    pub fn submit_answer(&self, response_text: String, code_submission: Option<String>) {
        let _ = self.commands.send(ExamCommand::Submit {
            response_text,
            code_submission,
        });
    }

    pub fn save_draft(&self, text: String) {
        let _ = self.commands.send(ExamCommand::Draft(text));
    }

    pub fn exit(&self) {
        let _ = self.commands.send(ExamCommand::UserExit);
    }

    /// Waits for the session loop to finish tearing down.
    pub async fn join(self) {
        let _ = self.task.await;
    }
}

enum Outcome {
    Terminated(TerminationReason),
    Completed,
}

struct ActiveExam {
    deps: ProctorDeps,
    policy: SecurityPolicy,
    coordinator: SecurityCoordinator,
    questions: Vec<ExamQuestion>,
    feed: Arc<dyn MediaFeed>,
    monitors: Vec<MonitorHandle>,
    timer: Option<QuestionTimer>,
    timer_tx: mpsc::UnboundedSender<TimerEvent>,
    question_index: usize,
    question_started: Instant,
    draft: Option<String>,
    notice_tx: mpsc::UnboundedSender<SessionNotice>,
    state: StateCell,
}

impl ActiveExam {
    async fn run(
        mut self,
        mut violations: mpsc::UnboundedReceiver<ViolationEvent>,
        mut timer_events: mpsc::UnboundedReceiver<TimerEvent>,
        mut commands: mpsc::UnboundedReceiver<ExamCommand>,
    ) {
        loop {
            tokio::select! {
                Some(violation) = violations.recv() => {
                    if let Some(outcome) = self.handle_violation(violation) {
                        return self.finish(outcome).await;
                    }
                }
                Some(event) = timer_events.recv() => {
                    if let Some(outcome) = self.handle_timer(event).await {
                        return self.finish(outcome).await;
                    }
                }
                command = commands.recv() => {
                    // A closed command channel means the client shell is
                    // gone; treat it as the candidate leaving.
                    let command = command.unwrap_or(ExamCommand::UserExit);
                    if let Some(outcome) = self.handle_command(command).await {
                        return self.finish(outcome).await;
                    }
                }
            }
        }
    }

    fn handle_violation(&mut self, violation: ViolationEvent) -> Option<Outcome> {
        let decision = self.coordinator.report_violation(&violation);
        match decision {
            Decision::Ignored => None,
            Decision::Warned { remaining } => {
                self.deps
                    .notices
                    .transient(warning_message(violation.category));
                let _ = self.notice_tx.send(SessionNotice::ViolationWarning {
                    category: violation.category,
                    remaining,
                });
                self.log_violation(violation);
                None
            }
            Decision::Terminated { reason } => {
                self.log_violation(violation);
                Some(Outcome::Terminated(reason))
            }
        }
    }

    fn log_violation(&self, violation: ViolationEvent) {
        let events = self.deps.events.clone();
        tokio::spawn(async move {
            events
                .log_event(violation.category.as_str(), violation.detail)
                .await;
        });
    }

    async fn handle_timer(&mut self, event: TimerEvent) -> Option<Outcome> {
        match event {
            TimerEvent::Warning {
                question_index,
                remaining_secs,
            } if question_index == self.question_index => {
                self.deps.notices.transient(&format!(
                    "{remaining_secs} seconds left on this question"
                ));
                None
            }
            TimerEvent::Expired { question_index } if question_index == self.question_index => {
                self.timer.take();
                self.deps
                    .notices
                    .transient("Time is up, submitting your answer");
                let text = self.draft.take().unwrap_or_default();
                self.submit_current(text, None, true).await;
                self.advance()
            }
            stale => {
                // A manual submission advanced the question while this
                // event was in flight.
                debug!(?stale, "stale timer event discarded");
                None
            }
        }
    }

    async fn handle_command(&mut self, command: ExamCommand) -> Option<Outcome> {
        match command {
            ExamCommand::Draft(text) => {
                self.draft = Some(text);
                None
            }
            ExamCommand::Submit {
                response_text,
                code_submission,
            } => {
                if let Some(timer) = self.timer.take() {
                    timer.stop();
                }
                self.submit_current(response_text, code_submission, false)
                    .await;
                self.advance()
            }
            ExamCommand::UserExit => Some(Outcome::Terminated(TerminationReason::UserExit)),
        }
    }

    async fn submit_current(
        &mut self,
        response_text: String,
        code_submission: Option<String>,
        auto_submitted: bool,
    ) {
        let question = &self.questions[self.question_index];
        let answer = CandidateAnswer {
            question_id: question.id.clone(),
            response_text,
            code_submission,
            duration_secs: self.question_started.elapsed().as_secs(),
            auto_submitted,
        };
        if let Err(e) = self.deps.backend.submit_answer(&answer).await {
            warn!(error = %e, question_id = %answer.question_id, "answer submission failed");
        }
        self.draft = None;
    }

    /// Moves to the next question, or reports completion when none remain.
    fn advance(&mut self) -> Option<Outcome> {
        self.question_index += 1;
        if self.question_index >= self.questions.len() {
            return Some(Outcome::Completed);
        }
        self.question_started = Instant::now();
        if let Some(timer) = self.timer.take() {
            timer.stop();
        }
        let question = &self.questions[self.question_index];
        self.timer = Some(QuestionTimer::start(
            self.question_index,
            question.is_coding,
            &self.policy,
            self.deps.notices.clone(),
            self.timer_tx.clone(),
        ));
        None
    }

    /// The single teardown path. Stops every monitor, releases the media
    /// feed and emits exactly one final notice.
    async fn finish(mut self, outcome: Outcome) {
        self.state.set(match outcome {
            Outcome::Terminated(_) => SessionState::Terminated,
            Outcome::Completed => SessionState::Completed,
        });
        self.monitors.clear();
        if let Some(timer) = self.timer.take() {
            timer.stop();
        }
        self.coordinator.deactivate();
        self.feed.release();

        match outcome {
            Outcome::Terminated(reason) => {
                info!(?reason, "exam session terminated");
                if self.draft.is_some() {
                    let text = self.draft.take().unwrap_or_default();
                    self.submit_current(text, None, true).await;
                }
                self.deps
                    .notices
                    .critical("The interview has been terminated");
                if let Err(e) = self.deps.backend.generate_assessment().await {
                    warn!(error = %e, "assessment generation failed");
                }
                self.deps
                    .events
                    .log_event("session_terminated", json!({ "reason": reason }))
                    .await;
                let _ = self.notice_tx.send(SessionNotice::Terminated { reason });
            }
            Outcome::Completed => {
                info!("exam session completed");
                if let Err(e) = self.deps.backend.generate_assessment().await {
                    warn!(error = %e, "assessment generation failed");
                }
                self.deps
                    .events
                    .log_event("session_completed", json!({}))
                    .await;
                let _ = self.notice_tx.send(SessionNotice::Completed);
            }
        }
    }
}

fn warning_message(category: ViolationCategory) -> &'static str {
    match category {
        ViolationCategory::TabSwitch => {
            "Tab switching detected. Another violation will end the interview"
        }
        ViolationCategory::Lockdown => {
            "Blocked action detected. Another violation will end the interview"
        }
        ViolationCategory::NoFace => "No face visible. Stay in view of the camera",
        ViolationCategory::MultipleFaces => "Multiple people detected. You must be alone",
        ViolationCategory::AudioNoise => "Background conversation detected. Find a quiet room",
    }
}
