//! Lockdown gatekeeper — environment preflight before the exam and page
//! lockdown enforcement while it runs.
//!
//! Preflight never blocks the caller on a single failure: every check
//! runs and every failure is collected, so the candidate fixes their
//! setup in one pass instead of replaying the checklist. Re-checking is
//! just calling [`run_preflight`] again.

use std::sync::Arc;

use serde_json::json;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::proctor::capabilities::{
    EnvironmentProbe, FingerprintRules, LockdownActions, MediaDevices, NoticeSink, PageEvent,
    PageSignals,
};
use crate::proctor::violation::{SecurityPolicy, ViolationCategory, ViolationEvent};
use crate::proctor::MonitorHandle;

/// One failed preflight check.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PreflightError {
    #[error("unsupported browser: {0}")]
    UnsupportedBrowser(String),

    #[error("blocked extensions detected: {}", .0.join(", "))]
    ExtensionsDetected(Vec<String>),

    #[error("camera/microphone unavailable: {0}")]
    MediaPermission(String),

    #[error("question generation failed: {0}")]
    QuestionGeneration(String),
}

/// Outcome of the environment preflight. All checks run; failures
/// accumulate.
#[derive(Debug, Clone)]
pub struct PreflightReport {
    /// Recognized browser name, if the identity parsed to one.
    pub browser: Option<String>,
    pub failures: Vec<PreflightError>,
}

impl PreflightReport {
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Maps a raw user-agent-derived identity to a browser name.
///
/// Order matters: Chromium derivatives embed "chrome" in their identity,
/// so the derivative tokens are checked first.
pub fn browser_name(identity: &str) -> Option<&'static str> {
    let identity = identity.to_lowercase();
    if identity.contains("edg") {
        Some("edge")
    } else if identity.contains("opr") || identity.contains("opera") {
        Some("opera")
    } else if identity.contains("brave") {
        Some("brave")
    } else if identity.contains("chrome") {
        Some("chrome")
    } else {
        None
    }
}

/// Runs every environment check and returns the accumulated report.
///
/// The media probe acquires and immediately releases the devices: the
/// point is surfacing the permission prompt before the exam, not holding
/// a stream that activation will acquire for real.
pub async fn run_preflight(
    probe: &dyn EnvironmentProbe,
    media: &dyn MediaDevices,
    rules: &FingerprintRules,
    policy: &SecurityPolicy,
) -> PreflightReport {
    let mut failures = Vec::new();

    let identity = probe.browser_identity();
    let browser = browser_name(&identity).map(str::to_string);
    match &browser {
        Some(name) if policy.allowed_browsers.iter().any(|b| b == name) => {
            debug!(browser = %name, "browser check passed");
        }
        _ => {
            warn!(identity = %identity, "browser check failed");
            failures.push(PreflightError::UnsupportedBrowser(identity));
        }
    }

    let matched = probe.detect_extensions(rules).await;
    if !matched.is_empty() {
        warn!(extensions = ?matched, "blocked extensions detected");
        failures.push(PreflightError::ExtensionsDetected(matched));
    }

    match media.acquire().await {
        Ok(feed) => feed.release(),
        Err(e) => {
            warn!(error = %e, "media probe failed");
            failures.push(PreflightError::MediaPermission(e.to_string()));
        }
    }

    info!(
        browser = ?browser,
        failures = failures.len(),
        "preflight complete"
    );
    PreflightReport { browser, failures }
}

/// Enforces page lockdown for the duration of the exam.
///
/// Blocked interactions (clipboard, context menu, devtools combos) have
/// already been intercepted by the embedding; this loop decides what they
/// mean: a transient notice plus a `Lockdown` violation. Leaving
/// fullscreen is corrected, not counted — re-entry is forced and the
/// candidate is told why.
pub fn spawn_lockdown_monitor(
    signals: Arc<dyn PageSignals>,
    actions: Arc<dyn LockdownActions>,
    notices: Arc<dyn NoticeSink>,
    policy: &SecurityPolicy,
    violations: mpsc::UnboundedSender<ViolationEvent>,
) -> MonitorHandle {
    let policy = policy.clone();
    MonitorHandle::new(tokio::spawn(run(
        signals, actions, notices, policy, violations,
    )))
}

async fn run(
    signals: Arc<dyn PageSignals>,
    actions: Arc<dyn LockdownActions>,
    notices: Arc<dyn NoticeSink>,
    policy: SecurityPolicy,
    violations: mpsc::UnboundedSender<ViolationEvent>,
) {
    let mut events = signals.subscribe();
    while let Some(event) = events.recv().await {
        let blocked = match &event {
            PageEvent::ContextMenu => {
                Some(("context_menu", "Right-click is disabled during the interview"))
            }
            PageEvent::Copy => Some(("copy", "Copying is disabled during the interview")),
            PageEvent::Cut => Some(("cut", "Cutting is disabled during the interview")),
            PageEvent::Paste => Some(("paste", "Pasting is disabled during the interview")),
            PageEvent::KeyCombo(combo) if policy.is_blocked_combo(combo) => {
                Some(("key_combo", "That shortcut is disabled during the interview"))
            }
            PageEvent::FullscreenExit => {
                // Auto-corrected, never counted.
                actions.enter_fullscreen();
                notices.transient("Fullscreen is required during the interview");
                None
            }
            _ => None,
        };

        if let Some((action, message)) = blocked {
            notices.transient(message);
            let detail = match &event {
                PageEvent::KeyCombo(combo) => json!({ "action": action, "combo": combo }),
                _ => json!({ "action": action }),
            };
            let event = ViolationEvent::new(ViolationCategory::Lockdown, detail);
            if violations.send(event).is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proctor::testutil::{FakeActions, FakeMedia, FakeNotices, FakePage, FakeProbe};
    use crate::proctor::violation::KeyCombo;
    use std::sync::atomic::Ordering;
    use std::time::Duration;
    use tokio::time::timeout;

    #[test]
    fn test_browser_name_orders_chromium_derivatives_first() {
        assert_eq!(browser_name("Mozilla Chrome/120 Edg/120"), Some("edge"));
        assert_eq!(browser_name("Mozilla Chrome/120 OPR/105"), Some("opera"));
        assert_eq!(browser_name("Mozilla Chrome/120 Brave/1.60"), Some("brave"));
        assert_eq!(browser_name("Mozilla Chrome/120 Safari/537"), Some("chrome"));
        assert_eq!(browser_name("Mozilla Firefox/121"), None);
    }

    #[tokio::test]
    async fn test_preflight_passes_on_clean_environment() {
        let probe = FakeProbe::new("Mozilla Chrome/120 Safari/537");
        let media = FakeMedia::new();
        let report = run_preflight(
            probe.as_ref(),
            media.as_ref(),
            &FingerprintRules::default(),
            &SecurityPolicy::default(),
        )
        .await;
        assert!(report.passed());
        assert_eq!(report.browser.as_deref(), Some("chrome"));
        // Probe stream is released, not held.
        assert_eq!(media.feed.releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_preflight_collects_every_failure() {
        let probe = FakeProbe::new("Mozilla Firefox/121");
        probe
            .extensions
            .lock()
            .unwrap()
            .push("grammarly".to_string());
        let media = FakeMedia::new();
        media.deny.store(true, Ordering::SeqCst);

        let report = run_preflight(
            probe.as_ref(),
            media.as_ref(),
            &FingerprintRules::default(),
            &SecurityPolicy::default(),
        )
        .await;
        assert_eq!(report.failures.len(), 3);
        assert!(matches!(
            report.failures[0],
            PreflightError::UnsupportedBrowser(_)
        ));
        assert!(matches!(
            report.failures[1],
            PreflightError::ExtensionsDetected(_)
        ));
        assert!(matches!(
            report.failures[2],
            PreflightError::MediaPermission(_)
        ));
    }

    async fn recv_violation(
        rx: &mut mpsc::UnboundedReceiver<ViolationEvent>,
    ) -> Option<ViolationEvent> {
        timeout(Duration::from_secs(1), rx.recv()).await.ok()?
    }

    #[tokio::test(start_paused = true)]
    async fn test_clipboard_and_devtools_count_as_lockdown() {
        let page = FakePage::new();
        let actions = Arc::new(FakeActions::default());
        let notices = Arc::new(FakeNotices::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _monitor = spawn_lockdown_monitor(
            page.clone(),
            actions,
            notices.clone(),
            &SecurityPolicy::default(),
            tx,
        );
        tokio::task::yield_now().await;

        page.emit(PageEvent::Paste);
        page.emit(PageEvent::KeyCombo(KeyCombo::new(false, false, "F12")));

        let first = recv_violation(&mut rx).await.unwrap();
        assert_eq!(first.category, ViolationCategory::Lockdown);
        assert_eq!(first.detail["action"], "paste");
        let second = recv_violation(&mut rx).await.unwrap();
        assert_eq!(second.detail["action"], "key_combo");
        assert_eq!(notices.transient.lock().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fullscreen_exit_is_corrected_not_counted() {
        let page = FakePage::new();
        let actions = Arc::new(FakeActions::default());
        let notices = Arc::new(FakeNotices::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _monitor = spawn_lockdown_monitor(
            page.clone(),
            actions.clone(),
            notices.clone(),
            &SecurityPolicy::default(),
            tx,
        );
        tokio::task::yield_now().await;

        page.emit(PageEvent::FullscreenExit);
        assert!(recv_violation(&mut rx).await.is_none());
        assert_eq!(actions.fullscreen_entries.load(Ordering::SeqCst), 1);
        assert_eq!(notices.transient.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unblocked_combo_passes_through() {
        let page = FakePage::new();
        let actions = Arc::new(FakeActions::default());
        let notices = Arc::new(FakeNotices::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _monitor = spawn_lockdown_monitor(
            page.clone(),
            actions,
            notices,
            &SecurityPolicy::default(),
            tx,
        );
        tokio::task::yield_now().await;

        page.emit(PageEvent::KeyCombo(KeyCombo::new(true, false, "s")));
        assert!(recv_violation(&mut rx).await.is_none());
    }
}
