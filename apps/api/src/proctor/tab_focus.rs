//! Tab-focus monitor — turns visibility/blur signals into `TabSwitch`
//! violations.
//!
//! Two suppression rules keep false positives out:
//! - focus inside the embedded code-execution frame is legitimate
//!   interaction, so both signals are discarded while it holds focus;
//! - a bare window blur is re-checked after a short debounce, because
//!   opening a browser dialog (e.g. the permission prompt) blurs the
//!   window without the candidate leaving the page.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc;
use tracing::debug;

use crate::proctor::capabilities::{PageEvent, PageSignals};
use crate::proctor::violation::{SecurityPolicy, ViolationCategory, ViolationEvent};
use crate::proctor::MonitorHandle;

pub fn spawn_tab_focus_monitor(
    signals: Arc<dyn PageSignals>,
    policy: &SecurityPolicy,
    violations: mpsc::UnboundedSender<ViolationEvent>,
) -> MonitorHandle {
    let debounce = Duration::from_millis(policy.blur_debounce_ms);
    MonitorHandle::new(tokio::spawn(run(signals, debounce, violations)))
}

async fn run(
    signals: Arc<dyn PageSignals>,
    debounce: Duration,
    violations: mpsc::UnboundedSender<ViolationEvent>,
) {
    let mut events = signals.subscribe();
    while let Some(event) = events.recv().await {
        match event {
            PageEvent::VisibilityHidden => {
                if signals.focus_in_code_frame() {
                    debug!("visibility change while code frame focused, ignoring");
                    continue;
                }
                let event = ViolationEvent::new(
                    ViolationCategory::TabSwitch,
                    json!({ "signal": "visibility_hidden" }),
                );
                if violations.send(event).is_err() {
                    return;
                }
            }
            PageEvent::WindowBlur => {
                if signals.focus_in_code_frame() {
                    debug!("window blur while code frame focused, ignoring");
                    continue;
                }
                // Focus may bounce straight back (dropdowns, permission
                // prompts). Re-check after the debounce before reporting.
                tokio::time::sleep(debounce).await;
                if signals.has_focus() {
                    debug!("focus regained within debounce, ignoring blur");
                    continue;
                }
                let event = ViolationEvent::new(
                    ViolationCategory::TabSwitch,
                    json!({ "signal": "window_blur" }),
                );
                if violations.send(event).is_err() {
                    return;
                }
            }
            _ => {}
        }
    }
}
