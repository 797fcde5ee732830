//! Per-question countdown timer.
//!
//! One timer runs per active question. It ticks once per second, pushes
//! the remaining time to the countdown display, emits a single warning at
//! the policy mark, and a single expiry when the countdown reaches zero.
//! Expiry events carry the question index so a consumer can discard a
//! stale expiry that races with a manual submission.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::proctor::capabilities::NoticeSink;
use crate::proctor::violation::SecurityPolicy;
use crate::proctor::MonitorHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// The countdown reached the warning mark.
    Warning {
        question_index: usize,
        remaining_secs: u64,
    },
    /// The countdown reached zero. Sent at most once per timer.
    Expired { question_index: usize },
}

pub struct QuestionTimer {
    handle: MonitorHandle,
    question_index: usize,
}

impl QuestionTimer {
    pub fn start(
        question_index: usize,
        is_coding: bool,
        policy: &SecurityPolicy,
        notices: Arc<dyn NoticeSink>,
        events: mpsc::UnboundedSender<TimerEvent>,
    ) -> Self {
        let total_secs = policy.question_duration(is_coding).as_secs();
        let mark_secs = policy.warning_mark_secs(is_coding);
        debug!(question_index, total_secs, "question timer started");
        let handle = MonitorHandle::new(tokio::spawn(run(
            question_index,
            total_secs,
            mark_secs,
            notices,
            events,
        )));
        Self {
            handle,
            question_index,
        }
    }

    pub fn question_index(&self) -> usize {
        self.question_index
    }

    /// Terminal. A stopped timer emits nothing further.
    pub fn stop(self) {
        self.handle.stop();
    }
}

async fn run(
    question_index: usize,
    total_secs: u64,
    mark_secs: u64,
    notices: Arc<dyn NoticeSink>,
    events: mpsc::UnboundedSender<TimerEvent>,
) {
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut remaining = total_secs;
    loop {
        ticker.tick().await;
        notices.countdown(remaining);

        if remaining == mark_secs {
            let _ = events.send(TimerEvent::Warning {
                question_index,
                remaining_secs: remaining,
            });
        }
        if remaining == 0 {
            let _ = events.send(TimerEvent::Expired { question_index });
            return;
        }
        remaining -= 1;
    }
}
