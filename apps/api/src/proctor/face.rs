//! Face-presence monitor — samples the camera once per second and turns
//! face counts into violations.
//!
//! An empty frame is only suspicious when it persists: the dwell counter
//! accumulates across consecutive zero-face samples and fires once it
//! reaches the policy dwell, then resets so the next stretch is counted
//! fresh. Any sample with at least one face clears the dwell. More than
//! one face is a violation on the spot.
//!
//! Capability failures (camera revoked mid-exam, model not loaded) put
//! the monitor in a degraded state instead of crashing the task; it keeps
//! sampling and recovers silently when frames flow again.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::proctor::capabilities::{FaceDetector, MediaFeed, NoticeSink};
use crate::proctor::violation::{SecurityPolicy, ViolationCategory, ViolationEvent};
use crate::proctor::MonitorHandle;

pub fn spawn_face_monitor(
    feed: Arc<dyn MediaFeed>,
    detector: Arc<dyn FaceDetector>,
    notices: Arc<dyn NoticeSink>,
    policy: &SecurityPolicy,
    violations: mpsc::UnboundedSender<ViolationEvent>,
) -> MonitorHandle {
    let interval_ms = policy.face_sample_interval_ms;
    let dwell_ms = policy.no_face_dwell_ms;
    MonitorHandle::new(tokio::spawn(run(
        feed, detector, notices, interval_ms, dwell_ms, violations,
    )))
}

async fn run(
    feed: Arc<dyn MediaFeed>,
    detector: Arc<dyn FaceDetector>,
    notices: Arc<dyn NoticeSink>,
    interval_ms: u64,
    dwell_ms: u64,
    violations: mpsc::UnboundedSender<ViolationEvent>,
) {
    let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut no_face_ms: u64 = 0;
    let mut degraded = false;

    loop {
        ticker.tick().await;

        let count = match sample(feed.as_ref(), detector.as_ref()).await {
            Ok(count) => count,
            Err(e) => {
                if !degraded {
                    warn!(error = %e, "face sampling degraded");
                    degraded = true;
                }
                continue;
            }
        };
        if degraded {
            info!("face sampling recovered");
            degraded = false;
        }

        notices.face_count(count);

        match count {
            0 => {
                no_face_ms += interval_ms;
                if no_face_ms >= dwell_ms {
                    let event = ViolationEvent::new(
                        ViolationCategory::NoFace,
                        json!({ "dwell_ms": no_face_ms }),
                    );
                    no_face_ms = 0;
                    if violations.send(event).is_err() {
                        return;
                    }
                }
            }
            1 => no_face_ms = 0,
            n => {
                no_face_ms = 0;
                let event = ViolationEvent::new(
                    ViolationCategory::MultipleFaces,
                    json!({ "count": n }),
                );
                if violations.send(event).is_err() {
                    return;
                }
            }
        }
    }
}

async fn sample(
    feed: &dyn MediaFeed,
    detector: &dyn FaceDetector,
) -> Result<u32, crate::proctor::capabilities::CapabilityError> {
    let frame = feed.video_frame().await?;
    detector.detect_faces(&frame).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proctor::testutil::{FakeFeed, FakeNotices, ScriptedDetector};
    use std::sync::atomic::Ordering;
    use tokio::time::timeout;

    fn setup(
        detector: Arc<ScriptedDetector>,
    ) -> (
        Arc<FakeNotices>,
        MonitorHandle,
        mpsc::UnboundedReceiver<ViolationEvent>,
    ) {
        let notices = Arc::new(FakeNotices::default());
        let (tx, rx) = mpsc::unbounded_channel();
        let monitor = spawn_face_monitor(
            Arc::new(FakeFeed::default()),
            detector,
            notices.clone(),
            &SecurityPolicy::default(),
            tx,
        );
        (notices, monitor, rx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_sustained_absence_fires_after_dwell() {
        let detector = ScriptedDetector::new(&[0, 0, 0], 1);
        let (_notices, _monitor, mut rx) = setup(detector);

        let event = timeout(Duration::from_secs(10), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.category, ViolationCategory::NoFace);
        assert_eq!(event.detail["dwell_ms"], 3_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reappearing_face_resets_the_dwell() {
        // Never three zero samples in a row.
        let detector = ScriptedDetector::new(&[0, 0, 1, 0, 0], 1);
        let (_notices, _monitor, mut rx) = setup(detector);

        assert!(timeout(Duration::from_secs(10), rx.recv()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_multiple_faces_is_immediate() {
        let detector = ScriptedDetector::new(&[2], 1);
        let (notices, _monitor, mut rx) = setup(detector);

        let event = timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.category, ViolationCategory::MultipleFaces);
        assert_eq!(event.detail["count"], 2);
        assert_eq!(notices.face_counts.lock().unwrap()[0], 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_detector_failure_degrades_without_violations() {
        let detector = ScriptedDetector::new(&[], 0);
        detector.fail.store(true, Ordering::SeqCst);
        let (_notices, _monitor, mut rx) = setup(detector.clone());

        // Degraded sampling must not manufacture absence violations.
        assert!(timeout(Duration::from_secs(10), rx.recv()).await.is_err());

        // Once the detector recovers, the zero-face default counts again.
        detector.fail.store(false, Ordering::SeqCst);
        let event = timeout(Duration::from_secs(10), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.category, ViolationCategory::NoFace);
    }
}
