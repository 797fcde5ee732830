//! Audio-level monitor — samples microphone loudness twice per second and
//! accumulates suspicious time in a leaky bucket.
//!
//! A sample strictly above the loudness threshold adds one interval to the
//! bucket; a quiet sample drains one interval, floored at zero. Crossing
//! the bucket limit fires one `AudioNoise` violation and empties the
//! bucket. Brief spikes (a cough, a dropped pen) drain away; sustained
//! conversation does not.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::proctor::capabilities::{LoudnessSampler, MediaFeed, NoticeSink};
use crate::proctor::violation::{SecurityPolicy, ViolationCategory, ViolationEvent};
use crate::proctor::MonitorHandle;

pub fn spawn_audio_monitor(
    feed: Arc<dyn MediaFeed>,
    sampler: Arc<dyn LoudnessSampler>,
    notices: Arc<dyn NoticeSink>,
    policy: &SecurityPolicy,
    violations: mpsc::UnboundedSender<ViolationEvent>,
) -> MonitorHandle {
    let interval_ms = policy.audio_sample_interval_ms;
    let threshold = policy.audio_loudness_threshold;
    let bucket_limit_ms = policy.audio_bucket_limit_ms;
    MonitorHandle::new(tokio::spawn(run(
        feed,
        sampler,
        notices,
        interval_ms,
        threshold,
        bucket_limit_ms,
        violations,
    )))
}

#[allow(clippy::too_many_arguments)]
async fn run(
    feed: Arc<dyn MediaFeed>,
    sampler: Arc<dyn LoudnessSampler>,
    notices: Arc<dyn NoticeSink>,
    interval_ms: u64,
    threshold: u8,
    bucket_limit_ms: u64,
    violations: mpsc::UnboundedSender<ViolationEvent>,
) {
    let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut suspicious_ms: u64 = 0;
    let mut degraded = false;

    loop {
        ticker.tick().await;

        let level = match sample(feed.as_ref(), sampler.as_ref()).await {
            Ok(level) => level,
            Err(e) => {
                if !degraded {
                    warn!(error = %e, "audio sampling degraded");
                    degraded = true;
                }
                continue;
            }
        };
        if degraded {
            info!("audio sampling recovered");
            degraded = false;
        }

        notices.audio_level(level);

        if level > threshold {
            suspicious_ms += interval_ms;
        } else {
            suspicious_ms = suspicious_ms.saturating_sub(interval_ms);
        }

        if suspicious_ms >= bucket_limit_ms {
            let event = ViolationEvent::new(
                ViolationCategory::AudioNoise,
                json!({ "level": level, "suspicious_ms": suspicious_ms }),
            );
            suspicious_ms = 0;
            if violations.send(event).is_err() {
                return;
            }
        }
    }
}

async fn sample(
    feed: &dyn MediaFeed,
    sampler: &dyn LoudnessSampler,
) -> Result<u8, crate::proctor::capabilities::CapabilityError> {
    let buffer = feed.audio_buffer().await?;
    sampler.sample_loudness(&buffer).await
}
