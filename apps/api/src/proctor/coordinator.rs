//! SecurityCoordinator — per-category counters and the warn/terminate
//! decision.
//!
//! `report_violation` is synchronous and takes `&mut self`: the controller
//! loop is the only caller, so the check-then-act on a counter can never
//! interleave with another event. That single-consumer discipline — not a
//! lock — is what keeps termination exactly-once.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::proctor::violation::{
    Decision, SecurityPolicy, TerminationReason, ViolationCategory, ViolationEvent,
};

pub struct SecurityCoordinator {
    policy: SecurityPolicy,
    counts: HashMap<ViolationCategory, u32>,
    active: bool,
}

impl SecurityCoordinator {
    pub fn new(policy: SecurityPolicy) -> Self {
        Self {
            policy,
            counts: HashMap::new(),
            active: false,
        }
    }

    /// Called once on entry to the active exam.
    pub fn activate(&mut self) {
        self.active = true;
    }

    /// Terminal for this coordinator: every later event is `Ignored`.
    pub fn deactivate(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn warning_count(&self, category: ViolationCategory) -> u32 {
        self.counts.get(&category).copied().unwrap_or(0)
    }

    /// Counts one violation and decides warn vs terminate.
    ///
    /// Invariants:
    /// - events are discarded (no counter change) unless active;
    /// - a counter never exceeds its category maximum;
    /// - crossing the maximum deactivates the coordinator in the same call,
    ///   so a second category crossing its own threshold afterwards is a
    ///   no-op.
    pub fn report_violation(&mut self, event: &ViolationEvent) -> Decision {
        if !self.active {
            debug!(
                category = event.category.as_str(),
                "violation ignored: session not active"
            );
            return Decision::Ignored;
        }

        let max = self.policy.max_warnings(event.category);
        let count = self.counts.entry(event.category).or_insert(0);
        *count = (*count + 1).min(max);

        if *count >= max {
            self.active = false;
            info!(
                category = event.category.as_str(),
                warnings = *count,
                "violation limit reached, terminating"
            );
            Decision::Terminated {
                reason: TerminationReason::Violation(event.category),
            }
        } else {
            let remaining = max - *count;
            info!(
                category = event.category.as_str(),
                warnings = *count,
                remaining,
                "violation warned"
            );
            Decision::Warned { remaining }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(category: ViolationCategory) -> ViolationEvent {
        ViolationEvent::new(category, json!({}))
    }

    fn active_coordinator() -> SecurityCoordinator {
        let mut c = SecurityCoordinator::new(SecurityPolicy::default());
        c.activate();
        c
    }

    #[test]
    fn test_every_category_terminates_at_max_warnings() {
        for category in ViolationCategory::ALL {
            let mut c = active_coordinator();
            assert_eq!(
                c.report_violation(&event(category)),
                Decision::Warned { remaining: 1 },
                "{category:?} should warn on first event"
            );
            assert!(c.is_active(), "{category:?} still active after 1 of 2");
            assert_eq!(
                c.report_violation(&event(category)),
                Decision::Terminated {
                    reason: TerminationReason::Violation(category)
                },
            );
            assert!(!c.is_active());
        }
    }

    #[test]
    fn test_ignored_when_not_active_changes_no_counter() {
        let mut c = SecurityCoordinator::new(SecurityPolicy::default());
        assert_eq!(
            c.report_violation(&event(ViolationCategory::TabSwitch)),
            Decision::Ignored
        );
        assert_eq!(c.warning_count(ViolationCategory::TabSwitch), 0);
    }

    #[test]
    fn test_termination_is_terminal_across_categories() {
        let mut c = active_coordinator();
        c.report_violation(&event(ViolationCategory::NoFace));
        c.report_violation(&event(ViolationCategory::NoFace));
        // NoFace terminated the session; AudioNoise events must be no-ops.
        assert_eq!(
            c.report_violation(&event(ViolationCategory::AudioNoise)),
            Decision::Ignored
        );
        assert_eq!(c.warning_count(ViolationCategory::AudioNoise), 0);
    }

    #[test]
    fn test_counter_never_exceeds_max() {
        let mut c = active_coordinator();
        c.report_violation(&event(ViolationCategory::TabSwitch));
        c.report_violation(&event(ViolationCategory::TabSwitch));
        // Re-activating to simulate a buggy double-report after termination.
        c.activate();
        c.report_violation(&event(ViolationCategory::TabSwitch));
        assert_eq!(c.warning_count(ViolationCategory::TabSwitch), 2);
    }

    #[test]
    fn test_categories_count_independently() {
        let mut c = active_coordinator();
        c.report_violation(&event(ViolationCategory::TabSwitch));
        c.report_violation(&event(ViolationCategory::AudioNoise));
        assert!(c.is_active(), "one warning each must not terminate");
        assert_eq!(c.warning_count(ViolationCategory::TabSwitch), 1);
        assert_eq!(c.warning_count(ViolationCategory::AudioNoise), 1);
    }

    #[test]
    fn test_override_raises_threshold_for_one_category() {
        let mut policy = SecurityPolicy::default();
        policy
            .max_warnings_overrides
            .insert(ViolationCategory::Lockdown, 4);
        let mut c = SecurityCoordinator::new(policy);
        c.activate();
        for remaining in [3, 2, 1] {
            assert_eq!(
                c.report_violation(&event(ViolationCategory::Lockdown)),
                Decision::Warned { remaining }
            );
        }
        assert!(matches!(
            c.report_violation(&event(ViolationCategory::Lockdown)),
            Decision::Terminated { .. }
        ));
    }
}
