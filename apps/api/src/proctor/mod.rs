//! Exam-integrity supervisor — the client-resident core of Vigil.
//!
//! # Architecture
//! Five independent signal channels (tab focus, lockdown events, face
//! presence, microphone loudness, per-question deadlines) each run as a
//! spawned task that only *produces* [`violation::ViolationEvent`]s.
//! A single [`session::ExamSessionController`] loop consumes every event
//! and calls [`coordinator::SecurityCoordinator::report_violation`]
//! synchronously, so the check-then-act on warning counters can never
//! interleave and teardown fires exactly once.
//!
//! All ambient browser state (visibility, focus, fullscreen, camera,
//! microphone, user agent) is reached through the capability traits in
//! [`capabilities`], injected at construction. Nothing in this tree reads
//! globals, which is what makes the monitors unit-testable with fakes.
//!
//! This tree is compiled into the exam client shell; the API binary shares
//! only [`violation::SecurityPolicy`] (served via `/api/v1/security/policy`)
//! and the HTTP capability impls in [`remote`].
#![allow(dead_code)]

pub mod audio;
pub mod capabilities;
pub mod coordinator;
pub mod face;
pub mod gatekeeper;
pub mod remote;
pub mod session;
pub mod tab_focus;
pub mod timer;
pub mod violation;

#[cfg(test)]
pub(crate) mod testutil;

use tokio::task::JoinHandle;

/// Handle to a spawned monitor task. Aborting is the only way to stop a
/// monitor; they hold no state worth flushing.
pub struct MonitorHandle {
    handle: JoinHandle<()>,
}

impl MonitorHandle {
    pub(crate) fn new(handle: JoinHandle<()>) -> Self {
        Self { handle }
    }

    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
