//! Integration status state machine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Mutex, PoisonError};

/// Operating state of an integration client.
///
/// Lifecycle: `uninitialized -> starting -> {ready | in-memory | disabled | error} -> stopped`.
/// A client that starts degraded stays degraded until it is started again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IntegrationStatus {
    /// `startup()` has not run yet.
    Uninitialized,
    /// `startup()` is probing the backend.
    Starting,
    /// Connected to the real backend.
    Ready,
    /// Serving from the local substitute.
    InMemory,
    /// Turned off by configuration or build.
    Disabled,
    /// The backend failed; calls fall back locally.
    Error,
    /// `shutdown()` released the backend.
    Stopped,
}

impl IntegrationStatus {
    /// Returns the wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Starting => "starting",
            Self::Ready => "ready",
            Self::InMemory => "in-memory",
            Self::Disabled => "disabled",
            Self::Error => "error",
            Self::Stopped => "stopped",
        }
    }

    /// Whether `startup()` has finished, successfully or not.
    #[must_use]
    pub const fn is_settled(self) -> bool {
        !matches!(self, Self::Uninitialized | Self::Starting)
    }

    /// Whether the client runs without its real backend.
    #[must_use]
    pub const fn is_degraded(self) -> bool {
        matches!(self, Self::InMemory | Self::Disabled | Self::Error)
    }
}

impl fmt::Display for IntegrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A status plus the human-readable reason behind it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// Current status.
    pub status: IntegrationStatus,
    /// Why the client is in this status, when it is not self-explanatory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl StatusSnapshot {
    /// Creates a snapshot.
    #[must_use]
    pub const fn new(status: IntegrationStatus, reason: Option<String>) -> Self {
        Self { status, reason }
    }
}

/// Shared status cell used by every integration client.
///
/// Writes happen during `startup()`, `shutdown()` and failed calls; reads come
/// from the status reporter at any time.
#[derive(Debug)]
pub struct StatusTracker {
    integration: &'static str,
    state: Mutex<StatusSnapshot>,
}

impl StatusTracker {
    /// Creates a tracker in the given initial status.
    #[must_use]
    pub const fn new(integration: &'static str, initial: IntegrationStatus) -> Self {
        Self {
            integration,
            state: Mutex::new(StatusSnapshot::new(initial, None)),
        }
    }

    /// Returns a copy of the current status and reason.
    #[must_use]
    pub fn snapshot(&self) -> StatusSnapshot {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the current status.
    #[must_use]
    pub fn status(&self) -> IntegrationStatus {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .status
    }

    /// Sets status and reason unconditionally.
    pub fn set(&self, status: IntegrationStatus, reason: Option<String>) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = state.status;
        state.status = status;
        state.reason.clone_from(&reason);
        drop(state);

        if previous != status {
            self.record_transition(previous, status, reason.as_deref());
        }
    }

    /// Records a failed call against a started client.
    ///
    /// Moves to `error` with the given reason. A stopped or never-started client
    /// keeps its status, since no backend call can legitimately happen there.
    pub fn mark_failed(&self, reason: impl Into<String>) {
        let reason = reason.into();
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if matches!(
            state.status,
            IntegrationStatus::Stopped | IntegrationStatus::Uninitialized
        ) {
            return;
        }
        let previous = state.status;
        state.status = IntegrationStatus::Error;
        state.reason = Some(reason.clone());
        drop(state);

        metrics::counter!("integration_call_failures_total", "integration" => self.integration)
            .increment(1);
        if previous != IntegrationStatus::Error {
            self.record_transition(previous, IntegrationStatus::Error, Some(&reason));
        }
    }

    /// Moves to `stopped` if the current status is one of `from`.
    ///
    /// Returns whether the transition happened.
    pub fn stop_if(&self, from: &[IntegrationStatus]) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if !from.contains(&state.status) {
            return false;
        }
        let previous = state.status;
        state.status = IntegrationStatus::Stopped;
        drop(state);

        self.record_transition(previous, IntegrationStatus::Stopped, None);
        true
    }

    fn record_transition(
        &self,
        previous: IntegrationStatus,
        status: IntegrationStatus,
        reason: Option<&str>,
    ) {
        metrics::counter!(
            "integration_status_transitions_total",
            "integration" => self.integration,
            "status" => status.as_str()
        )
        .increment(1);

        if status.is_degraded() {
            tracing::warn!(
                integration = self.integration,
                from = %previous,
                to = %status,
                reason = reason.unwrap_or("-"),
                "Integration degraded"
            );
        } else {
            tracing::info!(
                integration = self.integration,
                from = %previous,
                to = %status,
                "Integration status changed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_names() {
        let json = serde_json::to_string(&IntegrationStatus::InMemory).unwrap();
        assert_eq!(json, "\"in-memory\"");
        assert_eq!(IntegrationStatus::Uninitialized.to_string(), "uninitialized");
    }

    #[test]
    fn test_settled_and_degraded() {
        assert!(!IntegrationStatus::Uninitialized.is_settled());
        assert!(!IntegrationStatus::Starting.is_settled());
        assert!(IntegrationStatus::Ready.is_settled());
        assert!(IntegrationStatus::InMemory.is_degraded());
        assert!(!IntegrationStatus::Ready.is_degraded());
        assert!(!IntegrationStatus::Stopped.is_degraded());
    }

    #[test]
    fn test_set_replaces_reason() {
        let tracker = StatusTracker::new("cache", IntegrationStatus::Uninitialized);
        tracker.set(IntegrationStatus::InMemory, Some("ping failed".into()));
        assert_eq!(
            tracker.snapshot(),
            StatusSnapshot::new(IntegrationStatus::InMemory, Some("ping failed".into()))
        );

        tracker.set(IntegrationStatus::Ready, None);
        assert_eq!(tracker.snapshot().reason, None);
    }

    #[test]
    fn test_mark_failed_from_ready() {
        let tracker = StatusTracker::new("rpc", IntegrationStatus::Ready);
        tracker.mark_failed("deadline exceeded");
        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.status, IntegrationStatus::Error);
        assert_eq!(snapshot.reason.as_deref(), Some("deadline exceeded"));
    }

    #[test]
    fn test_mark_failed_ignored_when_stopped() {
        let tracker = StatusTracker::new("rpc", IntegrationStatus::Stopped);
        tracker.mark_failed("late failure");
        assert_eq!(tracker.status(), IntegrationStatus::Stopped);
    }

    #[test]
    fn test_stop_if() {
        let tracker = StatusTracker::new("events", IntegrationStatus::Disabled);
        assert!(!tracker.stop_if(&[IntegrationStatus::Ready]));
        assert_eq!(tracker.status(), IntegrationStatus::Disabled);

        tracker.set(IntegrationStatus::Ready, None);
        assert!(tracker.stop_if(&[IntegrationStatus::Ready]));
        assert_eq!(tracker.status(), IntegrationStatus::Stopped);
        // Idempotent.
        assert!(!tracker.stop_if(&[IntegrationStatus::Ready]));
    }
}
