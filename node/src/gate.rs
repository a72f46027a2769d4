//! Service gate: holds a dependent service back while synchronization runs.
//!
//! Anything that must only operate on a settled chain (request serving, an
//! RPC surface) registers its start/stop intent here. A start requested
//! while a sync is in flight is deferred, not dropped: the gate parks in
//! `PendingRestart` and releases the service once the sync settles, whether
//! it finished or failed.

use std::sync::Mutex;

/// Externally visible state of the gated service.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServiceState {
    Idle,
    Running,
    /// Stopped for an in-flight sync; restarts when the sync settles.
    PendingRestart,
}

/// Discrete events driving the gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServiceEvent {
    StartRequested,
    StopRequested,
    SyncStarted,
    SyncFinished,
    SyncFailed,
}

/// What the caller must do to the underlying service after a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateAction {
    None,
    Start,
    Stop,
}

struct GateInner {
    state: ServiceState,
    syncing: bool,
}

/// State machine gating a service on sync activity. Transitions happen
/// under one lock, so concurrent event delivery observes each transition
/// exactly once.
pub struct ServiceGate {
    inner: Mutex<GateInner>,
}

impl Default for ServiceGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceGate {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(GateInner {
                state: ServiceState::Idle,
                syncing: false,
            }),
        }
    }

    pub fn state(&self) -> ServiceState {
        let inner = self.inner.lock().expect("gate lock poisoned");
        inner.state
    }

    pub fn is_syncing(&self) -> bool {
        let inner = self.inner.lock().expect("gate lock poisoned");
        inner.syncing
    }

    /// Apply one event and return the action the caller must take.
    pub fn handle(&self, event: ServiceEvent) -> GateAction {
        let mut inner = self.inner.lock().expect("gate lock poisoned");
        let action = match event {
            ServiceEvent::StartRequested => match inner.state {
                ServiceState::Running | ServiceState::PendingRestart => GateAction::None,
                ServiceState::Idle if inner.syncing => {
                    inner.state = ServiceState::PendingRestart;
                    GateAction::None
                }
                ServiceState::Idle => {
                    inner.state = ServiceState::Running;
                    GateAction::Start
                }
            },
            ServiceEvent::StopRequested => {
                let was_running = inner.state == ServiceState::Running;
                inner.state = ServiceState::Idle;
                if was_running {
                    GateAction::Stop
                } else {
                    GateAction::None
                }
            }
            ServiceEvent::SyncStarted => {
                inner.syncing = true;
                if inner.state == ServiceState::Running {
                    inner.state = ServiceState::PendingRestart;
                    GateAction::Stop
                } else {
                    GateAction::None
                }
            }
            ServiceEvent::SyncFinished | ServiceEvent::SyncFailed => {
                inner.syncing = false;
                if inner.state == ServiceState::PendingRestart {
                    inner.state = ServiceState::Running;
                    GateAction::Start
                } else {
                    GateAction::None
                }
            }
        };
        if action != GateAction::None {
            tracing::debug!(?event, state = ?inner.state, ?action, "service gate transition");
        }
        action
    }
}
