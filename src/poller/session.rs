use crate::poller::snapshot::StatusSnapshot;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

/// Which step of the workflow failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    Trigger,
    Query,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PollFailure {
    pub stage: FailureStage,
    pub message: String,
}

impl PollFailure {
    pub fn trigger(error: impl fmt::Display) -> Self {
        Self {
            stage: FailureStage::Trigger,
            message: error.to_string(),
        }
    }

    pub fn query(error: impl fmt::Display) -> Self {
        Self {
            stage: FailureStage::Query,
            message: error.to_string(),
        }
    }
}

impl fmt::Display for PollFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.stage {
            FailureStage::Trigger => write!(f, "trigger failed: {}", self.message),
            FailureStage::Query => write!(f, "status query failed: {}", self.message),
        }
    }
}

/// Session lifecycle.
///
/// `Idle -> Triggering -> Polling -> {Converged | Exhausted | Failed | Cancelled}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "lowercase")]
pub enum PollPhase {
    Idle,
    Triggering,
    Polling,
    Converged,
    /// Attempt budget ran out without convergence. Callers treat this as a
    /// soft success.
    Exhausted,
    Failed(PollFailure),
    Cancelled,
}

impl PollPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PollPhase::Converged | PollPhase::Exhausted | PollPhase::Failed(_) | PollPhase::Cancelled
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            PollPhase::Idle => "idle",
            PollPhase::Triggering => "triggering",
            PollPhase::Polling => "polling",
            PollPhase::Converged => "converged",
            PollPhase::Exhausted => "exhausted",
            PollPhase::Failed(_) => "failed",
            PollPhase::Cancelled => "cancelled",
        }
    }
}

/// Observable state of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionState {
    pub phase: PollPhase,
    /// Number of status queries issued so far
    pub attempts: u32,
    pub last_snapshot: Option<StatusSnapshot>,
}

impl SessionState {
    fn idle() -> Self {
        Self {
            phase: PollPhase::Idle,
            attempts: 0,
            last_snapshot: None,
        }
    }
}

/// Terminal result handed back by [`PollSession::wait`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOutcome {
    pub phase: PollPhase,
    pub attempts: u32,
    pub last_snapshot: Option<StatusSnapshot>,
}

impl PollOutcome {
    /// Converged or Exhausted
    pub fn is_success(&self) -> bool {
        matches!(self.phase, PollPhase::Converged | PollPhase::Exhausted)
    }

    pub fn failure(&self) -> Option<&PollFailure> {
        match &self.phase {
            PollPhase::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}

impl From<SessionState> for PollOutcome {
    fn from(state: SessionState) -> Self {
        Self {
            phase: state.phase,
            attempts: state.attempts,
            last_snapshot: state.last_snapshot,
        }
    }
}

/// State shared between the session handle and its driving task.
///
/// All writes go through the watch sender's lock, and none of them may move
/// a session out of a terminal phase.
#[derive(Debug)]
pub(crate) struct SessionShared {
    pub(crate) id: Uuid,
    pub(crate) cancel: CancellationToken,
    state: watch::Sender<SessionState>,
}

impl SessionShared {
    pub(crate) fn new() -> Arc<Self> {
        let (state, _) = watch::channel(SessionState::idle());
        Arc::new(Self {
            id: Uuid::new_v4(),
            cancel: CancellationToken::new(),
            state,
        })
    }

    pub(crate) fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Apply `f` unless the session is already terminal. Returns whether the
    /// update was applied.
    pub(crate) fn update<F>(&self, f: F) -> bool
    where
        F: FnOnce(&mut SessionState),
    {
        self.state.send_if_modified(|state| {
            if state.phase.is_terminal() {
                return false;
            }
            f(state);
            true
        })
    }

    pub(crate) fn cancel(&self) -> bool {
        let applied = self.state.send_if_modified(|state| match state.phase {
            PollPhase::Triggering | PollPhase::Polling => {
                state.phase = PollPhase::Cancelled;
                true
            }
            _ => false,
        });
        self.cancel.cancel();
        applied
    }

    fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }
}

/// Handle to a running convergence operation.
///
/// Dropping the handle does not stop the session; call [`PollSession::cancel`].
#[derive(Debug)]
pub struct PollSession {
    shared: Arc<SessionShared>,
}

impl PollSession {
    pub(crate) fn new(shared: Arc<SessionShared>) -> Self {
        Self { shared }
    }

    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    /// Current state, cloned out of the session
    pub fn state(&self) -> SessionState {
        self.shared.snapshot()
    }

    pub fn phase(&self) -> PollPhase {
        self.shared.state.borrow().phase.clone()
    }

    pub fn attempts(&self) -> u32 {
        self.shared.state.borrow().attempts
    }

    pub fn last_snapshot(&self) -> Option<StatusSnapshot> {
        self.shared.state.borrow().last_snapshot.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.shared.state.borrow().phase.is_terminal()
    }

    /// Receiver that observes every state change
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.shared.subscribe()
    }

    /// Stop the session. Idempotent, and a no-op once the session has
    /// reached a terminal phase. Returns true if this call cancelled it.
    pub fn cancel(&self) -> bool {
        let cancelled = self.shared.cancel();
        if cancelled {
            info!(session_id = %self.shared.id, "Poll session cancelled");
        }
        cancelled
    }

    /// Wait for the session to reach a terminal phase.
    pub async fn wait(&self) -> PollOutcome {
        let mut rx = self.shared.subscribe();
        // The sender lives in `self.shared`, so the channel cannot close here.
        let outcome = match rx.wait_for(|state| state.phase.is_terminal()).await {
            Ok(state) => state.clone().into(),
            Err(_) => self.shared.snapshot().into(),
        };
        outcome
    }
}
