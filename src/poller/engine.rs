use crate::notify::{Notification, Notifier, TracingNotifier};
use crate::poller::session::{PollFailure, PollPhase, PollSession, SessionShared};
use crate::poller::snapshot::{ConvergenceRequest, StatusSnapshot};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum PollError {
    #[error("invalid poll policy: {0}")]
    InvalidPolicy(String),
}

/// The operation being driven to convergence: a one-shot trigger plus a
/// repeatable status query.
///
/// Both calls receive the session's cancellation token and should give up
/// promptly when it fires.
#[async_trait]
pub trait StatusSource: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn trigger(&self, cancel: &CancellationToken) -> Result<(), Self::Error>;

    async fn status(&self, cancel: &CancellationToken) -> Result<StatusSnapshot, Self::Error>;
}

/// Attempt budget and spacing between status queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    max_attempts: u32,
    interval: Duration,
}

impl PollPolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Result<Self, PollError> {
        if max_attempts == 0 {
            return Err(PollError::InvalidPolicy(
                "max_attempts must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            max_attempts,
            interval,
        })
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

/// Drives "trigger, then poll until converged" sessions.
#[derive(Clone)]
pub struct ConvergencePoller {
    policy: PollPolicy,
    notifier: Arc<dyn Notifier>,
}

impl ConvergencePoller {
    pub fn new(policy: PollPolicy) -> Self {
        Self {
            policy,
            notifier: Arc::new(TracingNotifier),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Start a session on the current tokio runtime.
    ///
    /// The session is already in `Triggering` when this returns.
    pub fn start<S>(&self, source: Arc<S>, request: ConvergenceRequest) -> PollSession
    where
        S: StatusSource + 'static,
    {
        let shared = SessionShared::new();
        shared.update(|state| state.phase = PollPhase::Triggering);

        info!(
            session_id = %shared.id,
            max_attempts = self.policy.max_attempts,
            interval = ?self.policy.interval,
            convergence = %request.description(),
            "Starting poll session"
        );

        let driver = SessionDriver {
            shared: shared.clone(),
            policy: self.policy,
            notifier: self.notifier.clone(),
            request,
        };
        tokio::spawn(driver.run(source));

        PollSession::new(shared)
    }
}

impl std::fmt::Debug for ConvergencePoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConvergencePoller")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// Stop a session; see [`PollSession::cancel`].
pub fn cancel(session: &PollSession) {
    session.cancel();
}

struct SessionDriver {
    shared: Arc<SessionShared>,
    policy: PollPolicy,
    notifier: Arc<dyn Notifier>,
    request: ConvergenceRequest,
}

impl SessionDriver {
    async fn run<S>(self, source: Arc<S>)
    where
        S: StatusSource + 'static,
    {
        let id = self.shared.id;

        let triggered = match self.until_cancelled(source.trigger(&self.shared.cancel)).await {
            Some(result) => result,
            None => return,
        };

        if let Err(e) = triggered {
            warn!(session_id = %id, error = %e, "Trigger failed, not polling");
            let failure = PollFailure::trigger(&e);
            if self.finish(PollPhase::Failed(failure.clone()), None) {
                self.notifier
                    .notify(Notification::failure("Failed to start operation", failure.message));
            }
            return;
        }

        if !self.shared.update(|state| state.phase = PollPhase::Polling) {
            return;
        }
        debug!(session_id = %id, "Trigger accepted, polling status");

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            if !self.shared.update(|state| state.attempts = attempt) {
                return;
            }

            let result = match self.until_cancelled(source.status(&self.shared.cancel)).await {
                Some(result) => result,
                None => return,
            };

            let snapshot = match result {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!(session_id = %id, attempt, error = %e, "Status query failed");
                    let failure = PollFailure::query(&e);
                    if self.finish(PollPhase::Failed(failure.clone()), None) {
                        self.notifier
                            .notify(Notification::failure("Failed to read status", failure.message));
                    }
                    return;
                }
            };

            if self.request.is_converged(&snapshot) {
                info!(session_id = %id, attempts = attempt, snapshot = %snapshot, "Converged");
                if self.finish(PollPhase::Converged, Some(snapshot.clone())) {
                    self.notifier.notify(Notification::success(
                        "Operation completed",
                        format!("converged after {} status checks: {}", attempt, snapshot),
                    ));
                }
                return;
            }

            if attempt >= self.policy.max_attempts {
                warn!(
                    session_id = %id,
                    attempts = attempt,
                    snapshot = %snapshot,
                    "Attempt budget exhausted without convergence"
                );
                if self.finish(PollPhase::Exhausted, Some(snapshot.clone())) {
                    self.notifier.notify(Notification::warning(
                        "Operation not confirmed",
                        format!(
                            "still pending after {} status checks: {}",
                            attempt, snapshot
                        ),
                    ));
                }
                return;
            }

            debug!(
                session_id = %id,
                attempt,
                max_attempts = self.policy.max_attempts,
                snapshot = %snapshot,
                "Not converged yet"
            );
            if !self.shared.update(|state| state.last_snapshot = Some(snapshot)) {
                return;
            }

            if self
                .until_cancelled(tokio::time::sleep(self.policy.interval))
                .await
                .is_none()
            {
                return;
            }
        }
    }

    /// Race `fut` against cancellation. `None` means the session was
    /// cancelled and whatever `fut` would have produced is discarded.
    async fn until_cancelled<F: Future>(&self, fut: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            _ = self.shared.cancel.cancelled() => None,
            output = fut => {
                if self.shared.cancel.is_cancelled() {
                    None
                } else {
                    Some(output)
                }
            }
        }
    }

    fn finish(&self, phase: PollPhase, snapshot: Option<StatusSnapshot>) -> bool {
        self.shared.update(|state| {
            state.phase = phase;
            if snapshot.is_some() {
                state.last_snapshot = snapshot;
            }
        })
    }
}
