pub mod engine;
pub mod session;
pub mod snapshot;

pub use engine::{cancel, ConvergencePoller, PollError, PollPolicy, StatusSource};
pub use session::{FailureStage, PollFailure, PollOutcome, PollPhase, PollSession, SessionState};
pub use snapshot::{ConvergenceRequest, StatusSnapshot};
