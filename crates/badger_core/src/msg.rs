use crate::{FetchFailure, JobHandle};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollMsg {
    /// The start-job request went out.
    TriggerSent,
    /// The server accepted the job and named it.
    HandleReceived { handle: JobHandle },
    /// The start-job request failed; the job never polls.
    TriggerFailed { failure: FetchFailure },
    /// The polling interval fired.
    Tick,
    /// A status check finished or was superseded by a newer one.
    AttemptSettled {
        attempt: u32,
        outcome: AttemptOutcome,
    },
    /// Caller-initiated teardown.
    Teardown,
}

/// Classified result of one status check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Ready { url: String },
    Failed { message: String },
    Pending,
    Transport(FetchFailure),
    Superseded,
}

impl AttemptOutcome {
    pub fn is_definitive(&self) -> bool {
        matches!(self, AttemptOutcome::Ready { .. } | AttemptOutcome::Failed { .. })
    }
}
