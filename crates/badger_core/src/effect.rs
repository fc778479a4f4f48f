use crate::{FetchFailure, JobHandle};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollEffect {
    StartTicker { handle: JobHandle },
    IssueStatusCheck { handle: JobHandle, attempt: u32 },
    StopTicker,
    Deliver(JobOutcome),
}

/// Final result of a job: the download location, or why there is none.
pub type JobOutcome = Result<String, PollError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PollError {
    #[error("unable to start job: {0}")]
    Trigger(FetchFailure),
    #[error("job failed: {message}")]
    JobFailed { message: String },
    #[error("job did not finish after {attempts} attempts, please try again")]
    Exhausted { attempts: u32 },
    #[error("job polling was cancelled")]
    Cancelled,
}
