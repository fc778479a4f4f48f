//! Badger core: pure fetch and job-polling state machines.
mod effect;
mod failure;
mod fetch_state;
mod msg;
mod poll;
mod update;

pub use effect::{JobOutcome, PollEffect, PollError};
pub use failure::{FailureKind, FetchFailure};
pub use fetch_state::{Epoch, FetchState, FetchTracker, Resolution};
pub use msg::{AttemptOutcome, PollMsg};
pub use poll::{JobHandle, JobId, PollJob, PollPhase, DEFAULT_RETRY_BUDGET};
pub use update::update;
