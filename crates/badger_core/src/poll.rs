use std::fmt;

pub type JobId = u64;

/// Number of status checks a job may spend before it is reported as exhausted.
pub const DEFAULT_RETRY_BUDGET: u32 = 50;

/// Server-issued identifier of a long-running job (the generated file name for exports).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobHandle(String);

impl JobHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PollPhase {
    #[default]
    Idle,
    Requested,
    Polling,
    Ready {
        url: String,
    },
    Failed {
        message: String,
    },
    Exhausted,
    Cancelled,
}

impl PollPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PollPhase::Ready { .. }
                | PollPhase::Failed { .. }
                | PollPhase::Exhausted
                | PollPhase::Cancelled
        )
    }
}

/// One export/import job lifecycle. Terminal jobs are never mutated again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollJob {
    job_id: JobId,
    handle: Option<JobHandle>,
    budget: u32,
    retries_remaining: u32,
    attempts_issued: u32,
    phase: PollPhase,
}

impl PollJob {
    /// A zero budget is raised to one so every job performs at least one check.
    pub fn new(job_id: JobId, budget: u32) -> Self {
        let budget = budget.max(1);
        Self {
            job_id,
            handle: None,
            budget,
            retries_remaining: budget,
            attempts_issued: 0,
            phase: PollPhase::Idle,
        }
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    pub fn handle(&self) -> Option<&JobHandle> {
        self.handle.as_ref()
    }

    pub fn budget(&self) -> u32 {
        self.budget
    }

    pub fn retries_remaining(&self) -> u32 {
        self.retries_remaining
    }

    pub fn attempts_issued(&self) -> u32 {
        self.attempts_issued
    }

    /// Attempts whose outcome (observed or superseded) has been accounted for.
    pub fn attempts_settled(&self) -> u32 {
        self.budget - self.retries_remaining
    }

    pub fn phase(&self) -> &PollPhase {
        &self.phase
    }

    pub(crate) fn set_phase(&mut self, phase: PollPhase) {
        self.phase = phase;
    }

    pub(crate) fn set_handle(&mut self, handle: JobHandle) {
        self.handle = Some(handle);
    }

    /// Reserves the next attempt number, if the budget allows another one.
    pub(crate) fn reserve_attempt(&mut self) -> Option<u32> {
        if self.attempts_issued >= self.budget {
            return None;
        }
        self.attempts_issued += 1;
        Some(self.attempts_issued)
    }

    /// Accounts for one settled attempt. Returns `false` if `attempt` was never
    /// issued or every issued attempt is already accounted for.
    pub(crate) fn settle_attempt(&mut self, attempt: u32) -> bool {
        if attempt == 0 || attempt > self.attempts_issued {
            return false;
        }
        if self.attempts_settled() >= self.attempts_issued {
            return false;
        }
        self.retries_remaining -= 1;
        true
    }
}
