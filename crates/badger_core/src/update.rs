use crate::{AttemptOutcome, PollEffect, PollError, PollJob, PollMsg, PollPhase};

/// Pure update function: applies a message to a job and returns any effects.
///
/// Terminal jobs ignore every message, so late ticks and stale responses can
/// neither mutate them nor deliver a second outcome.
pub fn update(mut job: PollJob, msg: PollMsg) -> (PollJob, Vec<PollEffect>) {
    if job.phase().is_terminal() {
        return (job, Vec::new());
    }

    let effects = match msg {
        PollMsg::TriggerSent => {
            if *job.phase() == PollPhase::Idle {
                job.set_phase(PollPhase::Requested);
            }
            Vec::new()
        }
        PollMsg::HandleReceived { handle } => {
            if *job.phase() != PollPhase::Requested {
                return (job, Vec::new());
            }
            job.set_handle(handle.clone());
            job.set_phase(PollPhase::Polling);
            vec![PollEffect::StartTicker { handle }]
        }
        PollMsg::TriggerFailed { failure } => {
            if *job.phase() != PollPhase::Requested {
                return (job, Vec::new());
            }
            job.set_phase(PollPhase::Failed {
                message: failure.to_string(),
            });
            vec![PollEffect::Deliver(Err(PollError::Trigger(failure)))]
        }
        PollMsg::Tick => {
            if *job.phase() != PollPhase::Polling {
                return (job, Vec::new());
            }
            let Some(handle) = job.handle().cloned() else {
                return (job, Vec::new());
            };
            match job.reserve_attempt() {
                Some(attempt) => vec![PollEffect::IssueStatusCheck { handle, attempt }],
                None => Vec::new(),
            }
        }
        PollMsg::AttemptSettled { attempt, outcome } => settle(&mut job, attempt, outcome),
        PollMsg::Teardown => {
            job.set_phase(PollPhase::Cancelled);
            vec![PollEffect::StopTicker]
        }
    };

    (job, effects)
}

fn settle(job: &mut PollJob, attempt: u32, outcome: AttemptOutcome) -> Vec<PollEffect> {
    if *job.phase() != PollPhase::Polling || !job.settle_attempt(attempt) {
        return Vec::new();
    }

    // A definitive answer wins even when it arrives on the last attempt.
    match outcome {
        AttemptOutcome::Ready { url } => {
            job.set_phase(PollPhase::Ready { url: url.clone() });
            vec![PollEffect::StopTicker, PollEffect::Deliver(Ok(url))]
        }
        AttemptOutcome::Failed { message } => {
            job.set_phase(PollPhase::Failed {
                message: message.clone(),
            });
            vec![
                PollEffect::StopTicker,
                PollEffect::Deliver(Err(PollError::JobFailed { message })),
            ]
        }
        AttemptOutcome::Pending | AttemptOutcome::Transport(_) | AttemptOutcome::Superseded => {
            if job.retries_remaining() > 0 {
                return Vec::new();
            }
            job.set_phase(PollPhase::Exhausted);
            vec![
                PollEffect::StopTicker,
                PollEffect::Deliver(Err(PollError::Exhausted {
                    attempts: job.attempts_settled(),
                })),
            ]
        }
    }
}
