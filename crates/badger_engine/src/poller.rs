use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use badger_core::{
    update, AttemptOutcome, FailureKind, FetchFailure, FetchState, JobHandle, JobId, JobOutcome,
    PollEffect, PollError, PollJob, PollMsg, DEFAULT_RETRY_BUDGET,
};
use badger_logging::{badger_debug, badger_info, badger_trace, badger_warn};
use futures_util::future::{BoxFuture, FutureExt};
use futures_util::stream::{FuturesUnordered, StreamExt};
use tokio::sync::{oneshot, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::api::{JobReady, JobStarted, JobStatus, JobStatusBody};
use crate::{DescriptorError, FetchDescriptor, FetchPrimitive, Settled, Transport};

/// Where a server-tracked job is started and asked about.
pub trait JobEndpoints: Send + Sync + 'static {
    fn start(&self) -> Result<FetchDescriptor, DescriptorError>;
    fn status(&self, handle: &JobHandle) -> Result<FetchDescriptor, DescriptorError>;
}

#[derive(Debug, Clone)]
pub struct PollerSettings {
    pub interval: Duration,
    pub retry_budget: u32,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1000),
            retry_budget: DEFAULT_RETRY_BUDGET,
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// State shared by a job's task and whoever may tear it down.
///
/// Every transition happens under `job`'s lock, so a teardown either lands before
/// a concurrent transition or turns it into a no-op.
struct JobControl {
    job: Mutex<PollJob>,
    job_tx: watch::Sender<PollJob>,
    outcome_tx: Mutex<Option<oneshot::Sender<JobOutcome>>>,
    cancel: CancellationToken,
}

impl JobControl {
    fn new(job: PollJob, outcome_tx: oneshot::Sender<JobOutcome>) -> Self {
        let (job_tx, _) = watch::channel(job.clone());
        Self {
            job: Mutex::new(job),
            job_tx,
            outcome_tx: Mutex::new(Some(outcome_tx)),
            cancel: CancellationToken::new(),
        }
    }

    /// Applies `msg`, delivers any outcome and returns the remaining effects.
    fn apply(&self, msg: PollMsg) -> Vec<PollEffect> {
        let mut job = lock(&self.job);
        let (next, effects) = update(job.clone(), msg);
        if next != *job {
            *job = next;
            self.job_tx.send_replace(job.clone());
        }

        let mut remaining = Vec::with_capacity(effects.len());
        for effect in effects {
            match effect {
                PollEffect::Deliver(outcome) => self.deliver(job.job_id(), outcome),
                other => remaining.push(other),
            }
        }
        remaining
    }

    fn deliver(&self, job_id: JobId, outcome: JobOutcome) {
        match &outcome {
            Ok(url) => badger_info!("Job {} ready: {}", job_id, url),
            Err(err) => badger_warn!("Job {} ended: {}", job_id, err),
        }
        if let Some(tx) = lock(&self.outcome_tx).take() {
            let _ = tx.send(outcome);
        }
    }

    fn teardown(&self) {
        let effects = self.apply(PollMsg::Teardown);
        if !effects.is_empty() {
            badger_debug!("Job {} torn down", lock(&self.job).job_id());
        }
        // Closes the outcome channel, so a waiting ticket sees `Cancelled`.
        lock(&self.outcome_tx).take();
        self.cancel.cancel();
    }

    fn snapshot(&self) -> PollJob {
        lock(&self.job).clone()
    }
}

/// Handle to one triggered job.
pub struct JobTicket {
    control: Arc<JobControl>,
    job_rx: watch::Receiver<PollJob>,
    outcome_rx: oneshot::Receiver<JobOutcome>,
}

impl JobTicket {
    pub fn job_id(&self) -> JobId {
        self.control.snapshot().job_id()
    }

    pub fn snapshot(&self) -> PollJob {
        self.control.snapshot()
    }

    pub fn watch(&self) -> watch::Receiver<PollJob> {
        self.job_rx.clone()
    }

    /// A handle that can stop this job from elsewhere, e.g. while awaiting `outcome`.
    pub fn canceller(&self) -> JobCanceller {
        JobCanceller {
            control: self.control.clone(),
        }
    }

    pub fn cancel(&self) {
        self.control.teardown();
    }

    /// Waits for the job's single outcome. A torn-down job yields `PollError::Cancelled`.
    pub async fn outcome(self) -> JobOutcome {
        self.outcome_rx.await.unwrap_or(Err(PollError::Cancelled))
    }
}

#[derive(Clone)]
pub struct JobCanceller {
    control: Arc<JobControl>,
}

impl JobCanceller {
    pub fn cancel(&self) {
        self.control.teardown();
    }
}

/// Triggers server-side jobs and polls them to completion, one at a time.
pub struct JobPoller<E> {
    transport: Arc<dyn Transport>,
    endpoints: Arc<E>,
    settings: PollerSettings,
    next_job_id: AtomicU64,
    active: Mutex<Option<Arc<JobControl>>>,
}

impl<E: JobEndpoints> JobPoller<E> {
    pub fn new(transport: Arc<dyn Transport>, endpoints: E, settings: PollerSettings) -> Self {
        Self {
            transport,
            endpoints: Arc::new(endpoints),
            settings,
            next_job_id: AtomicU64::new(0),
            active: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> &PollerSettings {
        &self.settings
    }

    /// Starts a fresh job, stopping the previous one first.
    ///
    /// Must be called from within a tokio runtime.
    pub fn trigger(&self) -> JobTicket {
        let mut active = lock(&self.active);
        if let Some(previous) = active.take() {
            badger_debug!("Stopping job {} before a new trigger", previous.snapshot().job_id());
            previous.teardown();
        }

        let job_id = self.next_job_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (outcome_tx, outcome_rx) = oneshot::channel();
        let control = Arc::new(JobControl::new(
            PollJob::new(job_id, self.settings.retry_budget),
            outcome_tx,
        ));
        let job_rx = control.job_tx.subscribe();
        *active = Some(control.clone());
        drop(active);

        tokio::spawn(run_job(
            self.transport.clone(),
            self.endpoints.clone(),
            self.settings.clone(),
            control.clone(),
        ));

        JobTicket {
            control,
            job_rx,
            outcome_rx,
        }
    }

    /// Stops the active job, if any. Safe to call repeatedly.
    pub fn teardown(&self) {
        if let Some(active) = lock(&self.active).take() {
            active.teardown();
        }
    }
}

impl<E> Drop for JobPoller<E> {
    fn drop(&mut self) {
        if let Some(active) = lock(&self.active).take() {
            active.teardown();
        }
    }
}

async fn run_job<E: JobEndpoints>(
    transport: Arc<dyn Transport>,
    endpoints: Arc<E>,
    settings: PollerSettings,
    control: Arc<JobControl>,
) {
    control.apply(PollMsg::TriggerSent);

    let starter = FetchPrimitive::<Option<JobStarted>>::new(transport.clone(), None);
    let descriptor = match endpoints.start() {
        Ok(descriptor) => descriptor,
        Err(err) => {
            let failure = FetchFailure::new(FailureKind::InvalidTarget, err.to_string());
            control.apply(PollMsg::TriggerFailed { failure });
            return;
        }
    };
    let ticket = starter.issue(descriptor);
    let settled = tokio::select! {
        biased;
        _ = control.cancel.cancelled() => return,
        settled = ticket.settled() => settled,
    };

    let msg = match settled {
        Settled::Observed(FetchState::Success {
            data: Some(JobStarted { file_name }),
        }) => PollMsg::HandleReceived {
            handle: JobHandle::new(file_name),
        },
        Settled::Observed(FetchState::Success { data: None }) => PollMsg::TriggerFailed {
            failure: FetchFailure::new(FailureKind::Decode, "start response carried no file name"),
        },
        Settled::Observed(FetchState::Error { failure, .. }) => PollMsg::TriggerFailed { failure },
        Settled::Observed(_) | Settled::Superseded => return,
    };

    let effects = control.apply(msg);
    let handle = effects.into_iter().find_map(|effect| match effect {
        PollEffect::StartTicker { handle } => Some(handle),
        _ => None,
    });
    if let Some(handle) = handle {
        badger_info!("Polling job {} as {}", control.snapshot().job_id(), handle);
        poll_until_settled(transport, endpoints, settings, control).await;
    }
}

async fn poll_until_settled<E: JobEndpoints>(
    transport: Arc<dyn Transport>,
    endpoints: Arc<E>,
    settings: PollerSettings,
    control: Arc<JobControl>,
) {
    let checker = FetchPrimitive::<Option<JobReady>>::new(transport, None);
    // `interval_at` panics on a zero period.
    let period = settings.interval.max(Duration::from_millis(1));
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut in_flight: FuturesUnordered<BoxFuture<'static, (u32, AttemptOutcome)>> =
        FuturesUnordered::new();

    loop {
        let effects = tokio::select! {
            biased;
            _ = control.cancel.cancelled() => break,
            Some((attempt, outcome)) = in_flight.next(), if !in_flight.is_empty() => {
                if outcome.is_definitive() {
                    badger_debug!("Attempt {} settled: {:?}", attempt, outcome);
                } else {
                    badger_trace!("Attempt {} settled: {:?}", attempt, outcome);
                }
                control.apply(PollMsg::AttemptSettled { attempt, outcome })
            }
            _ = ticker.tick() => control.apply(PollMsg::Tick),
        };

        let mut stop = false;
        for effect in effects {
            match effect {
                PollEffect::IssueStatusCheck { handle, attempt } => {
                    badger_trace!("Checking {} attempt {}", handle, attempt);
                    let request = endpoints.status(&handle).map(|d| checker.issue(d));
                    in_flight.push(
                        async move {
                            let outcome = match request {
                                Ok(ticket) => classify(ticket.settled().await),
                                Err(err) => AttemptOutcome::Transport(FetchFailure::new(
                                    FailureKind::InvalidTarget,
                                    err.to_string(),
                                )),
                            };
                            (attempt, outcome)
                        }
                        .boxed(),
                    );
                }
                PollEffect::StopTicker => stop = true,
                PollEffect::StartTicker { .. } | PollEffect::Deliver(_) => {}
            }
        }
        if stop {
            break;
        }
    }

    checker.teardown();
}

/// Maps one status check onto the poller's vocabulary.
pub(crate) fn classify(settled: Settled<Option<JobReady>>) -> AttemptOutcome {
    match settled {
        Settled::Observed(FetchState::Success {
            data: Some(JobReady { url }),
        }) => AttemptOutcome::Ready { url },
        Settled::Observed(FetchState::Success { data: None }) => AttemptOutcome::Transport(
            FetchFailure::new(FailureKind::Decode, "status response carried no url"),
        ),
        Settled::Observed(FetchState::Error { failure, .. }) => classify_failure(failure),
        Settled::Observed(_) | Settled::Superseded => AttemptOutcome::Superseded,
    }
}

fn classify_failure(failure: FetchFailure) -> AttemptOutcome {
    if failure.status().is_none() {
        return AttemptOutcome::Transport(failure);
    }
    let body = failure
        .body
        .as_deref()
        .and_then(|body| serde_json::from_str::<JobStatusBody>(body).ok());
    match body {
        Some(JobStatusBody {
            status: JobStatus::Failed,
            message,
        }) => AttemptOutcome::Failed {
            message: message.unwrap_or_else(|| "export failed".to_string()),
        },
        Some(JobStatusBody {
            status: JobStatus::Pending,
            ..
        }) => AttemptOutcome::Pending,
        _ => AttemptOutcome::Transport(failure),
    }
}
