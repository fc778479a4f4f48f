mod support;

use std::sync::Arc;
use std::time::Duration;

use badger_engine::api::{ExportJob, EXPORT_DOWNLOAD_PATH, EXPORT_PATH};
use badger_engine::{FailureKind, JobPoller, PollError, PollPhase, PollerSettings};
use pretty_assertions::assert_eq;
use support::{
    failed, init_logging, pending, ready, respond, started, unreachable, ScriptedTransport,
};

fn poller(transport: &Arc<ScriptedTransport>, retry_budget: u32) -> JobPoller<ExportJob> {
    let settings = PollerSettings {
        interval: Duration::from_millis(1000),
        retry_budget,
    };
    JobPoller::new(transport.clone(), ExportJob, settings)
}

fn export_transport() -> Arc<ScriptedTransport> {
    let transport = ScriptedTransport::new();
    transport.script(EXPORT_PATH, [started("subscribers-1.csv")]);
    transport
}

#[tokio::test(start_paused = true)]
async fn ready_after_three_pending_polls_delivers_once() {
    init_logging();
    let transport = export_transport();
    transport.script(
        EXPORT_DOWNLOAD_PATH,
        [pending(), pending(), pending(), ready("https://x/export.csv")],
    );
    let poller = poller(&transport, 50);

    let ticket = poller.trigger();
    let updates = ticket.watch();
    let canceller = ticket.canceller();
    let outcome = ticket.outcome().await;

    assert_eq!(outcome, Ok("https://x/export.csv".to_string()));
    assert!(updates.has_changed().unwrap());
    let job = updates.borrow().clone();
    assert_eq!(
        *job.phase(),
        PollPhase::Ready {
            url: "https://x/export.csv".to_string()
        }
    );
    assert_eq!(job.attempts_settled(), 4);
    assert_eq!(job.retries_remaining(), 46);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(transport.calls_to(EXPORT_DOWNLOAD_PATH), 4);
    assert_eq!(transport.calls_to(EXPORT_PATH), 1);
    assert_eq!(
        transport.calls()[1],
        "GET /api/subscribers/export/download?filename=subscribers-1.csv"
    );

    // Stopping a finished job changes nothing.
    canceller.cancel();
    assert_eq!(updates.borrow().clone(), job);
}

#[tokio::test(start_paused = true)]
async fn all_pending_exhausts_the_budget() {
    init_logging();
    let transport = export_transport();
    transport.script(EXPORT_DOWNLOAD_PATH, [pending()]);
    let poller = poller(&transport, 5);

    let outcome = poller.trigger().outcome().await;

    assert_eq!(outcome, Err(PollError::Exhausted { attempts: 5 }));
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(transport.calls_to(EXPORT_DOWNLOAD_PATH), 5);
}

#[tokio::test(start_paused = true)]
async fn transport_errors_spend_budget_without_failing() {
    init_logging();
    let transport = export_transport();
    transport.script(
        EXPORT_DOWNLOAD_PATH,
        [unreachable(), respond(502, "bad gateway"), ready("https://x/e.csv")],
    );
    let poller = poller(&transport, 50);

    let ticket = poller.trigger();
    let job = ticket.watch();
    assert_eq!(ticket.outcome().await, Ok("https://x/e.csv".to_string()));
    assert_eq!(job.borrow().attempts_settled(), 3);
}

#[tokio::test(start_paused = true)]
async fn failure_on_second_poll_stops_polling() {
    init_logging();
    let transport = export_transport();
    transport.script(EXPORT_DOWNLOAD_PATH, [pending(), failed("disk full")]);
    let poller = poller(&transport, 50);

    let ticket = poller.trigger();
    let job = ticket.watch();
    let outcome = ticket.outcome().await;

    assert_eq!(
        outcome,
        Err(PollError::JobFailed {
            message: "disk full".to_string()
        })
    );
    assert_eq!(
        *job.borrow().phase(),
        PollPhase::Failed {
            message: "disk full".to_string()
        }
    );
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(transport.calls_to(EXPORT_DOWNLOAD_PATH), 2);
}

#[tokio::test(start_paused = true)]
async fn failure_on_first_poll_is_not_exhaustion() {
    init_logging();
    let transport = export_transport();
    transport.script(EXPORT_DOWNLOAD_PATH, [failed("no subscribers to export")]);
    let poller = poller(&transport, 50);

    let outcome = poller.trigger().outcome().await;

    assert_eq!(
        outcome,
        Err(PollError::JobFailed {
            message: "no subscribers to export".to_string()
        })
    );
    assert_eq!(transport.calls_to(EXPORT_DOWNLOAD_PATH), 1);
}

#[tokio::test(start_paused = true)]
async fn trigger_failure_reports_immediately() {
    init_logging();
    let transport = ScriptedTransport::new();
    transport.script(EXPORT_PATH, [unreachable()]);
    let poller = poller(&transport, 50);

    let ticket = poller.trigger();
    let job = ticket.watch();
    let outcome = ticket.outcome().await;

    let Err(PollError::Trigger(failure)) = outcome else {
        panic!("expected a trigger failure, got {outcome:?}");
    };
    assert_eq!(failure.kind, FailureKind::Network);
    assert!(matches!(job.borrow().phase(), PollPhase::Failed { .. }));
    assert_eq!(job.borrow().retries_remaining(), 50);
    assert_eq!(job.borrow().handle(), None);
    assert_eq!(transport.calls_to(EXPORT_DOWNLOAD_PATH), 0);
}

#[tokio::test(start_paused = true)]
async fn trigger_rejected_by_server_reports_status() {
    let transport = ScriptedTransport::new();
    transport.script(EXPORT_PATH, [respond(500, r#"{"message":"unable to generate"}"#)]);
    let poller = poller(&transport, 50);

    let outcome = poller.trigger().outcome().await;

    let Err(PollError::Trigger(failure)) = outcome else {
        panic!("expected a trigger failure, got {outcome:?}");
    };
    assert_eq!(failure.kind, FailureKind::HttpStatus(500));
}

#[tokio::test(start_paused = true)]
async fn slow_responses_never_exceed_the_budget() {
    init_logging();
    let transport = export_transport();
    transport.script(
        EXPORT_DOWNLOAD_PATH,
        [pending().after(Duration::from_millis(2500))],
    );
    let poller = poller(&transport, 3);

    let ticket = poller.trigger();
    let job = ticket.watch();
    let outcome = ticket.outcome().await;

    assert_eq!(outcome, Err(PollError::Exhausted { attempts: 3 }));
    assert_eq!(job.borrow().attempts_issued(), 3);
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(transport.calls_to(EXPORT_DOWNLOAD_PATH), 3);
}

#[tokio::test(start_paused = true)]
async fn teardown_mid_poll_freezes_the_job() {
    init_logging();
    let transport = export_transport();
    transport.script(
        EXPORT_DOWNLOAD_PATH,
        [ready("https://x/late.csv").after(Duration::from_millis(1500))],
    );
    let poller = poller(&transport, 50);

    let ticket = poller.trigger();
    tokio::time::sleep(Duration::from_millis(1200)).await;
    assert_eq!(ticket.snapshot().attempts_issued(), 1);

    ticket.cancel();
    ticket.cancel();
    poller.teardown();
    let frozen = ticket.snapshot();
    assert_eq!(*frozen.phase(), PollPhase::Cancelled);

    let mut updates = ticket.watch();
    updates.borrow_and_update();
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert!(!updates.has_changed().unwrap());
    assert_eq!(ticket.snapshot(), frozen);
    assert_eq!(frozen.retries_remaining(), 50);
    assert_eq!(transport.calls_to(EXPORT_DOWNLOAD_PATH), 1);
    assert_eq!(ticket.outcome().await, Err(PollError::Cancelled));
}

#[tokio::test(start_paused = true)]
async fn new_trigger_stops_the_previous_job() {
    init_logging();
    let transport = export_transport();
    transport.script(EXPORT_DOWNLOAD_PATH, [pending()]);
    let poller = poller(&transport, 50);

    let first = poller.trigger();
    tokio::time::sleep(Duration::from_millis(2500)).await;
    let second = poller.trigger();

    assert_eq!(*first.snapshot().phase(), PollPhase::Cancelled);
    assert_ne!(first.job_id(), second.job_id());
    let first_attempts = first.snapshot().attempts_issued();
    assert_eq!(first_attempts, 2);

    tokio::time::sleep(Duration::from_millis(3500)).await;
    assert_eq!(first.snapshot().attempts_issued(), first_attempts);
    assert_eq!(*second.snapshot().phase(), PollPhase::Polling);
    assert_eq!(second.snapshot().attempts_issued(), 3);
    assert_eq!(first.outcome().await, Err(PollError::Cancelled));
}
