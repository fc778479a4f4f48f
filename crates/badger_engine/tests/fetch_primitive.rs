mod support;

use std::time::Duration;

use badger_engine::{FailureKind, FetchDescriptor, FetchPrimitive, FetchState, Settled};
use pretty_assertions::assert_eq;
use serde::Deserialize;
use support::{init_logging, respond, unreachable, ScriptedTransport};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
struct Count {
    total: u32,
}

fn get(path: &str) -> FetchDescriptor {
    FetchDescriptor::get(path).unwrap()
}

#[tokio::test(start_paused = true)]
async fn success_moves_through_loading() {
    init_logging();
    let transport = ScriptedTransport::new();
    transport.script("/api/count", [respond(200, r#"{"total":3}"#)]);
    let fetcher = FetchPrimitive::new(transport.clone(), None::<Count>);
    assert_eq!(fetcher.state(), FetchState::Idle { data: None });

    let ticket = fetcher.issue(get("/api/count"));
    assert!(fetcher.state().is_loading());

    let settled = ticket.settled().await;
    let expected = FetchState::Success {
        data: Some(Count { total: 3 }),
    };
    assert_eq!(settled, Settled::Observed(expected.clone()));
    assert_eq!(fetcher.state(), expected);
    assert_eq!(transport.calls(), vec!["GET /api/count".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn later_issue_wins_when_earlier_resolves_last() {
    init_logging();
    let transport = ScriptedTransport::new();
    transport.script("/api/slow", [respond(200, r#"{"total":1}"#).after(Duration::from_millis(500))]);
    transport.script("/api/fast", [respond(200, r#"{"total":2}"#).after(Duration::from_millis(50))]);
    let fetcher = FetchPrimitive::new(transport.clone(), None::<Count>);

    let first = fetcher.issue(get("/api/slow"));
    tokio::task::yield_now().await;
    let second = fetcher.issue(get("/api/fast"));

    assert_eq!(
        second.settled().await,
        Settled::Observed(FetchState::Success {
            data: Some(Count { total: 2 })
        })
    );
    assert_eq!(first.settled().await, Settled::Superseded);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(
        fetcher.state(),
        FetchState::Success {
            data: Some(Count { total: 2 })
        }
    );
    assert_eq!(transport.calls().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn later_issue_wins_when_earlier_resolves_first() {
    init_logging();
    let transport = ScriptedTransport::new();
    transport.script("/api/fast", [respond(200, r#"{"total":1}"#).after(Duration::from_millis(10))]);
    transport.script("/api/slow", [respond(500, "boom").after(Duration::from_millis(300))]);
    let fetcher = FetchPrimitive::new(transport, Some(Count { total: 0 }));

    let first = fetcher.issue(get("/api/fast"));
    tokio::task::yield_now().await;
    let second = fetcher.issue(get("/api/slow"));
    let mut states = fetcher.subscribe();

    assert_eq!(first.settled().await, Settled::Superseded);
    assert!(fetcher.state().is_loading());

    let Settled::Observed(state) = second.settled().await else {
        panic!("latest call must be observed");
    };
    assert!(state.is_error());
    assert_eq!(state.failure().unwrap().kind, FailureKind::HttpStatus(500));
    assert_eq!(*states.borrow_and_update(), state);
}

#[tokio::test(start_paused = true)]
async fn error_resets_data_to_fallback() {
    init_logging();
    let transport = ScriptedTransport::new();
    transport.script("/api/count", [respond(200, r#"{"total":9}"#), unreachable()]);
    let fetcher = FetchPrimitive::new(transport, Count { total: 0 });

    fetcher.issue(get("/api/count")).settled().await;
    assert_eq!(*fetcher.state().data(), Count { total: 9 });

    fetcher.issue(get("/api/count")).settled().await;
    let state = fetcher.state();
    assert!(state.is_error());
    assert_eq!(*state.data(), Count { total: 0 });
    assert_eq!(state.failure().unwrap().kind, FailureKind::Network);
}

#[tokio::test(start_paused = true)]
async fn undecodable_body_is_an_error() {
    let transport = ScriptedTransport::new();
    transport.script("/api/count", [respond(200, "not json")]);
    let fetcher = FetchPrimitive::new(transport, None::<Count>);

    let Settled::Observed(state) = fetcher.issue(get("/api/count")).settled().await else {
        panic!("expected an observed state");
    };
    assert_eq!(state.failure().unwrap().kind, FailureKind::Decode);
    assert_eq!(*state.data(), None);
}

#[tokio::test(start_paused = true)]
async fn teardown_discards_in_flight_and_is_idempotent() {
    init_logging();
    let transport = ScriptedTransport::new();
    transport.script("/api/count", [respond(200, r#"{"total":4}"#).after(Duration::from_millis(200))]);
    let fetcher = FetchPrimitive::new(transport.clone(), None::<Count>);
    let mut states = fetcher.subscribe();

    let ticket = fetcher.issue(get("/api/count"));
    states.borrow_and_update();
    tokio::task::yield_now().await;
    fetcher.teardown();
    fetcher.teardown();
    assert!(fetcher.is_torn_down());

    assert_eq!(ticket.settled().await, Settled::Superseded);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(!states.has_changed().unwrap_or(false));
    assert_eq!(fetcher.state(), FetchState::Loading { data: None });

    let late = fetcher.issue(get("/api/count"));
    assert_eq!(late.epoch(), None);
    assert_eq!(late.settled().await, Settled::Superseded);
    assert_eq!(transport.calls().len(), 1);
}
