use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use badger_core::{Epoch, FailureKind, FetchFailure, FetchState, FetchTracker, Resolution};
use badger_logging::{badger_debug, badger_trace};
use serde::de::DeserializeOwned;
use tokio::sync::{oneshot, watch};
use tokio_util::sync::CancellationToken;

use crate::{FetchDescriptor, Transport, TransportResponse};

/// How one issued call ended, from the point of view of its issuer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settled<T> {
    /// The call's result was applied; this is the state it produced.
    Observed(FetchState<T>),
    /// A newer call or a teardown invalidated the call before it could be applied.
    Superseded,
}

/// Completion handle for one `issue`.
#[derive(Debug)]
pub struct FetchTicket<T> {
    epoch: Option<Epoch>,
    rx: oneshot::Receiver<Settled<T>>,
}

impl<T> FetchTicket<T> {
    /// `None` if the primitive was already torn down when the call was issued.
    pub fn epoch(&self) -> Option<Epoch> {
        self.epoch
    }

    pub async fn settled(self) -> Settled<T> {
        self.rx.await.unwrap_or(Settled::Superseded)
    }
}

struct Inner<T> {
    tracker: FetchTracker<T>,
    current: Option<CancellationToken>,
}

struct Shared<T> {
    inner: Mutex<Inner<T>>,
    state_tx: watch::Sender<FetchState<T>>,
    scope: CancellationToken,
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn teardown(&self) {
        let mut inner = self.lock();
        if !inner.tracker.teardown() {
            return;
        }
        if let Some(token) = inner.current.take() {
            token.cancel();
        }
        self.scope.cancel();
    }
}

impl<T: Clone> Shared<T> {
    fn resolve(&self, epoch: Epoch, result: Result<T, FetchFailure>) -> Settled<T> {
        let mut inner = self.lock();
        match inner.tracker.resolve(epoch, result) {
            Resolution::Applied => {
                let state = inner.tracker.state().clone();
                self.state_tx.send_replace(state.clone());
                Settled::Observed(state)
            }
            Resolution::Discarded => {
                badger_trace!(
                    "Discarded stale response epoch={} latest={}",
                    epoch,
                    inner.tracker.latest_epoch()
                );
                Settled::Superseded
            }
        }
    }
}

/// Issues calls through a transport and reflects the latest one's state.
///
/// Only the most recently issued call can change the observed state. Dropping the
/// primitive tears it down.
pub struct FetchPrimitive<T> {
    transport: Arc<dyn Transport>,
    shared: Arc<Shared<T>>,
}

impl<T> FetchPrimitive<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// `initial` is the idle data and the fallback used whenever a call fails.
    pub fn new(transport: Arc<dyn Transport>, initial: T) -> Self {
        let tracker = FetchTracker::new(initial);
        let (state_tx, _) = watch::channel(tracker.state().clone());
        Self {
            transport,
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    tracker,
                    current: None,
                }),
                state_tx,
                scope: CancellationToken::new(),
            }),
        }
    }

    /// Starts one network call and supersedes any call still in flight.
    ///
    /// Must be called from within a tokio runtime.
    pub fn issue(&self, descriptor: FetchDescriptor) -> FetchTicket<T> {
        let (tx, rx) = oneshot::channel();
        let started = {
            let mut inner = self.shared.lock();
            match inner.tracker.begin() {
                Some(epoch) => {
                    if let Some(previous) = inner.current.take() {
                        previous.cancel();
                    }
                    let token = self.shared.scope.child_token();
                    inner.current = Some(token.clone());
                    self.shared
                        .state_tx
                        .send_replace(inner.tracker.state().clone());
                    Some((epoch, token))
                }
                None => None,
            }
        };

        let Some((epoch, token)) = started else {
            badger_debug!(
                "Ignoring {} {} after teardown",
                descriptor.method(),
                descriptor.target()
            );
            let _ = tx.send(Settled::Superseded);
            return FetchTicket { epoch: None, rx };
        };

        badger_trace!(
            "Issuing {} {} epoch={}",
            descriptor.method(),
            descriptor.target(),
            epoch
        );
        let transport = self.transport.clone();
        let shared = self.shared.clone();
        tokio::spawn(async move {
            let settled = tokio::select! {
                biased;
                _ = token.cancelled() => Settled::Superseded,
                result = transport.send(&descriptor) => shared.resolve(epoch, decode(result)),
            };
            let _ = tx.send(settled);
        });

        FetchTicket {
            epoch: Some(epoch),
            rx,
        }
    }

    pub fn state(&self) -> FetchState<T> {
        self.shared.state_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FetchState<T>> {
        self.shared.state_tx.subscribe()
    }

    /// Invalidates any in-flight call and freezes the state. Safe to call repeatedly.
    pub fn teardown(&self) {
        self.shared.teardown();
    }

    pub fn is_torn_down(&self) -> bool {
        self.shared.lock().tracker.is_torn_down()
    }
}

impl<T> Drop for FetchPrimitive<T> {
    fn drop(&mut self) {
        self.shared.teardown();
    }
}

fn decode<T: DeserializeOwned>(
    result: Result<TransportResponse, FetchFailure>,
) -> Result<T, FetchFailure> {
    let body = result?.into_success()?;
    // An empty success body decodes like JSON `null`.
    let raw: &[u8] = if body.is_empty() { b"null" } else { &body };
    serde_json::from_slice(raw)
        .map_err(|err| FetchFailure::new(FailureKind::Decode, err.to_string()))
}
