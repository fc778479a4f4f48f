use crate::FetchFailure;

/// Issue counter of one fetch tracker; only the latest epoch may change state.
pub type Epoch = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchState<T> {
    Idle { data: T },
    Loading { data: T },
    Success { data: T },
    Error { data: T, failure: FetchFailure },
}

impl<T> FetchState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, FetchState::Loading { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, FetchState::Error { .. })
    }

    pub fn data(&self) -> &T {
        match self {
            FetchState::Idle { data }
            | FetchState::Loading { data }
            | FetchState::Success { data }
            | FetchState::Error { data, .. } => data,
        }
    }

    pub fn into_data(self) -> T {
        match self {
            FetchState::Idle { data }
            | FetchState::Loading { data }
            | FetchState::Success { data }
            | FetchState::Error { data, .. } => data,
        }
    }

    pub fn failure(&self) -> Option<&FetchFailure> {
        match self {
            FetchState::Error { failure, .. } => Some(failure),
            _ => None,
        }
    }
}

/// Whether a resolution changed the observed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Applied,
    Discarded,
}

/// Last-issued-wins bookkeeping for one fetch consumer.
///
/// Every `begin` supersedes all earlier epochs. A resolution for anything but the
/// latest epoch, or arriving after `teardown`, is discarded without touching state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTracker<T> {
    fallback: T,
    latest: Epoch,
    state: FetchState<T>,
    torn_down: bool,
}

impl<T: Clone> FetchTracker<T> {
    /// `initial` is both the idle data and the fallback applied on errors.
    pub fn new(initial: T) -> Self {
        Self {
            fallback: initial.clone(),
            latest: 0,
            state: FetchState::Idle { data: initial },
            torn_down: false,
        }
    }

    /// Starts a new call. Returns `None` once torn down.
    pub fn begin(&mut self) -> Option<Epoch> {
        if self.torn_down {
            return None;
        }
        self.latest += 1;
        let data = self.state.data().clone();
        self.state = FetchState::Loading { data };
        Some(self.latest)
    }

    pub fn resolve(&mut self, epoch: Epoch, result: Result<T, FetchFailure>) -> Resolution {
        if self.torn_down || epoch != self.latest || !self.state.is_loading() {
            return Resolution::Discarded;
        }
        self.state = match result {
            Ok(data) => FetchState::Success { data },
            Err(failure) => FetchState::Error {
                data: self.fallback.clone(),
                failure,
            },
        };
        Resolution::Applied
    }
}

impl<T> FetchTracker<T> {
    pub fn state(&self) -> &FetchState<T> {
        &self.state
    }

    pub fn latest_epoch(&self) -> Epoch {
        self.latest
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Freezes the tracker. Returns `true` only for the first call.
    pub fn teardown(&mut self) -> bool {
        !std::mem::replace(&mut self.torn_down, true)
    }
}
