//! Resource state and the pure transition function.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use super::action::Action;
use crate::error::FetchError;
use crate::key::ArgKey;

/// Lifecycle phase of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Status {
    /// Nothing requested since creation or the last reset.
    #[default]
    Idle,
    /// A request is in flight.
    Loading,
    /// The latest request succeeded.
    Loaded,
    /// The latest request failed.
    Error,
}

impl Status {
    /// Lower-case name of the phase.
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Idle => "idle",
            Status::Loading => "loading",
            Status::Loaded => "loaded",
            Status::Error => "error",
        }
    }

    /// Returns true for `Loaded` and `Error`.
    pub fn is_settled(self) -> bool {
        matches!(self, Status::Loaded | Status::Error)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a container knows about one resource.
///
/// `A` is the argument type, `D` the fetched data and `E` the fetch
/// function's error type.
pub struct ResourceState<A, D, E> {
    data: Option<D>,
    args: Option<A>,
    key: Option<ArgKey>,
    status: Status,
    error: Option<Arc<FetchError<E>>>,
    request_seq: u64,
    updated_at: Option<Instant>,
}

/// The projection consumers render from: data, phase and error.
pub struct ResourceView<D, E> {
    /// Last fetched or locally set value.
    pub data: Option<D>,
    /// Current phase.
    pub status: Status,
    /// Failure of the latest request, only present in `Error`.
    pub error: Option<Arc<FetchError<E>>>,
}

impl<D, E> ResourceView<D, E> {
    /// Returns true while a request is in flight.
    pub fn is_loading(&self) -> bool {
        self.status == Status::Loading
    }
}

impl<D: Clone, E> Clone for ResourceView<D, E> {
    fn clone(&self) -> Self {
        ResourceView {
            data: self.data.clone(),
            status: self.status,
            error: self.error.clone(),
        }
    }
}

impl<D: fmt::Debug, E: fmt::Debug> fmt::Debug for ResourceView<D, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceView")
            .field("data", &self.data)
            .field("status", &self.status)
            .field("error", &self.error)
            .finish()
    }
}

impl<A, D, E> ResourceState<A, D, E> {
    /// A fresh `Idle` state.
    pub fn new() -> Self {
        ResourceState {
            data: None,
            args: None,
            key: None,
            status: Status::Idle,
            error: None,
            request_seq: 0,
            updated_at: None,
        }
    }

    /// Apply one transition.
    ///
    /// Completions whose sequence number is not the current one leave the
    /// state untouched; see [`accepts`](Self::accepts).
    pub fn reduce(mut self, action: Action<A, D, E>) -> Self {
        if !self.accepts(&action) {
            return self;
        }

        match action {
            Action::Request { args, key, seq } => {
                self.status = Status::Loading;
                self.args = Some(args);
                self.key = Some(key);
                self.request_seq = seq;
            }
            Action::Succeed { data, at, .. } => {
                self.status = Status::Loaded;
                self.data = Some(data);
                self.error = None;
                self.updated_at = Some(at);
            }
            Action::Fail { error, .. } => {
                self.status = Status::Error;
                self.error = Some(Arc::new(error));
            }
            Action::Reject { args, seq, error } => {
                self.status = Status::Error;
                self.args = Some(args);
                self.key = None;
                self.request_seq = seq;
                self.error = Some(Arc::new(error));
            }
            Action::SetData { data } => {
                self.data = Some(data);
            }
            Action::ClearData => {
                self.data = None;
            }
            Action::Reset => {
                let request_seq = self.request_seq + 1;
                self = ResourceState::new();
                self.request_seq = request_seq;
            }
        }

        self
    }

    /// Whether `action` would change anything.
    ///
    /// Only completions can be refused, and only when a newer request (or a
    /// reset) has been recorded since they were issued.
    pub fn accepts(&self, action: &Action<A, D, E>) -> bool {
        match action.completion_seq() {
            Some(seq) => seq == self.request_seq,
            None => true,
        }
    }

    /// Current phase.
    pub fn status(&self) -> Status {
        self.status
    }

    /// Last fetched or locally set value.
    pub fn data(&self) -> Option<&D> {
        self.data.as_ref()
    }

    /// Arguments of the most recently issued request.
    pub fn args(&self) -> Option<&A> {
        self.args.as_ref()
    }

    /// Key of the most recently issued request's arguments.
    pub fn key(&self) -> Option<&ArgKey> {
        self.key.as_ref()
    }

    /// Failure of the latest request.
    pub fn error(&self) -> Option<&FetchError<E>> {
        self.error.as_deref()
    }

    /// Sequence number of the most recently issued request.
    pub fn request_seq(&self) -> u64 {
        self.request_seq
    }

    /// When the last successful response was applied.
    pub fn updated_at(&self) -> Option<Instant> {
        self.updated_at
    }

    /// Returns true in `Idle`.
    pub fn is_idle(&self) -> bool {
        self.status == Status::Idle
    }

    /// Returns true in `Loading`.
    pub fn is_loading(&self) -> bool {
        self.status == Status::Loading
    }

    /// Returns true in `Loaded`.
    pub fn is_loaded(&self) -> bool {
        self.status == Status::Loaded
    }

    /// Returns true in `Error`.
    pub fn is_error(&self) -> bool {
        self.status == Status::Error
    }

    /// Whether a `Loaded` value is still young enough to serve at `now`.
    ///
    /// Without a `stale_after` bound a loaded value never goes stale.
    pub fn is_fresh(&self, now: Instant, stale_after: Option<Duration>) -> bool {
        if self.status != Status::Loaded {
            return false;
        }
        match (stale_after, self.updated_at) {
            (None, _) => true,
            (Some(max_age), Some(at)) => now.saturating_duration_since(at) < max_age,
            (Some(_), None) => false,
        }
    }

    /// Project the fields consumers render.
    pub fn view(&self) -> ResourceView<D, E>
    where
        D: Clone,
    {
        ResourceView {
            data: self.data.clone(),
            status: self.status,
            error: self.error.clone(),
        }
    }
}

impl<A, D, E> Default for ResourceState<A, D, E> {
    fn default() -> Self {
        ResourceState::new()
    }
}

impl<A: Clone, D: Clone, E> Clone for ResourceState<A, D, E> {
    fn clone(&self) -> Self {
        ResourceState {
            data: self.data.clone(),
            args: self.args.clone(),
            key: self.key.clone(),
            status: self.status,
            error: self.error.clone(),
            request_seq: self.request_seq,
            updated_at: self.updated_at,
        }
    }
}

impl<A: fmt::Debug, D: fmt::Debug, E: fmt::Debug> fmt::Debug for ResourceState<A, D, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceState")
            .field("status", &self.status)
            .field("data", &self.data)
            .field("args", &self.args)
            .field("error", &self.error)
            .field("request_seq", &self.request_seq)
            .finish()
    }
}
