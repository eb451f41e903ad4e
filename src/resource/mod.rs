//! Resource handles: the imperative shell around a container.
//!
//! A [`Resource`] owns one [`ResourceState`] and the fetch function that
//! feeds it. Consumers call [`request`](Resource::request) (or the
//! [`load`](Resource::load)/[`refresh`](Resource::refresh) shorthands) with
//! arguments; the handle decides whether a fetch is needed, records the
//! request synchronously, and runs the fetch on a detached Tokio task.
//! Completions are applied only if no newer request or reset happened in
//! between, so the visible state always belongs to the latest request.
//!
//! # Example
//!
//! ```
//! use millpond::{Dispatch, Resource, Status};
//!
//! # tokio_test::block_on(async {
//! let studies = Resource::new("studies", |page: u32| async move {
//!     Ok::<_, String>(vec![format!("study-{}", page)])
//! });
//!
//! assert!(matches!(studies.request(1, false), Dispatch::Issued { seq: 1 }));
//! // Same arguments while loading: nothing new is issued.
//! assert_eq!(studies.request(1, false), Dispatch::Coalesced);
//!
//! let state = studies.subscribe().wait_settled().await.unwrap();
//! assert_eq!(state.status(), Status::Loaded);
//! assert_eq!(state.data(), Some(&vec!["study-1".to_string()]));
//! # });
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::Instrument;

use crate::container::{Action, ResourceState, ResourceView, Status};
use crate::error::FetchError;
use crate::fetch::{self, Fetcher, SharedFetcher};
use crate::key::{canonical_key_fn, ArgKey, KeyError, KeyFn};
use crate::subscription::Subscription;

/// What a call to [`Resource::request`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// A new request was recorded and its fetch started.
    Issued {
        /// Sequence number of the new request.
        seq: u64,
    },
    /// A request with the same arguments is already in flight.
    Coalesced,
    /// The held result for these arguments was kept.
    Cached,
    /// The arguments could not be keyed; the request was recorded as failed
    /// without running a fetch.
    Rejected {
        /// Sequence number of the failed request.
        seq: u64,
    },
}

impl Dispatch {
    /// Returns true if a fetch was started.
    pub fn is_issued(&self) -> bool {
        matches!(self, Dispatch::Issued { .. })
    }

    /// Sequence number of the recorded request, if one was recorded.
    pub fn seq(&self) -> Option<u64> {
        match self {
            Dispatch::Issued { seq } | Dispatch::Rejected { seq } => Some(*seq),
            Dispatch::Coalesced | Dispatch::Cached => None,
        }
    }
}

/// How to build a resource: its fetcher, optional mock fixture, key
/// derivation and freshness bound.
pub struct ResourceOptions<A, D, E> {
    pub(crate) fetcher: SharedFetcher<A, D, E>,
    pub(crate) fixture: Option<SharedFetcher<A, D, E>>,
    pub(crate) key_fn: KeyFn<A>,
    pub(crate) stale_after: Option<Duration>,
}

impl<A, D, E> ResourceOptions<A, D, E> {
    /// Options for `fetcher`, keying arguments by their canonical JSON form.
    pub fn new(fetcher: impl Fetcher<A, D, E>) -> Self
    where
        A: Serialize + 'static,
    {
        ResourceOptions::keyed(fetcher, canonical_key_fn())
    }

    /// Options for `fetcher` with a custom key function, for arguments that
    /// are not serialisable or have a cheaper identity.
    pub fn keyed(fetcher: impl Fetcher<A, D, E>, key_fn: KeyFn<A>) -> Self {
        ResourceOptions {
            fetcher: Arc::new(fetcher),
            fixture: None,
            key_fn,
            stale_after: None,
        }
    }

    /// Stand-in used instead of the fetcher when mock mode is on.
    pub fn with_fixture(mut self, fixture: impl Fetcher<A, D, E>) -> Self {
        self.fixture = Some(Arc::new(fixture));
        self
    }

    /// Replace the key function.
    pub fn with_key<F>(mut self, key_fn: F) -> Self
    where
        F: Fn(&A) -> Result<ArgKey, KeyError> + Send + Sync + 'static,
    {
        self.key_fn = Arc::new(key_fn);
        self
    }

    /// Refetch loaded values older than `stale_after`. Overrides the
    /// registry-wide default.
    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = Some(stale_after);
        self
    }
}

impl<A, D, E> fmt::Debug for ResourceOptions<A, D, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceOptions")
            .field("has_fixture", &self.fixture.is_some())
            .field("stale_after", &self.stale_after)
            .finish_non_exhaustive()
    }
}

struct Inner<A, D, E> {
    name: String,
    state: watch::Sender<ResourceState<A, D, E>>,
    fetcher: SharedFetcher<A, D, E>,
    key_fn: KeyFn<A>,
    stale_after: Option<Duration>,
}

/// Handle onto one named resource. Cloning is cheap; every clone drives the
/// same state.
pub struct Resource<A, D, E> {
    inner: Arc<Inner<A, D, E>>,
}

impl<A, D, E> Resource<A, D, E>
where
    A: Clone + Send + Sync + 'static,
    D: Clone + Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    /// A standalone resource fetched by `fetcher`.
    pub fn new(name: impl Into<String>, fetcher: impl Fetcher<A, D, E>) -> Self
    where
        A: Serialize,
    {
        Resource::with_options(name, ResourceOptions::new(fetcher))
    }

    /// A standalone resource built from `options`. The fixture, if any, is
    /// ignored; mock substitution is decided by a [`Registry`](crate::Registry).
    pub fn with_options(name: impl Into<String>, options: ResourceOptions<A, D, E>) -> Self {
        Resource::from_parts(
            name.into(),
            options.fetcher,
            options.key_fn,
            options.stale_after,
        )
    }

    pub(crate) fn from_parts(
        name: String,
        fetcher: SharedFetcher<A, D, E>,
        key_fn: KeyFn<A>,
        stale_after: Option<Duration>,
    ) -> Self {
        let (state, _) = watch::channel(ResourceState::new());
        Resource {
            inner: Arc::new(Inner {
                name,
                state,
                fetcher,
                key_fn,
                stale_after,
            }),
        }
    }

    /// Ask for the data belonging to `args`.
    ///
    /// Unless `force` is set, nothing is fetched when the latest request has
    /// the same key and is still loading, has failed, or has loaded a value
    /// that is still fresh. Otherwise a new request is recorded before this
    /// returns and its fetch runs on the current Tokio runtime.
    ///
    /// Never fails: problems end up in the resource's state.
    pub fn request(&self, args: A, force: bool) -> Dispatch {
        let key = match (self.inner.key_fn)(&args) {
            Ok(key) => key,
            Err(err) => return self.inner.reject_args(args, err),
        };

        let now = Instant::now();
        let stale_after = self.inner.stale_after;
        let fetch_args = args.clone();
        let mut dispatch = Dispatch::Coalesced;

        self.inner.state.send_if_modified(|state| {
            if !force && state.key() == Some(&key) {
                if state.is_loading() {
                    dispatch = Dispatch::Coalesced;
                    return false;
                }
                if state.is_error() || state.is_fresh(now, stale_after) {
                    dispatch = Dispatch::Cached;
                    return false;
                }
            }

            let seq = state.request_seq() + 1;
            apply(state, Action::Request { args, key, seq });
            dispatch = Dispatch::Issued { seq };
            true
        });

        match dispatch {
            Dispatch::Issued { seq } => {
                tracing::debug!(resource = %self.inner.name, seq, force, "issuing fetch");
                self.inner.spawn_fetch(seq, fetch_args);
            }
            Dispatch::Coalesced => {
                tracing::debug!(resource = %self.inner.name, "request coalesced with in-flight fetch");
            }
            Dispatch::Cached => {
                tracing::debug!(resource = %self.inner.name, "serving held result");
            }
            Dispatch::Rejected { .. } => {}
        }

        dispatch
    }

    /// Request `args` without forcing and return what consumers should render.
    pub fn load(&self, args: A) -> ResourceView<D, E> {
        self.request(args, false);
        self.view()
    }

    /// Request `args` unconditionally.
    pub fn refresh(&self, args: A) -> Dispatch {
        self.request(args, true)
    }

    /// Re-issue the latest request. Returns `None` if nothing has been
    /// requested since creation or the last reset.
    pub fn reload(&self) -> Option<Dispatch> {
        let args = self.inner.state.borrow().args().cloned()?;
        Some(self.request(args, true))
    }

    /// Replace the held data locally.
    pub fn set_data(&self, data: D) {
        self.inner.state.send_modify(|state| apply(state, Action::SetData { data }));
    }

    /// Replace the held data with a value computed from the current one.
    ///
    /// `f` runs on a copy of the data, outside the state lock, so it may read
    /// this resource freely. A write landing between the copy and the update
    /// is overwritten.
    pub fn update_data(&self, f: impl FnOnce(Option<&D>) -> D) {
        let current = self.inner.state.borrow().data().cloned();
        self.set_data(f(current.as_ref()));
    }

    /// Drop the held data.
    pub fn clear_data(&self) {
        self.inner.state.send_modify(|state| apply(state, Action::ClearData));
    }

    /// Return to `Idle`. A fetch still in flight keeps running but its result
    /// is discarded.
    pub fn reset(&self) {
        self.inner.reset();
    }

    /// Clone of the current state.
    pub fn snapshot(&self) -> ResourceState<A, D, E> {
        self.inner.state.borrow().clone()
    }

    /// Data, phase and error as consumers render them.
    pub fn view(&self) -> ResourceView<D, E> {
        self.inner.state.borrow().view()
    }

    /// Current phase.
    pub fn status(&self) -> Status {
        self.inner.state.borrow().status()
    }

    /// Observe the state as it changes.
    pub fn subscribe(&self) -> Subscription<A, D, E> {
        Subscription::new(self.inner.state.subscribe())
    }

    /// Name the resource was created with.
    pub fn name(&self) -> &str {
        &self.inner.name
    }
}

impl<A, D, E> Inner<A, D, E>
where
    A: Clone + Send + Sync + 'static,
    D: Clone + Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    fn spawn_fetch(self: &Arc<Self>, seq: u64, args: A) {
        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                tracing::warn!(resource = %self.name, seq, "no Tokio runtime; fetch not started");
                self.complete(seq, Err(FetchError::NoRuntime));
                return;
            }
        };

        let pending = fetch::guarded(&*self.fetcher, args);
        let inner = Arc::clone(self);
        let span = tracing::debug_span!("fetch", resource = %self.name, seq);

        handle.spawn(
            async move {
                let outcome = pending.await;
                inner.complete(seq, outcome);
            }
            .instrument(span),
        );
    }

    fn complete(&self, seq: u64, outcome: Result<D, FetchError<E>>) -> bool {
        let action = match outcome {
            Ok(data) => Action::Succeed {
                seq,
                data,
                at: Instant::now(),
            },
            Err(error) => {
                match &error {
                    FetchError::Panicked(message) => {
                        tracing::warn!(resource = %self.name, seq, %message, "fetch panicked");
                    }
                    _ => tracing::debug!(resource = %self.name, seq, "fetch failed"),
                }
                Action::Fail { seq, error }
            }
        };

        let kind = action.name();
        let applied = self.state.send_if_modified(|state| {
            if !state.accepts(&action) {
                return false;
            }
            apply(state, action);
            true
        });

        if !applied {
            tracing::trace!(resource = %self.name, seq, action = kind, "discarding stale completion");
        }
        applied
    }

    // Invalid arguments still supersede whatever was in flight.
    fn reject_args(&self, args: A, err: KeyError) -> Dispatch {
        tracing::debug!(resource = %self.name, error = %err, "rejecting request");
        let mut seq = 0;
        self.state.send_modify(|state| {
            seq = state.request_seq() + 1;
            apply(
                state,
                Action::Reject {
                    args,
                    seq,
                    error: FetchError::InvalidArgs(err),
                },
            );
        });
        Dispatch::Rejected { seq }
    }

    fn reset(&self) {
        self.state.send_modify(|state| apply(state, Action::Reset));
        tracing::debug!(resource = %self.name, "reset");
    }
}

fn apply<A, D, E>(state: &mut ResourceState<A, D, E>, action: Action<A, D, E>) {
    *state = std::mem::take(state).reduce(action);
}

impl<A, D, E> Clone for Resource<A, D, E> {
    fn clone(&self) -> Self {
        Resource {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A, D, E> fmt::Debug for Resource<A, D, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("Resource")
            .field("name", &self.inner.name)
            .field("status", &state.status())
            .field("request_seq", &state.request_seq())
            .finish()
    }
}

/// Type-erased view of a resource, as held by a registry.
pub(crate) trait Container: Send + Sync {
    fn status(&self) -> Status;
    fn reset(&self);
    fn as_any(&self) -> &dyn std::any::Any;
}

impl<A, D, E> Container for Resource<A, D, E>
where
    A: Clone + Send + Sync + 'static,
    D: Clone + Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    fn status(&self) -> Status {
        Resource::status(self)
    }

    fn reset(&self) {
        Resource::reset(self);
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
