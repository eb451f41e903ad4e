//! Testing utilities for code built on resources.
//!
//! [`ManualFetcher`] hands every fetch to the test, which resolves them in
//! whatever order it wants. That makes races reproducible without timers.
//! The assertion macros check a resource (or a state snapshot) in one line.
//!
//! # Examples
//!
//! ```
//! use millpond::testing::{settle, ManualFetcher};
//! use millpond::{assert_loaded, Resource};
//!
//! # tokio_test::block_on(async {
//! let fetcher = ManualFetcher::<u32, &str, String>::new();
//! let studies = Resource::new("studies", fetcher.clone());
//!
//! studies.request(1, false);
//! studies.request(2, false);
//! assert_eq!(fetcher.calls(), 2);
//!
//! // The first request answers last and loses.
//! fetcher.succeed(1, "page two");
//! fetcher.succeed(0, "page one");
//! settle().await;
//!
//! assert_loaded!(studies, "page two");
//! # });
//! ```

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::oneshot;

use crate::fetch::Fetcher;

const SETTLE_ROUNDS: usize = 16;

/// Let spawned fetch tasks run until they have applied whatever completions
/// are ready.
///
/// This yields to the scheduler a fixed number of times. It is enough for
/// fetches that are already resolved, such as [`ManualFetcher`] calls or
/// fixtures without latency, but it never advances time: a fetch waiting on
/// a timer needs `tokio::time::sleep` or `advance` under paused time.
pub async fn settle() {
    for _ in 0..SETTLE_ROUNDS {
        tokio::task::yield_now().await;
    }
}

struct Call<A, D, E> {
    args: A,
    reply: Option<oneshot::Sender<Result<D, E>>>,
}

/// A fetcher whose calls stay pending until the test resolves them.
///
/// Calls are numbered from 0 in the order they were made. A call that is
/// never resolved stays pending forever, like a request that never returns.
pub struct ManualFetcher<A, D, E> {
    calls: Arc<Mutex<Vec<Call<A, D, E>>>>,
}

impl<A, D, E> ManualFetcher<A, D, E> {
    /// A fetcher with no calls yet.
    pub fn new() -> Self {
        ManualFetcher {
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Call<A, D, E>>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of fetches started so far.
    pub fn calls(&self) -> usize {
        self.lock().len()
    }

    /// Arguments of every fetch, in call order.
    pub fn args(&self) -> Vec<A>
    where
        A: Clone,
    {
        self.lock().iter().map(|call| call.args.clone()).collect()
    }

    /// Number of calls not resolved yet.
    pub fn pending(&self) -> usize {
        self.lock().iter().filter(|call| call.reply.is_some()).count()
    }

    /// Complete call `index` with `result`.
    ///
    /// Returns false if there is no such call, it was already resolved, or
    /// nobody is waiting for it any more.
    pub fn resolve(&self, index: usize, result: Result<D, E>) -> bool {
        let reply = self
            .lock()
            .get_mut(index)
            .and_then(|call| call.reply.take());
        match reply {
            Some(reply) => reply.send(result).is_ok(),
            None => false,
        }
    }

    /// Complete call `index` successfully.
    pub fn succeed(&self, index: usize, data: D) -> bool {
        self.resolve(index, Ok(data))
    }

    /// Fail call `index`.
    pub fn fail(&self, index: usize, error: E) -> bool {
        self.resolve(index, Err(error))
    }
}

impl<A, D, E> Fetcher<A, D, E> for ManualFetcher<A, D, E>
where
    A: Send + 'static,
    D: Send + 'static,
    E: Send + 'static,
{
    fn fetch(&self, args: A) -> BoxFuture<'static, Result<D, E>> {
        let (reply, response) = oneshot::channel();
        self.lock().push(Call {
            args,
            reply: Some(reply),
        });
        async move {
            match response.await {
                Ok(result) => result,
                Err(_) => futures::future::pending().await,
            }
        }
        .boxed()
    }
}

impl<A, D, E> Default for ManualFetcher<A, D, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A, D, E> Clone for ManualFetcher<A, D, E> {
    fn clone(&self) -> Self {
        ManualFetcher {
            calls: Arc::clone(&self.calls),
        }
    }
}

impl<A, D, E> fmt::Debug for ManualFetcher<A, D, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualFetcher")
            .field("calls", &self.calls())
            .field("pending", &self.pending())
            .finish()
    }
}

/// Assert the phase of a resource or state snapshot.
///
/// # Example
///
/// ```rust
/// use millpond::container::ResourceState;
/// use millpond::{assert_status, Status};
///
/// let state: ResourceState<(), u32, String> = ResourceState::new();
/// assert_status!(state, Status::Idle);
/// ```
#[macro_export]
macro_rules! assert_status {
    ($target:expr, $status:expr) => {{
        let actual = $target.status();
        assert_eq!(
            actual, $status,
            "expected status {}, got {}",
            $status, actual
        );
    }};
}

/// Assert that a resource or snapshot is `Loaded` with the given data.
#[macro_export]
macro_rules! assert_loaded {
    ($target:expr, $data:expr) => {{
        let view = $target.view();
        match view.status {
            $crate::Status::Loaded => assert_eq!(view.data, Some($data)),
            other => panic!("Expected Loaded, got {} (error: {:?})", other, view.error),
        }
    }};
}

/// Assert that a resource or snapshot is in `Error`, optionally checking the
/// fetch function's rejection payload.
#[macro_export]
macro_rules! assert_errored {
    ($target:expr) => {{
        let view = $target.view();
        if view.status != $crate::Status::Error {
            panic!("Expected Error, got {}", view.status);
        }
    }};
    ($target:expr, $rejection:expr) => {{
        let view = $target.view();
        match (view.status, view.error.as_deref()) {
            ($crate::Status::Error, Some($crate::FetchError::Rejected(e))) => {
                assert_eq!(e, &$rejection)
            }
            (status, error) => panic!(
                "Expected Error with rejection {:?}, got {} ({:?})",
                $rejection, status, error
            ),
        }
    }};
}

#[cfg(feature = "proptest")]
use proptest::prelude::*;

#[cfg(feature = "proptest")]
impl Arbitrary for crate::Status {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        prop_oneof![
            Just(crate::Status::Idle),
            Just(crate::Status::Loading),
            Just(crate::Status::Loaded),
            Just(crate::Status::Error),
        ]
        .boxed()
    }
}
