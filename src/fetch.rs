//! Fetch functions and their mock stand-ins.
//!
//! A [`Fetcher`] is the only piece of I/O a resource knows about. Any
//! `Fn(A) -> impl Future<Output = Result<D, E>>` closure is a fetcher, so most
//! callers never implement the trait by hand:
//!
//! ```
//! use millpond::Fetcher;
//!
//! async fn list_studies(page: u32) -> Result<Vec<String>, String> {
//!     Ok(vec![format!("study on page {}", page)])
//! }
//!
//! fn assert_fetcher<F: Fetcher<u32, Vec<String>, String>>(_: &F) {}
//! assert_fetcher(&list_studies);
//! ```
//!
//! [`Fixture`] is the stand-in used when mock mode is enabled.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::error::FetchError;

/// An asynchronous operation that loads `D` for arguments `A`.
pub trait Fetcher<A, D, E>: Send + Sync + 'static {
    /// Start loading the data for `args`.
    ///
    /// The returned future must not borrow from `self`; it is driven on a
    /// detached task.
    fn fetch(&self, args: A) -> BoxFuture<'static, Result<D, E>>;
}

impl<A, D, E, F, Fut> Fetcher<A, D, E> for F
where
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<D, E>> + Send + 'static,
{
    fn fetch(&self, args: A) -> BoxFuture<'static, Result<D, E>> {
        self(args).boxed()
    }
}

/// Shared, type-erased fetcher.
pub type SharedFetcher<A, D, E> = Arc<dyn Fetcher<A, D, E>>;

/// Run `fetcher` so that neither a synchronous panic in the call nor a panic
/// while polling the future escapes. Both become [`FetchError::Panicked`].
pub(crate) fn guarded<A, D, E, F>(
    fetcher: &F,
    args: A,
) -> BoxFuture<'static, Result<D, FetchError<E>>>
where
    F: Fetcher<A, D, E> + ?Sized,
    D: Send + 'static,
    E: Send + 'static,
{
    match std::panic::catch_unwind(AssertUnwindSafe(|| fetcher.fetch(args))) {
        Ok(future) => AssertUnwindSafe(future)
            .catch_unwind()
            .map(|outcome| match outcome {
                Ok(result) => result.map_err(FetchError::Rejected),
                Err(payload) => Err(FetchError::Panicked(panic_message(payload))),
            })
            .boxed(),
        Err(payload) => {
            let error = FetchError::Panicked(panic_message(payload));
            futures::future::ready(Err(error)).boxed()
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// A fixture-returning fetcher for mock mode.
///
/// # Examples
///
/// ```
/// use millpond::fetch::{Fetcher, Fixture};
///
/// # tokio_test::block_on(async {
/// let fixture = Fixture::from_fn(|page: u32| Ok::<_, String>(vec![page; 2]));
/// assert_eq!(fixture.fetch(3).await, Ok(vec![3, 3]));
/// # });
/// ```
pub struct Fixture<A, D, E> {
    respond: Arc<dyn Fn(A) -> Result<D, E> + Send + Sync>,
    latency: Option<Duration>,
}

impl<A, D, E> Fixture<A, D, E>
where
    A: Send + 'static,
    D: Send + 'static,
    E: Send + 'static,
{
    /// Answer every request with `value`.
    pub fn value(value: D) -> Self
    where
        D: Clone + Sync,
    {
        Fixture::from_fn(move |_| Ok(value.clone()))
    }

    /// Fail every request with `error`.
    pub fn failing(error: E) -> Self
    where
        E: Clone + Sync,
    {
        Fixture::from_fn(move |_| Err(error.clone()))
    }

    /// Compute the response from the arguments.
    pub fn from_fn<F>(respond: F) -> Self
    where
        F: Fn(A) -> Result<D, E> + Send + Sync + 'static,
    {
        Fixture {
            respond: Arc::new(respond),
            latency: None,
        }
    }

    /// Delay every response, to exercise loading states against fixtures.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }
}

impl<A, D, E> Fetcher<A, D, E> for Fixture<A, D, E>
where
    A: Send + 'static,
    D: Send + 'static,
    E: Send + 'static,
{
    fn fetch(&self, args: A) -> BoxFuture<'static, Result<D, E>> {
        let respond = Arc::clone(&self.respond);
        let latency = self.latency;
        async move {
            if let Some(delay) = latency {
                tokio::time::sleep(delay).await;
            }
            respond(args)
        }
        .boxed()
    }
}

impl<A, D, E> Clone for Fixture<A, D, E> {
    fn clone(&self) -> Self {
        Fixture {
            respond: Arc::clone(&self.respond),
            latency: self.latency,
        }
    }
}

impl<A, D, E> std::fmt::Debug for Fixture<A, D, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fixture")
            .field("latency", &self.latency)
            .finish_non_exhaustive()
    }
}
