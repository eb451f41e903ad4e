//! Observing a resource's state.
//!
//! A [`Subscription`] is a read-only view onto one resource. It is woken
//! whenever a transition actually changes the state; coalesced requests and
//! stale completions never wake it.

use std::fmt;

use tokio::sync::watch;

use crate::container::{ResourceState, ResourceView};

/// Live, read-only handle onto a resource's state.
pub struct Subscription<A, D, E> {
    rx: watch::Receiver<ResourceState<A, D, E>>,
}

impl<A, D, E> Subscription<A, D, E> {
    pub(crate) fn new(rx: watch::Receiver<ResourceState<A, D, E>>) -> Self {
        Subscription { rx }
    }

    /// Inspect the current state without cloning it.
    pub fn read<R>(&self, f: impl FnOnce(&ResourceState<A, D, E>) -> R) -> R {
        f(&self.rx.borrow())
    }

    /// Clone of the current state.
    pub fn current(&self) -> ResourceState<A, D, E>
    where
        A: Clone,
        D: Clone,
    {
        self.rx.borrow().clone()
    }

    /// Projection of the current state.
    pub fn view(&self) -> ResourceView<D, E>
    where
        D: Clone,
    {
        self.rx.borrow().view()
    }

    /// Returns true if the state changed since it was last observed through
    /// [`changed`](Self::changed) or [`wait_until`](Self::wait_until).
    pub fn has_changed(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }

    /// Wait for the next change and return the new projection.
    ///
    /// Returns `None` once every handle to the resource has been dropped.
    pub async fn changed(&mut self) -> Option<ResourceView<D, E>>
    where
        D: Clone,
    {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().view())
    }

    /// Wait until the state satisfies `predicate`, checking the current state
    /// first.
    ///
    /// Returns `None` if the resource is dropped before that happens.
    pub async fn wait_until(
        &mut self,
        mut predicate: impl FnMut(&ResourceState<A, D, E>) -> bool,
    ) -> Option<ResourceState<A, D, E>>
    where
        A: Clone,
        D: Clone,
    {
        let state = self.rx.wait_for(|state| predicate(state)).await.ok()?;
        Some((*state).clone())
    }

    /// Wait until the resource is `Loaded` or `Error`.
    pub async fn wait_settled(&mut self) -> Option<ResourceState<A, D, E>>
    where
        A: Clone,
        D: Clone,
    {
        self.wait_until(|state| state.status().is_settled()).await
    }
}

impl<A, D, E> Clone for Subscription<A, D, E> {
    fn clone(&self) -> Self {
        Subscription {
            rx: self.rx.clone(),
        }
    }
}

impl<A, D, E> fmt::Debug for Subscription<A, D, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("status", &self.rx.borrow().status())
            .finish()
    }
}
