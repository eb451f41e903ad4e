//! Transitions accepted by a resource container.

use tokio::time::Instant;

use crate::error::FetchError;
use crate::key::ArgKey;

/// A transition of a [`ResourceState`](super::ResourceState).
///
/// `Succeed` and `Fail` carry the sequence number of the request they
/// complete and are only applied while that request is still the latest one.
#[derive(Debug)]
pub enum Action<A, D, E> {
    /// A request was issued.
    Request {
        /// Arguments passed to the fetch.
        args: A,
        /// Cache identity of `args`.
        key: ArgKey,
        /// Sequence number assigned to this request.
        seq: u64,
    },
    /// The request numbered `seq` produced data.
    Succeed {
        /// Sequence number of the completing request.
        seq: u64,
        /// The fetched value.
        data: D,
        /// When the value arrived.
        at: Instant,
    },
    /// The request numbered `seq` failed.
    Fail {
        /// Sequence number of the completing request.
        seq: u64,
        /// What went wrong.
        error: FetchError<E>,
    },
    /// A request was issued but failed before any fetch could start.
    ///
    /// Supersedes whatever was in flight like `Request`, but records no key,
    /// so the next request is never coalesced with it or served from it.
    Reject {
        /// Arguments of the rejected request.
        args: A,
        /// Sequence number assigned to the rejected request.
        seq: u64,
        /// Why it was rejected.
        error: FetchError<E>,
    },
    /// Replace the data locally without a round trip.
    SetData {
        /// The new value.
        data: D,
    },
    /// Drop the held data without touching the request phase.
    ClearData,
    /// Return to `Idle` and invalidate any request still in flight.
    Reset,
}

impl<A, D, E> Action<A, D, E> {
    /// Sequence number of a completion, `None` for every other action.
    pub fn completion_seq(&self) -> Option<u64> {
        match self {
            Action::Succeed { seq, .. } | Action::Fail { seq, .. } => Some(*seq),
            _ => None,
        }
    }

    /// Short name, used in log output.
    pub fn name(&self) -> &'static str {
        match self {
            Action::Request { .. } => "request",
            Action::Succeed { .. } => "succeed",
            Action::Fail { .. } => "fail",
            Action::Reject { .. } => "reject",
            Action::SetData { .. } => "set_data",
            Action::ClearData => "clear_data",
            Action::Reset => "reset",
        }
    }
}
