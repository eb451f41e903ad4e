//! The per-resource state machine.
//!
//! This is the pure core of the crate: a [`ResourceState`] value and the
//! [`Action`]s that move it between phases. Nothing in here performs I/O,
//! spawns tasks or reads the clock. The caller passes timestamps and
//! sequence numbers in, which keeps every transition deterministic and easy
//! to test.
//!
//! ```text
//!            Request               Succeed (seq matches)
//!   Idle ─────────────► Loading ─────────────────────► Loaded
//!    ▲                   ▲   │                            │
//!    │                   │   │ Fail (seq matches)         │ Request
//!    │ Reset (any)       │   ▼                            │
//!    └──────────────     └── Error ◄──────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use millpond::container::{Action, ResourceState, Status};
//! use millpond::ArgKey;
//! use tokio::time::Instant;
//!
//! let state: ResourceState<u32, &str, String> = ResourceState::new();
//! let state = state.reduce(Action::Request { args: 1, key: ArgKey::new("1"), seq: 1 });
//! assert_eq!(state.status(), Status::Loading);
//!
//! let state = state.reduce(Action::Succeed { seq: 1, data: "A", at: Instant::now() });
//! assert_eq!(state.data(), Some(&"A"));
//!
//! // A completion for a superseded request is ignored.
//! let state = state.reduce(Action::Request { args: 2, key: ArgKey::new("2"), seq: 2 });
//! let state = state.reduce(Action::Succeed { seq: 1, data: "stale", at: Instant::now() });
//! assert_eq!(state.status(), Status::Loading);
//! assert_eq!(state.data(), Some(&"A"));
//! ```

mod action;
mod state;

pub use action::Action;
pub use state::{ResourceState, ResourceView, Status};

#[cfg(test)]
mod tests;
