//! # Millpond
//!
//! > *Still water, fed by a race.*
//!
//! Race-safe containers for asynchronously fetched data.
//!
//! ## Philosophy
//!
//! **Millpond** keeps the same split as any pure-core, imperative-shell design:
//! - **Container**: a pure state machine. Requests, completions, local edits
//!   and resets are values; applying them never performs I/O.
//! - **Resource**: the shell. It decides when to fetch, runs the fetch on a
//!   detached task, and feeds the outcome back through the container.
//!
//! Every request gets a sequence number. A completion is applied only if its
//! request is still the latest one, so a slow answer to an old request can
//! never overwrite a fast answer to a new one.
//!
//! ## Quick Example
//!
//! ```rust
//! use millpond::{Config, Registry, Status};
//!
//! async fn fetch_participants(study: u32) -> Result<Vec<String>, String> {
//!     Ok(vec![format!("participant of study {}", study)])
//! }
//!
//! # tokio_test::block_on(async {
//! let registry = Registry::new(Config::new());
//! let participants = registry.register("participants", fetch_participants).unwrap();
//!
//! participants.request(7, false);
//! assert_eq!(participants.status(), Status::Loading);
//!
//! let state = participants.subscribe().wait_settled().await.unwrap();
//! assert_eq!(state.data().map(Vec::len), Some(1));
//!
//! // Signing out drops everything fetched for the session.
//! registry.reset_all();
//! assert_eq!(participants.status(), Status::Idle);
//! # });
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod config;
pub mod container;
pub mod error;
pub mod fetch;
pub mod key;
pub mod registry;
pub mod resource;
pub mod subscription;
pub mod testing;

// Re-exports
pub use config::{Config, ConfigError};
pub use container::{ResourceState, ResourceView, Status};
pub use error::{FetchError, RegistryError};
pub use fetch::{Fetcher, Fixture};
pub use key::{ArgKey, KeyError};
pub use registry::Registry;
pub use resource::{Dispatch, Resource, ResourceOptions};
pub use subscription::Subscription;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::container::{ResourceState, ResourceView, Status};
    pub use crate::error::FetchError;
    pub use crate::fetch::{Fetcher, Fixture};
    pub use crate::registry::Registry;
    pub use crate::resource::{Dispatch, Resource, ResourceOptions};
    pub use crate::subscription::Subscription;
}
