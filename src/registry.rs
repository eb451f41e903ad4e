//! The registry: every resource of an application, by name.
//!
//! A [`Registry`] is assembled once at start-up. It decides, from its
//! [`Config`], whether each resource gets its real fetcher or its mock
//! fixture, and it can reset every resource at once, which is what signing
//! out does so that data scoped to one session never leaks into the next.
//!
//! # Example
//!
//! ```
//! use millpond::{Config, Registry, ResourceOptions, Status};
//! use millpond::fetch::Fixture;
//!
//! async fn list_studies(_: ()) -> Result<Vec<String>, String> {
//!     Err("the real backend is not reachable from docs".to_string())
//! }
//!
//! # tokio_test::block_on(async {
//! let registry = Registry::new(Config::new().with_mock(true));
//! let studies = registry
//!     .register_with(
//!         "studies",
//!         ResourceOptions::new(list_studies)
//!             .with_fixture(Fixture::value(vec!["demo study".to_string()])),
//!     )
//!     .unwrap();
//!
//! studies.request((), false);
//! let state = studies.subscribe().wait_settled().await.unwrap();
//! assert_eq!(state.data(), Some(&vec!["demo study".to_string()]));
//!
//! registry.reset_all();
//! assert_eq!(studies.status(), Status::Idle);
//! # });
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;

use crate::config::Config;
use crate::container::Status;
use crate::error::RegistryError;
use crate::fetch::Fetcher;
use crate::resource::{Container, Resource, ResourceOptions};

type Entries = BTreeMap<String, Box<dyn Container>>;

/// Named collection of resources sharing one [`Config`].
///
/// Cloning is cheap; clones share the same resources.
#[derive(Clone)]
pub struct Registry {
    config: Config,
    entries: Arc<RwLock<Entries>>,
}

impl Registry {
    /// An empty registry.
    pub fn new(config: Config) -> Self {
        Registry {
            config,
            entries: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// The configuration resources are built with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    fn read(&self) -> RwLockReadGuard<'_, Entries> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Entries> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a resource fetched by `fetcher`, keyed by canonical JSON.
    ///
    /// Fails in mock mode, since there is no fixture to stand in.
    pub fn register<A, D, E>(
        &self,
        name: impl Into<String>,
        fetcher: impl Fetcher<A, D, E>,
    ) -> Result<Resource<A, D, E>, RegistryError>
    where
        A: Serialize + Clone + Send + Sync + 'static,
        D: Clone + Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        self.register_with(name, ResourceOptions::new(fetcher))
    }

    /// Register a resource built from `options`.
    pub fn register_with<A, D, E>(
        &self,
        name: impl Into<String>,
        options: ResourceOptions<A, D, E>,
    ) -> Result<Resource<A, D, E>, RegistryError>
    where
        A: Clone + Send + Sync + 'static,
        D: Clone + Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        let name = name.into();
        let mut entries = self.write();
        if entries.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }

        let fetcher = if self.config.mock() {
            options
                .fixture
                .ok_or_else(|| RegistryError::MissingFixture(name.clone()))?
        } else {
            options.fetcher
        };
        let stale_after = options.stale_after.or(self.config.stale_after());

        let resource = Resource::from_parts(name.clone(), fetcher, options.key_fn, stale_after);
        entries.insert(name.clone(), Box::new(resource.clone()));
        tracing::debug!(resource = %name, mock = self.config.mock(), "registered resource");

        Ok(resource)
    }

    /// Look up a resource by name.
    ///
    /// The type parameters must match the ones it was registered with.
    pub fn get<A, D, E>(&self, name: &str) -> Result<Resource<A, D, E>, RegistryError>
    where
        A: Clone + Send + Sync + 'static,
        D: Clone + Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        let entries = self.read();
        let entry = entries
            .get(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        entry
            .as_any()
            .downcast_ref::<Resource<A, D, E>>()
            .cloned()
            .ok_or_else(|| RegistryError::TypeMismatch(name.to_string()))
    }

    /// Returns true if a resource with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    /// Names of all registered resources, sorted.
    pub fn names(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    /// Current phase of every resource, sorted by name.
    pub fn statuses(&self) -> Vec<(String, Status)> {
        self.read()
            .iter()
            .map(|(name, entry)| (name.clone(), entry.status()))
            .collect()
    }

    /// Number of registered resources.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Reset every resource to `Idle`, discarding held data and invalidating
    /// fetches in flight.
    ///
    /// The registry stays write-locked for the duration, so no resource can
    /// be registered half-way through.
    pub fn reset_all(&self) {
        let entries = self.write();
        for entry in entries.values() {
            entry.reset();
        }
        tracing::info!(resources = entries.len(), "reset all resources");
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("config", &self.config)
            .field("resources", &self.names())
            .finish()
    }
}
