//! Named service registry.
//!
//! A [`Registry`] maps names to [`Service`]s. Whether it can be shared across
//! threads is decided by the map it is built on:
//!
//! - [`Registry::new`] uses [`LocalMap`], an unsynchronized map. The registry
//!   is then `!Sync`, so the compiler rejects sharing it between threads.
//! - [`Registry::shared`] uses [`SharedMap`], guarded by a read-write lock,
//!   and can be put behind an `Arc` and used from any task.
//!
//! ```ignore
//! let registry = Arc::new(Registry::shared());
//! registry.register("github", Service::builder().host("https://api.github.com").build()?);
//!
//! let github = registry.get("github").expect("registered at startup");
//! ```

use std::cell::RefCell;
use std::collections::HashMap;

use parking_lot::RwLock;

use crate::http::Service;
use crate::logging::targets;

/// Storage backing a [`Registry`].
pub trait ServiceMap {
    /// Insert or replace the service stored under `name`.
    fn store(&self, name: String, service: Service) -> Option<Service>;

    /// Get a handle to the service stored under `name`.
    fn load(&self, name: &str) -> Option<Service>;

    /// Remove the service stored under `name`.
    fn remove(&self, name: &str) -> Option<Service>;

    /// Number of stored services.
    fn len(&self) -> usize;
}

/// Unsynchronized map for single-threaded use.
#[derive(Debug, Default)]
pub struct LocalMap {
    services: RefCell<HashMap<String, Service>>,
}

impl ServiceMap for LocalMap {
    fn store(&self, name: String, service: Service) -> Option<Service> {
        self.services.borrow_mut().insert(name, service)
    }

    fn load(&self, name: &str) -> Option<Service> {
        self.services.borrow().get(name).cloned()
    }

    fn remove(&self, name: &str) -> Option<Service> {
        self.services.borrow_mut().remove(name)
    }

    fn len(&self) -> usize {
        self.services.borrow().len()
    }
}

/// Lock-guarded map that can be shared across threads.
#[derive(Debug, Default)]
pub struct SharedMap {
    services: RwLock<HashMap<String, Service>>,
}

impl ServiceMap for SharedMap {
    fn store(&self, name: String, service: Service) -> Option<Service> {
        self.services.write().insert(name, service)
    }

    fn load(&self, name: &str) -> Option<Service> {
        self.services.read().get(name).cloned()
    }

    fn remove(&self, name: &str) -> Option<Service> {
        self.services.write().remove(name)
    }

    fn len(&self) -> usize {
        self.services.read().len()
    }
}

/// Services registered by name.
#[derive(Debug, Default)]
pub struct Registry<M = LocalMap> {
    map: M,
}

impl Registry<LocalMap> {
    /// Create a registry for single-threaded use.
    pub fn new() -> Self {
        Self::with_map(LocalMap::default())
    }
}

impl Registry<SharedMap> {
    /// Create a registry that can be shared across threads.
    pub fn shared() -> Self {
        Self::with_map(SharedMap::default())
    }
}

impl<M: ServiceMap> Registry<M> {
    /// Create a registry on top of a custom map.
    pub fn with_map(map: M) -> Self {
        Self { map }
    }

    /// Register `service` under `name`, returning the service it replaced.
    pub fn register(&self, name: impl Into<String>, service: Service) -> Option<Service> {
        let name = name.into();
        tracing::debug!(target: targets::REGISTRY, name = %name, "service registered");
        self.map.store(name, service)
    }

    /// Get the service registered under `name`.
    pub fn get(&self, name: &str) -> Option<Service> {
        self.map.load(name)
    }

    /// Remove the service registered under `name`.
    pub fn remove(&self, name: &str) -> Option<Service> {
        self.map.remove(name)
    }

    /// Whether a service is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.map.load(name).is_some()
    }

    /// Number of registered services.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether no service is registered.
    pub fn is_empty(&self) -> bool {
        self.map.len() == 0
    }
}
