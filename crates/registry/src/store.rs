//! In-process snapshot store with atomic whole-set replacement.
//!
//! Readers grab an `Arc` to the current snapshot and keep working with it
//! even while a writer swaps in a new one; nobody ever observes a
//! partially updated list. Writers (the registration handler and the
//! liveness sweep) serialize on the write lock, and their read-modify-write
//! runs entirely inside it.

use std::sync::{Arc, RwLock};

use conductor_core::service::{CapabilityIndex, ServiceDescriptor};

/// One immutable view of the registry: the descriptor set plus the
/// capability index derived from it.
#[derive(Debug, Default)]
pub struct RegistrySnapshot {
    pub services: Vec<ServiceDescriptor>,
    pub capabilities: CapabilityIndex,
}

impl RegistrySnapshot {
    pub fn new(services: Vec<ServiceDescriptor>) -> Self {
        let capabilities = CapabilityIndex::build(&services);
        Self {
            services,
            capabilities,
        }
    }
}

/// Holds the current [`RegistrySnapshot`] behind a read/write lock.
#[derive(Debug, Default)]
pub struct ServiceStore {
    current: RwLock<Arc<RegistrySnapshot>>,
}

impl ServiceStore {
    /// Start with an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current snapshot. Cheap; clones only the `Arc`.
    pub fn load(&self) -> Arc<RegistrySnapshot> {
        self.current.read().expect("service store lock poisoned").clone()
    }

    /// Replace the snapshot wholesale and return the new one.
    pub fn replace(&self, services: Vec<ServiceDescriptor>) -> Arc<RegistrySnapshot> {
        let snapshot = Arc::new(RegistrySnapshot::new(services));
        *self.current.write().expect("service store lock poisoned") = snapshot.clone();
        snapshot
    }

    /// Derive a new descriptor set from the current one and swap it in,
    /// all under the write lock, so concurrent writers cannot interleave
    /// their read-modify-write cycles.
    pub fn update(
        &self,
        f: impl FnOnce(&[ServiceDescriptor]) -> Vec<ServiceDescriptor>,
    ) -> Arc<RegistrySnapshot> {
        let mut guard = self.current.write().expect("service store lock poisoned");
        let snapshot = Arc::new(RegistrySnapshot::new(f(&guard.services)));
        *guard = snapshot.clone();
        snapshot
    }
}
