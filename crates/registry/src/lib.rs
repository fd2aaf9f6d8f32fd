//! Service registry: the authoritative, periodically verified list of
//! execution-backend instances.
//!
//! The working set lives in memory as an atomically swapped snapshot and
//! is mirrored to the database after every change, so a restart resumes
//! with the last known fleet instead of an empty one.

pub mod registry;
pub mod store;
pub mod sweep;

pub use registry::Registry;
pub use store::{RegistrySnapshot, ServiceStore};
pub use sweep::run_sweep;
