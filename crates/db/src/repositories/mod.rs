//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument. Every call returns a typed
//! result; write failures are never swallowed.

pub mod application_repo;
pub mod completed_job_repo;
pub mod job_repo;
pub mod snapshot_repo;

pub use application_repo::ApplicationRepo;
pub use completed_job_repo::CompletedJobRepo;
pub use job_repo::JobRepo;
pub use snapshot_repo::SnapshotRepo;
