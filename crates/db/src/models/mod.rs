//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` (or plain) create DTO for inserts

pub mod application;
pub mod completed_job;
pub mod job;
pub mod status;
