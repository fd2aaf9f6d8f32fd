//! Shared domain types for the conductor platform.
//!
//! This crate has no internal dependencies and no I/O. Everything here is
//! used by at least two of the other workspace crates.

pub mod error;
pub mod service;
pub mod types;
