//! tollgate core: domain types and the error surface of the transfer
//! admission pipeline.
//!
//! This crate defines the contracts shared by the engine, guard modules, and
//! any host embedding the pipeline. It intentionally carries no runtime or
//! transport dependencies so it can be reused in multiple contexts.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `GateError`/`Result` so an admission
//! decision never takes down its host.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod types;

/// Shared result type.
pub use error::{GateError, Result};
pub use types::{
    AccountPolicy, AccountStatus, Address, Amount, Headroom, RatePolicy, Transfer, UsageRecord,
};
