//! Guard chain exports.
//!
//! Re-exports the dispatcher and the guard module trait so downstream
//! consumers can depend on this module directly.

pub mod dispatcher;

pub use dispatcher::{GuardDispatcher, GuardModule};
