//! Windowed rate limiting.
//!
//! Policy resolution, per-window quota accounting, the two-phase opt
//! request/activate protocol, admin configuration, and the read-only views.

pub mod engine;

pub use engine::RateLimitEngine;
