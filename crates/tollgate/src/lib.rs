//! Top-level facade crate for tollgate.
//!
//! Re-exports the core contracts and the engine library so users can depend
//! on a single crate.

pub mod core {
    pub use tollgate_core::*;
}

pub mod engine {
    pub use tollgate_engine::*;
}
