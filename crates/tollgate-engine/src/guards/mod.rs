//! Built-in guard modules registered at boot.

pub mod denylist;

pub use denylist::DenylistGuard;
