//! Capability gate seam for admin-only operations.
//!
//! The engine and dispatcher consult an `Authorizer` before executing any
//! restricted operation; a denial surfaces as `GateError::Unauthorized` at
//! the call site. Authorization itself is an external concern.

use tollgate_core::Address;

/// Restricted operations an authorizer can grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminOp {
    SetDefaultPolicy,
    SetAccountPolicy,
    SetUsage,
    ResetAccountPolicy,
    /// Guard chain membership changes (add/remove modules).
    GuardAdmin,
}

/// Answers "is this caller allowed to run this restricted operation".
pub trait Authorizer: Send + Sync {
    fn permit(&self, caller: &Address, op: AdminOp) -> bool;
}

/// Grants every admin operation to a fixed operator set.
pub struct StaticAuthorizer {
    admins: Vec<Address>,
}

impl StaticAuthorizer {
    pub fn new(admins: Vec<Address>) -> Self {
        Self { admins }
    }
}

impl Authorizer for StaticAuthorizer {
    fn permit(&self, caller: &Address, _op: AdminOp) -> bool {
        self.admins.contains(caller)
    }
}
