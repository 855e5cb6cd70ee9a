use std::collections::HashSet;

use tollgate_core::error::{GateError, Result};
use tollgate_core::types::{Address, Transfer};

use crate::dispatch::GuardModule;

/// Rejects transfers touching a fixed set of blocked addresses.
///
/// Stateless: registered ahead of the rate limiter so a screened-out
/// transfer never reaches quota accounting.
pub struct DenylistGuard {
    blocked: HashSet<Address>,
}

impl DenylistGuard {
    pub fn new(blocked: impl IntoIterator<Item = Address>) -> Self {
        Self {
            blocked: blocked.into_iter().collect(),
        }
    }
}

impl GuardModule for DenylistGuard {
    fn name(&self) -> &'static str {
        "denylist"
    }

    fn check(&self, _origin: &Address, tx: &Transfer) -> Result<()> {
        for side in [&tx.sender, &tx.recipient] {
            if self.blocked.contains(side) {
                return Err(GateError::GuardRejected {
                    guard: "denylist",
                    reason: format!("{side} is blocked"),
                });
            }
        }
        Ok(())
    }
}
