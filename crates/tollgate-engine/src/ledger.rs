//! Ledger collaborator seam and the in-memory demo ledger.
//!
//! The engine consumes only a balance query from the ledger and is invoked
//! by it as a pre-transfer hook; balance storage and transfer execution stay
//! outside the admission core. `InMemoryLedger` is the minimal host backing
//! the binary and the integration tests.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tollgate_core::error::{GateError, Result};
use tollgate_core::types::{Address, Amount};

/// Balance query the rate limiter reads during `check`.
pub trait BalanceSource: Send + Sync {
    /// Current balance; unknown accounts hold zero.
    fn balance_of(&self, account: &Address) -> Amount;
}

/// Minimal fungible ledger backing the demo host and tests.
pub struct InMemoryLedger {
    id: Address,
    balances: Mutex<HashMap<Address, Amount>>,
}

impl InMemoryLedger {
    pub fn new(id: Address, seed: HashMap<Address, Amount>) -> Self {
        Self {
            id,
            balances: Mutex::new(seed),
        }
    }

    /// Identity this ledger presents to the guard chain as the transfer
    /// origin.
    pub fn id(&self) -> &Address {
        &self.id
    }

    /// Funding precondition, checked before the guard chain runs so a doomed
    /// transfer never burns quota.
    pub fn ensure_funded(&self, sender: &Address, amount: Amount) -> Result<()> {
        let balances = self.lock();
        let balance = balances.get(sender).copied().unwrap_or(0);
        if balance < amount {
            return Err(GateError::InsufficientBalance {
                balance,
                requested: amount,
            });
        }
        Ok(())
    }

    /// Move value between accounts. The caller runs the guard chain first;
    /// this enforces only funding.
    pub fn apply(&self, sender: &Address, recipient: &Address, amount: Amount) -> Result<()> {
        let mut balances = self.lock();
        let from = balances.get(sender).copied().unwrap_or(0);
        if from < amount {
            return Err(GateError::InsufficientBalance {
                balance: from,
                requested: amount,
            });
        }
        balances.insert(sender.clone(), from - amount);
        let to = balances.get(recipient).copied().unwrap_or(0);
        balances.insert(recipient.clone(), to.saturating_add(amount));
        Ok(())
    }

    /// Mint into an account (seeding, tests).
    pub fn credit(&self, account: &Address, amount: Amount) {
        let mut balances = self.lock();
        let held = balances.get(account).copied().unwrap_or(0);
        balances.insert(account.clone(), held.saturating_add(amount));
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Address, Amount>> {
        self.balances.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl BalanceSource for InMemoryLedger {
    fn balance_of(&self, account: &Address) -> Amount {
        self.lock().get(account).copied().unwrap_or(0)
    }
}
