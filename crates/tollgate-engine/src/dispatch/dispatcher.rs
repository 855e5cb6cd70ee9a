use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tollgate_core::error::{GateError, Result};
use tollgate_core::types::{Address, Transfer};

use crate::auth::{AdminOp, Authorizer};

/// A single pass/fail screen over a proposed transfer.
///
/// Checks are synchronous: one transfer is one serialized operation and a
/// check never awaits. A module may record side effects (the rate limiter
/// mutates its usage counters); because the dispatcher stops at the first
/// failure, side effects of earlier modules in the same call are best-effort
/// partial, and the host must abort the enclosing transfer as a whole.
pub trait GuardModule: Send + Sync {
    /// Stable registry name; also the duplicate-membership key.
    fn name(&self) -> &'static str;

    /// Screen one transfer. `origin` is the identity of the calling ledger.
    fn check(&self, origin: &Address, tx: &Transfer) -> Result<()>;
}

/// Ordered, duplicate-free registry of guard modules, run against every
/// transfer on the ledger's pre-transfer path.
pub struct GuardDispatcher {
    auth: Arc<dyn Authorizer>,
    modules: Mutex<Vec<Arc<dyn GuardModule>>>,
    in_check: AtomicBool,
}

impl GuardDispatcher {
    pub fn new(auth: Arc<dyn Authorizer>) -> Self {
        Self {
            auth,
            modules: Mutex::new(Vec::new()),
            in_check: AtomicBool::new(false),
        }
    }

    /// Append a module to the dispatch order. Admin-gated; adding a name
    /// that is already registered is a no-op.
    pub fn add_module(&self, caller: &Address, module: Arc<dyn GuardModule>) -> Result<()> {
        if !self.auth.permit(caller, AdminOp::GuardAdmin) {
            return Err(GateError::Unauthorized);
        }
        tracing::info!(guard = module.name(), "guard registered");
        self.install(module);
        Ok(())
    }

    /// Remove a module by name, preserving the relative order of the rest.
    /// Admin-gated; an absent name is a no-op.
    pub fn remove_module(&self, caller: &Address, name: &str) -> Result<()> {
        if !self.auth.permit(caller, AdminOp::GuardAdmin) {
            return Err(GateError::Unauthorized);
        }
        self.lock().retain(|m| m.name() != name);
        tracing::info!(guard = name, "guard removed");
        Ok(())
    }

    /// Ungated registration used while wiring the process at boot.
    pub(crate) fn install(&self, module: Arc<dyn GuardModule>) {
        let mut modules = self.lock();
        if modules.iter().any(|m| m.name() == module.name()) {
            return;
        }
        modules.push(module);
    }

    /// Registered module names in dispatch order.
    pub fn modules(&self) -> Vec<&'static str> {
        self.lock().iter().map(|m| m.name()).collect()
    }

    /// Run every registered module in registration order against one
    /// transfer.
    ///
    /// Ungated: this is the ledger's pre-transfer hook. The first failure
    /// stops iteration immediately and is propagated verbatim; later modules
    /// are never invoked. With zero registered modules the check succeeds.
    ///
    /// The chain is non-reentrant: a module that calls back into `check`
    /// during its own check fails with `ReentrantCheck`.
    pub fn check(&self, origin: &Address, tx: &Transfer) -> Result<()> {
        if self.in_check.swap(true, Ordering::Acquire) {
            return Err(GateError::ReentrantCheck);
        }
        let out = self.run_chain(origin, tx);
        self.in_check.store(false, Ordering::Release);
        out
    }

    fn run_chain(&self, origin: &Address, tx: &Transfer) -> Result<()> {
        // Snapshot the chain so modules never run under the registry lock.
        let modules: Vec<Arc<dyn GuardModule>> = self.lock().clone();
        for module in modules {
            if let Err(e) = module.check(origin, tx) {
                tracing::warn!(
                    guard = module.name(),
                    sender = %tx.sender,
                    recipient = %tx.recipient,
                    amount = tx.amount,
                    error = %e,
                    "transfer rejected"
                );
                return Err(e);
            }
        }
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Arc<dyn GuardModule>>> {
        // Poisoning cannot corrupt the registry; keep serving it.
        self.modules.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
