//! Shared application state: configuration compiled into the wired
//! admission stack.

use std::sync::{Arc, Mutex, PoisonError};

use tollgate_core::error::{GateError, Result};
use tollgate_core::types::{Address, Amount, Transfer};

use crate::auth::StaticAuthorizer;
use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::dispatch::{GuardDispatcher, GuardModule};
use crate::guards::DenylistGuard;
use crate::ledger::{BalanceSource, InMemoryLedger};
use crate::limiter::RateLimitEngine;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    listen: String,
    ledger: Arc<InMemoryLedger>,
    dispatcher: Arc<GuardDispatcher>,
    engine: Arc<RateLimitEngine>,
    /// Module handles kept for re-registration through the ops surface.
    builtins: Vec<Arc<dyn GuardModule>>,
    /// Serializes guarded transfers: chain plus balance move run as one
    /// unit with no observable intermediate state.
    transfer_lock: Mutex<()>,
}

impl AppState {
    /// Build application state from a validated config, on the wall clock.
    pub fn new(cfg: EngineConfig) -> Result<Self> {
        Self::with_clock(cfg, Arc::new(SystemClock))
    }

    /// Same wiring with an injected clock (tests, simulations).
    pub fn with_clock(cfg: EngineConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let root = cfg
            .admins
            .first()
            .cloned()
            .ok_or_else(|| GateError::Config("admins must not be empty".into()))?;
        let auth = Arc::new(StaticAuthorizer::new(cfg.admins.clone()));
        let ledger = Arc::new(InMemoryLedger::new(cfg.ledger.clone(), cfg.balances.clone()));

        let engine = Arc::new(RateLimitEngine::new(
            cfg.ledger.clone(),
            cfg.default_policy,
            Arc::clone(&ledger) as Arc<dyn BalanceSource>,
            auth.clone(),
            clock,
        ));
        for entry in &cfg.accounts {
            engine.set_account_policy(&root, &entry.id, entry.policy)?;
        }

        let dispatcher = Arc::new(GuardDispatcher::new(auth));
        let denylist: Arc<dyn GuardModule> =
            Arc::new(DenylistGuard::new(cfg.denylist.iter().cloned()));
        let limiter: Arc<dyn GuardModule> = engine.clone();
        // Pure screens run ahead of the side-effecting limiter so a rejected
        // chain leaves no usage residue.
        dispatcher.install(denylist.clone());
        dispatcher.install(limiter.clone());

        tracing::info!(ledger = %cfg.ledger, guards = ?dispatcher.modules(), "admission stack wired");

        Ok(Self {
            inner: Arc::new(AppStateInner {
                listen: cfg.service.listen.clone(),
                ledger,
                dispatcher,
                engine,
                builtins: vec![denylist, limiter],
                transfer_lock: Mutex::new(()),
            }),
        })
    }

    pub fn listen(&self) -> &str {
        &self.inner.listen
    }

    pub fn ledger(&self) -> &Arc<InMemoryLedger> {
        &self.inner.ledger
    }

    pub fn dispatcher(&self) -> &Arc<GuardDispatcher> {
        &self.inner.dispatcher
    }

    pub fn engine(&self) -> &Arc<RateLimitEngine> {
        &self.inner.engine
    }

    /// Built-in module handle by name, for re-registration over the ops
    /// surface. Arbitrary module injection stays a library-level operation.
    pub fn builtin(&self, name: &str) -> Option<Arc<dyn GuardModule>> {
        self.inner
            .builtins
            .iter()
            .find(|m| m.name() == name)
            .cloned()
    }

    /// One guarded transfer: funding check, then the guard chain, then the
    /// balance move, all under the transfer lock. Transfers serialize and a
    /// rejection at any step leaves every balance and counter untouched.
    pub fn transfer(&self, sender: &Address, recipient: &Address, amount: Amount) -> Result<()> {
        let _serial = self
            .inner
            .transfer_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        self.inner.ledger.ensure_funded(sender, amount)?;
        let tx = Transfer {
            sender: sender.clone(),
            recipient: recipient.clone(),
            amount,
        };
        self.inner.dispatcher.check(self.inner.ledger.id(), &tx)?;
        self.inner.ledger.apply(sender, recipient, amount)
    }
}
