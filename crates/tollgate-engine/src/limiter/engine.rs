use std::sync::{Arc, PoisonError, RwLock};

use dashmap::DashMap;

use tollgate_core::error::{GateError, Result};
use tollgate_core::types::{
    AccountPolicy, AccountStatus, Address, Amount, Headroom, RatePolicy, Transfer, UsageRecord,
};

use crate::auth::{AdminOp, Authorizer};
use crate::clock::Clock;
use crate::dispatch::GuardModule;
use crate::ledger::BalanceSource;

/// Stateful windowed quota policy; one instance per hosted ledger.
///
/// Usage is tracked per account inside fixed-length windows identified by
/// `now / window_secs`. Usage records are created lazily on the first
/// guarded transfer and superseded on rollover, never deleted. All records
/// are replaced whole per call; there is no partial-field update.
pub struct RateLimitEngine {
    /// Only this identity may reach `check`.
    ledger_id: Address,
    defaults: RwLock<RatePolicy>,
    policies: DashMap<Address, AccountPolicy>,
    usage: DashMap<Address, UsageRecord>,
    /// Pending request instants per direction; 0 means no pending request.
    pending_opt_out: DashMap<Address, u64>,
    pending_opt_in: DashMap<Address, u64>,
    balances: Arc<dyn BalanceSource>,
    auth: Arc<dyn Authorizer>,
    clock: Arc<dyn Clock>,
}

impl RateLimitEngine {
    pub fn new(
        ledger_id: Address,
        defaults: RatePolicy,
        balances: Arc<dyn BalanceSource>,
        auth: Arc<dyn Authorizer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            ledger_id,
            defaults: RwLock::new(defaults),
            policies: DashMap::new(),
            usage: DashMap::new(),
            pending_opt_out: DashMap::new(),
            pending_opt_in: DashMap::new(),
            balances,
            auth,
            clock,
        }
    }

    // ---- self-service opt protocol ----

    /// Record a pending opt-out request at the current instant, overwriting
    /// any prior pending opt-out.
    pub fn opt_out_request(&self, account: &Address) -> Result<()> {
        self.ensure_no_override(account)?;
        let now = self.clock.now();
        self.pending_opt_out.insert(account.clone(), now);
        tracing::info!(%account, now, "opt-out requested");
        Ok(())
    }

    /// Record a pending opt-in request at the current instant, overwriting
    /// any prior pending opt-in. Custom parameters are supplied at
    /// activation, not here.
    pub fn opt_in_request(&self, account: &Address) -> Result<()> {
        self.ensure_no_override(account)?;
        let now = self.clock.now();
        self.pending_opt_in.insert(account.clone(), now);
        tracing::info!(%account, now, "opt-in requested");
        Ok(())
    }

    /// Flip the account to `OptOut` once the delay has elapsed. The policy's
    /// numeric fields are left untouched; only the status changes.
    pub fn opt_out_activate(&self, account: &Address) -> Result<()> {
        self.ensure_no_override(account)?;
        let pending = self.pending_opt_out(account);
        if pending == 0 {
            return Err(GateError::OptOutNotRequested);
        }
        if pending + self.activation_delay(account) >= self.clock.now() {
            return Err(GateError::OptOutNotReady);
        }
        let mut policy = self.account_policy(account);
        policy.status = AccountStatus::OptOut;
        self.policies.insert(account.clone(), policy);
        self.pending_opt_out.insert(account.clone(), 0);
        tracing::info!(%account, "opt-out active");
        Ok(())
    }

    /// Replace the account's policy with `{window_secs, limit, OptIn}` once
    /// the delay has elapsed.
    pub fn opt_in_activate(&self, account: &Address, window_secs: u64, limit: Amount) -> Result<()> {
        self.ensure_no_override(account)?;
        let pending = self.pending_opt_in(account);
        if pending == 0 {
            return Err(GateError::OptInNotRequested);
        }
        if pending + self.activation_delay(account) >= self.clock.now() {
            return Err(GateError::OptInNotReady);
        }
        self.policies.insert(
            account.clone(),
            AccountPolicy {
                window_secs,
                limit,
                status: AccountStatus::OptIn,
            },
        );
        self.pending_opt_in.insert(account.clone(), 0);
        tracing::info!(%account, window_secs, limit, "opt-in active");
        Ok(())
    }

    // ---- admin configuration ----

    /// Replace the process-wide default policy. Unvalidated by design:
    /// `check` enforces the zero-window case lazily.
    pub fn set_default_policy(&self, caller: &Address, policy: RatePolicy) -> Result<()> {
        self.ensure_admin(caller, AdminOp::SetDefaultPolicy)?;
        *self
            .defaults
            .write()
            .unwrap_or_else(PoisonError::into_inner) = policy;
        tracing::info!(window_secs = policy.window_secs, limit = policy.limit, "default policy set");
        Ok(())
    }

    /// Replace an account's full policy record. Forcing an override status
    /// here is the only way an account enters an override state.
    pub fn set_account_policy(
        &self,
        caller: &Address,
        account: &Address,
        policy: AccountPolicy,
    ) -> Result<()> {
        self.ensure_admin(caller, AdminOp::SetAccountPolicy)?;
        self.policies.insert(account.clone(), policy);
        tracing::info!(%account, status = ?policy.status, "account policy set");
        Ok(())
    }

    /// Replace an account's usage record; an operational override used to
    /// manually clear or backdate usage.
    pub fn set_usage_record(
        &self,
        caller: &Address,
        account: &Address,
        record: UsageRecord,
    ) -> Result<()> {
        self.ensure_admin(caller, AdminOp::SetUsage)?;
        self.usage.insert(account.clone(), record);
        tracing::info!(%account, total = record.total, window_id = record.window_id, "usage record set");
        Ok(())
    }

    /// Return an account's policy to the all-zero `Default` state.
    pub fn reset_account_policy(&self, caller: &Address, account: &Address) -> Result<()> {
        self.ensure_admin(caller, AdminOp::ResetAccountPolicy)?;
        self.policies.remove(account);
        tracing::info!(%account, "account policy reset");
        Ok(())
    }

    // ---- read-only views ----

    pub fn default_policy(&self) -> RatePolicy {
        *self.defaults.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn account_policy(&self, account: &Address) -> AccountPolicy {
        self.policies.get(account).map(|p| *p).unwrap_or_default()
    }

    pub fn usage_record(&self, account: &Address) -> UsageRecord {
        self.usage.get(account).map(|u| *u).unwrap_or_default()
    }

    pub fn pending_opt_out(&self, account: &Address) -> u64 {
        self.pending_opt_out.get(account).map(|t| *t).unwrap_or(0)
    }

    pub fn pending_opt_in(&self, account: &Address) -> u64 {
        self.pending_opt_in.get(account).map(|t| *t).unwrap_or(0)
    }

    /// Volume still transferable right now; mirrors `check`'s policy
    /// resolution without mutating anything.
    pub fn available_to_transfer(&self, account: &Address) -> Headroom {
        let Some(policy) = self.effective_policy(account) else {
            return Headroom::Unlimited;
        };
        if policy.window_secs == 0 {
            return Headroom::Limited(0);
        }
        let window_id = self.clock.now() / policy.window_secs;
        let stored = self.usage_record(account);
        if stored.window_id != window_id {
            return Headroom::Limited(policy.limit);
        }
        Headroom::Limited(policy.limit.saturating_sub(stored.total))
    }

    /// Instant the account's live window ends, or `now` when there is no
    /// live window (stale id or zero usage) and a transfer would start
    /// fresh.
    pub fn next_window_at(&self, account: &Address) -> u64 {
        let now = self.clock.now();
        let Some(policy) = self.effective_policy(account) else {
            return now;
        };
        if policy.window_secs == 0 {
            return now;
        }
        let stored = self.usage_record(account);
        if stored.window_id != now / policy.window_secs || stored.total == 0 {
            return now;
        }
        stored
            .window_id
            .saturating_add(1)
            .saturating_mul(policy.window_secs)
    }

    // ---- resolution helpers ----

    /// `{window, limit}` currently governing the account, or `None` when it
    /// bypasses quota tracking entirely.
    fn effective_policy(&self, account: &Address) -> Option<RatePolicy> {
        let policy = self.account_policy(account);
        if policy.status.bypasses_quota() {
            return None;
        }
        if policy.status.uses_account_policy() {
            Some(RatePolicy {
                window_secs: policy.window_secs,
                limit: policy.limit,
            })
        } else {
            Some(self.default_policy())
        }
    }

    /// Delay an activation must wait out: the account's own window while it
    /// is governed by its own policy, the default window otherwise. Anchoring
    /// to the governing cadence keeps self-service transitions from being
    /// instantaneous.
    fn activation_delay(&self, account: &Address) -> u64 {
        let policy = self.account_policy(account);
        if policy.status.uses_account_policy() {
            policy.window_secs
        } else {
            self.default_policy().window_secs
        }
    }

    fn ensure_no_override(&self, account: &Address) -> Result<()> {
        if self.account_policy(account).status.is_override() {
            return Err(GateError::OverrideActive);
        }
        Ok(())
    }

    fn ensure_admin(&self, caller: &Address, op: AdminOp) -> Result<()> {
        if !self.auth.permit(caller, op) {
            return Err(GateError::Unauthorized);
        }
        Ok(())
    }
}

impl GuardModule for RateLimitEngine {
    fn name(&self) -> &'static str {
        "rate_limit"
    }

    /// The module contract invoked by the dispatcher on every transfer.
    ///
    /// Opted-out senders pass without any usage read or write. Otherwise the
    /// sender's cumulative window usage plus the proposed amount must stay
    /// within the effective limit; the boundary is inclusive. Rollover is
    /// detected purely by window-id comparison, so partial windows never
    /// carry a fraction of quota over.
    fn check(&self, origin: &Address, tx: &Transfer) -> Result<()> {
        if *origin != self.ledger_id {
            return Err(GateError::UnauthorizedCaller);
        }
        let Some(policy) = self.effective_policy(&tx.sender) else {
            return Ok(());
        };
        if policy.window_secs == 0 {
            return Err(GateError::PolicyWindowZero);
        }
        let window_id = self.clock.now() / policy.window_secs;
        let balance = self.balances.balance_of(&tx.sender);
        let stored = self.usage_record(&tx.sender);
        let stale = stored.window_id != window_id;

        // Fast path: an account whose whole balance fits under the limit
        // cannot overdraw the window, so it skips quota bookkeeping and
        // usage stays unwritten on a fresh window or an untouched one.
        if balance <= policy.limit && (stale || stored.total == 0) {
            tracing::debug!(sender = %tx.sender, balance, limit = policy.limit, "quota bypass");
            return Ok(());
        }

        let used = if stale { 0 } else { stored.total };
        let new_total = used.saturating_add(tx.amount);
        if new_total > policy.limit {
            return Err(GateError::QuotaExceeded {
                used,
                requested: tx.amount,
                limit: policy.limit,
            });
        }
        self.usage.insert(
            tx.sender.clone(),
            UsageRecord {
                total: new_total,
                window_id,
            },
        );
        tracing::debug!(sender = %tx.sender, total = new_total, window_id, "usage committed");
        Ok(())
    }
}
