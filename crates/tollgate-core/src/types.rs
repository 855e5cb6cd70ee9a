//! Domain types for the admission pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Token amount / quota volume.
pub type Amount = u64;

/// Opaque participant identity: an account, a ledger, or an operator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Per-account standing with respect to the rate limiter.
///
/// `Default` follows the process-wide default policy. `OptIn`/`OptOut` are
/// self-elected through the delayed request/activate protocol. The override
/// variants are admin-only pins: they behave like their plain counterparts
/// and additionally freeze the account's own opt operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    #[default]
    Default,
    OptIn,
    OptOut,
    OptInOverride,
    OptOutOverride,
}

impl AccountStatus {
    /// Admin-pinned variants; self-service opt operations are rejected.
    pub fn is_override(self) -> bool {
        matches!(self, Self::OptInOverride | Self::OptOutOverride)
    }

    /// Variants exempt from quota tracking entirely.
    pub fn bypasses_quota(self) -> bool {
        matches!(self, Self::OptOut | Self::OptOutOverride)
    }

    /// Variants governed by the account's own policy numbers.
    pub fn uses_account_policy(self) -> bool {
        matches!(self, Self::OptIn | Self::OptInOverride)
    }
}

/// Window length plus volume cap. The process-wide default policy has this
/// shape; so does the effective policy resolved per check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatePolicy {
    pub window_secs: u64,
    pub limit: Amount,
}

/// Per-account policy record. Stays all-zero with `Default` status until the
/// account opts in or an admin pins it; reset returns it to that state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccountPolicy {
    pub window_secs: u64,
    pub limit: Amount,
    pub status: AccountStatus,
}

/// Cumulative transfer volume inside one window.
///
/// Only valid while `window_id` equals the id derived from the account's
/// current governing policy; a mismatch means the window rolled over and
/// usage is implicitly zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UsageRecord {
    pub total: Amount,
    pub window_id: u64,
}

/// A proposed transfer, as presented to every guard check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub sender: Address,
    pub recipient: Address,
    pub amount: Amount,
}

/// Volume still transferable in the current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "amount")]
pub enum Headroom {
    /// The account bypasses rate limiting; no bound applies.
    Unlimited,
    Limited(Amount),
}
