use std::collections::HashMap;

use serde::Deserialize;

use tollgate_core::error::{GateError, Result};
use tollgate_core::types::{AccountPolicy, Address, Amount, RatePolicy};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    pub version: u32,

    #[serde(default)]
    pub service: ServiceSection,

    /// Identity the hosting ledger presents on the pre-transfer hook.
    pub ledger: Address,

    /// Operators granted every admin capability.
    pub admins: Vec<Address>,

    pub default_policy: RatePolicy,

    /// Accounts pre-provisioned with a policy (including override pins).
    #[serde(default)]
    pub accounts: Vec<AccountEntry>,

    /// Demo ledger opening balances.
    #[serde(default)]
    pub balances: HashMap<Address, Amount>,

    /// Addresses screened by the denylist guard.
    #[serde(default)]
    pub denylist: Vec<Address>,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(GateError::Config("unsupported config version".into()));
        }
        if self.ledger.as_str().is_empty() {
            return Err(GateError::Config("ledger must not be empty".into()));
        }
        if self.admins.is_empty() {
            return Err(GateError::Config("admins must not be empty".into()));
        }
        if self.default_policy.window_secs == 0 {
            return Err(GateError::Config(
                "default_policy.window_secs must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceSection {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccountEntry {
    pub id: Address,
    pub policy: AccountPolicy,
}
