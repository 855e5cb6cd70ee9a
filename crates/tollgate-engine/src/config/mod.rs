//! Engine config loader (strict parsing).

pub mod schema;

use std::fs;

use tollgate_core::error::{GateError, Result};

pub use schema::{AccountEntry, EngineConfig, ServiceSection};

pub fn load_from_file(path: &str) -> Result<EngineConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| GateError::Internal(format!("read config failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<EngineConfig> {
    let cfg: EngineConfig =
        serde_yaml::from_str(s).map_err(|e| GateError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
