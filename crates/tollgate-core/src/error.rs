//! Shared error type across tollgate crates.

use thiserror::Error;

use crate::types::Amount;

/// Stable machine-readable rejection codes (wire API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// `check` reached from outside the registered ledger.
    UnauthorizedCaller,
    /// Cumulative window usage would exceed the effective limit.
    QuotaExceeded,
    /// Effective window length is zero; the rate is undefined.
    PolicyWindowZero,
    /// Self-service opt operation while an admin override is pinned.
    OverrideActive,
    /// Opt-out activation without a pending request.
    OptOutNotRequested,
    /// Opt-out activation before the delay has elapsed.
    OptOutNotReady,
    /// Opt-in activation without a pending request.
    OptInNotRequested,
    /// Opt-in activation before the delay has elapsed.
    OptInNotReady,
    /// Capability gate denied an admin operation.
    Unauthorized,
    /// Guard chain re-entered during its own invocation.
    ReentrantCheck,
    /// A non-core guard module rejected the transfer.
    GuardRejected,
    /// Sender cannot fund the transfer.
    InsufficientBalance,
    /// Configuration failed strict parsing or validation.
    Config,
    /// Internal error.
    Internal,
}

impl ErrorCode {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::UnauthorizedCaller => "UNAUTHORIZED_CALLER",
            ErrorCode::QuotaExceeded => "QUOTA_EXCEEDED",
            ErrorCode::PolicyWindowZero => "POLICY_WINDOW_ZERO",
            ErrorCode::OverrideActive => "OVERRIDE_ACTIVE",
            ErrorCode::OptOutNotRequested => "OPT_OUT_NOT_REQUESTED",
            ErrorCode::OptOutNotReady => "OPT_OUT_NOT_READY",
            ErrorCode::OptInNotRequested => "OPT_IN_NOT_REQUESTED",
            ErrorCode::OptInNotReady => "OPT_IN_NOT_READY",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::ReentrantCheck => "REENTRANT_CHECK",
            ErrorCode::GuardRejected => "GUARD_REJECTED",
            ErrorCode::InsufficientBalance => "INSUFFICIENT_BALANCE",
            ErrorCode::Config => "CONFIG",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, GateError>;

/// Unified error type used by the engine, dispatcher, and hosts.
///
/// Every variant identifies exactly one failed precondition; a failure always
/// aborts its triggering operation (and, via the dispatcher and the ledger,
/// the enclosing transfer) with no partial mutation.
#[derive(Debug, Error)]
pub enum GateError {
    #[error("caller is not the registered ledger")]
    UnauthorizedCaller,
    #[error("quota exceeded: {used} used + {requested} requested over limit {limit}")]
    QuotaExceeded {
        used: Amount,
        requested: Amount,
        limit: Amount,
    },
    #[error("effective policy has a zero window")]
    PolicyWindowZero,
    #[error("admin override active")]
    OverrideActive,
    #[error("opt-out not requested")]
    OptOutNotRequested,
    #[error("opt-out not ready")]
    OptOutNotReady,
    #[error("opt-in not requested")]
    OptInNotRequested,
    #[error("opt-in not ready")]
    OptInNotReady,
    #[error("not authorized for this operation")]
    Unauthorized,
    #[error("guard chain re-entered")]
    ReentrantCheck,
    #[error("rejected by guard {guard}: {reason}")]
    GuardRejected { guard: &'static str, reason: String },
    #[error("insufficient balance: {balance} available, {requested} requested")]
    InsufficientBalance { balance: Amount, requested: Amount },
    #[error("config: {0}")]
    Config(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl GateError {
    /// Map to the stable wire-facing code.
    pub fn code(&self) -> ErrorCode {
        match self {
            GateError::UnauthorizedCaller => ErrorCode::UnauthorizedCaller,
            GateError::QuotaExceeded { .. } => ErrorCode::QuotaExceeded,
            GateError::PolicyWindowZero => ErrorCode::PolicyWindowZero,
            GateError::OverrideActive => ErrorCode::OverrideActive,
            GateError::OptOutNotRequested => ErrorCode::OptOutNotRequested,
            GateError::OptOutNotReady => ErrorCode::OptOutNotReady,
            GateError::OptInNotRequested => ErrorCode::OptInNotRequested,
            GateError::OptInNotReady => ErrorCode::OptInNotReady,
            GateError::Unauthorized => ErrorCode::Unauthorized,
            GateError::ReentrantCheck => ErrorCode::ReentrantCheck,
            GateError::GuardRejected { .. } => ErrorCode::GuardRejected,
            GateError::InsufficientBalance { .. } => ErrorCode::InsufficientBalance,
            GateError::Config(_) => ErrorCode::Config,
            GateError::Internal(_) => ErrorCode::Internal,
        }
    }
}
