//! Axum router wiring for the operations surface.
//!
//! Self-service and admin callers identify themselves with the `x-caller`
//! header; capability checks happen inside the engine and dispatcher, not
//! here. Failures map to the stable `ErrorCode` strings.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;

use tollgate_core::error::{ErrorCode, GateError};
use tollgate_core::types::{
    AccountPolicy, Address, Amount, Headroom, RatePolicy, UsageRecord,
};

use crate::app_state::AppState;
use crate::ledger::BalanceSource;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/transfer", post(transfer))
        .route("/v1/policy", get(default_policy))
        .route("/v1/guards", get(guards))
        .route("/v1/accounts/:id", get(account))
        .route("/v1/accounts/:id/opt-out/request", post(opt_out_request))
        .route("/v1/accounts/:id/opt-out/activate", post(opt_out_activate))
        .route("/v1/accounts/:id/opt-in/request", post(opt_in_request))
        .route("/v1/accounts/:id/opt-in/activate", post(opt_in_activate))
        .route("/v1/admin/policy", put(set_default_policy))
        .route(
            "/v1/admin/accounts/:id/policy",
            put(set_account_policy).delete(reset_account_policy),
        )
        .route("/v1/admin/accounts/:id/usage", put(set_usage))
        .route(
            "/v1/admin/guards/:name",
            post(add_guard).delete(remove_guard),
        )
        .with_state(state)
}

/// Wire-facing failure: stable code plus human-readable message.
struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    fn not_found(message: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code: "NOT_FOUND",
            message: message.to_string(),
        }
    }
}

impl From<GateError> for ApiError {
    fn from(err: GateError) -> Self {
        let code = err.code();
        let status = match code {
            ErrorCode::Unauthorized | ErrorCode::UnauthorizedCaller | ErrorCode::GuardRejected => {
                StatusCode::FORBIDDEN
            }
            ErrorCode::QuotaExceeded => StatusCode::TOO_MANY_REQUESTS,
            ErrorCode::InsufficientBalance | ErrorCode::Config => StatusCode::BAD_REQUEST,
            ErrorCode::OverrideActive
            | ErrorCode::OptOutNotRequested
            | ErrorCode::OptOutNotReady
            | ErrorCode::OptInNotRequested
            | ErrorCode::OptInNotReady => StatusCode::CONFLICT,
            ErrorCode::PolicyWindowZero | ErrorCode::ReentrantCheck | ErrorCode::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            code: code.as_str(),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.code, "message": self.message }));
        (self.status, body).into_response()
    }
}

fn caller(headers: &HeaderMap) -> Result<Address, ApiError> {
    headers
        .get("x-caller")
        .and_then(|v| v.to_str().ok())
        .map(Address::from)
        .ok_or_else(|| ApiError::from(GateError::Unauthorized))
}

/// Self-service endpoints act on the caller's own account only.
fn self_caller(headers: &HeaderMap, id: &Address) -> Result<(), ApiError> {
    if caller(headers)? != *id {
        return Err(ApiError::from(GateError::Unauthorized));
    }
    Ok(())
}

#[derive(Deserialize)]
struct TransferReq {
    sender: Address,
    recipient: Address,
    amount: Amount,
}

async fn transfer(
    State(state): State<AppState>,
    Json(req): Json<TransferReq>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.transfer(&req.sender, &req.recipient, req.amount)?;
    Ok(Json(json!({ "ok": true })))
}

async fn default_policy(State(state): State<AppState>) -> Json<RatePolicy> {
    Json(state.engine().default_policy())
}

async fn guards(State(state): State<AppState>) -> Json<Vec<&'static str>> {
    Json(state.dispatcher().modules())
}

#[derive(Serialize)]
struct AccountView {
    policy: AccountPolicy,
    usage: UsageRecord,
    pending_opt_out: u64,
    pending_opt_in: u64,
    headroom: Headroom,
    next_window_at: u64,
    balance: Amount,
}

async fn account(State(state): State<AppState>, Path(id): Path<Address>) -> Json<AccountView> {
    let engine = state.engine();
    Json(AccountView {
        policy: engine.account_policy(&id),
        usage: engine.usage_record(&id),
        pending_opt_out: engine.pending_opt_out(&id),
        pending_opt_in: engine.pending_opt_in(&id),
        headroom: engine.available_to_transfer(&id),
        next_window_at: engine.next_window_at(&id),
        balance: state.ledger().balance_of(&id),
    })
}

async fn opt_out_request(
    State(state): State<AppState>,
    Path(id): Path<Address>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    self_caller(&headers, &id)?;
    state.engine().opt_out_request(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn opt_out_activate(
    State(state): State<AppState>,
    Path(id): Path<Address>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    self_caller(&headers, &id)?;
    state.engine().opt_out_activate(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn opt_in_request(
    State(state): State<AppState>,
    Path(id): Path<Address>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    self_caller(&headers, &id)?;
    state.engine().opt_in_request(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct OptInReq {
    window_secs: u64,
    limit: Amount,
}

async fn opt_in_activate(
    State(state): State<AppState>,
    Path(id): Path<Address>,
    headers: HeaderMap,
    Json(req): Json<OptInReq>,
) -> Result<StatusCode, ApiError> {
    self_caller(&headers, &id)?;
    state
        .engine()
        .opt_in_activate(&id, req.window_secs, req.limit)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn set_default_policy(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(policy): Json<RatePolicy>,
) -> Result<StatusCode, ApiError> {
    let admin = caller(&headers)?;
    state.engine().set_default_policy(&admin, policy)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn set_account_policy(
    State(state): State<AppState>,
    Path(id): Path<Address>,
    headers: HeaderMap,
    Json(policy): Json<AccountPolicy>,
) -> Result<StatusCode, ApiError> {
    let admin = caller(&headers)?;
    state.engine().set_account_policy(&admin, &id, policy)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn reset_account_policy(
    State(state): State<AppState>,
    Path(id): Path<Address>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let admin = caller(&headers)?;
    state.engine().reset_account_policy(&admin, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn set_usage(
    State(state): State<AppState>,
    Path(id): Path<Address>,
    headers: HeaderMap,
    Json(record): Json<UsageRecord>,
) -> Result<StatusCode, ApiError> {
    let admin = caller(&headers)?;
    state.engine().set_usage_record(&admin, &id, record)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_guard(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let admin = caller(&headers)?;
    let module = state
        .builtin(&name)
        .ok_or_else(|| ApiError::not_found("unknown guard"))?;
    state.dispatcher().add_module(&admin, module)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn remove_guard(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let admin = caller(&headers)?;
    state.dispatcher().remove_module(&admin, &name)?;
    Ok(StatusCode::NO_CONTENT)
}
