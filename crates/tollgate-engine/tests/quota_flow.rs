#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;

use tollgate_core::error::GateError;
use tollgate_core::types::{
    AccountPolicy, AccountStatus, Address, Headroom, RatePolicy, Transfer, UsageRecord,
};
use tollgate_engine::app_state::AppState;
use tollgate_engine::clock::{Clock, ManualClock};
use tollgate_engine::config;
use tollgate_engine::dispatch::GuardModule;
use tollgate_engine::ledger::BalanceSource;

const START: u64 = 1_000_000;
const DAY: u64 = 86_400;

fn addr(id: &str) -> Address {
    Address::from(id)
}

fn harness() -> (AppState, Arc<ManualClock>) {
    let cfg = config::load_from_str(
        r#"
version: 1
ledger: "ledger:main"
admins: ["ops:root"]
default_policy: { window_secs: 86400, limit: 1000 }
accounts:
  - id: "acct:market"
    policy: { window_secs: 3600, limit: 50000, status: opt_in_override }
balances:
  "acct:alice": 10000
  "acct:carol": 10000
  "acct:market": 100000
  "acct:poor": 500
denylist: ["acct:frozen"]
"#,
    )
    .expect("config must parse");
    let clock = Arc::new(ManualClock::new(START));
    let state = AppState::with_clock(cfg, clock.clone()).expect("state must build");
    (state, clock)
}

#[test]
fn quota_accumulates_and_rejects_over_limit() {
    let (state, _clock) = harness();
    let (alice, bob) = (addr("acct:alice"), addr("acct:bob"));

    state.transfer(&alice, &bob, 600).unwrap();
    assert_eq!(state.engine().usage_record(&alice).total, 600);

    let err = state.transfer(&alice, &bob, 500).unwrap_err();
    assert!(matches!(
        err,
        GateError::QuotaExceeded {
            used: 600,
            requested: 500,
            limit: 1000,
        }
    ));

    // rejection leaves every balance and counter untouched
    assert_eq!(state.engine().usage_record(&alice).total, 600);
    assert_eq!(state.ledger().balance_of(&alice), 9400);
    assert_eq!(state.ledger().balance_of(&bob), 600);
}

#[test]
fn quota_boundary_is_inclusive() {
    let (state, _clock) = harness();
    let (alice, bob) = (addr("acct:alice"), addr("acct:bob"));

    state.transfer(&alice, &bob, 600).unwrap();
    state.transfer(&alice, &bob, 400).unwrap();
    assert_eq!(state.engine().usage_record(&alice).total, 1000);

    let err = state.transfer(&alice, &bob, 1).unwrap_err();
    assert!(matches!(err, GateError::QuotaExceeded { .. }));
}

#[test]
fn window_rollover_resets_usage() {
    let (state, clock) = harness();
    let (alice, bob) = (addr("acct:alice"), addr("acct:bob"));

    state.transfer(&alice, &bob, 900).unwrap();
    clock.advance(DAY);

    state.transfer(&alice, &bob, 700).unwrap();
    let usage = state.engine().usage_record(&alice);
    assert_eq!(usage.total, 700);
    assert_eq!(usage.window_id, (START + DAY) / DAY);
}

#[test]
fn opted_out_accounts_are_never_tracked() {
    let (state, _clock) = harness();
    let (root, bob) = (addr("ops:root"), addr("acct:bob"));

    for (account, status) in [
        (addr("acct:alice"), AccountStatus::OptOut),
        (addr("acct:carol"), AccountStatus::OptOutOverride),
    ] {
        state
            .engine()
            .set_account_policy(
                &root,
                &account,
                AccountPolicy {
                    window_secs: 0,
                    limit: 0,
                    status,
                },
            )
            .unwrap();
        state.transfer(&account, &bob, 5000).unwrap();
        assert_eq!(state.engine().usage_record(&account), UsageRecord::default());
        assert_eq!(
            state.engine().available_to_transfer(&account),
            Headroom::Unlimited
        );
    }
}

#[test]
fn low_balance_fast_path_skips_bookkeeping() {
    let (state, _clock) = harness();
    let (poor, bob) = (addr("acct:poor"), addr("acct:bob"));

    // fresh window, balance at the limit boundary: spend it all in pieces
    state.transfer(&poor, &bob, 200).unwrap();
    state.transfer(&poor, &bob, 300).unwrap();

    assert_eq!(state.engine().usage_record(&poor), UsageRecord::default());
    assert_eq!(state.ledger().balance_of(&poor), 0);
}

#[test]
fn opt_out_two_phase_delay() {
    let (state, clock) = harness();
    let engine = state.engine();
    let alice = addr("acct:alice");

    engine.opt_out_request(&alice).unwrap();
    assert_eq!(engine.pending_opt_out(&alice), START);

    let err = engine.opt_out_activate(&alice).unwrap_err();
    assert!(matches!(err, GateError::OptOutNotReady));

    // the instant `request + window` itself is still too early
    clock.advance(DAY);
    let err = engine.opt_out_activate(&alice).unwrap_err();
    assert!(matches!(err, GateError::OptOutNotReady));

    clock.advance(1);
    engine.opt_out_activate(&alice).unwrap();
    assert_eq!(engine.account_policy(&alice).status, AccountStatus::OptOut);
    assert_eq!(engine.pending_opt_out(&alice), 0);

    // the pending timestamp was consumed
    let err = engine.opt_out_activate(&alice).unwrap_err();
    assert!(matches!(err, GateError::OptOutNotRequested));
}

#[test]
fn activation_without_request_fails() {
    let (state, _clock) = harness();
    let engine = state.engine();
    let alice = addr("acct:alice");

    assert!(matches!(
        engine.opt_out_activate(&alice).unwrap_err(),
        GateError::OptOutNotRequested
    ));
    assert!(matches!(
        engine.opt_in_activate(&alice, 3600, 50).unwrap_err(),
        GateError::OptInNotRequested
    ));
}

#[test]
fn override_freezes_self_service() {
    let (state, clock) = harness();
    let engine = state.engine();
    let (root, alice) = (addr("ops:root"), addr("acct:alice"));

    // a pending request does not survive an admin pin
    engine.opt_out_request(&alice).unwrap();
    engine
        .set_account_policy(
            &root,
            &alice,
            AccountPolicy {
                window_secs: 3600,
                limit: 100,
                status: AccountStatus::OptInOverride,
            },
        )
        .unwrap();
    clock.advance(DAY + 1);

    assert!(matches!(
        engine.opt_out_request(&alice).unwrap_err(),
        GateError::OverrideActive
    ));
    assert!(matches!(
        engine.opt_in_request(&alice).unwrap_err(),
        GateError::OverrideActive
    ));
    assert!(matches!(
        engine.opt_out_activate(&alice).unwrap_err(),
        GateError::OverrideActive
    ));
    assert!(matches!(
        engine.opt_in_activate(&alice, 60, 1).unwrap_err(),
        GateError::OverrideActive
    ));

    // the pre-provisioned override account is frozen from boot
    assert!(matches!(
        engine.opt_out_request(&addr("acct:market")).unwrap_err(),
        GateError::OverrideActive
    ));
}

#[test]
fn opt_in_activation_installs_policy_and_anchors_delay() {
    let (state, clock) = harness();
    let engine = state.engine();
    let (alice, bob) = (addr("acct:alice"), addr("acct:bob"));

    engine.opt_in_request(&alice).unwrap();
    clock.advance(DAY + 1);
    engine.opt_in_activate(&alice, 3600, 50).unwrap();
    assert_eq!(
        engine.account_policy(&alice),
        AccountPolicy {
            window_secs: 3600,
            limit: 50,
            status: AccountStatus::OptIn,
        }
    );
    assert_eq!(engine.pending_opt_in(&alice), 0);

    // the custom limit now governs checks
    let err = state.transfer(&alice, &bob, 60).unwrap_err();
    assert!(matches!(err, GateError::QuotaExceeded { limit: 50, .. }));
    state.transfer(&alice, &bob, 50).unwrap();

    // a later opt-out waits out the account's own window, not the default
    engine.opt_out_request(&alice).unwrap();
    clock.advance(3600);
    assert!(matches!(
        engine.opt_out_activate(&alice).unwrap_err(),
        GateError::OptOutNotReady
    ));
    clock.advance(1);
    engine.opt_out_activate(&alice).unwrap();
    assert_eq!(engine.account_policy(&alice).status, AccountStatus::OptOut);
    // opt-out flips only the status; the numbers stay
    assert_eq!(engine.account_policy(&alice).window_secs, 3600);
    assert_eq!(engine.account_policy(&alice).limit, 50);
}

#[test]
fn zero_window_policy_is_rejected() {
    let (state, clock) = harness();
    let engine = state.engine();
    let (root, carol, bob) = (addr("ops:root"), addr("acct:carol"), addr("acct:bob"));

    engine
        .set_account_policy(
            &root,
            &carol,
            AccountPolicy {
                window_secs: 0,
                limit: 500,
                status: AccountStatus::OptIn,
            },
        )
        .unwrap();

    let err = state.transfer(&carol, &bob, 10).unwrap_err();
    assert!(matches!(err, GateError::PolicyWindowZero));
    assert_eq!(engine.available_to_transfer(&carol), Headroom::Limited(0));
    assert_eq!(engine.next_window_at(&carol), clock.now());
}

#[test]
fn headroom_and_next_window_views() {
    let (state, _clock) = harness();
    let engine = state.engine();
    let (alice, bob) = (addr("acct:alice"), addr("acct:bob"));

    // no live window yet: full limit, next window is "now"
    assert_eq!(engine.available_to_transfer(&alice), Headroom::Limited(1000));
    assert_eq!(engine.next_window_at(&alice), START);

    state.transfer(&alice, &bob, 600).unwrap();
    assert_eq!(engine.available_to_transfer(&alice), Headroom::Limited(400));
    assert_eq!(engine.next_window_at(&alice), (START / DAY + 1) * DAY);

    // over-consumption never reports negative headroom
    engine
        .set_usage_record(
            &addr("ops:root"),
            &alice,
            UsageRecord {
                total: 5000,
                window_id: START / DAY,
            },
        )
        .unwrap();
    assert_eq!(engine.available_to_transfer(&alice), Headroom::Limited(0));
}

#[test]
fn denylist_blocks_before_limiter_runs() {
    let (state, _clock) = harness();
    let (alice, frozen) = (addr("acct:alice"), addr("acct:frozen"));

    let err = state.transfer(&alice, &frozen, 100).unwrap_err();
    assert!(matches!(
        err,
        GateError::GuardRejected {
            guard: "denylist",
            ..
        }
    ));
    assert_eq!(state.engine().usage_record(&alice), UsageRecord::default());
    assert_eq!(state.ledger().balance_of(&alice), 10000);
}

#[test]
fn check_requires_ledger_origin() {
    let (state, _clock) = harness();
    let tx = Transfer {
        sender: addr("acct:alice"),
        recipient: addr("acct:bob"),
        amount: 1,
    };

    let err = state.engine().check(&addr("intruder"), &tx).unwrap_err();
    assert!(matches!(err, GateError::UnauthorizedCaller));
}

#[test]
fn underfunded_transfer_never_reaches_the_chain() {
    let (state, _clock) = harness();
    let (nobody, bob) = (addr("acct:nobody"), addr("acct:bob"));

    let err = state.transfer(&nobody, &bob, 10).unwrap_err();
    assert!(matches!(err, GateError::InsufficientBalance { .. }));
    assert_eq!(state.engine().usage_record(&nobody), UsageRecord::default());
}

#[test]
fn admin_setters_are_gated_and_unconditional() {
    let (state, _clock) = harness();
    let engine = state.engine();
    let (root, alice) = (addr("ops:root"), addr("acct:alice"));

    let err = engine
        .set_default_policy(
            &alice,
            RatePolicy {
                window_secs: 60,
                limit: 5,
            },
        )
        .unwrap_err();
    assert!(matches!(err, GateError::Unauthorized));

    engine
        .set_default_policy(
            &root,
            RatePolicy {
                window_secs: 60,
                limit: 5,
            },
        )
        .unwrap();
    assert_eq!(
        engine.default_policy(),
        RatePolicy {
            window_secs: 60,
            limit: 5,
        }
    );

    engine
        .set_usage_record(
            &root,
            &alice,
            UsageRecord {
                total: 7,
                window_id: 3,
            },
        )
        .unwrap();
    assert_eq!(
        engine.usage_record(&alice),
        UsageRecord {
            total: 7,
            window_id: 3,
        }
    );

    engine
        .set_account_policy(
            &root,
            &alice,
            AccountPolicy {
                window_secs: 10,
                limit: 10,
                status: AccountStatus::OptIn,
            },
        )
        .unwrap();
    engine.reset_account_policy(&root, &alice).unwrap();
    assert_eq!(engine.account_policy(&alice), AccountPolicy::default());
}
