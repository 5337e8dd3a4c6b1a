//! Deposit test cases

use crate::environment::*;
use alloy::primitives::U256;
use depositor::{
    ledger::LedgerCall,
    types::{GiftId, Phase},
};
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn native_gift_is_deposited_in_one_transaction() {
    let env = Environment::setup();
    env.lookup("john42").await;

    let session = env.deposit().await;
    assert_eq!(session.phase, Phase::Success);
    assert_eq!(session.error, None);
    assert!(session.approval_tx.is_none());

    let tx = session.deposit_tx.unwrap();
    assert!(tx.explorer_url.starts_with("https://shannon-explorer.somnia.network/tx/0x"));

    let gift = session.gift.unwrap();
    assert!(gift.deposited);
    assert_eq!(gift.depositor, ALICE);

    assert_eq!(
        env.ledger.submissions(),
        vec![LedgerCall::Deposit {
            contract: env.contract(),
            id: GiftId::from_code("john42"),
            value: FIVE,
        }]
    );
    assert!(!env.ledger.calls().iter().any(|call| matches!(call, LedgerCall::Allowance { .. })));

    let stored = env.ledger.gift_by_code(env.contract(), "john42").unwrap();
    assert!(stored.deposited);
    assert_eq!(stored.gifter, ALICE);
}

#[tokio::test(start_paused = true)]
async fn token_gift_is_approved_before_deposit() {
    let env = Environment::setup();
    env.ledger.set_finality_delay(Duration::from_secs(1));
    env.lookup("alice").await;

    env.orchestrator.submit_deposit();
    let session =
        env.orchestrator.wait_for(|s| s.phase == Phase::AwaitingApprovalFinality).await;
    assert_eq!(session.allowance, Some(U256::ZERO));
    assert!(session.approval_tx.is_some());
    assert_eq!(
        env.ledger.submissions(),
        vec![LedgerCall::Approve { token: TOKEN, spender: env.contract(), amount: U256::from(100) }]
    );

    let session = env.orchestrator.settled().await;
    assert_eq!(session.phase, Phase::Success);
    assert_eq!(session.allowance, Some(U256::from(100)));

    let calls = env.ledger.calls();
    let approval_finality = calls
        .iter()
        .position(|call| matches!(call, LedgerCall::AwaitFinality(_)))
        .unwrap();
    let deposit = calls.iter().position(|call| matches!(call, LedgerCall::Deposit { .. })).unwrap();
    assert!(approval_finality < deposit);

    assert_eq!(
        env.ledger.submissions()[1],
        LedgerCall::Deposit {
            contract: env.contract(),
            id: GiftId::from_code("alice"),
            value: U256::ZERO,
        }
    );
}

#[tokio::test(start_paused = true)]
async fn sufficient_allowance_skips_approval() {
    let env = Environment::setup();
    env.ledger.set_allowance(TOKEN, ALICE, env.contract(), U256::from(1000));
    env.lookup("alice").await;

    let session = env.deposit().await;
    assert_eq!(session.phase, Phase::Success);
    assert!(session.approval_tx.is_none());
    assert_eq!(env.ledger.submissions().len(), 1);
    assert!(matches!(env.ledger.submissions()[0], LedgerCall::Deposit { .. }));
}

#[tokio::test(start_paused = true)]
async fn deposit_in_flight_ignores_resubmission() {
    let env = Environment::setup();
    env.ledger.set_finality_delay(Duration::from_secs(1));
    env.lookup("john42").await;

    env.orchestrator.submit_deposit();
    env.orchestrator.submit_deposit();
    let session = env.orchestrator.settled().await;

    assert_eq!(session.phase, Phase::Success);
    assert_eq!(env.ledger.submissions().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn success_resets_after_grace_period() {
    let env = Environment::setup();
    env.lookup("john42").await;
    let session = env.deposit().await;
    assert_eq!(session.phase, Phase::Success);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(env.orchestrator.snapshot().phase, Phase::Success);

    tokio::time::sleep(Duration::from_secs(2)).await;
    let reset = env.orchestrator.snapshot();
    assert_eq!(reset.phase, Phase::Idle);
    assert_eq!(reset.id, session.id);
    assert!(reset.gift.is_none());
    assert!(reset.deposit_tx.is_none());
}

#[tokio::test(start_paused = true)]
async fn grace_period_does_not_reset_newer_session() {
    let env = Environment::setup();
    env.lookup("john42").await;
    env.deposit().await;

    let session = env.lookup("alice").await;
    tokio::time::sleep(Duration::from_secs(5)).await;

    let current = env.orchestrator.snapshot();
    assert_eq!(current.id, session.id);
    assert_eq!(current.phase, Phase::Found);
    assert!(current.gift.is_some());
}

#[tokio::test(start_paused = true)]
async fn rejected_signature_can_be_retried() {
    let env = Environment::setup();
    env.lookup("john42").await;
    env.ledger.reject_next_submission();

    let session = env.deposit().await;
    assert_eq!(session.phase, Phase::Found);
    assert_eq!(
        session.error.as_ref().map(ToString::to_string).as_deref(),
        Some("Transaction was rejected in the wallet")
    );

    let session = env.deposit().await;
    assert_eq!(session.phase, Phase::Success);
    assert_eq!(session.error, None);
    assert_eq!(env.ledger.submissions().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn rejected_approval_is_reevaluated_on_retry() {
    let env = Environment::setup();
    env.lookup("alice").await;
    env.ledger.reject_next_submission();

    let session = env.deposit().await;
    assert_eq!(session.phase, Phase::Found);

    let session = env.deposit().await;
    assert_eq!(session.phase, Phase::Success);
    let approvals = env
        .ledger
        .submissions()
        .into_iter()
        .filter(|call| matches!(call, LedgerCall::Approve { .. }))
        .count();
    assert_eq!(approvals, 2);
}

#[tokio::test(start_paused = true)]
async fn lookup_during_approval_discards_deposit() {
    let env = Environment::setup();
    env.ledger.set_finality_delay(Duration::from_secs(1));
    env.lookup("alice").await;

    env.orchestrator.submit_deposit();
    env.orchestrator.wait_for(|s| s.phase == Phase::AwaitingApprovalFinality).await;

    let id = env.orchestrator.submit_lookup("john42");
    let session = env.orchestrator.settled().await;
    assert_eq!(session.id, id);
    assert_eq!(session.phase, Phase::Found);
    assert_eq!(session.code.as_deref(), Some("john42"));

    tokio::time::sleep(Duration::from_secs(10)).await;
    let session = env.orchestrator.snapshot();
    assert_eq!(session.id, id);
    assert_eq!(session.phase, Phase::Found);
    assert!(session.approval_tx.is_none());
    assert_eq!(
        env.ledger.submissions(),
        vec![LedgerCall::Approve { token: TOKEN, spender: env.contract(), amount: U256::from(100) }]
    );
}

#[tokio::test(start_paused = true)]
async fn deposit_after_success_is_ignored() {
    let env = Environment::setup();
    env.lookup("john42").await;
    let deposited = env.deposit().await;
    assert_eq!(deposited.phase, Phase::Success);

    env.orchestrator.submit_deposit();
    let session = env.orchestrator.snapshot();
    assert_eq!(session, deposited);
    assert_eq!(session.error, None);
    assert_eq!(env.ledger.submissions().len(), 1);
}
