//! Error test cases

use crate::environment::*;
use alloy::primitives::U256;
use depositor::{
    error::{DepositError, RevertReason},
    ledger::LedgerCall,
    types::Phase,
};

const CIRCUIT_BREAKER_MESSAGE: &str = "Token transfers are currently paused. The token contract \
                                       has activated its circuit breaker (safety mechanism). \
                                       Please try again later or contact the token issuer.";

#[tokio::test(start_paused = true)]
async fn already_deposited_gift_is_not_submitted() {
    let env = Environment::setup();
    let mut gift = native_gift(FIVE);
    gift.deposited = true;
    gift.gifter = ALICE;
    env.insert_gift("done", gift);

    let session = env.lookup("done").await;
    assert_eq!(session.phase, Phase::Found);
    assert!(session.gift.as_ref().unwrap().has_depositor());

    let session = env.deposit().await;
    assert_eq!(session.error, Some(DepositError::AlreadyDeposited));
    assert!(env.ledger.submissions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn deposit_needs_a_gift() {
    let env = Environment::setup();

    let session = env.deposit().await;
    assert_eq!(session.phase, Phase::Idle);
    assert_eq!(session.error, Some(DepositError::InputInvalid("No gift selected".into())));

    env.lookup("ghost").await;
    let session = env.deposit().await;
    assert_eq!(session.phase, Phase::NotFound);
    assert_eq!(session.error, Some(DepositError::no_gift_selected()));
    assert!(env.ledger.submissions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn deposit_needs_wallet() {
    let env = Environment::disconnected();
    env.lookup("john42").await;

    let session = env.deposit().await;
    assert_eq!(session.phase, Phase::Found);
    assert_eq!(session.error, Some(DepositError::WalletNotConnected));
    assert_eq!(session.error.unwrap().to_string(), "Please connect your wallet first");
    assert!(env.ledger.submissions().is_empty());

    env.ledger.connect(ALICE);
    assert_eq!(env.deposit().await.phase, Phase::Success);
}

#[tokio::test(start_paused = true)]
async fn paused_token_surfaces_circuit_breaker() {
    let env = Environment::setup();
    env.ledger.pause_token(TOKEN);
    env.lookup("alice").await;

    let session = env.deposit().await;
    assert_eq!(session.phase, Phase::Failed);
    assert_eq!(session.error, Some(DepositError::ContractReverted(RevertReason::CircuitBreaker)));
    assert_eq!(session.error.unwrap().to_string(), CIRCUIT_BREAKER_MESSAGE);
}

#[tokio::test(start_paused = true)]
async fn deposit_revert_with_circuit_breaker_reason() {
    let env = Environment::setup();
    env.ledger.set_allowance(TOKEN, ALICE, env.contract(), U256::from(100));
    env.lookup("alice").await;
    env.ledger.revert_next_transaction(Some("CircuitBreaker: token transfers paused"));

    let session = env.deposit().await;
    assert_eq!(session.phase, Phase::Failed);

    let message = session.error.unwrap().to_string();
    assert_eq!(
        message,
        "Token transfers are paused. Circuit breaker is active. Please try again later."
    );
    assert!(!message.contains("CircuitBreaker:"));
}

#[tokio::test(start_paused = true)]
async fn deposit_revert_surfaces_reason() {
    let env = Environment::setup();
    env.lookup("john42").await;

    // someone else funds the gift in the meantime
    let mut gift = native_gift(FIVE);
    gift.deposited = true;
    env.insert_gift("john42", gift);

    let session = env.deposit().await;
    assert_eq!(session.phase, Phase::Failed);
    assert_eq!(
        session.error,
        Some(DepositError::ContractReverted(RevertReason::Reason("Gift already deposited".into())))
    );
    assert_eq!(
        session.error.unwrap().to_string(),
        "Transaction failed: Gift already deposited"
    );
    assert!(session.deposit_tx.is_some());
}

#[tokio::test(start_paused = true)]
async fn revert_without_reason() {
    let env = Environment::setup();
    env.lookup("john42").await;
    env.ledger.revert_next_transaction(None);

    let session = env.deposit().await;
    assert_eq!(session.error, Some(DepositError::ContractReverted(RevertReason::Unspecified)));
}

#[tokio::test(start_paused = true)]
async fn failed_approval_stops_before_deposit() {
    let env = Environment::setup();
    env.lookup("alice").await;
    env.ledger.revert_next_transaction(Some("ERC20: approve to the zero address"));

    let session = env.deposit().await;
    assert_eq!(session.phase, Phase::Failed);
    assert_eq!(env.ledger.submissions().len(), 1);
    assert!(session.deposit_tx.is_none());
}

#[tokio::test(start_paused = true)]
async fn unknown_errors_keep_raw_message() {
    let env = Environment::setup();
    env.lookup("john42").await;
    env.ledger.fail_next_submission("nonce too low");

    let session = env.deposit().await;
    assert_eq!(session.phase, Phase::Failed);
    assert_eq!(session.error, Some(DepositError::Unknown("nonce too low".into())));
}

#[tokio::test(start_paused = true)]
async fn failed_session_is_not_reset() {
    let env = Environment::setup();
    env.lookup("john42").await;
    env.ledger.revert_next_transaction(None);
    env.deposit().await;

    tokio::time::sleep(std::time::Duration::from_secs(10)).await;
    assert_eq!(env.orchestrator.snapshot().phase, Phase::Failed);
}

#[tokio::test(start_paused = true)]
async fn allowance_unchanged_after_approval() {
    let env = Environment::setup();
    env.ledger.ignore_approvals();
    env.lookup("alice").await;

    let session = env.deposit().await;
    assert_eq!(session.phase, Phase::Failed);
    assert_eq!(
        session.error,
        Some(DepositError::Unknown("Allowance is still insufficient after approval".into()))
    );
    assert_eq!(session.allowance, Some(U256::ZERO));
    assert!(session.deposit_tx.is_none());

    assert_eq!(env.ledger.submissions().len(), 1);
    let allowance_reads = env
        .ledger
        .calls()
        .iter()
        .filter(|call| matches!(call, LedgerCall::Allowance { .. }))
        .count();
    assert_eq!(allowance_reads, 1 + env.config.orchestrator.allowance_recheck_attempts as usize);
}

#[tokio::test(start_paused = true)]
async fn failed_allowance_read() {
    let env = Environment::setup();
    env.lookup("alice").await;
    env.ledger.fail_allowance_reads(1);

    let session = env.deposit().await;
    assert_eq!(session.phase, Phase::Failed);
    assert!(matches!(
        session.error,
        Some(DepositError::LedgerReadFailed(ref message)) if message.contains("connection reset by peer")
    ));
    assert!(env.ledger.submissions().is_empty());
}
