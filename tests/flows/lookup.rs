//! Gift lookup test cases

use crate::environment::*;
use alloy::primitives::U256;
use depositor::{
    error::DepositError,
    types::{FundingPath, GiftId, Phase, TokenMetadata},
};
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn finds_native_gift() {
    let env = Environment::setup();

    let session = env.lookup("  john42 ").await;
    assert_eq!(session.phase, Phase::Found);
    assert_eq!(session.error, None);
    assert_eq!(session.gift_id, Some(GiftId::from_code("john42")));

    let gift = session.gift.unwrap();
    assert_eq!(gift.amount, FIVE);
    assert_eq!(gift.recipient, RECIPIENT);
    assert_eq!(gift.funding_path(), FundingPath::Native);

    let asset = session.asset.unwrap();
    assert_eq!(asset.display_amount(gift.amount), "5.000000000000000000 STT");
}

#[tokio::test(start_paused = true)]
async fn unknown_code_is_not_found() {
    let env = Environment::setup();

    let session = env.lookup("ghost").await;
    assert_eq!(session.phase, Phase::NotFound);
    assert_eq!(session.error, Some(DepositError::NotFound));
    assert_eq!(session.error.unwrap().to_string(), "Gift not found with this code");
    assert!(session.gift.is_none());
    assert!(env.ledger.submissions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn zero_amount_is_not_found_even_if_deposited() {
    let env = Environment::setup();
    let mut gift = native_gift(U256::ZERO);
    gift.deposited = true;
    gift.gifter = ALICE;
    env.insert_gift("empty", gift);

    let session = env.lookup("empty").await;
    assert_eq!(session.error, Some(DepositError::NotFound));
}

#[tokio::test(start_paused = true)]
async fn lookup_does_not_need_wallet() {
    let env = Environment::disconnected();

    let session = env.lookup("john42").await;
    assert_eq!(session.phase, Phase::Found);
}

#[tokio::test(start_paused = true)]
async fn token_metadata_is_used_for_display() {
    let env = Environment::setup();
    env.ledger.insert_token(
        TOKEN,
        TokenMetadata { symbol: Some("USDC".into()), decimals: Some(6) },
    );

    let session = env.lookup("alice").await;
    let asset = session.asset.unwrap();
    assert_eq!(asset.symbol, "USDC");
    assert_eq!(asset.display_amount(U256::from(100)), "0.000100 USDC");
}

#[tokio::test(start_paused = true)]
async fn missing_token_metadata_falls_back() {
    let env = Environment::setup();

    let session = env.lookup("alice").await;
    let asset = session.asset.unwrap();
    assert_eq!(asset.path, FundingPath::Token(TOKEN));
    assert_eq!(asset.symbol, "TOKEN");
    assert_eq!(asset.decimals, 18);
}

#[tokio::test(start_paused = true)]
async fn empty_code_is_rejected() {
    let env = Environment::setup();

    let id = env.orchestrator.submit_lookup("   ");
    let session = env.orchestrator.snapshot();
    assert_eq!(session.id, id);
    assert_eq!(session.phase, Phase::Idle);
    assert_eq!(session.error, Some(DepositError::InputInvalid("Please enter a gift code".into())));
    assert!(env.ledger.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn empty_code_supersedes_pending_lookup() {
    let env = Environment::setup();
    env.ledger.delay_gift_read("john42", Duration::from_secs(5));

    env.orchestrator.submit_lookup("john42");
    env.orchestrator.submit_lookup("");
    tokio::time::sleep(Duration::from_secs(10)).await;

    let session = env.orchestrator.snapshot();
    assert_eq!(session.phase, Phase::Idle);
    assert!(session.gift.is_none());
    assert!(matches!(session.error, Some(DepositError::InputInvalid(_))));
}

#[tokio::test(start_paused = true)]
async fn newer_lookup_wins_over_slower_older_one() {
    let env = Environment::setup();
    env.ledger.delay_gift_read("alice", Duration::from_secs(5));

    let stale = env.orchestrator.submit_lookup("alice");
    let current = env.orchestrator.submit_lookup("john42");
    assert!(current > stale);

    let session = env.orchestrator.settled().await;
    assert_eq!(session.id, current);
    assert_eq!(session.code.as_deref(), Some("john42"));

    tokio::time::sleep(Duration::from_secs(10)).await;
    let session = env.orchestrator.snapshot();
    assert_eq!(session.id, current);
    assert_eq!(session.gift.unwrap().amount, FIVE);
}

#[tokio::test(start_paused = true)]
async fn newer_lookup_wins_over_faster_older_one() {
    let env = Environment::setup();
    env.ledger.delay_gift_read("ghost", Duration::from_secs(5));

    env.orchestrator.submit_lookup("john42");
    let current = env.orchestrator.submit_lookup("ghost");

    let session = env.orchestrator.settled().await;
    assert_eq!(session.id, current);
    assert_eq!(session.phase, Phase::NotFound);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(env.orchestrator.snapshot().phase, Phase::NotFound);
}

#[tokio::test(start_paused = true)]
async fn lookup_is_retried() {
    let env = Environment::setup();
    env.ledger.fail_gift_reads(2);

    let start = tokio::time::Instant::now();
    let session = env.lookup("john42").await;
    assert_eq!(session.phase, Phase::Found);
    assert_eq!(env.gift_reads("john42"), 3);
    // 1s then 2s of backoff
    assert!(start.elapsed() >= Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn lookup_gives_up_after_retries() {
    let env = Environment::setup();
    env.ledger.fail_gift_reads(3);

    let session = env.lookup("john42").await;
    assert_eq!(session.phase, Phase::LookupError);
    assert_eq!(env.gift_reads("john42"), 3);

    let err = session.error.unwrap();
    assert!(matches!(err, DepositError::LedgerReadFailed(_)));
    assert!(err.to_string().starts_with("Failed to fetch gift: "));

    // a manual retry works
    let session = env.lookup("john42").await;
    assert_eq!(session.phase, Phase::Found);
}

#[tokio::test(start_paused = true)]
async fn snapshots_are_published() {
    let env = Environment::setup();
    let mut rx = env.orchestrator.subscribe();

    env.orchestrator.submit_lookup("john42");
    assert_eq!(rx.borrow_and_update().phase, Phase::LookingUp);

    rx.changed().await.unwrap();
    assert_eq!(rx.borrow_and_update().phase, Phase::Found);
}

#[tokio::test(start_paused = true)]
async fn copies_to_clipboard() {
    let env = Environment::setup();
    let address = RECIPIENT.to_checksum(None);

    assert!(env.orchestrator.copy_address_to_clipboard(&address));
    assert_eq!(env.clipboard.contents(), vec![address]);
}
