//! Ledger capabilities backed by a JSON-RPC node.

use super::{Finality, GiftLedger, Result, Transactor, WalletSession};
use crate::{
    constants::{DEFAULT_FINALITY_TIMEOUT, DEFAULT_REQUIRED_CONFIRMATIONS},
    error::{LedgerError, decode_revert_data},
    types::{Gift, GiftId, IERC20, IGiftEscrow, TokenMetadata},
};
use alloy::{
    eips::BlockId,
    network::{EthereumWallet, TransactionBuilder},
    primitives::{Address, B256, U256},
    providers::{
        DynProvider, PendingTransactionConfig, PendingTransactionError, Provider, ProviderBuilder,
        WatchTxError,
    },
    rpc::{client::ClientBuilder, types::TransactionRequest},
    signers::local::PrivateKeySigner,
    transports::layers::RetryBackoffLayer,
};
use async_trait::async_trait;
use dashmap::DashMap;
use std::{sync::Arc, time::Duration};
use tracing::{debug, instrument, warn};
use url::Url;

/// [`RetryBackoffLayer`] used for chain providers.
///
/// We are allowing max 10 retries with a backoff of 800ms. The CU/s is set to max value to avoid
/// any throttling.
pub const RETRY_LAYER: RetryBackoffLayer = RetryBackoffLayer::new(10, 800, u64::MAX);

/// Connects a read-only provider to `endpoint`.
pub async fn connect_provider(endpoint: &Url, poll_interval: Duration) -> eyre::Result<DynProvider> {
    let client = ClientBuilder::default()
        .layer(RETRY_LAYER)
        .connect(endpoint.as_str())
        .await?
        .with_poll_interval(poll_interval);

    Ok(ProviderBuilder::new().connect_client(client).erased())
}

/// Connects a provider to `endpoint` that signs with `signer`.
pub async fn connect_wallet_provider(
    endpoint: &Url,
    poll_interval: Duration,
    signer: PrivateKeySigner,
) -> eyre::Result<DynProvider> {
    let client = ClientBuilder::default()
        .layer(RETRY_LAYER)
        .connect(endpoint.as_str())
        .await?
        .with_poll_interval(poll_interval);

    Ok(ProviderBuilder::new().wallet(EthereumWallet::from(signer)).connect_client(client).erased())
}

/// Reads gifts, allowances and token metadata over RPC.
#[derive(Debug, Clone)]
pub struct RpcLedger {
    provider: DynProvider,
}

impl RpcLedger {
    /// Creates a new [`RpcLedger`].
    pub fn new(provider: DynProvider) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl GiftLedger for RpcLedger {
    #[instrument(skip(self))]
    async fn gift(&self, contract: Address, id: GiftId) -> Result<Gift> {
        let gift = IGiftEscrow::new(contract, &self.provider)
            .getGift(id.as_b256())
            .call()
            .await?;

        debug!(amount = %gift.amount, token = %gift.token, deposited = gift.deposited, "Read gift");

        Ok(gift)
    }

    #[instrument(skip(self))]
    async fn allowance(&self, token: Address, owner: Address, spender: Address) -> Result<U256> {
        Ok(IERC20::new(token, &self.provider).allowance(owner, spender).call().await?)
    }

    #[instrument(skip(self))]
    async fn token_metadata(&self, token: Address) -> TokenMetadata {
        let erc20 = IERC20::new(token, &self.provider);

        let symbol = erc20
            .symbol()
            .call()
            .await
            .inspect_err(|err| warn!(%err, "Failed to read token symbol"))
            .ok();
        let decimals = erc20
            .decimals()
            .call()
            .await
            .inspect_err(|err| warn!(%err, "Failed to read token decimals"))
            .ok();

        TokenMetadata { symbol, decimals }
    }
}

/// Signs and submits transactions with a local key.
///
/// Without a key, every submission fails with [`LedgerError::WalletNotConnected`].
#[derive(Debug, Clone)]
pub struct RpcWallet {
    provider: DynProvider,
    address: Option<Address>,
    finality_timeout: Duration,
    required_confirmations: u64,
    /// Requests we have sent, used to replay reverted transactions.
    sent: Arc<DashMap<B256, TransactionRequest>>,
}

impl RpcWallet {
    /// Creates a wallet sending transactions from `address` through `provider`.
    ///
    /// `provider` is expected to sign for `address`, see [`connect_wallet_provider`].
    pub fn new(provider: DynProvider, address: Option<Address>) -> Self {
        Self {
            provider,
            address,
            finality_timeout: DEFAULT_FINALITY_TIMEOUT,
            required_confirmations: DEFAULT_REQUIRED_CONFIRMATIONS,
            sent: Default::default(),
        }
    }

    /// Sets the time to wait for a transaction to be included.
    pub fn with_finality_timeout(mut self, timeout: Duration) -> Self {
        self.finality_timeout = timeout;
        self
    }

    /// Sets the confirmations needed before a transaction is final.
    pub fn with_required_confirmations(mut self, confirmations: u64) -> Self {
        self.required_confirmations = confirmations;
        self
    }

    async fn send(&self, request: TransactionRequest) -> Result<B256> {
        let from = self.address.ok_or(LedgerError::WalletNotConnected)?;
        let request = request.with_from(from);

        let pending = self.provider.send_transaction(request.clone()).await?;
        let tx_hash = *pending.tx_hash();
        debug!(%tx_hash, "Sent transaction");

        self.sent.insert(tx_hash, request);

        Ok(tx_hash)
    }

    /// Replays a reverted transaction at its block to recover the revert reason.
    async fn revert_reason(&self, tx_hash: B256, block_number: Option<u64>) -> Option<String> {
        let request = self.sent.get(&tx_hash).map(|request| request.value().clone())?;
        let block = block_number.map(BlockId::number).unwrap_or_else(BlockId::latest);

        match self.provider.call(request).block(block).await {
            Ok(_) => None,
            Err(err) => err
                .as_error_resp()
                .and_then(|payload| payload.as_revert_data())
                .and_then(|data| decode_revert_data(&data)),
        }
    }
}

#[async_trait]
impl Transactor for RpcWallet {
    #[instrument(skip(self))]
    async fn approve(&self, token: Address, spender: Address, amount: U256) -> Result<B256> {
        let request = IERC20::new(token, &self.provider)
            .approve(spender, amount)
            .into_transaction_request();

        self.send(request).await
    }

    #[instrument(skip(self))]
    async fn deposit(&self, contract: Address, id: GiftId, value: U256) -> Result<B256> {
        let request = IGiftEscrow::new(contract, &self.provider)
            .depositGift(id.as_b256())
            .value(value)
            .into_transaction_request();

        self.send(request).await
    }

    #[instrument(skip(self))]
    async fn await_finality(&self, tx_hash: B256) -> Result<Finality> {
        let _sent = SentEntry { sent: &self.sent, tx_hash };

        let watched = self
            .provider
            .watch_pending_transaction(
                PendingTransactionConfig::new(tx_hash)
                    .with_required_confirmations(self.required_confirmations)
                    .with_timeout(Some(self.finality_timeout)),
            )
            .await?
            .await;

        match watched {
            Ok(_) => {}
            Err(PendingTransactionError::TxWatcher(WatchTxError::Timeout)) => {
                warn!(%tx_hash, "Transaction was not confirmed in time");
                return Err(LedgerError::Dropped(tx_hash));
            }
            Err(err) => return Err(err.into()),
        }

        let receipt = self
            .provider
            .get_transaction_receipt(tx_hash)
            .await?
            .ok_or(LedgerError::Dropped(tx_hash))?;

        if receipt.status() {
            return Ok(Finality::Finalized);
        }

        let reason = self.revert_reason(tx_hash, receipt.block_number).await;
        warn!(%tx_hash, ?reason, "Transaction reverted");

        Ok(Finality::Reverted { reason })
    }
}

/// Forgets the request sent for `tx_hash` once dropped.
#[derive(Debug)]
struct SentEntry<'a> {
    sent: &'a DashMap<B256, TransactionRequest>,
    tx_hash: B256,
}

impl Drop for SentEntry<'_> {
    fn drop(&mut self) {
        self.sent.remove(&self.tx_hash);
    }
}

impl WalletSession for RpcWallet {
    fn connected_address(&self) -> Option<Address> {
        self.address
    }
}
