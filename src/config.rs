//! Depositor configuration.
use crate::{
    constants::{
        DEFAULT_ALLOWANCE_RECHECK_ATTEMPTS, DEFAULT_FINALITY_TIMEOUT, DEFAULT_LOOKUP_RETRIES,
        DEFAULT_LOOKUP_RETRY_BACKOFF, DEFAULT_POLL_INTERVAL, DEFAULT_REQUIRED_CONFIRMATIONS,
        DEFAULT_SUCCESS_GRACE_PERIOD, SOMNIA_MAINNET_CHAIN_ID, SOMNIA_MAINNET_EXPLORER_URL,
        SOMNIA_MAINNET_NATIVE_SYMBOL, SOMNIA_MAINNET_RPC_URL, SOMNIA_TESTNET_CHAIN_ID,
        SOMNIA_TESTNET_EXPLORER_URL, SOMNIA_TESTNET_GIFT_CONTRACT, SOMNIA_TESTNET_NATIVE_SYMBOL,
        SOMNIA_TESTNET_RPC_URL,
    },
    types::AssetInfo,
};
use alloy::{
    primitives::{Address, ChainId},
    signers::local::PrivateKeySigner,
};
use alloy_chains::Chain;
use eyre::Context;
use serde::{Deserialize, Serialize};
use std::{path::Path, str::FromStr, time::Duration};
use url::Url;

/// Depositor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositorConfig {
    /// The chain gifts live on.
    pub chain: ChainConfig,
    /// Address of the gift escrow contract.
    pub gift_contract: Address,
    /// Orchestrator configuration.
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    /// Transaction configuration.
    #[serde(default)]
    pub transactions: TransactionConfig,
    /// Secrets.
    #[serde(skip_serializing, default)]
    pub secrets: SecretsConfig,
}

impl Default for DepositorConfig {
    fn default() -> Self {
        Self {
            chain: ChainConfig::somnia_testnet(),
            gift_contract: SOMNIA_TESTNET_GIFT_CONTRACT,
            orchestrator: Default::default(),
            transactions: Default::default(),
            secrets: Default::default(),
        }
    }
}

impl DepositorConfig {
    /// Sets the chain.
    pub fn with_chain(mut self, chain: ChainConfig) -> Self {
        self.chain = chain;
        self
    }

    /// Sets the RPC endpoint of the chain.
    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.chain.endpoint = endpoint;
        self
    }

    /// Sets the expected chain id.
    pub fn with_chain_id(mut self, chain_id: ChainId) -> Self {
        self.chain.chain_id = chain_id;
        self
    }

    /// Sets the gift escrow contract.
    pub fn with_gift_contract(mut self, gift_contract: Address) -> Self {
        self.gift_contract = gift_contract;
        self
    }

    /// Sets the orchestrator configuration.
    pub fn with_orchestrator(mut self, orchestrator: OrchestratorConfig) -> Self {
        self.orchestrator = orchestrator;
        self
    }

    /// Sets the transaction configuration.
    pub fn with_transactions(mut self, transactions: TransactionConfig) -> Self {
        self.transactions = transactions;
        self
    }

    /// Sets the private key used to sign transactions.
    pub fn with_signer_key(mut self, signer_key: Option<String>) -> Self {
        if let Some(signer_key) = signer_key {
            self.secrets.signer_key = Some(signer_key);
        }
        self
    }

    /// Load from a YAML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> eyre::Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .wrap_err_with(|| format!("failed to read config file: {}", path.display()))?;
        let config = serde_yaml::from_reader(&file)
            .wrap_err_with(|| format!("failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Save to a YAML file.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> eyre::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Parses the configured signer key, if any.
    pub fn signer(&self) -> eyre::Result<Option<PrivateKeySigner>> {
        self.secrets
            .signer_key
            .as_deref()
            .map(PrivateKeySigner::from_str)
            .transpose()
            .wrap_err("invalid signer key")
    }
}

/// Chain configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainConfig {
    /// Chain id the endpoint is expected to report.
    pub chain_id: ChainId,
    /// RPC endpoint.
    pub endpoint: Url,
    /// Symbol of the native asset.
    pub native_symbol: String,
    /// Block explorer base URL.
    pub explorer_url: String,
}

impl ChainConfig {
    /// Somnia testnet.
    pub fn somnia_testnet() -> Self {
        Self::preset(
            SOMNIA_TESTNET_CHAIN_ID,
            SOMNIA_TESTNET_RPC_URL,
            SOMNIA_TESTNET_NATIVE_SYMBOL,
            SOMNIA_TESTNET_EXPLORER_URL,
        )
    }

    /// Somnia mainnet.
    pub fn somnia_mainnet() -> Self {
        Self::preset(
            SOMNIA_MAINNET_CHAIN_ID,
            SOMNIA_MAINNET_RPC_URL,
            SOMNIA_MAINNET_NATIVE_SYMBOL,
            SOMNIA_MAINNET_EXPLORER_URL,
        )
    }

    fn preset(chain_id: ChainId, endpoint: &str, symbol: &str, explorer: &str) -> Self {
        Self {
            chain_id,
            endpoint: Url::parse(endpoint).expect("valid preset endpoint"),
            native_symbol: symbol.to_string(),
            explorer_url: explorer.to_string(),
        }
    }

    /// The chain.
    pub fn chain(&self) -> Chain {
        Chain::from_id(self.chain_id)
    }

    /// Display information of the native asset.
    pub fn native_asset(&self) -> AssetInfo {
        AssetInfo::native(self.native_symbol.clone())
    }
}

/// Timing and retry configuration of the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrchestratorConfig {
    /// Automatic retries of a failed lookup.
    pub lookup_retries: u32,
    /// Delay before the first lookup retry, doubled on every further retry.
    #[serde(with = "crate::serde::duration")]
    pub lookup_retry_backoff: Duration,
    /// How long a successful deposit is shown before the session resets.
    #[serde(with = "crate::serde::duration")]
    pub success_grace_period: Duration,
    /// Allowance reads after approval finality before giving up.
    pub allowance_recheck_attempts: u32,
    /// Delay between allowance reads.
    #[serde(with = "crate::serde::duration::millis")]
    pub allowance_recheck_interval: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            lookup_retries: DEFAULT_LOOKUP_RETRIES,
            lookup_retry_backoff: DEFAULT_LOOKUP_RETRY_BACKOFF,
            success_grace_period: DEFAULT_SUCCESS_GRACE_PERIOD,
            allowance_recheck_attempts: DEFAULT_ALLOWANCE_RECHECK_ATTEMPTS,
            allowance_recheck_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl OrchestratorConfig {
    /// Sets the lookup retries.
    pub fn with_lookup_retries(mut self, retries: u32) -> Self {
        self.lookup_retries = retries;
        self
    }

    /// Sets the initial lookup retry backoff.
    pub fn with_lookup_retry_backoff(mut self, backoff: Duration) -> Self {
        self.lookup_retry_backoff = backoff;
        self
    }

    /// Sets the success grace period.
    pub fn with_success_grace_period(mut self, period: Duration) -> Self {
        self.success_grace_period = period;
        self
    }
}

/// Transaction configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransactionConfig {
    /// How long to wait for a transaction to be included.
    #[serde(with = "crate::serde::duration")]
    pub finality_timeout: Duration,
    /// Confirmations needed before a transaction is final.
    pub required_confirmations: u64,
    /// Poll interval of the RPC client.
    #[serde(with = "crate::serde::duration::millis")]
    pub poll_interval: Duration,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            finality_timeout: DEFAULT_FINALITY_TIMEOUT,
            required_confirmations: DEFAULT_REQUIRED_CONFIRMATIONS,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Secrets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretsConfig {
    /// Hex encoded private key of the depositing account.
    pub signer_key: Option<String>,
}
