//! Depositor spawn utilities.
use crate::{
    cli::Args,
    config::DepositorConfig,
    ledger::{Osc52Clipboard, RpcLedger, RpcWallet, connect_provider, connect_wallet_provider},
    orchestrator::{Capabilities, Orchestrator},
};
use alloy::providers::Provider;
use std::{path::Path, sync::Arc};
use tracing::{info, warn};

/// Attempts to spawn the orchestrator using CLI arguments and a configuration file.
///
/// If the configuration file does not exist, a default one merged with the CLI arguments is
/// written to it.
pub async fn try_spawn_with_args<P: AsRef<Path>>(
    args: &Args,
    config_path: P,
) -> eyre::Result<Orchestrator> {
    let config = if !config_path.as_ref().exists() {
        let config = args.merge_depositor_config(DepositorConfig::default());
        config.save_to_file(&config_path)?;
        config
    } else {
        // File exists: load and override with CLI values.
        args.merge_depositor_config(DepositorConfig::load_from_file(&config_path)?)
    };

    try_spawn(config).await
}

/// Connects to the configured chain and creates an [`Orchestrator`] for it.
pub async fn try_spawn(config: DepositorConfig) -> eyre::Result<Orchestrator> {
    let signer = config.signer()?;
    let account = signer.as_ref().map(|signer| signer.address());
    let poll_interval = config.transactions.poll_interval;

    let provider = connect_provider(&config.chain.endpoint, poll_interval).await?;
    let chain_id = provider.get_chain_id().await?;
    if chain_id != config.chain.chain_id {
        eyre::bail!(
            "endpoint {} is on chain {chain_id}, expected {}",
            config.chain.endpoint,
            config.chain.chain()
        );
    }

    let wallet_provider = match signer {
        Some(signer) => {
            connect_wallet_provider(&config.chain.endpoint, poll_interval, signer).await?
        }
        None => {
            warn!("No signer key configured, deposits are disabled");
            provider.clone()
        }
    };

    let wallet = Arc::new(
        RpcWallet::new(wallet_provider, account)
            .with_finality_timeout(config.transactions.finality_timeout)
            .with_required_confirmations(config.transactions.required_confirmations),
    );

    let capabilities = Capabilities {
        ledger: Arc::new(RpcLedger::new(provider)),
        transactor: wallet.clone(),
        wallet,
        clipboard: Arc::new(Osc52Clipboard),
    };

    info!(
        chain = %config.chain.chain(),
        contract = %config.gift_contract,
        account = ?account,
        "Connected"
    );

    Ok(Orchestrator::new(capabilities, &config))
}
