//! # Depositor CLI
use crate::{
    config::{ChainConfig, DepositorConfig},
    orchestrator::Orchestrator,
    spawn::try_spawn_with_args,
    types::{Phase, Session},
};
use alloy::primitives::{Address, ChainId};
use clap::{Parser, Subcommand, ValueEnum};
use eyre::OptionExt;
use std::{fmt::Write, path::PathBuf};
use url::Url;

/// Looks up gifts held in escrow and funds them.
#[derive(Debug, Parser)]
#[command(author, about = "Gift depositor", long_about = None)]
pub struct Args {
    /// The configuration file.
    ///
    /// If missing, a default one will be used and stored in the working directory under
    /// `depositor.yaml`.
    #[arg(long, value_name = "CONFIG", env = "DEPOSITOR_CONFIG", default_value = "depositor.yaml")]
    pub config: PathBuf,
    /// Use the Somnia mainnet preset instead of the testnet one.
    #[arg(long, default_value_t = false)]
    pub mainnet: bool,
    /// The RPC endpoint of the chain.
    ///
    /// Must be a valid HTTP or HTTPS URL pointing to an Ethereum JSON-RPC endpoint.
    #[arg(long, value_name = "RPC_ENDPOINT")]
    pub endpoint: Option<Url>,
    /// The chain id the endpoint is expected to report.
    #[arg(long = "chain-id", value_name = "CHAIN_ID")]
    pub chain_id: Option<ChainId>,
    /// The address of the gift escrow contract.
    #[arg(long, value_name = "ADDRESS")]
    pub contract: Option<Address>,
    /// The secret key to sign deposits with.
    #[arg(long = "secret-key", value_name = "SECRET_KEY", env = "DEPOSITOR_SK", hide_env_values = true)]
    pub secret_key: Option<String>,
    /// What to do.
    #[command(subcommand)]
    pub command: Command,
}

/// Depositor commands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Looks up a gift and prints its details.
    Lookup {
        /// The gift code.
        code: String,
        /// Copies an address of the gift to the clipboard.
        #[arg(long, value_enum, value_name = "WHAT")]
        copy: Option<CopyTarget>,
    },
    /// Looks up a gift and deposits into it.
    Deposit {
        /// The gift code.
        code: String,
    },
}

/// Address that `--copy` copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CopyTarget {
    /// The recipient of the gift.
    Recipient,
    /// The token of the gift.
    Asset,
    /// The account that funded the gift.
    Depositor,
}

impl Args {
    /// Runs the command.
    pub async fn run(self) -> eyre::Result<()> {
        let orchestrator = try_spawn_with_args(&self, &self.config).await?;

        match self.command {
            Command::Lookup { code, copy } => lookup(&orchestrator, &code, copy).await,
            Command::Deposit { code } => deposit(&orchestrator, &code).await,
        }
    }

    /// Merges [`Args`] values into an existing [`DepositorConfig`] instance.
    pub fn merge_depositor_config(&self, mut config: DepositorConfig) -> DepositorConfig {
        if self.mainnet {
            config = config.with_chain(ChainConfig::somnia_mainnet());
        }
        if let Some(endpoint) = &self.endpoint {
            config = config.with_endpoint(endpoint.clone());
        }
        if let Some(chain_id) = self.chain_id {
            config = config.with_chain_id(chain_id);
        }
        if let Some(contract) = self.contract {
            config = config.with_gift_contract(contract);
        }
        config.with_signer_key(self.secret_key.clone())
    }
}

async fn lookup(
    orchestrator: &Orchestrator,
    code: &str,
    copy: Option<CopyTarget>,
) -> eyre::Result<()> {
    orchestrator.submit_lookup(code);
    let session = orchestrator.settled().await;
    if let Some(err) = &session.error {
        eyre::bail!("{err}");
    }

    print!("{}", render_gift(&session));

    if let Some(target) = copy {
        let gift = session.gift.as_ref().ok_or_eyre("no gift")?;
        let address = match target {
            CopyTarget::Recipient => gift.recipient,
            CopyTarget::Asset => gift.asset,
            CopyTarget::Depositor => {
                gift.has_depositor().then_some(gift.depositor).ok_or_eyre("gift has no depositor")?
            }
        };
        if orchestrator.copy_address_to_clipboard(&address.to_checksum(None)) {
            println!("Copied {address}");
        }
    }

    Ok(())
}

async fn deposit(orchestrator: &Orchestrator, code: &str) -> eyre::Result<()> {
    orchestrator.submit_lookup(code);
    let session = orchestrator.settled().await;
    if let Some(err) = &session.error {
        eyre::bail!("{err}");
    }
    print!("{}", render_gift(&session));

    let mut rx = orchestrator.subscribe();
    orchestrator.submit_deposit();

    let mut phase = session.phase;
    loop {
        let session = rx.borrow_and_update().clone();
        if session.phase != phase {
            phase = session.phase;
            println!("{}", render_phase(&session));
        }

        if session.phase.is_settled() {
            return match session.error {
                Some(err) => Err(eyre::eyre!("{err}")),
                None => Ok(()),
            };
        }

        rx.changed().await?;
    }
}

/// Renders the gift of `session`.
pub fn render_gift(session: &Session) -> String {
    let mut out = String::new();
    let (Some(gift), Some(asset)) = (&session.gift, &session.asset) else {
        return out;
    };

    let _ = writeln!(out, "Amount:    {}", asset.display_amount(gift.amount));
    if let Some(token) = asset.path.token() {
        let _ = writeln!(out, "Token:     {token}");
    }
    if gift.has_recipient() {
        let _ = writeln!(out, "Recipient: {}", gift.recipient);
    }
    if gift.has_depositor() {
        let _ = writeln!(out, "Depositor: {}", gift.depositor);
    }
    if gift.deposited {
        let _ = writeln!(out, "This gift has already been deposited");
    }
    out
}

/// Renders a phase change of `session`.
pub fn render_phase(session: &Session) -> String {
    match session.phase {
        Phase::CheckingAllowance => "Checking allowance...".to_string(),
        Phase::Approving => "Approve the token in your wallet...".to_string(),
        Phase::AwaitingApprovalFinality => match &session.approval_tx {
            Some(tx) => format!("Waiting for approval {}", tx.explorer_url),
            None => "Waiting for approval...".to_string(),
        },
        Phase::Depositing => "Confirm the deposit in your wallet...".to_string(),
        Phase::AwaitingDepositFinality => match &session.deposit_tx {
            Some(tx) => format!("Waiting for deposit {}", tx.explorer_url),
            None => "Waiting for deposit...".to_string(),
        },
        Phase::Success => "Gift deposited successfully!".to_string(),
        phase => match &session.error {
            Some(err) => format!("{phase}: {err}"),
            None => phase.to_string(),
        },
    }
}
