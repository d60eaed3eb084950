//! dapp-wallet command line host.
//!
//! Builds a [`Wallet`] from a TOML config, runs startup (legacy migration,
//! endpoint failover, session resume) and executes one command.

use alloy::primitives::{Address, U256};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use dapp_wallet::config::{load_config, WalletConfig};
use dapp_wallet::observability::logging::init_logging;
use dapp_wallet::session::AutoLockPolicy;
use dapp_wallet::tx::{format_gwei, parse_gwei, ContractCall, TxOptions};
use dapp_wallet::{Wallet, WalletError};

#[derive(Parser)]
#[command(name = "dapp-wallet")]
#[command(about = "Custodial wallet with encrypted keys, auto-lock and endpoint failover", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Master password, used when the wallet has to be unlocked.
    #[arg(short, long, env = "DAPP_WALLET_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show session, connection and key summary
    Status,
    /// Unlock the active key with the master password
    Unlock,
    /// Lock the wallet and forget the session
    Lock,
    /// Import a private key
    Import {
        /// Display name
        #[arg(short, long)]
        name: String,
        /// Hex private key
        #[arg(short, long, env = "DAPP_WALLET_IMPORT_KEY", hide_env_values = true)]
        key: String,
    },
    /// List stored keys
    List,
    /// Make a key the signing key
    Switch { id: String },
    /// Rename a key
    Rename { id: String, name: String },
    /// Delete a key
    Remove { id: String },
    /// Show or set the gas price limit in gwei
    GasLimit { value: Option<String> },
    /// Show or set the auto-lock policy (24h, 3d, 7d, 14d, 30d, 90d, never)
    AutoLock { policy: Option<String> },
    /// Re-check that the endpoint reports the configured chain
    Verify,
    /// Call a contract method with the active key
    Send {
        #[arg(long)]
        contract: Address,
        /// Method signature, e.g. "transfer(address,uint256)"
        #[arg(long)]
        method: String,
        /// Method arguments in order
        #[arg(long = "arg")]
        args: Vec<String>,
        #[arg(long)]
        gas_limit: Option<u64>,
        #[arg(long)]
        gas_price_gwei: Option<String>,
        #[arg(long, default_value = "0")]
        value_wei: U256,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => WalletConfig::default(),
    };
    init_logging(&config.observability)?;

    tracing::info!(
        network = %config.network.active,
        data_path = %config.storage.data_path,
        "dapp-wallet v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    let wallet = Wallet::open(config)?;
    wallet.initialize().await?;

    match cli.command {
        Commands::Status => print_status(&wallet).await,
        Commands::Unlock => {
            let password = require_password(cli.password.as_deref())?;
            if wallet.unlock(password).await? {
                println!("unlocked");
            } else {
                return Err(WalletError::Auth("wrong password".to_string()).into());
            }
        }
        Commands::Lock => {
            wallet.lock().await;
            println!("locked");
        }
        Commands::Import { name, key } => {
            ensure_unlocked(&wallet, cli.password.as_deref()).await?;
            let record = wallet.add_key(&key, &name).await?;
            println!("{}  {}  {}", record.id, record.name, record.address_label());
        }
        Commands::List => {
            for record in wallet.list_keys() {
                let marker = if record.is_active { "*" } else { " " };
                println!("{} {}  {}  {}", marker, record.id, record.name, record.address_label());
            }
        }
        Commands::Switch { id } => {
            ensure_unlocked(&wallet, cli.password.as_deref()).await?;
            wallet.switch_active_key(&id).await?;
            println!("active key: {}", id);
        }
        Commands::Rename { id, name } => {
            wallet.rename_key(&id, &name).await?;
            println!("renamed {}", id);
        }
        Commands::Remove { id } => {
            ensure_unlocked(&wallet, cli.password.as_deref()).await?;
            wallet.remove_key(&id).await?;
            println!("removed {}", id);
        }
        Commands::GasLimit { value } => {
            if let Some(value) = value {
                wallet.save_gas_limit(&value)?;
            }
            println!("gas price limit: {} gwei", format_gwei(wallet.gas_price_limit()));
        }
        Commands::AutoLock { policy } => {
            if let Some(policy) = policy {
                wallet.set_auto_lock_policy(policy.parse::<AutoLockPolicy>()?).await?;
            }
            println!("auto-lock: {}", wallet.auto_lock_policy().await);
        }
        Commands::Verify => {
            if wallet.connection_handle().is_none() {
                wallet.reconnect().await?;
            }
            if wallet.verify_network_consistency().await {
                println!("chain id verified");
            } else {
                return Err(WalletError::Connectivity("chain id check failed".to_string()).into());
            }
        }
        Commands::Send {
            contract,
            method,
            args,
            gas_limit,
            gas_price_gwei,
            value_wei,
        } => {
            ensure_unlocked(&wallet, cli.password.as_deref()).await?;
            let call = ContractCall::from_strings(contract, &method, &args)?;
            let options = TxOptions {
                gas_limit,
                gas_price: gas_price_gwei.as_deref().map(parse_gwei).transpose()?,
                value: value_wei,
            };
            let receipt = wallet.send_contract_transaction(&call, options).await?;
            println!(
                "{}  block {}  gas used {}",
                receipt.transaction_hash,
                receipt
                    .block_number
                    .map(|b| b.to_string())
                    .unwrap_or_else(|| "?".to_string()),
                receipt.gas_used
            );
        }
    }

    Ok(())
}

fn require_password(password: Option<&str>) -> Result<&str, WalletError> {
    password.ok_or_else(|| {
        WalletError::Auth("a password is required (--password or DAPP_WALLET_PASSWORD)".to_string())
    })
}

/// Use the resumed session if there is one, otherwise unlock with the password.
async fn ensure_unlocked(wallet: &Wallet, password: Option<&str>) -> Result<(), WalletError> {
    if !wallet.is_locked().await {
        return Ok(());
    }
    let password = require_password(password)?;
    if wallet.authenticate(password).await? {
        Ok(())
    } else {
        Err(WalletError::Auth("wrong password".to_string()))
    }
}

async fn print_status(wallet: &Wallet) {
    println!("session:     {}", wallet.status().await);
    println!("auto-lock:   {}", wallet.auto_lock_policy().await);
    match wallet.connection_handle() {
        Some(connection) => println!(
            "network:     {} via {} (chain {}, block {})",
            connection.network, connection.active_endpoint, connection.chain_id, connection.latest_block
        ),
        None => println!("network:     not connected"),
    }
    println!("keys:        {}", wallet.key_count());
    if let Some(active) = wallet.active_key() {
        println!("active:      {} ({})", active.name, active.address_label());
    }
    println!("gas limit:   {} gwei", format_gwei(wallet.gas_price_limit()));
}
