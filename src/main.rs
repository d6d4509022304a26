use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;

use utxo_signer::config::{BackendKind, SignerConfig};
use utxo_signer::native::{EmbeddedCore, WalletCore};
use utxo_signer::scenario::{self, Scenario};
use utxo_signer::types::CoinType;
use utxo_signer::{log_debug, log_warn, wallet};

#[derive(Parser)]
#[command(name = "utxo-signer", version, about = "Plan and sign Bitcoin UTXO transactions through a wallet engine")]
struct Cli {
    /// Signer configuration (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Signing engine: embedded or native
    #[arg(long, global = true)]
    backend: Option<BackendKind>,
    /// bitcoin or bitcoin-testnet
    #[arg(long, global = true)]
    coin: Option<CoinType>,
    /// Enable debug logging on stderr
    #[arg(long, global = true)]
    debug: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Derive, plan, sign without keys, then sign with keys.
    Demo {
        #[arg(long)]
        mnemonic: Option<String>,
        #[arg(long)]
        passphrase: Option<String>,
        /// Scenario file (JSON); defaults to the built-in sample
        #[arg(long)]
        scenario: Option<PathBuf>,
        /// Fee rate in sat/vB
        #[arg(long)]
        byte_fee: Option<u64>,
        #[arg(long)]
        json: bool,
    },
    /// Generate a new mnemonic.
    Generate {
        #[arg(long, default_value_t = 12)]
        words: usize,
        #[arg(long)]
        json: bool,
    },
    /// Print the default address and lock script of a mnemonic.
    Address {
        #[arg(long)]
        mnemonic: String,
        #[arg(long, default_value = "")]
        passphrase: String,
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => SignerConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => SignerConfig::default(),
    };
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    if let Some(coin) = cli.coin {
        config.coin = coin;
    }
    if cli.debug {
        config.debug_logging = true;
    }
    for warning in config.validate()? {
        log_warn!("cli", warning);
    }
    config.apply_logging();
    log_debug!("cli", "configuration loaded", backend = config.backend, coin = config.coin);

    match config.backend {
        BackendKind::Embedded => {
            let backend = EmbeddedCore::new().with_dust_threshold(config.dust_threshold);
            execute(backend, cli.command, cli.coin, &config)
        }
        BackendKind::Native => run_native(cli.command, cli.coin, &config),
    }
}

#[cfg(feature = "trust-wallet-core")]
fn run_native(command: Command, coin: Option<CoinType>, config: &SignerConfig) -> anyhow::Result<()> {
    execute(utxo_signer::native::TrustWalletCore::new(), command, coin, config)
}

#[cfg(not(feature = "trust-wallet-core"))]
fn run_native(_: Command, _: Option<CoinType>, _: &SignerConfig) -> anyhow::Result<()> {
    Err(utxo_signer::SignerError::native_unavailable("Built without the trust-wallet-core feature").into())
}

fn execute<B: WalletCore>(
    backend: B,
    command: Command,
    coin_override: Option<CoinType>,
    config: &SignerConfig,
) -> anyhow::Result<()> {
    match command {
        Command::Demo {
            mnemonic,
            passphrase,
            scenario: scenario_path,
            byte_fee,
            json,
        } => {
            let mut scenario = match scenario_path {
                Some(path) => Scenario::load(&path).with_context(|| format!("loading {}", path.display()))?,
                None => Scenario::sample(),
            };
            if let Some(mnemonic) = mnemonic {
                scenario.mnemonic = mnemonic;
            }
            if let Some(passphrase) = passphrase {
                scenario.passphrase = passphrase;
            }
            if let Some(byte_fee) = byte_fee {
                scenario.byte_fee = Some(byte_fee);
            }
            if coin_override.is_some() {
                scenario.coin = coin_override;
            }

            let report = scenario::run_demo(backend, &scenario, config)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("==> mnemonic is valid: {}", report.mnemonic_valid);
                println!("<== {} private key: {}", report.coin, report.private_key_hex.as_str());
                println!("<== {} address: {}", report.coin, report.address);
                println!("<== {} address lock script: {}", report.coin, report.lock_script_hex);
                println!(
                    "<== plan: amount={} available={} fee={} change={}",
                    report.plan.amount, report.plan.available_amount, report.plan.fee, report.plan.change
                );
                for input in &report.plan.inputs {
                    println!("    input {}", input);
                }
                println!("<== signing without keys refused: {}", report.keyless_error);
                println!("<== signed transaction: {}", report.signed.raw_tx);
                println!("<== txid: {}", report.signed.txid);
            }
        }
        Command::Generate { words, json } => {
            let phrase = wallet::generate_mnemonic(words)?;
            if json {
                println!("{}", json!({ "words": words, "mnemonic": phrase.as_str() }));
            } else {
                println!("{}", phrase.as_str());
            }
        }
        Command::Address {
            mnemonic,
            passphrase,
            json,
        } => {
            let coin = coin_override.unwrap_or(config.coin);
            let keys = wallet::derive_account(&backend, &mnemonic, &passphrase, coin)?;
            if json {
                println!(
                    "{}",
                    json!({
                        "coin": coin,
                        "address": keys.address,
                        "lock_script": keys.lock_script_hex(),
                    })
                );
            } else {
                println!("address: {}", keys.address);
                println!("lock script: {}", keys.lock_script_hex());
            }
        }
    }
    Ok(())
}
