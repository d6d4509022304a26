//! Demonstration Scenario
//!
//! The end-to-end flow: validate the mnemonic, derive the account, build
//! the UTXO set, plan, sign once without keys (which must fail) and once
//! with keys. A scenario can be loaded from JSON; [`Scenario::sample`] is
//! the built-in one.

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::path::Path;
use zeroize::Zeroizing;

use crate::config::SignerConfig;
use crate::error::{SignerError, SignerResult};
use crate::native::WalletCore;
use crate::tx::{summarize, AnySignerClient, SigningRequestBuilder};
use crate::types::{CoinType, PlanSummary, SignedTransaction};
use crate::wallet::{self, Utxo};
use crate::{log_info, log_warn};

pub const SAMPLE_MNEMONIC: &str =
    "trial sing wear crumble monkey survey immense awake title announce shoe soldier";

/// Inputs to one run of the flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub mnemonic: String,
    #[serde(default)]
    pub passphrase: String,
    /// Overrides the configured coin
    #[serde(default)]
    pub coin: Option<CoinType>,
    #[serde(default)]
    pub amount: u64,
    /// Overrides the configured fee rate
    #[serde(default)]
    pub byte_fee: Option<u64>,
    /// Defaults to the derived address
    #[serde(default)]
    pub to_address: Option<String>,
    /// Defaults to the derived address
    #[serde(default)]
    pub change_address: Option<String>,
    #[serde(default)]
    pub use_max_amount: bool,
    pub utxos: Vec<Utxo>,
}

impl Scenario {
    /// Testnet wallet with four outputs, paying 1 000 000 sats back to itself
    pub fn sample() -> Self {
        Self {
            mnemonic: SAMPLE_MNEMONIC.to_string(),
            passphrase: String::new(),
            coin: Some(CoinType::BitcoinTestnet),
            amount: 1_000_000,
            byte_fee: Some(10),
            to_address: None,
            change_address: None,
            use_max_amount: false,
            utxos: vec![
                Utxo::new("c00e4d0a2b6b8d5a39aed9bb3f1773f8f3126b9f10fdcd7944d15a620e71bf7a", 0, 5_000),
                Utxo::new("2b0a61e429bf4acb580310118db94f27a8a6a51d3b4a1152f25fdb76057c62d1", 1, 1_000),
                Utxo::new("6cc82a0a689c2a39803ff8a07a25c6ea022ac01182c5773f17b185f8a25dba30", 1, 175_085),
                Utxo::new("6cc82a0a689c2a39803ff8a07a25c6ea022ac01182c5773f17b185f8a25dba30", 0, 1_000_000),
            ],
        }
    }

    pub fn load(path: impl AsRef<Path>) -> SignerResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            SignerError::invalid_input(format!("Cannot read scenario {}: {}", path.display(), e))
        })?;
        let scenario: Scenario = serde_json::from_str(&raw)?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn validate(&self) -> SignerResult<()> {
        if self.mnemonic.trim().is_empty() {
            return Err(SignerError::invalid_input("Scenario has no mnemonic"));
        }
        if self.utxos.is_empty() {
            return Err(SignerError::invalid_input("Scenario has no UTXOs"));
        }
        if !self.use_max_amount {
            if self.amount == 0 {
                return Err(SignerError::invalid_input("Scenario amount must be greater than zero"));
            }
            let total = wallet::utxo::total_value(&self.utxos);
            if self.amount > total {
                return Err(SignerError::insufficient_funds(format!(
                    "Scenario sends {} sats but its UTXOs hold {}",
                    self.amount, total
                )));
            }
        }
        wallet::utxo::ensure_unique(&self.utxos)
    }
}

fn serialize_secret<S: Serializer>(value: &Zeroizing<String>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(value.as_str())
}

/// Everything the flow produced, in the order it was produced
#[derive(Serialize)]
pub struct DemoReport {
    pub backend: &'static str,
    pub coin: CoinType,
    pub mnemonic_valid: bool,
    #[serde(serialize_with = "serialize_secret")]
    pub private_key_hex: Zeroizing<String>,
    pub address: String,
    pub lock_script_hex: String,
    pub plan: PlanSummary,
    /// Why the key-less signing attempt was refused
    pub keyless_error: SignerError,
    pub signed: SignedTransaction,
}

impl fmt::Debug for DemoReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DemoReport")
            .field("backend", &self.backend)
            .field("coin", &self.coin)
            .field("private_key_hex", &"[REDACTED]")
            .field("address", &self.address)
            .field("plan", &self.plan)
            .field("keyless_error", &self.keyless_error)
            .field("signed", &self.signed)
            .finish()
    }
}

/// Run the full flow against `backend`
pub fn run_demo<B: WalletCore>(backend: B, scenario: &Scenario, config: &SignerConfig) -> SignerResult<DemoReport> {
    scenario.validate()?;
    let coin = scenario.coin.unwrap_or(config.coin);
    let client = AnySignerClient::new(backend, coin);
    let backend_name = client.backend().name();

    let mnemonic_valid = wallet::validate_mnemonic(client.backend(), &scenario.mnemonic);
    log_info!("demo", "mnemonic checked", valid = mnemonic_valid, backend = backend_name);
    if !mnemonic_valid {
        return Err(SignerError::invalid_mnemonic("Scenario mnemonic is not valid"));
    }

    let keys = wallet::derive_account(client.backend(), &scenario.mnemonic, &scenario.passphrase, coin)?;
    let to_address = scenario.to_address.clone().unwrap_or_else(|| keys.address.clone());
    let change_address = scenario.change_address.clone().unwrap_or_else(|| keys.address.clone());

    let mut input = SigningRequestBuilder::new(coin)
        .byte_fee(scenario.byte_fee.unwrap_or(config.byte_fee))
        .sighash(config.sighash)
        .amount(scenario.amount)
        .to_address(to_address)
        .change_address(change_address)
        .use_max_amount(scenario.use_max_amount)
        .utxo_set(&scenario.utxos, &keys.lock_script)?
        .build()?;

    let plan = client.plan(&input)?;
    input.plan = Some(plan.clone());

    let keyless_error = match client.sign(&input) {
        Ok(_) => return Err(SignerError::internal("Signing without private keys returned a transaction")),
        Err(e) => e,
    };
    log_warn!("demo", "key-less signing refused", error = keyless_error);

    input.private_key = vec![keys.private_key.to_vec()];
    let signed = client.plan_and_sign(input)?;
    log_info!(
        "demo",
        "signed transaction",
        txid = signed.txid,
        size = signed.size_bytes,
        fee = signed.fee,
    );

    Ok(DemoReport {
        backend: backend_name,
        coin,
        mnemonic_valid,
        private_key_hex: keys.private_key_hex(),
        address: keys.address.clone(),
        lock_script_hex: keys.lock_script_hex(),
        plan: summarize(&plan),
        keyless_error,
        signed,
    })
}
