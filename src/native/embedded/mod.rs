//! Embedded Signing Engine
//!
//! An in-process stand-in for the native engine with the same byte-level
//! contract: protobuf in, protobuf out, failures reported through the
//! `error` field of the response rather than as a Rust error. BIP39/BIP32,
//! script templates, sighash and serialization come from the `bitcoin` and
//! `bip39` crates.

mod planner;
mod signer;

pub use planner::plan_transaction;
pub use signer::sign_transaction;

use bip39::Mnemonic;
use bitcoin::bip32::{DerivationPath, Xpriv};
use bitcoin::key::CompressedPublicKey;
use bitcoin::secp256k1::Secp256k1;
use bitcoin::Address;
use prost::Message;
use std::str::FromStr;
use zeroize::Zeroizing;

use super::{HdWallet, WalletCore};
use crate::config::DEFAULT_DUST_THRESHOLD;
use crate::error::{SignerError, SignerResult};
use crate::proto::{SigningError, SigningInput, SigningOutput, TransactionPlan};
use crate::types::CoinType;
use crate::{log_debug, log_warn};

/// Failures raised inside the embedded engine
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("Requested amount is zero")]
    ZeroAmount,

    #[error("No input UTXOs supplied")]
    MissingInputUtxos,

    #[error("Invalid UTXO at index {0}: {1}")]
    InvalidUtxo(usize, String),

    #[error("UTXO at index {0} has non-positive amount {1}")]
    InvalidUtxoAmount(usize, i64),

    #[error("Not enough UTXOs: need {needed} sats, have {available} sats")]
    NotEnoughUtxos { needed: u64, available: u64 },

    #[error("Invalid fee rate: {0}")]
    WrongFee(i64),

    #[error("Invalid address '{0}'")]
    InvalidAddress(String),

    #[error("Invalid private key at index {0}")]
    InvalidPrivateKey(usize),

    #[error("No private key matches input {0}")]
    MissingPrivateKey(usize),

    #[error("Unsupported locking script on input {0}")]
    UnsupportedScript(usize),

    #[error("Unsupported sighash type {0:#x}")]
    UnsupportedSighash(u32),

    #[error("Inconsistent plan: {0}")]
    InvalidPlan(String),

    #[error("Request is for coin {request}, engine was asked for {engine}")]
    CoinMismatch { request: u32, engine: u32 },

    #[error("Signing failed: {0}")]
    Signing(String),
}

impl EngineError {
    /// Wire error code reported back to the caller
    pub fn code(&self) -> SigningError {
        match self {
            EngineError::ZeroAmount => SigningError::ZeroAmountRequested,
            EngineError::MissingInputUtxos => SigningError::MissingInputUtxos,
            EngineError::InvalidUtxo(..) => SigningError::InvalidUtxo,
            EngineError::InvalidUtxoAmount(..) => SigningError::InvalidUtxoAmount,
            EngineError::NotEnoughUtxos { .. } => SigningError::NotEnoughUtxos,
            EngineError::WrongFee(_) => SigningError::WrongFee,
            EngineError::InvalidAddress(_) => SigningError::InvalidAddress,
            EngineError::InvalidPrivateKey(_) => SigningError::InvalidPrivateKey,
            EngineError::MissingPrivateKey(_) => SigningError::MissingPrivateKey,
            EngineError::UnsupportedScript(_) => SigningError::ScriptOutput,
            EngineError::UnsupportedSighash(_) => SigningError::Signing,
            EngineError::InvalidPlan(_) | EngineError::CoinMismatch { .. } => SigningError::General,
            EngineError::Signing(_) => SigningError::Signing,
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

/// In-process signing engine
#[derive(Debug, Clone, Copy)]
pub struct EmbeddedCore {
    dust_threshold: u64,
}

impl Default for EmbeddedCore {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbeddedCore {
    pub fn new() -> Self {
        Self {
            dust_threshold: DEFAULT_DUST_THRESHOLD,
        }
    }

    pub fn with_dust_threshold(mut self, dust_threshold: u64) -> Self {
        self.dust_threshold = dust_threshold;
        self
    }

    pub fn dust_threshold(&self) -> u64 {
        self.dust_threshold
    }

    /// Decode a request the way the native engine does: an undecodable
    /// buffer yields nothing, and the caller returns an empty response.
    fn decode_request(&self, input: &[u8], coin: CoinType) -> Option<EngineResult<SigningInput>> {
        let request = match SigningInput::decode(input) {
            Ok(request) => request,
            Err(e) => {
                log_warn!("embedded", "undecodable signing input", error = e);
                return None;
            }
        };
        if request.coin_type != coin.id() {
            return Some(Err(EngineError::CoinMismatch {
                request: request.coin_type,
                engine: coin.id(),
            }));
        }
        Some(Ok(request))
    }
}

/// HD wallet whose seed lives in process memory
pub struct EmbeddedWallet {
    seed: Zeroizing<[u8; 64]>,
}

impl EmbeddedWallet {
    fn derive(&self, coin: CoinType) -> SignerResult<(Xpriv, CompressedPublicKey)> {
        let secp = Secp256k1::new();
        let master = Xpriv::new_master(coin.network(), self.seed.as_ref())?;
        let path = DerivationPath::from_str(coin.derivation_path())?;
        let child = master.derive_priv(&secp, &path)?;
        let public = CompressedPublicKey(child.private_key.public_key(&secp));
        Ok((child, public))
    }
}

impl HdWallet for EmbeddedWallet {
    fn private_key_for_coin(&self, coin: CoinType) -> SignerResult<Zeroizing<Vec<u8>>> {
        let (child, _) = self.derive(coin)?;
        Ok(Zeroizing::new(child.private_key.secret_bytes().to_vec()))
    }

    fn address_for_coin(&self, coin: CoinType) -> SignerResult<String> {
        let (_, public) = self.derive(coin)?;
        Ok(Address::p2wpkh(&public, coin.network()).to_string())
    }
}

impl WalletCore for EmbeddedCore {
    type Wallet = EmbeddedWallet;

    fn name(&self) -> &'static str {
        "embedded"
    }

    fn is_valid_mnemonic(&self, mnemonic: &str) -> bool {
        Mnemonic::parse(mnemonic).is_ok()
    }

    fn create_wallet(&self, mnemonic: &str, passphrase: &str) -> SignerResult<EmbeddedWallet> {
        let mnemonic = Mnemonic::parse(mnemonic)
            .map_err(|e| SignerError::invalid_mnemonic(format!("Invalid mnemonic: {}", e)))?;
        Ok(EmbeddedWallet {
            seed: Zeroizing::new(mnemonic.to_seed(passphrase)),
        })
    }

    fn lock_script_for_address(&self, address: &str, coin: CoinType) -> SignerResult<Vec<u8>> {
        let script = planner::script_for_address(address, coin)
            .map_err(|e| SignerError::invalid_address(e.to_string()))?;
        Ok(script.into_bytes())
    }

    fn plan(&self, input: &[u8], coin: CoinType) -> SignerResult<Vec<u8>> {
        let request = match self.decode_request(input, coin) {
            Some(request) => request,
            None => return Ok(Vec::new()),
        };
        let plan = request
            .and_then(|request| plan_transaction(&request, coin, self.dust_threshold))
            .unwrap_or_else(|e| {
                log_debug!("embedded", "planning failed", error = e);
                TransactionPlan {
                    error: e.code() as i32,
                    ..Default::default()
                }
            });
        Ok(plan.encode_to_vec())
    }

    fn sign(&self, input: &[u8], coin: CoinType) -> SignerResult<Vec<u8>> {
        let request = match self.decode_request(input, coin) {
            Some(request) => request,
            None => return Ok(Vec::new()),
        };
        let output = request
            .and_then(|request| sign_transaction(&request, coin, self.dust_threshold))
            .unwrap_or_else(|e| {
                log_debug!("embedded", "signing failed", error = e);
                SigningOutput {
                    error: e.code() as i32,
                    error_message: e.to_string(),
                    ..Default::default()
                }
            });
        Ok(output.encode_to_vec())
    }
}
