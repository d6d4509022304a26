//! Signing Request Builder
//!
//! Assembles a [`SigningInput`] from typed values. Addresses are checked
//! against the coin's network; the change address defaults to the
//! destination.

use std::collections::HashMap;

use crate::config::SignerConfig;
use crate::error::{SignerError, SignerResult};
use crate::proto::{SigningInput, UnspentTransaction};
use crate::types::{CoinType, SigHashType};
use crate::wallet::utxo::{self, Utxo};
use crate::wallet::validate_address;

/// Fluent builder for signing requests
#[derive(Debug, Clone)]
pub struct SigningRequestBuilder {
    coin: CoinType,
    amount: u64,
    byte_fee: u64,
    sighash: SigHashType,
    to_address: Option<String>,
    change_address: Option<String>,
    private_keys: Vec<Vec<u8>>,
    utxos: Vec<UnspentTransaction>,
    scripts: HashMap<String, Vec<u8>>,
    use_max_amount: bool,
}

impl SigningRequestBuilder {
    pub fn new(coin: CoinType) -> Self {
        Self {
            coin,
            amount: 0,
            byte_fee: crate::config::DEFAULT_BYTE_FEE,
            sighash: SigHashType::All,
            to_address: None,
            change_address: None,
            private_keys: Vec::new(),
            utxos: Vec::new(),
            scripts: HashMap::new(),
            use_max_amount: false,
        }
    }

    /// Start from configured coin, fee rate and sighash
    pub fn from_config(config: &SignerConfig) -> Self {
        Self::new(config.coin).byte_fee(config.byte_fee).sighash(config.sighash)
    }

    pub fn amount(mut self, amount: u64) -> Self {
        self.amount = amount;
        self
    }

    pub fn byte_fee(mut self, byte_fee: u64) -> Self {
        self.byte_fee = byte_fee;
        self
    }

    pub fn sighash(mut self, sighash: SigHashType) -> Self {
        self.sighash = sighash;
        self
    }

    pub fn to_address(mut self, address: impl Into<String>) -> Self {
        self.to_address = Some(address.into());
        self
    }

    pub fn change_address(mut self, address: impl Into<String>) -> Self {
        self.change_address = Some(address.into());
        self
    }

    pub fn private_key(mut self, key: &[u8]) -> Self {
        self.private_keys.push(key.to_vec());
        self
    }

    pub fn utxo(mut self, utxo: UnspentTransaction) -> Self {
        self.utxos.push(utxo);
        self
    }

    pub fn utxos(mut self, utxos: impl IntoIterator<Item = UnspentTransaction>) -> Self {
        self.utxos.extend(utxos);
        self
    }

    /// Add display-form UTXOs; empty scripts take `default_script`
    pub fn utxo_set(self, utxos: &[Utxo], default_script: &[u8]) -> SignerResult<Self> {
        let converted = utxo::to_proto_set(utxos, default_script)?;
        Ok(self.utxos(converted))
    }

    /// Register a redeem script under its hex script hash
    pub fn redeem_script(mut self, script_hash: impl Into<String>, script: Vec<u8>) -> Self {
        self.scripts.insert(script_hash.into(), script);
        self
    }

    pub fn use_max_amount(mut self, enabled: bool) -> Self {
        self.use_max_amount = enabled;
        self
    }

    pub fn build(self) -> SignerResult<SigningInput> {
        let to_address = match self.to_address {
            Some(address) if !address.trim().is_empty() => validate_address(&address, self.coin)?,
            _ => return Err(SignerError::invalid_input("Destination address is required")),
        };
        if self.utxos.is_empty() {
            return Err(SignerError::invalid_input("At least one UTXO is required"));
        }

        let change_address = match self.change_address {
            Some(address) if !address.trim().is_empty() => validate_address(&address, self.coin)?,
            _ => to_address.clone(),
        };

        let amount = i64::try_from(self.amount)
            .map_err(|_| SignerError::invalid_input(format!("Amount {} overflows", self.amount)))?;
        let byte_fee = i64::try_from(self.byte_fee)
            .map_err(|_| SignerError::invalid_input(format!("Byte fee {} overflows", self.byte_fee)))?;

        Ok(SigningInput {
            hash_type: self.sighash.to_u32(),
            amount,
            byte_fee,
            to_address,
            change_address,
            private_key: self.private_keys,
            scripts: self.scripts,
            utxo: self.utxos,
            use_max_amount: self.use_max_amount,
            coin_type: self.coin.id(),
            plan: None,
        })
    }
}
