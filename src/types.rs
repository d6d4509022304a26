//! Shared types for the signer
//!
//! Data structures that cross module boundaries are defined here
//! for consistent serialization.

use bitcoin::Network;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use zeroize::Zeroizing;

use crate::error::{SignerError, SignerResult};

// =============================================================================
// Coin Types
// =============================================================================

/// Coins the signing engine is asked to handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CoinType {
    Bitcoin,
    BitcoinTestnet,
}

impl CoinType {
    /// Numeric identifier passed across the engine boundary (SLIP-0044)
    pub fn id(&self) -> u32 {
        match self {
            CoinType::Bitcoin => 0,
            CoinType::BitcoinTestnet => 1,
        }
    }

    pub fn from_id(id: u32) -> SignerResult<Self> {
        match id {
            0 => Ok(CoinType::Bitcoin),
            1 => Ok(CoinType::BitcoinTestnet),
            other => Err(SignerError::unsupported_coin(format!("Unknown coin type {}", other))),
        }
    }

    pub fn network(&self) -> Network {
        match self {
            CoinType::Bitcoin => Network::Bitcoin,
            CoinType::BitcoinTestnet => Network::Testnet,
        }
    }

    /// BIP84 path of the first receive address
    pub fn derivation_path(&self) -> &'static str {
        match self {
            CoinType::Bitcoin => "m/84'/0'/0'/0/0",
            CoinType::BitcoinTestnet => "m/84'/1'/0'/0/0",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            CoinType::Bitcoin => "BTC",
            CoinType::BitcoinTestnet => "tBTC",
        }
    }
}

impl fmt::Display for CoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoinType::Bitcoin => write!(f, "bitcoin"),
            CoinType::BitcoinTestnet => write!(f, "bitcoin-testnet"),
        }
    }
}

impl FromStr for CoinType {
    type Err = SignerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bitcoin" | "btc" | "mainnet" => Ok(CoinType::Bitcoin),
            "bitcoin-testnet" | "testnet" | "tbtc" => Ok(CoinType::BitcoinTestnet),
            other => Err(SignerError::unsupported_coin(format!("Unknown coin '{}'", other))),
        }
    }
}

// =============================================================================
// Sighash Types
// =============================================================================

/// Which parts of the transaction a signature commits to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SigHashType {
    /// Sign all inputs and all outputs
    All = 0x01,
    /// Sign all inputs, no outputs
    None = 0x02,
    /// Sign all inputs, only output at same index
    Single = 0x03,
    AllAnyoneCanPay = 0x81,
    NoneAnyoneCanPay = 0x82,
    SingleAnyoneCanPay = 0x83,
}

impl SigHashType {
    pub fn to_u32(self) -> u32 {
        self as u32
    }

    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0x01 => Some(Self::All),
            0x02 => Some(Self::None),
            0x03 => Some(Self::Single),
            0x81 => Some(Self::AllAnyoneCanPay),
            0x82 => Some(Self::NoneAnyoneCanPay),
            0x83 => Some(Self::SingleAnyoneCanPay),
            _ => None,
        }
    }

    pub fn is_anyonecanpay(self) -> bool {
        (self as u32) & 0x80 != 0
    }
}

impl Default for SigHashType {
    fn default() -> Self {
        SigHashType::All
    }
}

// =============================================================================
// Results
// =============================================================================

/// Key material for one coin derived from an HD wallet
pub struct AccountKeys {
    pub coin: CoinType,
    pub private_key: Zeroizing<Vec<u8>>,
    pub address: String,
    pub lock_script: Vec<u8>,
}

impl AccountKeys {
    pub fn private_key_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.private_key.as_slice()))
    }

    pub fn lock_script_hex(&self) -> String {
        hex::encode(&self.lock_script)
    }
}

impl fmt::Debug for AccountKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountKeys")
            .field("coin", &self.coin)
            .field("private_key", &"[REDACTED]")
            .field("address", &self.address)
            .field("lock_script", &self.lock_script_hex())
            .finish()
    }
}

/// Human-facing summary of a transaction plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub amount: u64,
    pub available_amount: u64,
    pub fee: u64,
    pub change: u64,
    /// Selected outputs as `display_txid:vout`
    pub inputs: Vec<String>,
}

/// Signed transaction ready for broadcast
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub coin: CoinType,
    pub raw_tx: String,
    pub txid: String,
    pub fee: u64,
    pub change: u64,
    pub input_count: usize,
    pub size_bytes: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coin_type_ids_roundtrip() {
        for coin in [CoinType::Bitcoin, CoinType::BitcoinTestnet] {
            assert_eq!(CoinType::from_id(coin.id()).unwrap(), coin);
        }
        assert!(CoinType::from_id(60).is_err());
    }

    #[test]
    fn test_coin_type_parse() {
        assert_eq!("testnet".parse::<CoinType>().unwrap(), CoinType::BitcoinTestnet);
        assert_eq!("BTC".parse::<CoinType>().unwrap(), CoinType::Bitcoin);
        assert!("dogecoin".parse::<CoinType>().is_err());
    }

    #[test]
    fn test_sighash_bytes() {
        assert_eq!(SigHashType::All.to_u32(), 1);
        assert_eq!(SigHashType::from_u32(0x81), Some(SigHashType::AllAnyoneCanPay));
        assert!(SigHashType::SingleAnyoneCanPay.is_anyonecanpay());
        assert!(!SigHashType::Single.is_anyonecanpay());
        assert_eq!(SigHashType::from_u32(0x40), None);
    }

    #[test]
    fn test_account_keys_debug_redacts_key() {
        let keys = AccountKeys {
            coin: CoinType::BitcoinTestnet,
            private_key: Zeroizing::new(vec![0xab; 32]),
            address: "tb1qexample".to_string(),
            lock_script: vec![0x00, 0x14],
        };
        let debug = format!("{:?}", keys);
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("abab"));
    }
}
