//! Signer Configuration
//!
//! Settings are read from an optional JSON file and then overridden by CLI
//! flags. Missing keys fall back to the defaults below.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{SignerError, SignerResult};
use crate::types::{CoinType, SigHashType};
use crate::utils::logging;

/// Highest dust threshold accepted from configuration
pub const MAX_DUST_THRESHOLD: u64 = 10_000;

/// Default fee rate in satoshis per virtual byte
pub const DEFAULT_BYTE_FEE: u64 = 10;

/// Outputs below this many satoshis are folded into the fee
pub const DEFAULT_DUST_THRESHOLD: u64 = 546;

/// Which signing engine handles requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// In-process engine built on the `bitcoin` crate
    Embedded,
    /// libTrustWalletCore through the C ABI
    Native,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Embedded => write!(f, "embedded"),
            BackendKind::Native => write!(f, "native"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = SignerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "embedded" => Ok(BackendKind::Embedded),
            "native" | "trust-wallet-core" => Ok(BackendKind::Native),
            other => Err(SignerError::invalid_input(format!("Unknown backend '{}'", other))),
        }
    }
}

/// Signer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignerConfig {
    pub coin: CoinType,
    /// Fee rate in satoshis per virtual byte
    pub byte_fee: u64,
    pub sighash: SigHashType,
    /// Change below this value is added to the fee instead
    pub dust_threshold: u64,
    pub backend: BackendKind,
    pub debug_logging: bool,
    /// Shorten addresses and hashes in log output
    pub redact_logs: bool,
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            coin: CoinType::BitcoinTestnet,
            byte_fee: DEFAULT_BYTE_FEE,
            sighash: SigHashType::All,
            dust_threshold: DEFAULT_DUST_THRESHOLD,
            backend: BackendKind::Embedded,
            debug_logging: false,
            redact_logs: true,
        }
    }
}

impl SignerConfig {
    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> SignerResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            SignerError::invalid_input(format!("Cannot read config {}: {}", path.display(), e))
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> SignerResult<Self> {
        let config: SignerConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject unusable settings; returns warnings for questionable ones
    pub fn validate(&self) -> SignerResult<Vec<String>> {
        if self.byte_fee == 0 {
            return Err(SignerError::invalid_input("byte_fee must be greater than zero"));
        }
        if self.dust_threshold > MAX_DUST_THRESHOLD {
            return Err(SignerError::invalid_input(format!(
                "dust_threshold {} exceeds maximum {}",
                self.dust_threshold, MAX_DUST_THRESHOLD
            )));
        }

        let mut warnings = Vec::new();
        if self.byte_fee > 1_000 {
            warnings.push(format!("Warning: byte_fee {} sat/vB is unusually high", self.byte_fee));
        }
        if self.sighash != SigHashType::All {
            warnings.push(format!(
                "Warning: sighash {:?} does not commit to every input and output",
                self.sighash
            ));
        }
        if !self.redact_logs && self.debug_logging {
            warnings.push("Warning: Debug logging enabled without log redaction".to_string());
        }
        Ok(warnings)
    }

    /// Push logging settings into the global logger
    pub fn apply_logging(&self) {
        if self.debug_logging {
            logging::enable_debug();
        } else {
            logging::disable_debug();
        }
        logging::set_redact_public(self.redact_logs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SignerConfig::default();
        assert!(config.validate().unwrap().is_empty());
        assert_eq!(config.byte_fee, 10);
        assert_eq!(config.coin, CoinType::BitcoinTestnet);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = SignerConfig::from_json(r#"{"byte_fee": 25, "coin": "bitcoin"}"#).unwrap();
        assert_eq!(config.byte_fee, 25);
        assert_eq!(config.coin, CoinType::Bitcoin);
        assert_eq!(config.dust_threshold, DEFAULT_DUST_THRESHOLD);
        assert_eq!(config.backend, BackendKind::Embedded);
    }

    #[test]
    fn test_zero_fee_rejected() {
        let err = SignerConfig::from_json(r#"{"byte_fee": 0}"#).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::InvalidInput);
    }

    #[test]
    fn test_dust_threshold_bound() {
        let config = SignerConfig {
            dust_threshold: MAX_DUST_THRESHOLD + 1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_all_sighash_warns() {
        let config = SignerConfig {
            sighash: SigHashType::Single,
            ..Default::default()
        };
        let warnings = config.validate().unwrap();
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_backend_parse() {
        assert_eq!("native".parse::<BackendKind>().unwrap(), BackendKind::Native);
        assert!("remote".parse::<BackendKind>().is_err());
    }
}
