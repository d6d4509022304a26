//! Unified error types for the signer
//!
//! Every failure, whether it is raised locally or reported by the signing
//! engine, flows through [`SignerError`] so callers see one taxonomy.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::proto::common::SigningError;

/// Main error type for all signer operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<String>,
}

impl SignerError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    // Convenience constructors
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, msg)
    }

    pub fn invalid_mnemonic(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidMnemonic, msg)
    }

    pub fn invalid_address(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidAddress, msg)
    }

    pub fn insufficient_funds(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InsufficientFunds, msg)
    }

    pub fn missing_signing_keys(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::MissingSigningKeys, msg)
    }

    pub fn malformed_request(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::MalformedRequest, msg)
    }

    pub fn malformed_response(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::MalformedResponse, msg)
    }

    pub fn empty_result(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::EmptyResult, msg)
    }

    pub fn signing_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::SigningFailed, msg)
    }

    pub fn unsupported_coin(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::UnsupportedCoin, msg)
    }

    pub fn native_unavailable(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::NativeUnavailable, msg)
    }

    pub fn crypto_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::CryptoError, msg)
    }

    pub fn parse_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ParseError, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, msg)
    }

    /// Translate an error code reported by the signing engine.
    pub fn from_engine(error: SigningError, message: impl Into<String>) -> Self {
        let code = match error {
            SigningError::LowBalance | SigningError::NotEnoughUtxos => ErrorCode::InsufficientFunds,
            SigningError::MissingPrivateKey => ErrorCode::MissingSigningKeys,
            SigningError::InvalidAddress => ErrorCode::InvalidAddress,
            SigningError::InvalidPrivateKey => ErrorCode::InvalidPrivateKey,
            SigningError::ZeroAmountRequested
            | SigningError::MissingInputUtxos
            | SigningError::InvalidUtxo
            | SigningError::InvalidUtxoAmount => ErrorCode::MalformedRequest,
            _ => ErrorCode::SigningFailed,
        };
        Self::new(code, message).with_details(format!("engine error {:?}", error))
    }
}

impl fmt::Display for SignerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for SignerError {}

/// Error codes for categorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // Input errors
    InvalidInput,
    InvalidMnemonic,
    InvalidAddress,
    InvalidPrivateKey,

    // Protocol errors
    InsufficientFunds,
    MissingSigningKeys,
    MalformedRequest,
    MalformedResponse,
    EmptyResult,
    SigningFailed,

    // Engine availability
    UnsupportedCoin,
    NativeUnavailable,

    // Crypto errors
    CryptoError,

    // Parse errors
    ParseError,
    HexError,
    JsonError,

    // Internal
    Internal,
}

/// Result type alias for signer operations
pub type SignerResult<T> = Result<T, SignerError>;

// Conversions from common error types

impl From<prost::DecodeError> for SignerError {
    fn from(e: prost::DecodeError) -> Self {
        SignerError::new(ErrorCode::MalformedResponse, format!("Protobuf decode failed: {}", e))
    }
}

impl From<prost::EncodeError> for SignerError {
    fn from(e: prost::EncodeError) -> Self {
        SignerError::new(ErrorCode::MalformedRequest, format!("Protobuf encode failed: {}", e))
    }
}

impl From<serde_json::Error> for SignerError {
    fn from(e: serde_json::Error) -> Self {
        SignerError::new(ErrorCode::JsonError, e.to_string())
    }
}

impl From<hex::FromHexError> for SignerError {
    fn from(e: hex::FromHexError) -> Self {
        SignerError::new(ErrorCode::HexError, e.to_string())
    }
}

impl From<std::io::Error> for SignerError {
    fn from(e: std::io::Error) -> Self {
        SignerError::new(ErrorCode::Internal, e.to_string())
    }
}

impl From<bitcoin::bip32::Error> for SignerError {
    fn from(e: bitcoin::bip32::Error) -> Self {
        SignerError::new(ErrorCode::CryptoError, format!("BIP32 error: {}", e))
    }
}

impl From<bitcoin::secp256k1::Error> for SignerError {
    fn from(e: bitcoin::secp256k1::Error) -> Self {
        SignerError::new(ErrorCode::CryptoError, format!("Secp256k1 error: {}", e))
    }
}

impl From<bip39::Error> for SignerError {
    fn from(e: bip39::Error) -> Self {
        SignerError::new(ErrorCode::InvalidMnemonic, format!("BIP39 error: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let err = SignerError::insufficient_funds("Not enough BTC")
            .with_details("Required: 1002080 sats, Available: 6000 sats");

        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("insufficient_funds"));
        assert!(json.contains("Not enough BTC"));
    }

    #[test]
    fn test_engine_error_mapping() {
        let err = SignerError::from_engine(SigningError::NotEnoughUtxos, "plan failed");
        assert_eq!(err.code, ErrorCode::InsufficientFunds);

        let err = SignerError::from_engine(SigningError::MissingPrivateKey, "sign failed");
        assert_eq!(err.code, ErrorCode::MissingSigningKeys);

        let err = SignerError::from_engine(SigningError::TxTooBig, "sign failed");
        assert_eq!(err.code, ErrorCode::SigningFailed);
        assert!(err.to_string().contains("TxTooBig"));
    }

    #[test]
    fn test_decode_error_is_malformed_response() {
        let err: SignerError = prost::DecodeError::new("truncated").into();
        assert_eq!(err.code, ErrorCode::MalformedResponse);
    }
}
