//! Address and Mnemonic Validation

use bitcoin::Address;
use std::str::FromStr;
use unicode_normalization::UnicodeNormalization;

use crate::error::{SignerError, SignerResult};
use crate::native::WalletCore;
use crate::types::CoinType;

/// NFKD-normalize a phrase and collapse runs of whitespace
pub fn normalize_mnemonic(phrase: &str) -> String {
    let normalized: String = phrase.nfkd().collect();
    normalized.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Check a mnemonic phrase with the signing engine
pub fn validate_mnemonic<B: WalletCore>(backend: &B, phrase: &str) -> bool {
    let normalized = normalize_mnemonic(phrase);
    !normalized.is_empty() && backend.is_valid_mnemonic(&normalized)
}

/// Validate an address against the coin's network; returns it trimmed
pub fn validate_address(address: &str, coin: CoinType) -> SignerResult<String> {
    let trimmed = address.trim();
    if trimmed.is_empty() {
        return Err(SignerError::invalid_address("Address is empty"));
    }

    let unchecked = Address::from_str(trimmed)
        .map_err(|e| SignerError::invalid_address(format!("Invalid address '{}': {}", trimmed, e)))?;
    if !unchecked.is_valid_for_network(coin.network()) {
        return Err(SignerError::invalid_address(format!(
            "Address '{}' is not valid for {}",
            trimmed, coin
        )));
    }
    Ok(trimmed.to_string())
}
