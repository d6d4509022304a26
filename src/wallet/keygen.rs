//! Mnemonic Generation
//!
//! SECURITY: entropy is zeroized on drop.

use bip39::Mnemonic;
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroizing;

use crate::error::{SignerError, SignerResult};

/// Generate a new English mnemonic of 12 or 24 words
pub fn generate_mnemonic(words: usize) -> SignerResult<Zeroizing<String>> {
    let entropy_len = match words {
        12 => 16,
        24 => 32,
        other => {
            return Err(SignerError::invalid_input(format!(
                "Unsupported mnemonic length {}, expected 12 or 24",
                other
            )))
        }
    };

    let mut entropy = Zeroizing::new([0u8; 32]);
    OsRng.fill_bytes(&mut entropy[..entropy_len]);

    let mnemonic = Mnemonic::from_entropy(&entropy[..entropy_len])
        .map_err(|e| SignerError::crypto_error(format!("Failed to create mnemonic: {}", e)))?;
    Ok(Zeroizing::new(mnemonic.to_string()))
}
