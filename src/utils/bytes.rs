//! Byte-order helpers for transaction hashes
//!
//! Transaction ids are displayed big-endian but travel over the wire and
//! through the engine in reversed (little-endian) order.

use crate::error::{SignerError, SignerResult};

/// Length of a transaction hash in bytes
pub const HASH_LEN: usize = 32;

/// Reverse a byte buffer, returning a new vector
pub fn reversed(bytes: &[u8]) -> Vec<u8> {
    bytes.iter().rev().copied().collect()
}

/// Reverse a byte buffer in place
pub fn reverse_in_place(bytes: &mut [u8]) {
    bytes.reverse();
}

/// Decode a display txid into wire byte order
pub fn wire_hash_from_display(txid_hex: &str) -> SignerResult<Vec<u8>> {
    let trimmed = txid_hex.trim();
    let mut bytes = hex::decode(trimmed)
        .map_err(|e| SignerError::parse_error(format!("Invalid txid hex '{}': {}", trimmed, e)))?;
    if bytes.len() != HASH_LEN {
        return Err(SignerError::invalid_input(format!(
            "Transaction hash must be {} bytes, got {}",
            HASH_LEN,
            bytes.len()
        )));
    }
    reverse_in_place(&mut bytes);
    Ok(bytes)
}

/// Encode a wire-order hash as display hex
pub fn display_from_wire_hash(hash: &[u8]) -> String {
    hex::encode(reversed(hash))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DISPLAY: &str = "c00e4d0a2b6b8d5a39aed9bb3f1773f8f3126b9f10fdcd7944d15a620e71bf7a";

    #[test]
    fn test_wire_hash_is_reversed() {
        let wire = wire_hash_from_display(DISPLAY).unwrap();
        assert_eq!(wire[0], 0x7a);
        assert_eq!(wire[31], 0xc0);
        assert_eq!(display_from_wire_hash(&wire), DISPLAY);
    }

    #[test]
    fn test_reverse_twice_is_identity() {
        let original: Vec<u8> = (0u8..32).collect();
        assert_eq!(reversed(&reversed(&original)), original);
    }

    #[test]
    fn test_rejects_short_hash() {
        let err = wire_hash_from_display("abcd").unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::InvalidInput);
    }

    #[test]
    fn test_rejects_bad_hex() {
        let err = wire_hash_from_display("zz").unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::ParseError);
    }
}
