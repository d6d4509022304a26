//! UTXO Model
//!
//! Outputs are stored as they are shown by explorers: display txid (big
//! endian hex) and a hex locking script. Conversion into the wire message
//! reverses the hash.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{SignerError, SignerResult};
use crate::proto::{OutPoint, UnspentTransaction};
use crate::utils::bytes::{display_from_wire_hash, wire_hash_from_display};

// =============================================================================
// Types
// =============================================================================

/// An unspent output owned by the wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    pub txid: String,
    pub vout: u32,
    #[serde(default)]
    pub sequence: u32,
    /// Amount in satoshis
    pub amount: u64,
    /// Locking script, hex. Empty means "use the account's lock script".
    #[serde(default)]
    pub script: String,
}

impl Utxo {
    pub fn new(txid: impl Into<String>, vout: u32, amount: u64) -> Self {
        Self {
            txid: txid.into(),
            vout,
            sequence: 0,
            amount,
            script: String::new(),
        }
    }

    pub fn with_script(mut self, script: &[u8]) -> Self {
        self.script = hex::encode(script);
        self
    }

    pub fn with_sequence(mut self, sequence: u32) -> Self {
        self.sequence = sequence;
        self
    }

    /// Create UTXO key for indexing
    pub fn key(&self) -> String {
        format!("{}:{}", self.txid, self.vout)
    }

    /// Convert into the wire message, reversing the txid bytes
    pub fn to_proto(&self) -> SignerResult<UnspentTransaction> {
        let hash = wire_hash_from_display(&self.txid)?;
        let script = hex::decode(self.script.trim())
            .map_err(|e| SignerError::parse_error(format!("Invalid script hex for {}: {}", self.key(), e)))?;
        let amount = i64::try_from(self.amount)
            .map_err(|_| SignerError::invalid_input(format!("Amount of {} overflows", self.key())))?;

        Ok(UnspentTransaction {
            out_point: Some(OutPoint {
                hash,
                index: self.vout,
                sequence: self.sequence,
            }),
            script,
            amount,
        })
    }

    /// Recover a display-form UTXO from a wire message
    pub fn from_proto(utxo: &UnspentTransaction) -> SignerResult<Self> {
        let out_point = utxo
            .out_point
            .as_ref()
            .ok_or_else(|| SignerError::malformed_response("UTXO without out point"))?;
        Ok(Self {
            txid: display_from_wire_hash(&out_point.hash),
            vout: out_point.index,
            sequence: out_point.sequence,
            amount: utxo.amount_sats(),
            script: hex::encode(&utxo.script),
        })
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Total value of a UTXO set, saturating at `u64::MAX`
pub fn total_value(utxos: &[Utxo]) -> u64 {
    utxos.iter().fold(0u64, |acc, u| acc.saturating_add(u.amount))
}

/// Reject duplicate outpoints
pub fn ensure_unique(utxos: &[Utxo]) -> SignerResult<()> {
    let mut seen = HashSet::new();
    for utxo in utxos {
        let key = format!("{}:{}", utxo.txid.trim().to_ascii_lowercase(), utxo.vout);
        if !seen.insert(key) {
            return Err(SignerError::invalid_input(format!("Duplicate UTXO {}", utxo.key())));
        }
    }
    Ok(())
}

/// Convert a UTXO set, filling empty scripts with `default_script`
pub fn to_proto_set(utxos: &[Utxo], default_script: &[u8]) -> SignerResult<Vec<UnspentTransaction>> {
    ensure_unique(utxos)?;
    utxos
        .iter()
        .map(|utxo| {
            let mut message = utxo.to_proto()?;
            if message.script.is_empty() {
                message.script = default_script.to_vec();
            }
            Ok(message)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TXID: &str = "c00e4d0a2b6b8d5a39aed9bb3f1773f8f3126b9f10fdcd7944d15a620e71bf7a";

    #[test]
    fn test_to_proto_reverses_hash() {
        let utxo = Utxo::new(TXID, 0, 5000).with_script(&[0x00, 0x14]);
        let message = utxo.to_proto().unwrap();
        let out_point = message.out_point.unwrap();
        assert_eq!(out_point.hash[0], 0x7a);
        assert_eq!(out_point.hash[31], 0xc0);
        assert_eq!(message.amount, 5000);
        assert_eq!(message.script, vec![0x00, 0x14]);
    }

    #[test]
    fn test_from_proto_restores_display() {
        let utxo = Utxo::new(TXID, 3, 1000).with_sequence(7);
        let restored = Utxo::from_proto(&utxo.to_proto().unwrap()).unwrap();
        assert_eq!(restored, utxo);
    }

    #[test]
    fn test_bad_txid_rejected() {
        assert!(Utxo::new("abcd", 0, 1).to_proto().is_err());
        assert!(Utxo::new("zz", 0, 1).to_proto().is_err());
    }

    #[test]
    fn test_duplicates_rejected() {
        let utxos = vec![Utxo::new(TXID, 0, 1), Utxo::new(TXID.to_uppercase(), 0, 2)];
        assert!(ensure_unique(&utxos).is_err());
        assert!(to_proto_set(&utxos, &[]).is_err());
    }

    #[test]
    fn test_default_script_filled() {
        let utxos = vec![Utxo::new(TXID, 0, 1), Utxo::new(TXID, 1, 2).with_script(&[0x51])];
        let set = to_proto_set(&utxos, &[0xaa]).unwrap();
        assert_eq!(set[0].script, vec![0xaa]);
        assert_eq!(set[1].script, vec![0x51]);
        assert_eq!(total_value(&utxos), 3);
    }

    #[test]
    fn test_serde_defaults() {
        let utxo: Utxo = serde_json::from_str(&format!(r#"{{"txid":"{}","vout":1,"amount":9}}"#, TXID)).unwrap();
        assert_eq!(utxo.sequence, 0);
        assert!(utxo.script.is_empty());
    }
}
