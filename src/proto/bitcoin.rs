//! Bitcoin signing messages

use std::collections::HashMap;

/// Largest amount that can ever exist, in satoshis
pub const MAX_MONEY: i64 = 21_000_000 * 100_000_000;

/// Reference to a previous transaction output
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OutPoint {
    /// Previous transaction hash, in wire (reversed) byte order
    #[prost(bytes = "vec", tag = "1")]
    pub hash: Vec<u8>,
    #[prost(uint32, tag = "2")]
    pub index: u32,
    #[prost(uint32, tag = "3")]
    pub sequence: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UnspentTransaction {
    #[prost(message, optional, tag = "1")]
    pub out_point: Option<OutPoint>,
    /// Locking script protecting the output
    #[prost(bytes = "vec", tag = "2")]
    pub script: Vec<u8>,
    #[prost(int64, tag = "3")]
    pub amount: i64,
}

/// Request submitted to both plan and sign
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SigningInput {
    #[prost(uint32, tag = "1")]
    pub hash_type: u32,
    #[prost(int64, tag = "2")]
    pub amount: i64,
    #[prost(int64, tag = "3")]
    pub byte_fee: i64,
    #[prost(string, tag = "4")]
    pub to_address: String,
    #[prost(string, tag = "5")]
    pub change_address: String,
    #[prost(bytes = "vec", repeated, tag = "6")]
    pub private_key: Vec<Vec<u8>>,
    /// Redeem scripts keyed by hex script hash
    #[prost(map = "string, bytes", tag = "7")]
    pub scripts: HashMap<String, Vec<u8>>,
    #[prost(message, repeated, tag = "8")]
    pub utxo: Vec<UnspentTransaction>,
    #[prost(bool, tag = "9")]
    pub use_max_amount: bool,
    #[prost(uint32, tag = "10")]
    pub coin_type: u32,
    #[prost(message, optional, tag = "11")]
    pub plan: Option<TransactionPlan>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TransactionPlan {
    #[prost(int64, tag = "1")]
    pub amount: i64,
    #[prost(int64, tag = "2")]
    pub available_amount: i64,
    #[prost(int64, tag = "3")]
    pub fee: i64,
    #[prost(int64, tag = "4")]
    pub change: i64,
    #[prost(message, repeated, tag = "5")]
    pub utxos: Vec<UnspentTransaction>,
    #[prost(bytes = "vec", tag = "6")]
    pub branch_id: Vec<u8>,
    #[prost(enumeration = "super::common::SigningError", tag = "7")]
    pub error: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TransactionInput {
    #[prost(message, optional, tag = "1")]
    pub previous_output: Option<OutPoint>,
    #[prost(uint32, tag = "2")]
    pub sequence: u32,
    #[prost(bytes = "vec", tag = "3")]
    pub script: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TransactionOutput {
    #[prost(int64, tag = "1")]
    pub value: i64,
    #[prost(bytes = "vec", tag = "2")]
    pub script: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Transaction {
    #[prost(int32, tag = "1")]
    pub version: i32,
    #[prost(uint32, tag = "2")]
    pub lock_time: u32,
    #[prost(message, repeated, tag = "3")]
    pub inputs: Vec<TransactionInput>,
    #[prost(message, repeated, tag = "4")]
    pub outputs: Vec<TransactionOutput>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SigningOutput {
    #[prost(message, optional, tag = "1")]
    pub transaction: Option<Transaction>,
    /// Serialized transaction ready for broadcast
    #[prost(bytes = "vec", tag = "2")]
    pub encoded: Vec<u8>,
    #[prost(string, tag = "3")]
    pub transaction_id: String,
    #[prost(enumeration = "super::common::SigningError", tag = "4")]
    pub error: i32,
    #[prost(string, tag = "5")]
    pub error_message: String,
}

impl UnspentTransaction {
    /// Amount as unsigned satoshis; negative amounts clamp to zero.
    pub fn amount_sats(&self) -> u64 {
        u64::try_from(self.amount).unwrap_or(0)
    }

    /// Identity of the output this entry spends.
    pub fn outpoint_key(&self) -> Option<(Vec<u8>, u32)> {
        self.out_point.as_ref().map(|op| (op.hash.clone(), op.index))
    }
}

/// Sum of amounts, saturating instead of wrapping
fn saturating_total(utxos: &[UnspentTransaction]) -> u64 {
    utxos
        .iter()
        .fold(0u64, |acc, u| acc.saturating_add(u.amount_sats()))
}

impl TransactionPlan {
    pub fn selected_total(&self) -> u64 {
        saturating_total(&self.utxos)
    }
}

impl SigningInput {
    pub fn utxo_total(&self) -> u64 {
        saturating_total(&self.utxo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::common::SigningError;
    use prost::Message;

    #[test]
    fn test_plan_error_defaults_to_ok() {
        let plan = TransactionPlan::default();
        assert_eq!(plan.error(), SigningError::Ok);
    }

    #[test]
    fn test_signing_input_field_tags() {
        let input = SigningInput {
            hash_type: 1,
            coin_type: 1,
            ..Default::default()
        };
        // tag 1 varint 1, tag 10 varint 1
        assert_eq!(input.encode_to_vec(), vec![0x08, 0x01, 0x50, 0x01]);
    }

    #[test]
    fn test_selected_total_ignores_negative_amounts() {
        let plan = TransactionPlan {
            utxos: vec![
                UnspentTransaction { amount: 5000, ..Default::default() },
                UnspentTransaction { amount: -1, ..Default::default() },
            ],
            ..Default::default()
        };
        assert_eq!(plan.selected_total(), 5000);
    }

    #[test]
    fn test_totals_saturate() {
        let input = SigningInput {
            utxo: vec![UnspentTransaction { amount: i64::MAX, ..Default::default() }; 3],
            ..Default::default()
        };
        assert_eq!(input.utxo_total(), u64::MAX);
    }
}
