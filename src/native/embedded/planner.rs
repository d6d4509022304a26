//! UTXO selection
//!
//! Candidates are sorted by ascending amount. For the smallest input count
//! that can cover `amount + fee`, the window of consecutive candidates with
//! the lowest total wins. Windows are first priced with a change output;
//! when none fits, they are priced again without one and any leftover goes
//! to the fee. Change under the dust threshold also goes to the fee.

use bitcoin::{Address, ScriptBuf};
use std::str::FromStr;

use super::{EngineError, EngineResult};
use crate::proto::{SigningError, SigningInput, TransactionPlan, UnspentTransaction, MAX_MONEY};
use crate::tx::fees::{estimate_fee, ScriptKind};
use crate::types::CoinType;
use crate::utils::bytes::HASH_LEN;

/// Locking script for an address on the coin's network
pub(crate) fn script_for_address(address: &str, coin: CoinType) -> EngineResult<ScriptBuf> {
    Address::from_str(address.trim())
        .and_then(|a| a.require_network(coin.network()))
        .map(|a| a.script_pubkey())
        .map_err(|_| EngineError::InvalidAddress(address.to_string()))
}

pub(super) fn check_utxos(utxos: &[UnspentTransaction]) -> EngineResult<()> {
    if utxos.is_empty() {
        return Err(EngineError::MissingInputUtxos);
    }
    for (i, utxo) in utxos.iter().enumerate() {
        let out_point = utxo
            .out_point
            .as_ref()
            .ok_or_else(|| EngineError::InvalidUtxo(i, "missing out point".to_string()))?;
        if out_point.hash.len() != HASH_LEN {
            return Err(EngineError::InvalidUtxo(
                i,
                format!("hash is {} bytes, expected {}", out_point.hash.len(), HASH_LEN),
            ));
        }
        if utxo.amount <= 0 || utxo.amount > MAX_MONEY {
            return Err(EngineError::InvalidUtxoAmount(i, utxo.amount));
        }
    }
    Ok(())
}

fn window_fee(window: &[UnspentTransaction], outputs: &[&[u8]], byte_fee: u64) -> u64 {
    estimate_fee(
        window.iter().map(|u| u.script.as_slice()),
        outputs.iter().copied(),
        byte_fee,
    )
}

/// Sum of amounts; fails on the entry that would overflow
pub(super) fn window_total(window: &[UnspentTransaction]) -> EngineResult<u64> {
    window.iter().enumerate().try_fold(0u64, |acc, (i, u)| {
        acc.checked_add(u.amount_sats())
            .ok_or(EngineError::InvalidUtxoAmount(i, u.amount))
    })
}

/// Cheapest window of the smallest size covering `amount` plus its fee
fn select_window(
    sorted: &[UnspentTransaction],
    amount: u64,
    outputs: &[&[u8]],
    byte_fee: u64,
) -> EngineResult<Option<(u64, u64, usize, usize)>> {
    let mut best: Option<(u64, u64, usize, usize)> = None;
    for count in 1..=sorted.len() {
        for start in 0..=(sorted.len() - count) {
            let window = &sorted[start..start + count];
            let total = window_total(window)?;
            let fee = window_fee(window, outputs, byte_fee);
            if total < amount.saturating_add(fee) {
                continue;
            }
            if best.map_or(true, |(best_total, ..)| total < best_total) {
                best = Some((total, fee, start, count));
            }
        }
        if best.is_some() {
            break;
        }
    }
    Ok(best)
}

/// Build a transaction plan for `input`
pub fn plan_transaction(input: &SigningInput, coin: CoinType, dust_threshold: u64) -> EngineResult<TransactionPlan> {
    check_utxos(&input.utxo)?;

    let byte_fee = u64::try_from(input.byte_fee).map_err(|_| EngineError::WrongFee(input.byte_fee))?;
    let to_script = script_for_address(&input.to_address, coin)?;
    let change_script = if input.change_address.trim().is_empty() {
        to_script.clone()
    } else {
        script_for_address(&input.change_address, coin)?
    };

    let available = window_total(&input.utxo)?;
    let mut sorted = input.utxo.clone();
    sorted.sort_by_key(|u| u.amount);

    if input.use_max_amount {
        return plan_max(sorted, to_script.as_bytes(), byte_fee, available);
    }

    let amount = u64::try_from(input.amount).unwrap_or(0);
    if amount == 0 {
        return Err(EngineError::ZeroAmount);
    }

    let with_change = [to_script.as_bytes(), change_script.as_bytes()];
    let without_change = [to_script.as_bytes()];
    let (total, mut fee, start, count, has_change) =
        match select_window(&sorted, amount, &with_change, byte_fee)? {
            Some((total, fee, start, count)) => (total, fee, start, count, true),
            None => match select_window(&sorted, amount, &without_change, byte_fee)? {
                Some((total, fee, start, count)) => (total, fee, start, count, false),
                None => {
                    let fee = window_fee(&sorted, &without_change, byte_fee);
                    return Err(EngineError::NotEnoughUtxos {
                        needed: amount.saturating_add(fee),
                        available,
                    });
                }
            },
        };

    let mut change = total - amount - fee;
    if !has_change || change < dust_threshold {
        fee += change;
        change = 0;
    }

    Ok(TransactionPlan {
        amount: amount as i64,
        available_amount: available as i64,
        fee: fee as i64,
        change: change as i64,
        utxos: sorted[start..start + count].to_vec(),
        branch_id: Vec::new(),
        error: SigningError::Ok as i32,
    })
}

/// Spend every input worth more than its own fee, with no change output
fn plan_max(
    sorted: Vec<UnspentTransaction>,
    to_script: &[u8],
    byte_fee: u64,
    available: u64,
) -> EngineResult<TransactionPlan> {
    let spendable: Vec<UnspentTransaction> = sorted
        .into_iter()
        .filter(|u| {
            let input_fee = ScriptKind::classify(&u.script).input_vbytes().saturating_mul(byte_fee);
            u.amount_sats() > input_fee
        })
        .collect();

    let total = window_total(&spendable)?;
    let fee = window_fee(&spendable, &[to_script], byte_fee);
    if spendable.is_empty() || total <= fee {
        return Err(EngineError::NotEnoughUtxos {
            needed: fee.saturating_add(1),
            available,
        });
    }

    Ok(TransactionPlan {
        amount: (total - fee) as i64,
        available_amount: available as i64,
        fee: fee as i64,
        change: 0,
        utxos: spendable,
        branch_id: Vec::new(),
        error: SigningError::Ok as i32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::OutPoint;

    const ADDRESS: &str = "tb1qw508d6qejxtdg4y5r3zarvary0c5xw7kxpjzsx";

    fn utxo(amount: i64, index: u32) -> UnspentTransaction {
        let script = script_for_address(ADDRESS, CoinType::BitcoinTestnet).unwrap();
        UnspentTransaction {
            out_point: Some(OutPoint {
                hash: vec![index as u8; 32],
                index,
                sequence: 0,
            }),
            script: script.into_bytes(),
            amount,
        }
    }

    fn request(amounts: &[i64], amount: i64) -> SigningInput {
        SigningInput {
            hash_type: 1,
            amount,
            byte_fee: 10,
            to_address: ADDRESS.to_string(),
            change_address: ADDRESS.to_string(),
            utxo: amounts.iter().enumerate().map(|(i, a)| utxo(*a, i as u32)).collect(),
            coin_type: CoinType::BitcoinTestnet.id(),
            ..Default::default()
        }
    }

    #[test]
    fn test_sample_selection() {
        let input = request(&[5000, 1000, 175085, 1000000], 1000000);
        let plan = plan_transaction(&input, CoinType::BitcoinTestnet, 546).unwrap();
        let mut selected: Vec<i64> = plan.utxos.iter().map(|u| u.amount).collect();
        selected.sort();
        assert_eq!(selected, vec![175085, 1000000]);
        assert_eq!(plan.fee, 2090);
        assert_eq!(plan.change, 173995);
        assert_eq!(plan.available_amount, 1181085);
    }

    #[test]
    fn test_single_input_preferred() {
        let input = request(&[5000, 50000, 200000], 40000);
        let plan = plan_transaction(&input, CoinType::BitcoinTestnet, 546).unwrap();
        assert_eq!(plan.utxos.len(), 1);
        assert_eq!(plan.utxos[0].amount, 50000);
        // 11 + 68 + 2*31 = 141 vbytes
        assert_eq!(plan.fee, 1410);
        assert_eq!(plan.change, 50000 - 40000 - 1410);
    }

    #[test]
    fn test_dust_change_folded_into_fee() {
        // 11 + 68 + 62 = 141 vbytes -> 1410 sats; leftover 100 is dust
        let input = request(&[11510], 10000);
        let plan = plan_transaction(&input, CoinType::BitcoinTestnet, 546).unwrap();
        assert_eq!(plan.change, 0);
        assert_eq!(plan.fee, 1510);
    }

    #[test]
    fn test_payment_without_change_output() {
        // 11 + 68 + 31 = 110 vbytes with a single output
        let plan = plan_transaction(&request(&[11100], 10000), CoinType::BitcoinTestnet, 546).unwrap();
        assert_eq!(plan.fee, 1100);
        assert_eq!(plan.change, 0);

        // leftover 300 has no output to go to
        let plan = plan_transaction(&request(&[11400], 10000), CoinType::BitcoinTestnet, 546).unwrap();
        assert_eq!(plan.fee, 1400);
        assert_eq!(plan.change, 0);

        let err = plan_transaction(&request(&[11099], 10000), CoinType::BitcoinTestnet, 546).unwrap_err();
        assert_eq!(err.code(), SigningError::NotEnoughUtxos);
    }

    #[test]
    fn test_amounts_above_max_money_rejected() {
        let input = request(&[i64::MAX, i64::MAX, i64::MAX], 1000);
        assert_eq!(
            plan_transaction(&input, CoinType::BitcoinTestnet, 546).unwrap_err(),
            EngineError::InvalidUtxoAmount(0, i64::MAX)
        );

        let input = request(&[MAX_MONEY, 1000], MAX_MONEY - 10_000);
        let plan = plan_transaction(&input, CoinType::BitcoinTestnet, 546).unwrap();
        assert_eq!(plan.available_amount, MAX_MONEY + 1000);
    }

    #[test]
    fn test_not_enough_utxos() {
        let input = request(&[1000, 2000], 1_000_000);
        let err = plan_transaction(&input, CoinType::BitcoinTestnet, 546).unwrap_err();
        assert_eq!(err.code(), SigningError::NotEnoughUtxos);
    }

    #[test]
    fn test_zero_amount() {
        let input = request(&[1000], 0);
        assert_eq!(
            plan_transaction(&input, CoinType::BitcoinTestnet, 546).unwrap_err(),
            EngineError::ZeroAmount
        );
    }

    #[test]
    fn test_use_max_amount_drops_uneconomic_inputs() {
        let mut input = request(&[500, 5000, 100000], 0);
        input.use_max_amount = true;
        let plan = plan_transaction(&input, CoinType::BitcoinTestnet, 546).unwrap();
        assert_eq!(plan.utxos.len(), 2);
        // 11 + 2*68 + 31 = 178 vbytes
        assert_eq!(plan.fee, 1780);
        assert_eq!(plan.amount, 105000 - 1780);
        assert_eq!(plan.change, 0);
    }

    #[test]
    fn test_invalid_inputs() {
        let input = request(&[], 1000);
        assert_eq!(
            plan_transaction(&input, CoinType::BitcoinTestnet, 546).unwrap_err(),
            EngineError::MissingInputUtxos
        );

        let mut input = request(&[1000], 500);
        input.utxo[0].out_point.as_mut().unwrap().hash.truncate(31);
        assert_eq!(
            plan_transaction(&input, CoinType::BitcoinTestnet, 546).unwrap_err().code(),
            SigningError::InvalidUtxo
        );

        let mut input = request(&[1000], 500);
        input.to_address = "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4".to_string();
        assert_eq!(
            plan_transaction(&input, CoinType::BitcoinTestnet, 546).unwrap_err().code(),
            SigningError::InvalidAddress
        );
    }
}
