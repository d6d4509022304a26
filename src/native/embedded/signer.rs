//! Transaction assembly and signing
//!
//! Inputs follow the plan's UTXO order. Outputs are the destination followed
//! by change when the plan has any. P2WPKH inputs get a witness, P2PKH
//! inputs a scriptSig and P2SH-wrapped P2WPKH inputs both. Keys are matched
//! to inputs by locking script.

use bitcoin::absolute::LockTime;
use bitcoin::consensus::encode::serialize;
use bitcoin::ecdsa::Signature as EcdsaSignature;
use bitcoin::hashes::Hash;
use bitcoin::key::CompressedPublicKey;
use bitcoin::script::{Builder, PushBytesBuf};
use bitcoin::secp256k1::{All, Message, Secp256k1, SecretKey};
use bitcoin::sighash::{EcdsaSighashType, SighashCache};
use bitcoin::transaction::Version;
use bitcoin::{Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid, Witness};
use std::collections::HashMap;

use super::planner::{check_utxos, plan_transaction, script_for_address, window_total};
use super::{EngineError, EngineResult};
use crate::proto::{self, MAX_MONEY};
use crate::types::CoinType;

/// Keys supplied with the request, indexed by the scripts they unlock
struct KeyRing {
    secp: Secp256k1<All>,
    by_script: HashMap<ScriptBuf, (SecretKey, CompressedPublicKey)>,
    /// P2SH script to the P2WPKH redeem script it wraps
    nested: HashMap<ScriptBuf, ScriptBuf>,
}

impl KeyRing {
    fn new(private_keys: &[Vec<u8>]) -> EngineResult<Self> {
        let secp = Secp256k1::new();
        let mut by_script = HashMap::new();
        let mut nested = HashMap::new();
        for (i, raw) in private_keys.iter().enumerate() {
            let secret = SecretKey::from_slice(raw).map_err(|_| EngineError::InvalidPrivateKey(i))?;
            let public = CompressedPublicKey(secret.public_key(&secp));
            let p2wpkh = ScriptBuf::new_p2wpkh(&public.wpubkey_hash());
            nested.insert(ScriptBuf::new_p2sh(&p2wpkh.script_hash()), p2wpkh.clone());
            by_script.insert(p2wpkh, (secret, public));
            by_script.insert(ScriptBuf::new_p2pkh(&public.pubkey_hash()), (secret, public));
        }
        Ok(Self {
            secp,
            by_script,
            nested,
        })
    }

    fn lookup(&self, script: &ScriptBuf) -> Option<&(SecretKey, CompressedPublicKey)> {
        self.by_script.get(script)
    }
}

enum Unlock {
    Witness(Witness),
    ScriptSig(ScriptBuf),
    Nested(ScriptBuf, Witness),
}

/// Redeem script behind a P2SH input, from the request or the key ring
fn redeem_script(
    index: usize,
    script: &ScriptBuf,
    scripts: &HashMap<String, Vec<u8>>,
    keys: &KeyRing,
) -> EngineResult<ScriptBuf> {
    let script_hash = hex::encode(&script.as_bytes()[2..22]);
    let redeem = match scripts.get(&script_hash) {
        Some(bytes) => ScriptBuf::from_bytes(bytes.clone()),
        None => keys.nested.get(script).cloned().ok_or(EngineError::MissingPrivateKey(index))?,
    };
    if ScriptBuf::new_p2sh(&redeem.script_hash()) != *script {
        return Err(EngineError::InvalidUtxo(index, "redeem script does not match".to_string()));
    }
    if !redeem.is_p2wpkh() {
        return Err(EngineError::UnsupportedScript(index));
    }
    Ok(redeem)
}

fn sighash_type(hash_type: u32) -> EngineResult<EcdsaSighashType> {
    if hash_type == 0 {
        return Ok(EcdsaSighashType::All);
    }
    EcdsaSighashType::from_standard(hash_type).map_err(|_| EngineError::UnsupportedSighash(hash_type))
}

/// Use the caller's plan when it carries inputs, otherwise plan now
fn resolve_plan(input: &proto::SigningInput, coin: CoinType, dust_threshold: u64) -> EngineResult<proto::TransactionPlan> {
    let plan = match &input.plan {
        Some(plan) if !plan.utxos.is_empty() => plan.clone(),
        _ => return plan_transaction(input, coin, dust_threshold),
    };

    if !plan.error().is_ok() {
        return Err(EngineError::InvalidPlan(format!("plan carries error {:?}", plan.error())));
    }
    check_utxos(&plan.utxos)?;
    let in_range = |value: i64| (0..=MAX_MONEY).contains(&value);
    if plan.amount <= 0 || !in_range(plan.amount) || !in_range(plan.fee) || !in_range(plan.change) {
        return Err(EngineError::InvalidPlan(format!(
            "plan values out of range: amount {}, fee {}, change {}",
            plan.amount, plan.fee, plan.change
        )));
    }
    let total = window_total(&plan.utxos)?;
    let spent = plan
        .amount
        .checked_add(plan.fee)
        .and_then(|v| v.checked_add(plan.change))
        .and_then(|v| u64::try_from(v).ok());
    if spent != Some(total) {
        return Err(EngineError::InvalidPlan(format!(
            "inputs {} do not equal amount {} + fee {} + change {}",
            total, plan.amount, plan.fee, plan.change
        )));
    }
    Ok(plan)
}

fn unsigned_transaction(
    plan: &proto::TransactionPlan,
    to_script: ScriptBuf,
    change_script: ScriptBuf,
) -> EngineResult<Transaction> {
    let mut inputs = Vec::with_capacity(plan.utxos.len());
    for (i, utxo) in plan.utxos.iter().enumerate() {
        let out_point = utxo
            .out_point
            .as_ref()
            .ok_or_else(|| EngineError::InvalidUtxo(i, "missing out point".to_string()))?;
        let hash: [u8; 32] = out_point
            .hash
            .as_slice()
            .try_into()
            .map_err(|_| EngineError::InvalidUtxo(i, "hash is not 32 bytes".to_string()))?;
        inputs.push(TxIn {
            previous_output: OutPoint::new(Txid::from_byte_array(hash), out_point.index),
            script_sig: ScriptBuf::new(),
            sequence: Sequence(out_point.sequence),
            witness: Witness::new(),
        });
    }

    let mut outputs = vec![TxOut {
        value: Amount::from_sat(plan.amount as u64),
        script_pubkey: to_script,
    }];
    if plan.change > 0 {
        outputs.push(TxOut {
            value: Amount::from_sat(plan.change as u64),
            script_pubkey: change_script,
        });
    }

    Ok(Transaction {
        version: Version::ONE,
        lock_time: LockTime::ZERO,
        input: inputs,
        output: outputs,
    })
}

fn unlock_inputs(
    tx: &Transaction,
    plan: &proto::TransactionPlan,
    scripts: &HashMap<String, Vec<u8>>,
    keys: &KeyRing,
    hash_type: EcdsaSighashType,
) -> EngineResult<Vec<Unlock>> {
    let mut cache = SighashCache::new(tx);
    let mut unlocks = Vec::with_capacity(plan.utxos.len());

    for (i, utxo) in plan.utxos.iter().enumerate() {
        let script = ScriptBuf::from_bytes(utxo.script.clone());
        if script.is_p2sh() {
            let redeem = redeem_script(i, &script, scripts, keys)?;
            let (secret, public) = keys.lookup(&redeem).ok_or(EngineError::MissingPrivateKey(i))?;
            let sighash = cache
                .p2wpkh_signature_hash(i, &redeem, Amount::from_sat(utxo.amount_sats()), hash_type)
                .map_err(|e| EngineError::Signing(e.to_string()))?;
            let msg = Message::from_digest(sighash.to_byte_array());
            let signature = EcdsaSignature {
                signature: keys.secp.sign_ecdsa(&msg, secret),
                sighash_type: hash_type,
            };
            let push = PushBytesBuf::try_from(redeem.to_bytes()).map_err(|e| EngineError::Signing(e.to_string()))?;
            let script_sig = Builder::new().push_slice(push).into_script();
            unlocks.push(Unlock::Nested(script_sig, Witness::p2wpkh(&signature, &public.0)));
            continue;
        }

        let (secret, public) = keys.lookup(&script).ok_or(EngineError::MissingPrivateKey(i))?;
        if script.is_p2wpkh() {
            let sighash = cache
                .p2wpkh_signature_hash(i, &script, Amount::from_sat(utxo.amount_sats()), hash_type)
                .map_err(|e| EngineError::Signing(e.to_string()))?;
            let msg = Message::from_digest(sighash.to_byte_array());
            let signature = EcdsaSignature {
                signature: keys.secp.sign_ecdsa(&msg, secret),
                sighash_type: hash_type,
            };
            unlocks.push(Unlock::Witness(Witness::p2wpkh(&signature, &public.0)));
        } else if script.is_p2pkh() {
            let sighash = cache
                .legacy_signature_hash(i, &script, hash_type.to_u32())
                .map_err(|e| EngineError::Signing(e.to_string()))?;
            let msg = Message::from_digest(sighash.to_byte_array());
            let signature = EcdsaSignature {
                signature: keys.secp.sign_ecdsa(&msg, secret),
                sighash_type: hash_type,
            };
            let push = PushBytesBuf::try_from(signature.to_vec())
                .map_err(|e| EngineError::Signing(e.to_string()))?;
            let script_sig = Builder::new()
                .push_slice(push)
                .push_key(&bitcoin::PublicKey::new(public.0))
                .into_script();
            unlocks.push(Unlock::ScriptSig(script_sig));
        } else {
            return Err(EngineError::UnsupportedScript(i));
        }
    }
    Ok(unlocks)
}

fn transaction_message(tx: &Transaction) -> proto::Transaction {
    proto::Transaction {
        version: tx.version.0,
        lock_time: tx.lock_time.to_consensus_u32(),
        inputs: tx
            .input
            .iter()
            .map(|txin| proto::TransactionInput {
                previous_output: Some(proto::OutPoint {
                    hash: txin.previous_output.txid.to_byte_array().to_vec(),
                    index: txin.previous_output.vout,
                    sequence: txin.sequence.0,
                }),
                sequence: txin.sequence.0,
                script: txin.script_sig.to_bytes(),
            })
            .collect(),
        outputs: tx
            .output
            .iter()
            .map(|txout| proto::TransactionOutput {
                value: txout.value.to_sat() as i64,
                script: txout.script_pubkey.to_bytes(),
            })
            .collect(),
    }
}

/// Plan (if needed), build and sign the transaction described by `input`
pub fn sign_transaction(
    input: &proto::SigningInput,
    coin: CoinType,
    dust_threshold: u64,
) -> EngineResult<proto::SigningOutput> {
    let plan = resolve_plan(input, coin, dust_threshold)?;
    let hash_type = sighash_type(input.hash_type)?;
    let keys = KeyRing::new(&input.private_key)?;

    let to_script = script_for_address(&input.to_address, coin)?;
    let change_script = if input.change_address.trim().is_empty() {
        to_script.clone()
    } else {
        script_for_address(&input.change_address, coin)?
    };

    let mut tx = unsigned_transaction(&plan, to_script, change_script)?;
    let unlocks = unlock_inputs(&tx, &plan, &input.scripts, &keys, hash_type)?;
    for (txin, unlock) in tx.input.iter_mut().zip(unlocks) {
        match unlock {
            Unlock::Witness(witness) => txin.witness = witness,
            Unlock::ScriptSig(script_sig) => txin.script_sig = script_sig,
            Unlock::Nested(script_sig, witness) => {
                txin.script_sig = script_sig;
                txin.witness = witness;
            }
        }
    }

    Ok(proto::SigningOutput {
        transaction: Some(transaction_message(&tx)),
        encoded: serialize(&tx),
        transaction_id: tx.compute_txid().to_string(),
        error: proto::SigningError::Ok as i32,
        error_message: String::new(),
    })
}
