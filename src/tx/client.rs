//! Plan/Sign Client
//!
//! Drives the engine's two request/response calls and refuses to trust
//! anything it returns without checking. An empty buffer, an undecodable
//! message, a non-OK error code or an internally inconsistent plan all
//! become errors here.

use bitcoin::consensus::encode::deserialize;
use prost::Message;
use std::collections::HashSet;

use crate::error::{SignerError, SignerResult};
use crate::native::WalletCore;
use crate::proto::{SigningError, SigningInput, SigningOutput, TransactionPlan, UnspentTransaction, MAX_MONEY};
use crate::types::{CoinType, PlanSummary, SignedTransaction};
use crate::utils::bytes::HASH_LEN;
use crate::wallet::Utxo;
use crate::{log_debug, log_info, log_warn};

/// Client for the engine's plan and sign calls
pub struct AnySignerClient<B: WalletCore> {
    backend: B,
    coin: CoinType,
}

impl<B: WalletCore> AnySignerClient<B> {
    pub fn new(backend: B, coin: CoinType) -> Self {
        Self { backend, coin }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn coin(&self) -> CoinType {
        self.coin
    }

    /// Ask the engine to select inputs and compute fee and change.
    ///
    /// Private keys are never sent with a planning request.
    pub fn plan(&self, input: &SigningInput) -> SignerResult<TransactionPlan> {
        validate_request(input, self.coin)?;

        let mut request = input.clone();
        request.private_key.clear();
        request.plan = None;

        let raw = self.backend.plan(&request.encode_to_vec(), self.coin)?;
        if raw.is_empty() {
            return Err(SignerError::empty_result("Engine returned an empty plan"));
        }
        let plan = TransactionPlan::decode(raw.as_slice())?;
        check_engine_status(plan.error, "plan", "")?;

        if plan.utxos.is_empty() || plan.amount <= 0 {
            return Err(SignerError::insufficient_funds(format!(
                "Engine selected no spendable inputs for {} sats",
                input.amount
            )));
        }
        check_plan(&plan, &input.utxo)?;

        log_info!(
            "client",
            "plan ready",
            backend = self.backend.name(),
            inputs = plan.utxos.len(),
            amount = plan.amount,
            fee = plan.fee,
            change = plan.change,
        );
        Ok(plan)
    }

    /// Ask the engine to build and sign the transaction.
    ///
    /// A request without private keys is always rejected, whatever the
    /// engine returns for it.
    pub fn sign(&self, input: &SigningInput) -> SignerResult<SigningOutput> {
        validate_request(input, self.coin)?;
        if let Some(plan) = input.plan.as_ref().filter(|p| !p.utxos.is_empty()) {
            check_plan(plan, &input.utxo).map_err(|e| SignerError::malformed_request(e.message))?;
        }

        let raw = self.backend.sign(&input.encode_to_vec(), self.coin)?;

        if input.private_key.is_empty() {
            let engine_status = SigningOutput::decode(raw.as_slice())
                .map(|o| format!("engine reported {:?}", o.error()))
                .unwrap_or_else(|_| format!("engine returned {} undecodable bytes", raw.len()));
            log_warn!("client", "refusing key-less signing result", status = engine_status);
            return Err(SignerError::missing_signing_keys("Signing request carries no private keys")
                .with_details(engine_status));
        }

        if raw.is_empty() {
            return Err(SignerError::empty_result("Engine returned an empty signing output"));
        }
        let output = SigningOutput::decode(raw.as_slice())?;
        check_engine_status(output.error, "sign", &output.error_message)?;

        if output.encoded.is_empty() {
            return Err(SignerError::empty_result("Engine returned an empty transaction"));
        }

        log_debug!(
            "client",
            "transaction signed",
            bytes = output.encoded.len(),
            txid = output.transaction_id,
        );
        Ok(output)
    }

    /// Plan when needed, fold the plan into the request, then sign
    pub fn plan_and_sign(&self, mut input: SigningInput) -> SignerResult<SignedTransaction> {
        let plan = match input.plan.take() {
            Some(plan) if !plan.utxos.is_empty() => plan,
            _ => self.plan(&input)?,
        };
        input.plan = Some(plan.clone());

        let output = self.sign(&input)?;
        let txid = if output.transaction_id.is_empty() {
            txid_of(&output.encoded)?
        } else {
            output.transaction_id.clone()
        };

        Ok(SignedTransaction {
            coin: self.coin,
            raw_tx: hex::encode(&output.encoded),
            txid,
            fee: plan.fee as u64,
            change: plan.change as u64,
            input_count: plan.utxos.len(),
            size_bytes: output.encoded.len(),
        })
    }
}

// =============================================================================
// Checks
// =============================================================================

/// Reject requests the engine would fail on, before crossing the boundary
pub fn validate_request(input: &SigningInput, coin: CoinType) -> SignerResult<()> {
    if input.coin_type != coin.id() {
        return Err(SignerError::unsupported_coin(format!(
            "Request is for coin {}, client is for {}",
            input.coin_type, coin
        )));
    }
    if input.to_address.trim().is_empty() {
        return Err(SignerError::malformed_request("Destination address is empty"));
    }
    if input.utxo.is_empty() {
        return Err(SignerError::insufficient_funds("No UTXOs to spend"));
    }
    for (i, utxo) in input.utxo.iter().enumerate() {
        let hash_len = utxo.out_point.as_ref().map(|op| op.hash.len()).unwrap_or(0);
        if hash_len != HASH_LEN {
            return Err(SignerError::malformed_request(format!(
                "UTXO {} hash is {} bytes, expected {}",
                i, hash_len, HASH_LEN
            )));
        }
        if utxo.amount <= 0 || utxo.amount > MAX_MONEY {
            return Err(SignerError::malformed_request(format!(
                "UTXO {} has out-of-range amount {}",
                i, utxo.amount
            )));
        }
    }
    if input.byte_fee < 0 {
        return Err(SignerError::malformed_request(format!("Negative byte fee {}", input.byte_fee)));
    }
    if input.use_max_amount {
        return Ok(());
    }
    if input.amount <= 0 {
        return Err(SignerError::malformed_request("Amount must be greater than zero"));
    }
    let total = input.utxo_total();
    if input.amount as u64 > total {
        return Err(SignerError::insufficient_funds(format!(
            "Requested {} sats but only {} sats available",
            input.amount, total
        )));
    }
    Ok(())
}

/// Verify a plan's arithmetic and that it only spends offered outputs
pub fn check_plan(plan: &TransactionPlan, offered: &[UnspentTransaction]) -> SignerResult<()> {
    if plan.amount < 0 || plan.fee < 0 || plan.change < 0 {
        return Err(SignerError::malformed_response(format!(
            "Plan has negative values: amount {}, fee {}, change {}",
            plan.amount, plan.fee, plan.change
        )));
    }

    let selected = plan.selected_total();
    let spent = (plan.amount as u64).saturating_add(plan.fee as u64);
    if selected < spent {
        return Err(SignerError::malformed_response(format!(
            "Selected inputs {} do not cover amount {} + fee {}",
            selected, plan.amount, plan.fee
        )));
    }
    if plan.change as u64 != selected - spent {
        return Err(SignerError::malformed_response(format!(
            "Change {} does not equal inputs {} - amount {} - fee {}",
            plan.change, selected, plan.amount, plan.fee
        )));
    }

    let offered: HashSet<(Vec<u8>, u32)> = offered.iter().filter_map(UnspentTransaction::outpoint_key).collect();
    for utxo in &plan.utxos {
        match utxo.outpoint_key() {
            Some(key) if offered.contains(&key) => {}
            _ => {
                return Err(SignerError::malformed_response(
                    "Plan spends an output that was not offered",
                ))
            }
        }
    }
    Ok(())
}

fn check_engine_status(code: i32, call: &str, message: &str) -> SignerResult<()> {
    match SigningError::try_from(code) {
        Ok(SigningError::Ok) => Ok(()),
        Ok(error) => {
            let message = if message.is_empty() {
                format!("Engine {} failed with {:?}", call, error)
            } else {
                message.to_string()
            };
            Err(SignerError::from_engine(error, message))
        }
        Err(_) => Err(SignerError::signing_failed(format!(
            "Engine {} returned unknown error code {}",
            call, code
        ))),
    }
}

fn txid_of(encoded: &[u8]) -> SignerResult<String> {
    let tx: bitcoin::Transaction = deserialize(encoded)
        .map_err(|e| SignerError::malformed_response(format!("Encoded transaction does not parse: {}", e)))?;
    Ok(tx.compute_txid().to_string())
}

/// Display-friendly view of a plan
pub fn summarize(plan: &TransactionPlan) -> PlanSummary {
    PlanSummary {
        amount: plan.amount.max(0) as u64,
        available_amount: plan.available_amount.max(0) as u64,
        fee: plan.fee.max(0) as u64,
        change: plan.change.max(0) as u64,
        inputs: plan
            .utxos
            .iter()
            .filter_map(|u| Utxo::from_proto(u).ok())
            .map(|u| u.key())
            .collect(),
    }
}
