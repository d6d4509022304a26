use bitcoin::consensus::encode::deserialize;
use bitcoin::Transaction;
use utxo_signer::error::ErrorCode;
use utxo_signer::native::EmbeddedCore;
use utxo_signer::scenario::{run_demo, Scenario, SAMPLE_MNEMONIC};
use utxo_signer::tx::{AnySignerClient, SigningRequestBuilder};
use utxo_signer::wallet::{self, Utxo};
use utxo_signer::{CoinType, SignerConfig};

const AMOUNT: u64 = 1_000_000;

fn sample_client() -> AnySignerClient<EmbeddedCore> {
    AnySignerClient::new(EmbeddedCore::new(), CoinType::BitcoinTestnet)
}

fn sample_request(keys: &utxo_signer::AccountKeys, amount: u64) -> utxo_signer::proto::SigningInput {
    SigningRequestBuilder::new(CoinType::BitcoinTestnet)
        .amount(amount)
        .byte_fee(10)
        .to_address(keys.address.clone())
        .change_address(keys.address.clone())
        .utxo_set(&Scenario::sample().utxos, &keys.lock_script)
        .expect("sample utxos convert")
        .build()
        .expect("request builds")
}

#[test]
fn sample_mnemonic_is_valid_and_derives() {
    let core = EmbeddedCore::new();
    assert!(wallet::validate_mnemonic(&core, SAMPLE_MNEMONIC));

    let keys = wallet::derive_account(&core, SAMPLE_MNEMONIC, "", CoinType::BitcoinTestnet).expect("derivation");
    assert_eq!(keys.private_key.len(), 32);
    assert!(keys.address.starts_with("tb1"));
    assert!(!keys.lock_script.is_empty());
}

#[test]
fn invalid_mnemonic_aborts_before_derivation() {
    let err = wallet::derive_account(
        &EmbeddedCore::new(),
        "trial sing wear crumble monkey survey immense awake title announce shoe notaword",
        "",
        CoinType::BitcoinTestnet,
    )
    .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidMnemonic);
}

#[test]
fn plan_covers_amount_and_fee() {
    let client = sample_client();
    let keys = wallet::derive_account(client.backend(), SAMPLE_MNEMONIC, "", CoinType::BitcoinTestnet).unwrap();
    let plan = client.plan(&sample_request(&keys, AMOUNT)).expect("plan");

    assert!(plan.selected_total() >= AMOUNT + plan.fee as u64);
    assert_eq!(plan.amount as u64, AMOUNT);
    assert_eq!(plan.available_amount, 1_181_085);
    assert_eq!(plan.selected_total(), AMOUNT + (plan.fee + plan.change) as u64);
}

#[test]
fn signing_without_keys_is_refused() {
    let client = sample_client();
    let keys = wallet::derive_account(client.backend(), SAMPLE_MNEMONIC, "", CoinType::BitcoinTestnet).unwrap();
    let mut input = sample_request(&keys, AMOUNT);
    input.plan = Some(client.plan(&input).unwrap());

    let err = client.sign(&input).unwrap_err();
    assert_eq!(err.code, ErrorCode::MissingSigningKeys);
}

#[test]
fn signing_with_keys_yields_a_transaction() {
    let client = sample_client();
    let keys = wallet::derive_account(client.backend(), SAMPLE_MNEMONIC, "", CoinType::BitcoinTestnet).unwrap();
    let mut input = sample_request(&keys, AMOUNT);
    input.private_key = vec![keys.private_key.to_vec()];

    let signed = client.plan_and_sign(input).expect("signing succeeds");
    assert!(!signed.raw_tx.is_empty());

    let bytes = hex::decode(&signed.raw_tx).expect("raw tx is hex");
    let tx: Transaction = deserialize(&bytes).expect("raw tx is a transaction");
    assert_eq!(tx.compute_txid().to_string(), signed.txid);
    assert_eq!(tx.input.len(), signed.input_count);
    assert_eq!(tx.output[0].value.to_sat(), AMOUNT);
    assert!(tx.input.iter().all(|i| !i.witness.is_empty()));
}

#[test]
fn insufficient_funds_fail_planning() {
    let client = sample_client();
    let keys = wallet::derive_account(client.backend(), SAMPLE_MNEMONIC, "", CoinType::BitcoinTestnet).unwrap();

    // Every sat is offered, so the fee cannot be paid
    let err = client.plan(&sample_request(&keys, 1_181_085)).unwrap_err();
    assert_eq!(err.code, ErrorCode::InsufficientFunds);

    let err = client.plan(&sample_request(&keys, 2_000_000)).unwrap_err();
    assert_eq!(err.code, ErrorCode::InsufficientFunds);
}

#[test]
fn foreign_utxo_script_cannot_be_signed() {
    let client = sample_client();
    let keys = wallet::derive_account(client.backend(), SAMPLE_MNEMONIC, "", CoinType::BitcoinTestnet).unwrap();
    let other = wallet::derive_account(client.backend(), SAMPLE_MNEMONIC, "other", CoinType::BitcoinTestnet).unwrap();

    let mut input = SigningRequestBuilder::new(CoinType::BitcoinTestnet)
        .amount(10_000)
        .to_address(keys.address.clone())
        .utxo_set(
            &[Utxo::new("6cc82a0a689c2a39803ff8a07a25c6ea022ac01182c5773f17b185f8a25dba30", 0, 50_000)],
            &other.lock_script,
        )
        .unwrap()
        .build()
        .unwrap();
    input.private_key = vec![keys.private_key.to_vec()];

    let err = client.plan_and_sign(input).unwrap_err();
    assert_eq!(err.code, ErrorCode::MissingSigningKeys);
}

#[test]
fn full_demo_runs_on_embedded_engine() {
    let report = run_demo(EmbeddedCore::new(), &Scenario::sample(), &SignerConfig::default()).expect("demo");
    assert!(report.mnemonic_valid);
    assert_eq!(report.keyless_error.code, ErrorCode::MissingSigningKeys);
    assert!(report.plan.amount + report.plan.fee + report.plan.change <= report.plan.available_amount);
    assert!(!report.signed.raw_tx.is_empty());
}
