use bitcoin::consensus::encode::deserialize;
use bitcoin::Transaction;
use serde_json::Value;
use std::process::Command;

const MNEMONIC: &str = "trial sing wear crumble monkey survey immense awake title announce shoe soldier";

fn run(args: &[&str]) -> std::process::Output {
    let binary_path = assert_cmd::cargo::cargo_bin!("utxo-signer");
    Command::new(binary_path).args(args).output().expect("cli runs")
}

fn run_json(args: &[&str]) -> Value {
    let output = run(args);
    assert!(output.status.success(), "cli exited unsuccessfully: {:?}", output);
    let stdout = String::from_utf8(output.stdout).expect("stdout is utf8");
    serde_json::from_str(&stdout).expect("stdout is valid json")
}

#[test]
fn demo_emits_signed_transaction() {
    let report = run_json(&["demo", "--json"]);

    assert_eq!(report["mnemonic_valid"], Value::Bool(true));
    assert_eq!(report["backend"], "embedded");
    assert_eq!(report["keyless_error"]["code"], "missing_signing_keys");
    assert!(report["address"].as_str().unwrap().starts_with("tb1"));
    assert_eq!(report["plan"]["fee"], 2090);

    let raw = report["signed"]["raw_tx"].as_str().expect("raw tx present");
    let tx: Transaction = deserialize(&hex::decode(raw).expect("hex")).expect("transaction");
    assert_eq!(tx.compute_txid().to_string(), report["signed"]["txid"].as_str().unwrap());
}

#[test]
fn demo_text_output_lists_each_step() {
    let output = run(&["demo"]);
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("mnemonic is valid: true"));
    assert!(stdout.contains("address lock script: 0014"));
    assert!(stdout.contains("signing without keys refused"));
    assert!(stdout.contains("signed transaction: 01000000"));
}

#[test]
fn address_matches_demo() {
    let address = run_json(&["address", "--mnemonic", MNEMONIC, "--json"]);
    let demo = run_json(&["demo", "--json"]);
    assert_eq!(address["address"], demo["address"]);
    assert_eq!(address["lock_script"], demo["lock_script_hex"]);
}

#[test]
fn invalid_mnemonic_fails() {
    let output = run(&["address", "--mnemonic", "trial sing wear"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("InvalidMnemonic"));
}

#[test]
fn generate_produces_requested_length() {
    let generated = run_json(&["generate", "--words", "24", "--json"]);
    assert_eq!(generated["words"], 24);
    assert_eq!(generated["mnemonic"].as_str().unwrap().split_whitespace().count(), 24);

    assert!(!run(&["generate", "--words", "13"]).status.success());
}

#[test]
fn scenario_file_is_honored() {
    let dir = std::env::temp_dir().join(format!("utxo-signer-cli-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("scenario.json");
    std::fs::write(
        &path,
        format!(
            r#"{{
                "mnemonic": "{}",
                "coin": "bitcoin-testnet",
                "amount": 40000,
                "byte_fee": 5,
                "utxos": [
                    {{"txid": "c00e4d0a2b6b8d5a39aed9bb3f1773f8f3126b9f10fdcd7944d15a620e71bf7a", "vout": 0, "amount": 50000}}
                ]
            }}"#,
            MNEMONIC
        ),
    )
    .unwrap();

    let report = run_json(&["demo", "--json", "--scenario", path.to_str().unwrap()]);
    // 11 + 68 + 2 * 31 = 141 vbytes at 5 sat/vB
    assert_eq!(report["plan"]["fee"], 705);
    assert_eq!(report["plan"]["change"], 50000 - 40000 - 705);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn native_backend_requires_feature() {
    if cfg!(feature = "trust-wallet-core") {
        return;
    }
    let output = run(&["--backend", "native", "demo"]);
    assert!(!output.status.success());
    assert!(String::from_utf8(output.stderr).unwrap().contains("NativeUnavailable"));
}
