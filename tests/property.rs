use bitcoin::consensus::encode::deserialize;
use bitcoin::key::CompressedPublicKey;
use bitcoin::secp256k1::{Secp256k1, SecretKey};
use bitcoin::{Address, Network, Transaction};
use prost::Message;
use proptest::prelude::*;
use utxo_signer::native::embedded::{plan_transaction, sign_transaction};
use utxo_signer::proto::{OutPoint, SigningInput, UnspentTransaction};
use utxo_signer::tx::check_plan;
use utxo_signer::utils::bytes::{display_from_wire_hash, reversed, wire_hash_from_display};
use utxo_signer::CoinType;

const DUST: u64 = 546;

fn any_secret_key() -> impl Strategy<Value = SecretKey> {
    prop::array::uniform32(any::<u8>()).prop_filter_map("valid secp256k1 scalar", |bytes| {
        SecretKey::from_slice(&bytes).ok()
    })
}

fn testnet_address(secret: &SecretKey) -> (String, Vec<u8>) {
    let secp = Secp256k1::new();
    let public = CompressedPublicKey(secret.public_key(&secp));
    let address = Address::p2wpkh(&public, Network::Testnet);
    (address.to_string(), address.script_pubkey().to_bytes())
}

fn request(address: &str, script: &[u8], amounts: &[u64], amount: u64, byte_fee: u64) -> SigningInput {
    SigningInput {
        hash_type: 1,
        amount: amount as i64,
        byte_fee: byte_fee as i64,
        to_address: address.to_string(),
        change_address: address.to_string(),
        utxo: amounts
            .iter()
            .enumerate()
            .map(|(i, a)| UnspentTransaction {
                out_point: Some(OutPoint {
                    hash: vec![i as u8; 32],
                    index: i as u32,
                    sequence: 0,
                }),
                script: script.to_vec(),
                amount: *a as i64,
            })
            .collect(),
        coin_type: CoinType::BitcoinTestnet.id(),
        ..Default::default()
    }
}

proptest! {
    #[test]
    fn reversing_twice_is_identity(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        prop_assert_eq!(reversed(&reversed(&bytes)), bytes);
    }

    #[test]
    fn display_and_wire_hashes_roundtrip(hash in prop::array::uniform32(any::<u8>())) {
        let display = display_from_wire_hash(&hash);
        prop_assert_eq!(display.len(), 64);
        prop_assert_eq!(wire_hash_from_display(&display).unwrap(), hash.to_vec());
    }

    #[test]
    fn signing_input_survives_encoding(
        amount in 0i64..i64::MAX,
        byte_fee in 0i64..1_000,
        hash_type in prop::sample::select(vec![1u32, 2, 3, 0x81, 0x82, 0x83]),
        keys in prop::collection::vec(prop::collection::vec(any::<u8>(), 32), 0..4),
        amounts in prop::collection::vec(1i64..21_000_000_00_000_000, 0..6),
        use_max in any::<bool>(),
        to in "[a-z0-9]{0,62}",
    ) {
        let input = SigningInput {
            hash_type,
            amount,
            byte_fee,
            to_address: to.clone(),
            change_address: to,
            private_key: keys,
            utxo: amounts
                .iter()
                .enumerate()
                .map(|(i, a)| UnspentTransaction {
                    out_point: Some(OutPoint { hash: vec![i as u8; 32], index: i as u32, sequence: u32::MAX }),
                    script: vec![0x00, 0x14],
                    amount: *a,
                })
                .collect(),
            use_max_amount: use_max,
            coin_type: 1,
            ..Default::default()
        };
        let decoded = SigningInput::decode(input.encode_to_vec().as_slice()).unwrap();
        prop_assert_eq!(decoded, input);
    }

    #[test]
    fn planning_succeeds_iff_funds_cover_amount_and_fee(
        secret in any_secret_key(),
        amounts in prop::collection::vec(1u64..2_000_000, 1..8),
        amount in 1u64..3_000_000,
        byte_fee in 1u64..50,
    ) {
        let (address, script) = testnet_address(&secret);
        let input = request(&address, &script, &amounts, amount, byte_fee);

        // P2WPKH everywhere: at least 11 + 31 vbytes fixed, 68 per input
        let base_fee = (11 + 31) * byte_fee;
        let spendable: u64 = amounts.iter().map(|a| a.saturating_sub(68 * byte_fee)).sum();
        let expected = amount + base_fee <= spendable;

        match plan_transaction(&input, CoinType::BitcoinTestnet, DUST) {
            Ok(plan) => {
                prop_assert!(expected);
                check_plan(&plan, &input.utxo).unwrap();
                let selected = plan.selected_total();
                prop_assert!(selected >= amount + plan.fee as u64);
                prop_assert!(plan.change == 0 || plan.change as u64 >= DUST);
                prop_assert_eq!(plan.amount as u64, amount);
            }
            Err(_) => prop_assert!(!expected),
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn signed_outputs_match_plan(
        secret in any_secret_key(),
        amounts in prop::collection::vec(10_000u64..500_000, 1..5),
        byte_fee in 1u64..20,
    ) {
        let (address, script) = testnet_address(&secret);
        let amount = amounts[0] / 2;
        let mut input = request(&address, &script, &amounts, amount, byte_fee);
        input.private_key = vec![secret.secret_bytes().to_vec()];

        let plan = plan_transaction(&input, CoinType::BitcoinTestnet, DUST).unwrap();
        let output = sign_transaction(&input, CoinType::BitcoinTestnet, DUST).unwrap();
        let tx: Transaction = deserialize(&output.encoded).unwrap();

        prop_assert_eq!(tx.input.len(), plan.utxos.len());
        let paid: u64 = tx.output.iter().map(|o| o.value.to_sat()).sum();
        prop_assert_eq!(paid, (plan.amount + plan.change) as u64);
        prop_assert_eq!(output.transaction_id, tx.compute_txid().to_string());
    }
}
