//! Account Derivation
//!
//! mnemonic -> engine wallet -> private key and address -> lock script.
//! The wallet handle is dropped (and its native resources released) before
//! this returns, on success or failure.

use zeroize::Zeroizing;

use super::validation::{normalize_mnemonic, validate_mnemonic};
use crate::error::{SignerError, SignerResult};
use crate::log_debug;
use crate::native::{HdWallet, WalletCore};
use crate::types::{AccountKeys, CoinType};

/// Derive the default account for `coin` from a mnemonic
pub fn derive_account<B: WalletCore>(
    backend: &B,
    mnemonic: &str,
    passphrase: &str,
    coin: CoinType,
) -> SignerResult<AccountKeys> {
    if !validate_mnemonic(backend, mnemonic) {
        return Err(SignerError::invalid_mnemonic("Mnemonic failed validation"));
    }

    let phrase = Zeroizing::new(normalize_mnemonic(mnemonic));
    let wallet = backend.create_wallet(&phrase, passphrase)?;

    let private_key = wallet.private_key_for_coin(coin)?;
    let address = wallet.address_for_coin(coin)?;
    drop(wallet);

    let lock_script = backend.lock_script_for_address(&address, coin)?;
    log_debug!(
        "wallet",
        "derived account",
        backend = backend.name(),
        coin = coin,
        address = address,
        lock_script = hex::encode(&lock_script),
    );

    Ok(AccountKeys {
        coin,
        private_key,
        address,
        lock_script,
    })
}
