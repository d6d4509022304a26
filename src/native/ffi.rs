//! libTrustWalletCore Backend
//!
//! Raw C ABI declarations plus a [`WalletCore`] implementation over them.
//! Every pointer returned by the library is wrapped in [`Owned`] right away
//! and released with its matching delete call when the guard drops.
//!
//! Linking is configured by `build.rs` from `WALLET_CORE_LIB_DIR`.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use libc::size_t;
use zeroize::Zeroizing;

use super::handle::{NativeResource, Owned};
use super::{HdWallet, WalletCore};
use crate::error::{SignerError, SignerResult};
use crate::types::CoinType;
use crate::{log_debug, log_warn};

// =============================================================================
// Opaque Types
// =============================================================================

#[repr(C)]
pub struct TWString {
    _private: [u8; 0],
}

#[repr(C)]
pub struct TWData {
    _private: [u8; 0],
}

#[repr(C)]
pub struct TWHDWallet {
    _private: [u8; 0],
}

#[repr(C)]
pub struct TWPrivateKey {
    _private: [u8; 0],
}

#[repr(C)]
pub struct TWBitcoinScript {
    _private: [u8; 0],
}

// =============================================================================
// C ABI
// =============================================================================

#[link(name = "TrustWalletCore")]
extern "C" {
    fn TWStringCreateWithUTF8Bytes(bytes: *const c_char) -> *mut TWString;
    fn TWStringUTF8Bytes(string: *const TWString) -> *const c_char;
    fn TWStringDelete(string: *mut TWString);

    fn TWDataCreateWithBytes(bytes: *const u8, size: size_t) -> *mut TWData;
    fn TWDataBytes(data: *const TWData) -> *const u8;
    fn TWDataSize(data: *const TWData) -> size_t;
    fn TWDataDelete(data: *mut TWData);

    fn TWHDWalletIsValid(mnemonic: *const TWString) -> bool;
    fn TWHDWalletCreateWithMnemonic(
        mnemonic: *const TWString,
        passphrase: *const TWString,
    ) -> *mut TWHDWallet;
    fn TWHDWalletDelete(wallet: *mut TWHDWallet);
    fn TWHDWalletGetKeyForCoin(wallet: *mut TWHDWallet, coin: u32) -> *mut TWPrivateKey;
    fn TWHDWalletGetAddressForCoin(wallet: *mut TWHDWallet, coin: u32) -> *mut TWString;

    fn TWPrivateKeyData(key: *mut TWPrivateKey) -> *mut TWData;
    fn TWPrivateKeyDelete(key: *mut TWPrivateKey);

    fn TWBitcoinScriptLockScriptForAddress(address: *const TWString, coin: u32) -> *mut TWBitcoinScript;
    fn TWBitcoinScriptData(script: *const TWBitcoinScript) -> *mut TWData;
    fn TWBitcoinScriptDelete(script: *mut TWBitcoinScript);

    fn TWAnySignerPlan(input: *const TWData, coin: u32) -> *mut TWData;
    fn TWAnySignerSign(input: *const TWData, coin: u32) -> *mut TWData;
}

impl NativeResource for TWString {
    const KIND: &'static str = "TWString";

    unsafe fn release(ptr: *mut Self) {
        TWStringDelete(ptr)
    }
}

impl NativeResource for TWData {
    const KIND: &'static str = "TWData";

    unsafe fn release(ptr: *mut Self) {
        TWDataDelete(ptr)
    }
}

impl NativeResource for TWHDWallet {
    const KIND: &'static str = "TWHDWallet";

    unsafe fn release(ptr: *mut Self) {
        TWHDWalletDelete(ptr)
    }
}

impl NativeResource for TWPrivateKey {
    const KIND: &'static str = "TWPrivateKey";

    unsafe fn release(ptr: *mut Self) {
        TWPrivateKeyDelete(ptr)
    }
}

impl NativeResource for TWBitcoinScript {
    const KIND: &'static str = "TWBitcoinScript";

    unsafe fn release(ptr: *mut Self) {
        TWBitcoinScriptDelete(ptr)
    }
}

// =============================================================================
// Safe Conversions
// =============================================================================

fn tw_string(value: &str) -> SignerResult<Owned<TWString>> {
    let c_value = CString::new(value)
        .map_err(|_| SignerError::invalid_input("String contains an interior NUL byte"))?;
    // SAFETY: c_value outlives the call; the library copies the bytes
    unsafe { Owned::from_raw_or_err(TWStringCreateWithUTF8Bytes(c_value.as_ptr()), "TWStringCreateWithUTF8Bytes") }
}

fn read_string(string: &Owned<TWString>) -> SignerResult<String> {
    // SAFETY: the guard keeps the string alive for the duration of the borrow
    unsafe {
        let raw = TWStringUTF8Bytes(string.as_ptr());
        if raw.is_null() {
            return Err(SignerError::empty_result("TWStringUTF8Bytes returned null"));
        }
        CStr::from_ptr(raw)
            .to_str()
            .map(str::to_owned)
            .map_err(|_| SignerError::malformed_response("Native string is not valid UTF-8"))
    }
}

fn tw_data(bytes: &[u8]) -> SignerResult<Owned<TWData>> {
    // SAFETY: the library copies `bytes` before returning
    unsafe { Owned::from_raw_or_err(TWDataCreateWithBytes(bytes.as_ptr(), bytes.len()), "TWDataCreateWithBytes") }
}

fn read_data(data: &Owned<TWData>) -> Vec<u8> {
    // SAFETY: the guard keeps the buffer alive; size and pointer come from the same handle
    unsafe {
        let size = TWDataSize(data.as_ptr());
        let ptr = TWDataBytes(data.as_ptr());
        if ptr.is_null() || size == 0 {
            return Vec::new();
        }
        std::slice::from_raw_parts(ptr, size).to_vec()
    }
}

// =============================================================================
// Backend
// =============================================================================

/// Signing engine backed by libTrustWalletCore
#[derive(Debug, Default, Clone, Copy)]
pub struct TrustWalletCore;

impl TrustWalletCore {
    pub fn new() -> Self {
        Self
    }

    fn call_signer(
        &self,
        input: &[u8],
        coin: CoinType,
        name: &str,
        call: unsafe extern "C" fn(*const TWData, u32) -> *mut TWData,
    ) -> SignerResult<Vec<u8>> {
        let input_data = tw_data(input)?;
        // SAFETY: input_data is a live handle; the result is owned by us
        let output = unsafe { Owned::from_raw_or_err(call(input_data.as_ptr(), coin.id()), name)? };
        let bytes = read_data(&output);
        log_debug!("native", "signer call returned", call = name, bytes = bytes.len());
        Ok(bytes)
    }
}

/// HD wallet handle owned by libTrustWalletCore
pub struct NativeWallet {
    handle: Owned<TWHDWallet>,
}

impl HdWallet for NativeWallet {
    fn private_key_for_coin(&self, coin: CoinType) -> SignerResult<Zeroizing<Vec<u8>>> {
        // SAFETY: the wallet handle is live; key and data are owned by their guards
        let key = unsafe {
            Owned::from_raw_or_err(
                TWHDWalletGetKeyForCoin(self.handle.as_ptr(), coin.id()),
                "TWHDWalletGetKeyForCoin",
            )?
        };
        let data = unsafe { Owned::from_raw_or_err(TWPrivateKeyData(key.as_ptr()), "TWPrivateKeyData")? };
        let bytes = Zeroizing::new(read_data(&data));
        if bytes.len() != 32 {
            return Err(SignerError::malformed_response(format!(
                "Private key has {} bytes, expected 32",
                bytes.len()
            )));
        }
        Ok(bytes)
    }

    fn address_for_coin(&self, coin: CoinType) -> SignerResult<String> {
        // SAFETY: the wallet handle is live; the returned string is owned by its guard
        let address = unsafe {
            Owned::from_raw_or_err(
                TWHDWalletGetAddressForCoin(self.handle.as_ptr(), coin.id()),
                "TWHDWalletGetAddressForCoin",
            )?
        };
        read_string(&address)
    }
}

impl WalletCore for TrustWalletCore {
    type Wallet = NativeWallet;

    fn name(&self) -> &'static str {
        "native"
    }

    fn is_valid_mnemonic(&self, mnemonic: &str) -> bool {
        match tw_string(mnemonic) {
            // SAFETY: the guard keeps the string alive across the call
            Ok(phrase) => unsafe { TWHDWalletIsValid(phrase.as_ptr()) },
            Err(e) => {
                log_warn!("native", "mnemonic could not be marshaled", error = e);
                false
            }
        }
    }

    fn create_wallet(&self, mnemonic: &str, passphrase: &str) -> SignerResult<NativeWallet> {
        let phrase = tw_string(mnemonic)?;
        let pass = tw_string(passphrase)?;
        // SAFETY: both strings are live; the wallet is owned by its guard
        let handle = unsafe {
            Owned::from_raw_or_err(
                TWHDWalletCreateWithMnemonic(phrase.as_ptr(), pass.as_ptr()),
                "TWHDWalletCreateWithMnemonic",
            )
            .map_err(|e| SignerError::invalid_mnemonic(e.message))?
        };
        Ok(NativeWallet { handle })
    }

    fn lock_script_for_address(&self, address: &str, coin: CoinType) -> SignerResult<Vec<u8>> {
        let addr = tw_string(address)?;
        // SAFETY: the address is live; script and data are owned by their guards
        let script = unsafe {
            Owned::from_raw_or_err(
                TWBitcoinScriptLockScriptForAddress(addr.as_ptr(), coin.id()),
                "TWBitcoinScriptLockScriptForAddress",
            )?
        };
        let data = unsafe { Owned::from_raw_or_err(TWBitcoinScriptData(script.as_ptr()), "TWBitcoinScriptData")? };
        let bytes = read_data(&data);
        if bytes.is_empty() {
            return Err(SignerError::invalid_address(format!(
                "No lock script for address on {}",
                coin
            )));
        }
        Ok(bytes)
    }

    fn plan(&self, input: &[u8], coin: CoinType) -> SignerResult<Vec<u8>> {
        self.call_signer(input, coin, "TWAnySignerPlan", TWAnySignerPlan)
    }

    fn sign(&self, input: &[u8], coin: CoinType) -> SignerResult<Vec<u8>> {
        self.call_signer(input, coin, "TWAnySignerSign", TWAnySignerSign)
    }
}
