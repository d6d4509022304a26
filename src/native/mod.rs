//! Signing Engine Boundary
//!
//! The wallet-core engine is a black box reached through [`WalletCore`].
//! Requests and responses cross the boundary as serialized protobuf bytes;
//! the engine owns derivation, script templates, selection and signing.
//!
//! Two engines are provided:
//! - [`embedded::EmbeddedCore`]: in-process, built on the `bitcoin` crate
//! - `ffi::TrustWalletCore`: libTrustWalletCore via the C ABI
//!   (requires the `trust-wallet-core` feature)

pub mod embedded;
pub mod handle;

#[cfg(feature = "trust-wallet-core")]
pub mod ffi;

use zeroize::Zeroizing;

use crate::error::SignerResult;
use crate::types::CoinType;

pub use embedded::EmbeddedCore;
#[cfg(feature = "trust-wallet-core")]
pub use ffi::TrustWalletCore;

/// An HD wallet handle owned by the engine
pub trait HdWallet {
    /// Raw 32-byte private key of the coin's default account
    fn private_key_for_coin(&self, coin: CoinType) -> SignerResult<Zeroizing<Vec<u8>>>;

    /// Default receive address for the coin
    fn address_for_coin(&self, coin: CoinType) -> SignerResult<String>;
}

/// The four capabilities consumed from the signing engine
pub trait WalletCore {
    type Wallet: HdWallet;

    /// Short name used in logs and CLI output
    fn name(&self) -> &'static str;

    fn is_valid_mnemonic(&self, mnemonic: &str) -> bool;

    /// Create a wallet. Callers validate the mnemonic first.
    fn create_wallet(&self, mnemonic: &str, passphrase: &str) -> SignerResult<Self::Wallet>;

    /// Locking script paying to `address`
    fn lock_script_for_address(&self, address: &str, coin: CoinType) -> SignerResult<Vec<u8>>;

    /// Serialized `SigningInput` in, serialized `TransactionPlan` out.
    ///
    /// An empty return value is passed through unchanged; interpreting it is
    /// the caller's job.
    fn plan(&self, input: &[u8], coin: CoinType) -> SignerResult<Vec<u8>>;

    /// Serialized `SigningInput` in, serialized `SigningOutput` out.
    fn sign(&self, input: &[u8], coin: CoinType) -> SignerResult<Vec<u8>>;
}
