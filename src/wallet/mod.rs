//! Wallet Module
//!
//! Mnemonic validation and generation, account derivation through the
//! signing engine, and the UTXO model fed into signing requests.

mod derivation;
mod keygen;
mod validation;
pub mod utxo;

pub use derivation::derive_account;
pub use keygen::generate_mnemonic;
pub use utxo::Utxo;
pub use validation::{normalize_mnemonic, validate_address, validate_mnemonic};
