//! UTXO Signer Library
//!
//! Client for a black-box wallet engine that derives keys, templates
//! locking scripts, plans UTXO transactions and signs them. Requests and
//! responses cross the engine boundary as protobuf bytes.
//!
//! # Architecture
//!
//! This crate provides:
//! - **wallet**: Mnemonic validation and generation, account derivation, UTXO model
//! - **tx**: Request builder, fee estimation, plan/sign client
//! - **native**: Engine trait with an embedded backend and a libTrustWalletCore backend
//! - **proto**: Wire messages shared with the engine
//! - **scenario**: The end-to-end demonstration flow
//!
//! # Security
//!
//! Private keys, seeds and entropy are held in `zeroize` wrappers and
//! cleared on drop. Log output redacts secrets by field name.
//!
//! # Example
//!
//! ```rust,ignore
//! use utxo_signer::{native::EmbeddedCore, scenario, SignerConfig};
//!
//! let report = scenario::run_demo(EmbeddedCore::new(), &scenario::Scenario::sample(), &SignerConfig::default())?;
//! println!("{}", report.signed.raw_tx);
//! ```

pub mod config;
pub mod error;
pub mod native;
pub mod proto;
pub mod scenario;
pub mod tx;
pub mod types;
pub mod utils;
pub mod wallet;

pub use config::{BackendKind, SignerConfig};
pub use error::{ErrorCode, SignerError, SignerResult};
pub use native::{EmbeddedCore, HdWallet, WalletCore};
pub use tx::{AnySignerClient, SigningRequestBuilder};
pub use types::*;
