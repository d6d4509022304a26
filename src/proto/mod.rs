//! Wire schema shared with the signing engine
//!
//! Field numbers mirror the engine's `Bitcoin.proto` and `Common.proto`.
//! The engine decodes by tag, so a renumbered field silently changes meaning.

pub mod bitcoin;
pub mod common;

pub use self::bitcoin::*;
pub use self::common::SigningError;
