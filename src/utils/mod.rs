//! Utilities Module
//!
//! Byte-order helpers and structured logging.

pub mod bytes;
pub mod logging;

pub use bytes::{display_from_wire_hash, reversed, wire_hash_from_display};
