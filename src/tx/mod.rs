//! Transaction Module
//!
//! Request assembly, fee estimation and the plan/sign client.

pub mod client;
pub mod fees;
pub mod request;

pub use client::{check_plan, summarize, validate_request, AnySignerClient};
pub use fees::{estimate_fee, estimate_vsize, ScriptKind};
pub use request::SigningRequestBuilder;
