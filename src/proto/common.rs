//! Shared engine enumerations

/// Error codes the engine embeds in plans and signing outputs
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum SigningError {
    Ok = 0,
    General = 1,
    Internal = 2,
    LowBalance = 3,
    ZeroAmountRequested = 4,
    MissingPrivateKey = 5,
    WrongFee = 6,
    Signing = 7,
    TxTooBig = 8,
    MissingInputUtxos = 9,
    NotEnoughUtxos = 10,
    ScriptRedeem = 11,
    ScriptOutput = 12,
    InvalidPrivateKey = 15,
    InvalidAddress = 16,
    InvalidUtxo = 17,
    InvalidUtxoAmount = 18,
}

impl SigningError {
    pub fn is_ok(self) -> bool {
        self == SigningError::Ok
    }
}
