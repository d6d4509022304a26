//! Fee Estimation
//!
//! Virtual-size estimates per script type. P2WPKH input ~68 vbytes,
//! P2WPKH output 31 vbytes, ~11 vbytes of version/locktime/counts/marker.

use bitcoin::Script;

/// Version, locktime, counts and segwit marker
pub const TX_OVERHEAD_VBYTES: u64 = 11;

/// Output value (8) plus script length prefix (1)
pub const OUTPUT_BASE_VBYTES: u64 = 9;

/// Script template of an output being spent or created
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    P2pkh,
    P2sh,
    P2wpkh,
    P2wsh,
    P2tr,
    Unknown,
}

impl ScriptKind {
    pub fn classify(script: &[u8]) -> Self {
        let script = Script::from_bytes(script);
        if script.is_p2wpkh() {
            ScriptKind::P2wpkh
        } else if script.is_p2pkh() {
            ScriptKind::P2pkh
        } else if script.is_p2sh() {
            ScriptKind::P2sh
        } else if script.is_p2wsh() {
            ScriptKind::P2wsh
        } else if script.is_p2tr() {
            ScriptKind::P2tr
        } else {
            ScriptKind::Unknown
        }
    }

    /// Estimated vbytes to spend an output of this kind
    pub fn input_vbytes(self) -> u64 {
        match self {
            ScriptKind::P2wpkh => 68,
            // Assumes P2SH-wrapped P2WPKH
            ScriptKind::P2sh => 91,
            ScriptKind::P2tr => 58,
            ScriptKind::P2wsh => 104,
            ScriptKind::P2pkh | ScriptKind::Unknown => 148,
        }
    }
}

/// Virtual size of an output paying to `script`
pub fn output_vbytes(script: &[u8]) -> u64 {
    OUTPUT_BASE_VBYTES + script.len() as u64
}

/// Estimate transaction vsize from the scripts being spent and created
pub fn estimate_vsize<'a, I, O>(input_scripts: I, output_scripts: O) -> u64
where
    I: IntoIterator<Item = &'a [u8]>,
    O: IntoIterator<Item = &'a [u8]>,
{
    let inputs: u64 = input_scripts
        .into_iter()
        .map(|s| ScriptKind::classify(s).input_vbytes())
        .sum();
    let outputs: u64 = output_scripts.into_iter().map(output_vbytes).sum();
    TX_OVERHEAD_VBYTES + inputs + outputs
}

/// Fee for a transaction spending `input_scripts` into `output_scripts`
pub fn estimate_fee<'a, I, O>(input_scripts: I, output_scripts: O, byte_fee: u64) -> u64
where
    I: IntoIterator<Item = &'a [u8]>,
    O: IntoIterator<Item = &'a [u8]>,
{
    estimate_vsize(input_scripts, output_scripts).saturating_mul(byte_fee)
}
