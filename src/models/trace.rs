//! Call trace model

use serde::{Deserialize, Serialize};

/// One instruction in the reconstructed call trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpiStep {
    /// Sequential id in trace order
    pub id: usize,
    pub program_id: String,
    pub program_name: String,
    /// Decoded type name, or "unknown" / "compiled" for opaque instructions
    pub instruction_kind: String,
    /// 0 for top-level instructions, 1 for their inner instructions
    pub depth: u8,
    /// Invocation stack height reported by the node, when present
    pub stack_height: Option<u32>,
    pub accounts: Vec<CpiAccountRef>,
    /// Transaction-level outcome; every step of a failed transaction is failed
    pub success: bool,
    pub compute_units: u64,
    /// Whether `compute_units` was measured, apportioned or guessed
    pub compute_source: ComputeSource,
    pub efficiency_rating: EfficiencyRating,
    pub suggested_optimizations: Vec<String>,
    /// Size of the decoded instruction payload, when it was base58-decodable
    pub data_length: Option<usize>,
}

/// An account referenced by a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpiAccountRef {
    pub pubkey: String,
    /// Field name for decoded instructions, positional label otherwise
    pub role_label: String,
    /// Position in the transaction's account list, `None` if not found there
    pub index: Option<usize>,
    pub region: AccountRegion,
    pub is_signer: bool,
    pub is_writable: bool,
}

/// The four contiguous account regions a message header defines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountRegion {
    WritableSigner,
    ReadonlySigner,
    WritableNonSigner,
    ReadonlyNonSigner,
    /// Position outside the account list; roles are not known
    Unknown,
}

/// Provenance of a step's compute figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComputeSource {
    /// Read from the program's own `consumed` log line
    Measured,
    /// Share of the transaction's measured total
    Apportioned,
    /// Heuristic from instruction kind and account count
    Estimated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EfficiencyRating {
    Optimal,
    Good,
    Poor,
}
