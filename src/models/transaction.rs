//! Transaction record model
//!
//! Mirrors the shape of a `getTransaction` response in `jsonParsed` encoding,
//! flattened so the message and its metadata sit side by side. The debugger
//! only reads these types.

use log::warn;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::errors::{DebuggerError, DebuggerResult};

/// One fetched transaction, as handed to the debugger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    /// Transaction signature, reported back verbatim
    #[serde(default)]
    pub signature: String,
    /// Slot the transaction landed in
    #[serde(default)]
    pub slot: u64,
    /// Static account keys, ordered by role
    #[serde(deserialize_with = "deserialize_account_keys")]
    pub account_keys: Vec<String>,
    /// Counts partitioning `account_keys` into signer and writable regions
    pub header: MessageHeader,
    /// Top-level instructions in execution order
    #[serde(default, alias = "topLevelInstructions")]
    pub instructions: Vec<InstructionRecord>,
    /// Inner instructions grouped by the top-level instruction that triggered them
    #[serde(
        default,
        alias = "innerInstructionGroups",
        deserialize_with = "deserialize_inner_groups"
    )]
    pub inner_instructions: Vec<InnerInstructionGroup>,
    /// Execution metadata
    #[serde(default)]
    pub meta: Option<TransactionMeta>,
}

/// Message header counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageHeader {
    pub num_required_signatures: u8,
    pub num_readonly_signed_accounts: u8,
    pub num_readonly_unsigned_accounts: u8,
}

/// A top-level or inner instruction in one of the three shapes a record can carry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InstructionRecord {
    /// Decoded by the node into a named type with named fields
    Parsed(ParsedInstruction),
    /// Program and account addresses resolved, payload left opaque
    PartiallyDecoded(PartiallyDecodedInstruction),
    /// Index-only form referencing `account_keys` positions
    Compiled(CompiledInstruction),
    /// Anything matching none of the shapes above. Kept so one bad entry
    /// costs a step, not the whole record.
    Malformed(Value),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedInstruction {
    pub program_id: String,
    /// Short program label supplied by the node, e.g. "spl-token"
    #[serde(default)]
    pub program: Option<String>,
    /// Either `{ "type": .., "info": {..} }` or a bare value (memo text)
    pub parsed: Value,
    #[serde(default)]
    pub stack_height: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartiallyDecodedInstruction {
    pub program_id: String,
    pub accounts: Vec<String>,
    /// Base58 instruction data
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub stack_height: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledInstruction {
    pub program_id_index: usize,
    #[serde(default)]
    pub accounts: Vec<usize>,
    /// Base58 instruction data
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub stack_height: Option<u32>,
}

/// Inner instructions triggered by the top-level instruction at `index`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InnerInstructionGroup {
    pub index: usize,
    pub instructions: Vec<InstructionRecord>,
}

/// Execution metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionMeta {
    /// Failure object, `None` when the transaction succeeded
    #[serde(default)]
    pub err: Option<Value>,
    #[serde(default)]
    pub fee: u64,
    #[serde(default)]
    pub compute_units_consumed: Option<u64>,
    #[serde(default)]
    pub log_messages: Option<Vec<String>>,
    /// Accounts pulled in through address lookup tables
    #[serde(default)]
    pub loaded_addresses: Option<LoadedAddresses>,
}

/// Addresses appended after the static keys by lookup tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadedAddresses {
    #[serde(default)]
    pub writable: Vec<String>,
    #[serde(default)]
    pub readonly: Vec<String>,
}

impl TransactionRecord {
    /// Decode a record from JSON text.
    pub fn from_json(json: &str) -> DebuggerResult<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Decode a record from an already parsed JSON value.
    ///
    /// Absent `accountKeys` or `header` are reported as
    /// [`DebuggerError::MissingField`] rather than a generic decode error.
    pub fn from_value(value: Value) -> DebuggerResult<Self> {
        for field in ["accountKeys", "header"] {
            if value.get(field).map_or(true, Value::is_null) {
                return Err(DebuggerError::MissingField(field));
            }
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Whether the ledger rejected this transaction.
    pub fn is_failed(&self) -> bool {
        self.meta.as_ref().map_or(false, |meta| meta.err.is_some())
    }

    pub fn loaded_addresses(&self) -> Option<&LoadedAddresses> {
        self.meta.as_ref().and_then(|meta| meta.loaded_addresses.as_ref())
    }
}

impl InstructionRecord {
    pub fn stack_height(&self) -> Option<u32> {
        match self {
            InstructionRecord::Parsed(ix) => ix.stack_height,
            InstructionRecord::PartiallyDecoded(ix) => ix.stack_height,
            InstructionRecord::Compiled(ix) => ix.stack_height,
            InstructionRecord::Malformed(_) => None,
        }
    }

    /// Base58 payload, if the shape carries one.
    pub fn data(&self) -> Option<&str> {
        match self {
            InstructionRecord::Parsed(_) | InstructionRecord::Malformed(_) => None,
            InstructionRecord::PartiallyDecoded(ix) => Some(&ix.data),
            InstructionRecord::Compiled(ix) => Some(&ix.data),
        }
    }
}

impl ParsedInstruction {
    /// The decoded instruction type, e.g. "transfer".
    pub fn instruction_type(&self) -> Option<&str> {
        self.parsed.get("type").and_then(Value::as_str)
    }

    /// Named fields of the decoded instruction.
    pub fn info(&self) -> Option<&serde_json::Map<String, Value>> {
        self.parsed.get("info").and_then(Value::as_object)
    }
}

/// Accepts both plain address strings and the `{ "pubkey": .. }` objects the
/// `jsonParsed` encoding emits. Any signer/writable flags on those objects are
/// ignored: roles come from the header alone.
fn deserialize_account_keys<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum AccountKey {
        Address(String),
        Parsed { pubkey: String },
    }

    let keys = Vec::<AccountKey>::deserialize(deserializer)?;
    Ok(keys
        .into_iter()
        .map(|key| match key {
            AccountKey::Address(address) => address,
            AccountKey::Parsed { pubkey } => pubkey,
        })
        .collect())
}

/// Drops inner groups that do not have an `index` and an `instructions`
/// array instead of rejecting the record. Entries inside a well-formed group
/// always decode, falling back to [`InstructionRecord::Malformed`].
fn deserialize_inner_groups<'de, D>(deserializer: D) -> Result<Vec<InnerInstructionGroup>, D::Error>
where
    D: Deserializer<'de>,
{
    let groups = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(groups
        .into_iter()
        .enumerate()
        .filter_map(|(position, group)| match serde_json::from_value(group) {
            Ok(group) => Some(group),
            Err(e) => {
                warn!("Ignoring malformed inner instruction group #{}: {}", position, e);
                None
            }
        })
        .collect())
}
