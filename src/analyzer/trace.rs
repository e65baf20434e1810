//! Call trace reconstruction
//!
//! The ledger stores invocations as a flat list of top-level instructions and,
//! per top-level position, a flat list of everything it triggered. The trace
//! keeps that two-level shape: depth 0 for top-level instructions and depth 1
//! for their inner instructions, emitted right after their parent.

use std::collections::BTreeMap;

use log::{debug, warn};
use serde_json::Value;

use super::accounts::{AccountRole, AccountRoles};
use super::compute::{estimate_step_units, rate_step};
use super::known_programs::ProgramRegistry;
use crate::constants::{ACCOUNT_HEAVY_THRESHOLD, KIND_COMPILED, KIND_UNKNOWN};
use crate::models::trace::{ComputeSource, CpiAccountRef, CpiStep};
use crate::models::transaction::{
    CompiledInstruction, InstructionRecord, ParsedInstruction, PartiallyDecodedInstruction,
    TransactionRecord,
};
use crate::utils::log_parser::{InvocationSlot, LogAnalysis};

pub const HINT_REDUCE_ACCOUNTS: &str = "Reduce accounts per instruction";
pub const HINT_DIRECT_ROUTES: &str = "Prefer direct routes over multi-hop swaps";
pub const HINT_BATCHING: &str = "Consider batching swaps into fewer transactions";
pub const HINT_DECODABLE_PATH: &str =
    "Prefer a decodable instruction path for future debugging";

/// The reconstructed steps plus how many instructions had to be dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trace {
    pub steps: Vec<CpiStep>,
    /// Where each step came from, parallel to `steps`
    pub slots: Vec<InvocationSlot>,
    pub skipped: usize,
}

/// A step before compute units and ids are assigned.
struct StepDraft {
    slot: InvocationSlot,
    program_id: String,
    instruction_kind: String,
    stack_height: Option<u32>,
    accounts: Vec<CpiAccountRef>,
    data_length: Option<usize>,
}

impl StepDraft {
    fn depth(&self) -> u8 {
        match self.slot {
            InvocationSlot::TopLevel(_) => 0,
            InvocationSlot::Inner { .. } => 1,
        }
    }
}

pub struct TraceBuilder<'a> {
    programs: &'a ProgramRegistry,
}

impl<'a> TraceBuilder<'a> {
    pub fn new(programs: &'a ProgramRegistry) -> Self {
        Self { programs }
    }

    /// Build the ordered step list for a record.
    pub fn build(&self, record: &TransactionRecord, logs: &LogAnalysis) -> Trace {
        let roles = AccountRoles::new(
            &record.account_keys,
            record.header,
            record.loaded_addresses(),
        );
        let groups = group_inner_instructions(record);

        let mut drafts = Vec::new();
        let mut skipped = 0;

        for (index, instruction) in record.instructions.iter().enumerate() {
            let slot = InvocationSlot::TopLevel(index);
            match draft_step(instruction, &roles, slot) {
                Some(draft) => drafts.push(draft),
                None => {
                    warn!(
                        "Skipping top-level instruction {} of {}: not a known shape or program index outside the account list",
                        index, record.signature
                    );
                    skipped += 1;
                }
            }

            for (ordinal, inner) in groups.get(&index).into_iter().flatten().enumerate() {
                let slot = InvocationSlot::Inner {
                    top_level: index,
                    ordinal,
                };
                match draft_step(inner, &roles, slot) {
                    Some(draft) => drafts.push(draft),
                    None => {
                        warn!(
                            "Skipping inner instruction {}.{} of {}: not a known shape or program index outside the account list",
                            index, ordinal, record.signature
                        );
                        skipped += 1;
                    }
                }
            }
        }

        let slots = drafts.iter().map(|draft| draft.slot).collect();
        let steps = self.finish(drafts, record, logs);
        debug!(
            "Built trace for {} with {} steps ({} skipped)",
            record.signature,
            steps.len(),
            skipped
        );

        Trace {
            steps,
            slots,
            skipped,
        }
    }

    /// Assign ids, compute figures, ratings and hints.
    fn finish(
        &self,
        drafts: Vec<StepDraft>,
        record: &TransactionRecord,
        logs: &LogAnalysis,
    ) -> Vec<CpiStep> {
        let success = !record.is_failed();
        let units = assign_compute_units(&drafts, record, logs);

        drafts
            .into_iter()
            .zip(units)
            .enumerate()
            .map(|(id, (draft, (compute_units, compute_source)))| {
                let account_count = draft.accounts.len();
                CpiStep {
                    id,
                    program_name: self.programs.name_of(&draft.program_id).to_string(),
                    depth: draft.depth(),
                    efficiency_rating: rate_step(compute_units, account_count),
                    suggested_optimizations: suggest_optimizations(
                        &draft.instruction_kind,
                        account_count,
                    ),
                    program_id: draft.program_id,
                    instruction_kind: draft.instruction_kind,
                    stack_height: draft.stack_height,
                    accounts: draft.accounts,
                    success,
                    compute_units,
                    compute_source,
                    data_length: draft.data_length,
                }
            })
            .collect()
    }
}

/// Inner instruction groups keyed by top-level position. Repeated keys are
/// concatenated in record order.
fn group_inner_instructions(record: &TransactionRecord) -> BTreeMap<usize, Vec<&InstructionRecord>> {
    let mut groups: BTreeMap<usize, Vec<&InstructionRecord>> = BTreeMap::new();

    for group in &record.inner_instructions {
        if group.index >= record.instructions.len() {
            warn!(
                "Ignoring {} inner instructions of {} keyed by missing top-level instruction {}",
                group.instructions.len(),
                record.signature,
                group.index
            );
            continue;
        }
        groups
            .entry(group.index)
            .or_default()
            .extend(group.instructions.iter());
    }

    groups
}

fn draft_step(
    instruction: &InstructionRecord,
    roles: &AccountRoles<'_>,
    slot: InvocationSlot,
) -> Option<StepDraft> {
    let (program_id, instruction_kind, accounts) = match instruction {
        InstructionRecord::Parsed(ix) => (
            ix.program_id.clone(),
            ix.instruction_type().unwrap_or(KIND_UNKNOWN).to_string(),
            parsed_accounts(ix, roles),
        ),
        InstructionRecord::PartiallyDecoded(ix) => (
            ix.program_id.clone(),
            KIND_UNKNOWN.to_string(),
            partially_decoded_accounts(ix, roles),
        ),
        InstructionRecord::Compiled(ix) => (
            roles.pubkey_at(ix.program_id_index)?.to_string(),
            KIND_COMPILED.to_string(),
            compiled_accounts(ix, roles),
        ),
        InstructionRecord::Malformed(value) => {
            debug!("Instruction matches no known shape: {}", value);
            return None;
        }
    };

    Some(StepDraft {
        slot,
        program_id,
        instruction_kind,
        stack_height: instruction.stack_height(),
        accounts,
        data_length: instruction.data().and_then(decoded_length),
    })
}

fn account_ref(pubkey: &str, role_label: String, index: Option<usize>, roles: &AccountRoles<'_>) -> CpiAccountRef {
    let role = index.map_or(AccountRole::UNKNOWN, |index| roles.resolve(index));
    CpiAccountRef {
        pubkey: pubkey.to_string(),
        role_label,
        index,
        region: role.region,
        is_signer: role.is_signer,
        is_writable: role.is_writable,
    }
}

/// Accounts named by a decoded instruction's fields, in field order. Only
/// values present in the account list count; amounts and other strings are
/// not addresses of this transaction.
fn parsed_accounts(ix: &ParsedInstruction, roles: &AccountRoles<'_>) -> Vec<CpiAccountRef> {
    let info = match ix.info() {
        Some(info) => info,
        None => return Vec::new(),
    };

    let mut accounts = Vec::new();
    for (field, value) in info {
        match value {
            Value::String(pubkey) => {
                if let Some(index) = roles.position_of(pubkey) {
                    accounts.push(account_ref(pubkey, field.clone(), Some(index), roles));
                }
            }
            Value::Array(values) => {
                for (i, pubkey) in values.iter().filter_map(Value::as_str).enumerate() {
                    if let Some(index) = roles.position_of(pubkey) {
                        let label = format!("{}[{}]", field, i);
                        accounts.push(account_ref(pubkey, label, Some(index), roles));
                    }
                }
            }
            _ => {}
        }
    }
    accounts
}

fn partially_decoded_accounts(
    ix: &PartiallyDecodedInstruction,
    roles: &AccountRoles<'_>,
) -> Vec<CpiAccountRef> {
    ix.accounts
        .iter()
        .enumerate()
        .map(|(i, pubkey)| {
            account_ref(pubkey, format!("account_{}", i), roles.position_of(pubkey), roles)
        })
        .collect()
}

fn compiled_accounts(ix: &CompiledInstruction, roles: &AccountRoles<'_>) -> Vec<CpiAccountRef> {
    ix.accounts
        .iter()
        .enumerate()
        .filter_map(|(i, &index)| match roles.pubkey_at(index) {
            Some(pubkey) => Some(account_ref(pubkey, format!("account_{}", i), Some(index), roles)),
            None => {
                warn!("Dropping account reference {} beyond the account list", index);
                None
            }
        })
        .collect()
}

fn decoded_length(data: &str) -> Option<usize> {
    bs58::decode(data).into_vec().ok().map(|bytes| bytes.len())
}

/// Compute units and their provenance for each draft.
///
/// Log measurements win. Otherwise, when the transaction total is known, the
/// part of it not already measured at depth 0 is shared among the remaining
/// steps in proportion to their heuristic estimates. Without a total the
/// heuristic estimate itself is used.
fn assign_compute_units(
    drafts: &[StepDraft],
    record: &TransactionRecord,
    logs: &LogAnalysis,
) -> Vec<(u64, ComputeSource)> {
    let measured: Vec<Option<u64>> = drafts
        .iter()
        .map(|draft| logs.measured_units(draft.slot, &draft.program_id))
        .collect();
    let estimates: Vec<u64> = drafts
        .iter()
        .map(|draft| estimate_step_units(&draft.instruction_kind, draft.accounts.len()))
        .collect();

    let total = record.meta.as_ref().and_then(|meta| meta.compute_units_consumed);
    let measured_top_level: u64 = drafts
        .iter()
        .zip(&measured)
        .filter(|(draft, _)| draft.depth() == 0)
        .filter_map(|(_, units)| *units)
        .sum();
    let unmeasured_weight: u128 = estimates
        .iter()
        .zip(&measured)
        .filter(|(_, units)| units.is_none())
        .map(|(estimate, _)| *estimate as u128)
        .sum();

    measured
        .iter()
        .zip(&estimates)
        .map(|(measured, &estimate)| match (measured, total) {
            (Some(units), _) => (*units, ComputeSource::Measured),
            (None, Some(total)) if unmeasured_weight > 0 => {
                let remaining = total.saturating_sub(measured_top_level) as u128;
                let share = remaining * estimate as u128 / unmeasured_weight;
                (share as u64, ComputeSource::Apportioned)
            }
            (None, _) => (estimate, ComputeSource::Estimated),
        })
        .collect()
}

fn suggest_optimizations(instruction_kind: &str, account_count: usize) -> Vec<String> {
    let mut hints = Vec::new();

    if account_count > ACCOUNT_HEAVY_THRESHOLD {
        hints.push(HINT_REDUCE_ACCOUNTS.to_string());
    }
    if instruction_kind == "swap" {
        hints.push(HINT_DIRECT_ROUTES.to_string());
        hints.push(HINT_BATCHING.to_string());
    }
    if instruction_kind == KIND_UNKNOWN || instruction_kind == KIND_COMPILED {
        hints.push(HINT_DECODABLE_PATH.to_string());
    }

    hints
}
