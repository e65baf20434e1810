//! Compute unit accounting
//!
//! Transaction-level figures come from the measured `computeUnitsConsumed`.
//! Per-step figures fall back to a declared heuristic when nothing better is
//! available; the trace marks those steps as estimated.

use log::debug;
use serde_json::Value;

use crate::constants::programs::compute_budget_program;
use crate::constants::{
    DEFAULT_INSTRUCTION_COST, GOOD_UNITS_PER_ACCOUNT, INSTRUCTION_COSTS,
    MIN_REQUESTED_COMPUTE_UNITS, OPTIMAL_UNITS_PER_ACCOUNT,
};
use crate::models::report::{EfficiencyNarrative, PerformanceReport};
use crate::models::trace::EfficiencyRating;
use crate::models::transaction::{InstructionRecord, TransactionRecord};

/// Compute budget instruction discriminator for `SetComputeUnitLimit`.
const SET_COMPUTE_UNIT_LIMIT: u8 = 2;

/// Aggregate performance figures for a transaction.
pub fn estimate(record: &TransactionRecord) -> PerformanceReport {
    let (fee, consumed) = match &record.meta {
        Some(meta) => (meta.fee, meta.compute_units_consumed),
        None => (0, None),
    };

    let requested = consumed.map(requested_estimate);
    // Bucketed before rounding so the narrative follows the true ratio
    let share = consumed
        .zip(requested)
        .map(|(consumed, requested)| consumed_share(consumed, requested));

    PerformanceReport {
        compute_units_used: consumed,
        compute_units_requested_estimate: requested,
        declared_compute_unit_limit: declared_compute_unit_limit(record),
        fee,
        slot: record.slot,
        efficiency_percent: share.map(round_percent),
        efficiency_narrative: share.map_or(EfficiencyNarrative::Unknown, narrative),
    }
}

/// What the transaction most likely asked for: 120% of consumption, never
/// below the smallest realistic budget request.
pub fn requested_estimate(consumed: u64) -> u64 {
    (consumed.saturating_mul(6) / 5).max(MIN_REQUESTED_COMPUTE_UNITS)
}

/// Consumed share of the requested budget, rounded to one decimal.
pub fn efficiency_percent(consumed: u64, requested: u64) -> f64 {
    round_percent(consumed_share(consumed, requested))
}

fn consumed_share(consumed: u64, requested: u64) -> f64 {
    if requested == 0 {
        return 0.0;
    }
    consumed as f64 / requested as f64 * 100.0
}

fn round_percent(percent: f64) -> f64 {
    (percent * 10.0).round() / 10.0
}

pub fn narrative(percent: f64) -> EfficiencyNarrative {
    if percent > 90.0 {
        EfficiencyNarrative::Excellent
    } else if percent > 70.0 {
        EfficiencyNarrative::Good
    } else if percent > 50.0 {
        EfficiencyNarrative::Moderate
    } else {
        EfficiencyNarrative::Poor
    }
}

/// Heuristic compute cost of one instruction. Not a measurement.
pub fn estimate_step_units(instruction_kind: &str, account_count: usize) -> u64 {
    let base = INSTRUCTION_COSTS
        .iter()
        .find(|(kind, _)| *kind == instruction_kind)
        .map_or(DEFAULT_INSTRUCTION_COST, |(_, cost)| *cost);

    base * (account_count / 3).max(1) as u64
}

/// Rate a step by the compute it spends per account touched.
pub fn rate_step(compute_units: u64, account_count: usize) -> EfficiencyRating {
    let per_account = compute_units / account_count.max(1) as u64;

    if per_account < OPTIMAL_UNITS_PER_ACCOUNT {
        EfficiencyRating::Optimal
    } else if per_account < GOOD_UNITS_PER_ACCOUNT {
        EfficiencyRating::Good
    } else {
        EfficiencyRating::Poor
    }
}

/// The limit set by a top-level `SetComputeUnitLimit` instruction, if any.
pub fn declared_compute_unit_limit(record: &TransactionRecord) -> Option<u64> {
    let compute_budget = compute_budget_program();

    record.instructions.iter().find_map(|instruction| match instruction {
        InstructionRecord::Parsed(ix) if ix.program_id == compute_budget => {
            if ix.instruction_type() != Some("setComputeUnitLimit") {
                return None;
            }
            ix.info()?.get("units").and_then(Value::as_u64)
        }
        InstructionRecord::PartiallyDecoded(ix) if ix.program_id == compute_budget => {
            decode_unit_limit(&ix.data)
        }
        InstructionRecord::Compiled(ix)
            if record.account_keys.get(ix.program_id_index) == Some(&compute_budget) =>
        {
            decode_unit_limit(&ix.data)
        }
        _ => None,
    })
}

fn decode_unit_limit(data: &str) -> Option<u64> {
    let bytes = match bs58::decode(data).into_vec() {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!("Compute budget instruction data is not base58: {}", e);
            return None;
        }
    };

    match bytes.as_slice() {
        [SET_COMPUTE_UNIT_LIMIT, a, b, c, d] => Some(u32::from_le_bytes([*a, *b, *c, *d]) as u64),
        _ => None,
    }
}
