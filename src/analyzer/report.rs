//! Report assembly

use super::accounts::AccountRoles;
use super::trace::Trace;
use crate::models::report::{
    Diagnostic, PerformanceReport, Report, ReportMetadata, SuspectedFailure, TransactionStatus,
};
use crate::models::trace::CpiStep;
use crate::models::transaction::TransactionRecord;
use crate::utils::log_parser::LogAnalysis;

/// Merge the trace, diagnostics and performance figures into one report.
pub fn assemble(
    record: &TransactionRecord,
    trace: Trace,
    diagnostics: Vec<Diagnostic>,
    performance: PerformanceReport,
    logs: &LogAnalysis,
) -> Report {
    let roles = AccountRoles::new(
        &record.account_keys,
        record.header,
        record.loaded_addresses(),
    );

    let metadata = ReportMetadata {
        accounts_modified: roles.writable_count(),
        total_instructions: trace.steps.len(),
        skipped_instructions: trace.skipped,
        programs_involved: programs_involved(&trace.steps),
        logs_truncated: logs.is_truncated(),
    };

    let status = if record.is_failed() {
        TransactionStatus::Failed
    } else {
        TransactionStatus::Success
    };

    let suspected_failure = if record.is_failed() {
        suspected_failure(&trace, logs)
    } else {
        None
    };

    Report {
        signature: record.signature.clone(),
        slot: record.slot,
        status,
        cpi_flow: trace.steps,
        errors: diagnostics,
        performance,
        metadata,
        suspected_failure,
    }
}

/// Distinct program ids in order of first appearance.
pub fn programs_involved(steps: &[CpiStep]) -> Vec<String> {
    let mut programs: Vec<String> = Vec::new();
    for step in steps {
        if !programs.contains(&step.program_id) {
            programs.push(step.program_id.clone());
        }
    }
    programs
}

/// Best-effort location of the failure, from the first `failed` log line.
fn suspected_failure(trace: &Trace, logs: &LogAnalysis) -> Option<SuspectedFailure> {
    let failure = logs.failure()?;

    let step_id = trace
        .slots
        .iter()
        .zip(&trace.steps)
        .find(|(slot, step)| **slot == failure.slot && step.program_id == failure.program_id)
        .map(|(_, step)| step.id);

    Some(SuspectedFailure {
        step_id,
        program_id: failure.program_id.clone(),
        log_message: failure.message.clone(),
    })
}
