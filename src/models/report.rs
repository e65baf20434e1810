//! Diagnostic report model

use serde::{Deserialize, Serialize};

use super::trace::CpiStep;

/// Failure categories the pattern matcher can recognise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    AccountBalanceMismatch,
    AccountConstraintViolation,
    ProgramError,
    ComputeBudgetExceeded,
    RentViolation,
    AccountSizeExceeded,
    AuthorityMismatch,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::AccountBalanceMismatch => "account_balance_mismatch",
            DiagnosticKind::AccountConstraintViolation => "account_constraint_violation",
            DiagnosticKind::ProgramError => "program_error",
            DiagnosticKind::ComputeBudgetExceeded => "compute_budget_exceeded",
            DiagnosticKind::RentViolation => "rent_violation",
            DiagnosticKind::AccountSizeExceeded => "account_size_exceeded",
            DiagnosticKind::AuthorityMismatch => "authority_mismatch",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

/// A classified, human-readable explanation of a failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub message: String,
    pub suggested_fix: String,
    pub documentation_link: Option<String>,
    pub estimated_fix_time: Option<String>,
}

/// Qualitative reading of transaction-level compute efficiency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EfficiencyNarrative {
    Excellent,
    Good,
    Moderate,
    Poor,
    /// The record did not report consumed compute units
    Unknown,
}

impl EfficiencyNarrative {
    pub fn describe(&self) -> &'static str {
        match self {
            EfficiencyNarrative::Excellent => "Compute budget is used almost entirely",
            EfficiencyNarrative::Good => "Compute budget is well sized",
            EfficiencyNarrative::Moderate => "Compute budget is noticeably oversized",
            EfficiencyNarrative::Poor => "Most of the compute budget goes unused",
            EfficiencyNarrative::Unknown => "Compute consumption was not reported",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceReport {
    pub compute_units_used: Option<u64>,
    pub compute_units_requested_estimate: Option<u64>,
    /// Limit set by a `setComputeUnitLimit` instruction, if the transaction carried one
    pub declared_compute_unit_limit: Option<u64>,
    pub fee: u64,
    pub slot: u64,
    pub efficiency_percent: Option<f64>,
    pub efficiency_narrative: EfficiencyNarrative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Success,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    /// Writable accounts in the transaction
    pub accounts_modified: usize,
    /// Steps actually present in `cpi_flow`
    pub total_instructions: usize,
    /// Instructions dropped because they could not be resolved
    pub skipped_instructions: usize,
    /// Distinct program ids in order of first appearance
    pub programs_involved: Vec<String>,
    /// The node cut the program logs short, so later steps have no
    /// measured compute units and no suspected failure point
    pub logs_truncated: bool,
}

/// Best-effort guess at which step failed, inferred from program logs.
///
/// The ledger only reports failure for the whole transaction; this is a hint,
/// not an attribution the record guarantees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuspectedFailure {
    pub step_id: Option<usize>,
    pub program_id: String,
    pub log_message: String,
}

/// Everything the debugger knows about one transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub signature: String,
    pub slot: u64,
    pub status: TransactionStatus,
    pub cpi_flow: Vec<CpiStep>,
    pub errors: Vec<Diagnostic>,
    pub performance: PerformanceReport,
    pub metadata: ReportMetadata,
    pub suspected_failure: Option<SuspectedFailure>,
}

impl Report {
    pub fn has_critical_errors(&self) -> bool {
        self.errors.iter().any(|d| d.severity == Severity::Critical)
    }
}
