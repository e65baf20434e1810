//! Core debugging engine for Solana transactions

pub mod accounts;
pub mod compute;
pub mod error_patterns;
pub mod known_programs;
pub mod report;
pub mod trace;

use std::sync::Arc;

use log::info;

use crate::errors::{DebuggerError, DebuggerResult, ErrorContext, ErrorExt};
use crate::models::report::Report;
use crate::models::transaction::TransactionRecord;
use crate::utils::log_parser::LogAnalysis;

pub use self::error_patterns::{ErrorRule, ErrorRuleSet};
pub use self::known_programs::ProgramRegistry;
pub use self::trace::{Trace, TraceBuilder};

/// Turns transaction records into diagnostic reports.
///
/// Holds only immutable lookup tables, so one debugger can serve any number
/// of threads or tasks at once.
#[derive(Debug, Clone)]
pub struct TraceDebugger {
    programs: Arc<ProgramRegistry>,
    rules: Arc<ErrorRuleSet>,
}

impl TraceDebugger {
    /// Create a debugger over the given program and error tables.
    pub fn new(programs: Arc<ProgramRegistry>, rules: Arc<ErrorRuleSet>) -> Self {
        Self { programs, rules }
    }

    /// Produce the full report for one record.
    ///
    /// Fails only when the record cannot be partitioned into account roles;
    /// problems with individual instructions are absorbed into the report.
    pub fn debug(&self, record: &TransactionRecord) -> DebuggerResult<Report> {
        let context = ErrorContext::new("trace_debugger", "validate_record")
            .with_signature(&record.signature)
            .with_details(format!("account_keys={}", record.account_keys.len()));
        validate(record).log_context(&context)?;

        let logs = record
            .meta
            .as_ref()
            .and_then(|meta| meta.log_messages.as_deref())
            .map(LogAnalysis::parse)
            .unwrap_or_default();

        let trace = TraceBuilder::new(&self.programs).build(record, &logs);
        let diagnostics = self.rules.diagnose(record.meta.as_ref());
        let performance = compute::estimate(record);

        info!(
            "Debugged {}: {} steps, {} diagnostics",
            record.signature,
            trace.steps.len(),
            diagnostics.len()
        );

        Ok(report::assemble(record, trace, diagnostics, performance, &logs))
    }

    /// Decode a JSON record and debug it.
    pub fn debug_json(&self, json: &str) -> DebuggerResult<Report> {
        let record = TransactionRecord::from_json(json)?;
        self.debug(&record)
    }
}

impl Default for TraceDebugger {
    fn default() -> Self {
        Self::new(ProgramRegistry::shared(), ErrorRuleSet::shared())
    }
}

/// Structural checks every downstream computation depends on.
fn validate(record: &TransactionRecord) -> DebuggerResult<()> {
    if record.account_keys.is_empty() {
        return Err(DebuggerError::EmptyAccountKeys);
    }
    accounts::validate_header(record.account_keys.len(), &record.header)
}
