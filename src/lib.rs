//! A library for reconstructing and explaining Solana transaction traces
//!
//! Given one fetched transaction record, this crate rebuilds the call trace of
//! top-level and inner instructions, classifies why the transaction failed,
//! and reports how efficiently it used its compute budget. It performs no
//! network access; fetching records is left to the caller.

pub mod analyzer;
pub mod constants;
pub mod errors;
pub mod models;
pub mod utils;

pub use analyzer::{ErrorRuleSet, ProgramRegistry, TraceDebugger};
pub use errors::{DebuggerError, DebuggerResult};
pub use models::report::Report;
pub use models::transaction::TransactionRecord;

/// Debug a record with the built-in program and error tables.
pub fn debug_transaction(record: &TransactionRecord) -> DebuggerResult<Report> {
    TraceDebugger::default().debug(record)
}

/// Decode a JSON record and debug it with the built-in tables.
pub fn debug_transaction_json(json: &str) -> DebuggerResult<Report> {
    TraceDebugger::default().debug_json(json)
}

/// Version of the trace debugger
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
