//! Data models for transaction records, traces and diagnostic reports

pub mod report;
pub mod trace;
pub mod transaction;

pub use self::report::{Diagnostic, DiagnosticKind, PerformanceReport, Report, Severity};
pub use self::trace::{CpiAccountRef, CpiStep, ComputeSource, EfficiencyRating};
pub use self::transaction::{InstructionRecord, MessageHeader, TransactionMeta, TransactionRecord};
