//! Error handling for the trace debugger.
//!
//! Only structural problems with the transaction record itself surface as
//! errors. Problems with a single instruction are recovered inside the trace
//! builder, and the reasons a transaction failed on-chain are returned as
//! [`Diagnostic`](crate::models::report::Diagnostic) data, never as errors.

use std::fmt;
use thiserror::Error;

/// Main error type for the trace debugger.
#[derive(Error, Debug)]
pub enum DebuggerError {
    /// A field every downstream computation depends on is absent.
    #[error("Transaction record is missing required field `{0}`")]
    MissingField(&'static str),

    /// The record references no accounts at all, so there is no fee payer.
    #[error("Transaction record has an empty account key list")]
    EmptyAccountKeys,

    /// The header counts cannot partition the account key list.
    #[error("Message header does not fit {account_count} account keys: {reason}")]
    InvalidHeader {
        account_count: usize,
        reason: String,
    },

    /// The record could not be decoded from its serialized form.
    #[error("Failed to decode transaction record: {0}")]
    Decode(#[from] serde_json::Error),

    /// A program registry entry does not name a valid program address.
    #[error("Invalid program id in registry: {0}")]
    InvalidProgramId(String),

    /// Errors related to file I/O while loading registry overrides.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for the trace debugger.
pub type DebuggerResult<T> = Result<T, DebuggerError>;

/// Where a structural error was detected.
///
/// Used in log lines so a rejected record can be traced back to the caller
/// that supplied it.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// Signature of the transaction being debugged, if known.
    pub signature: Option<String>,

    /// Component where the error occurred (e.g., "trace_builder").
    pub component: String,

    /// Operation being performed when the error occurred.
    pub operation: String,

    /// Additional context details, such as input sizes.
    pub details: Option<String>,
}

impl ErrorContext {
    pub fn new(component: &str, operation: &str) -> Self {
        Self {
            signature: None,
            component: component.to_string(),
            operation: operation.to_string(),
            details: None,
        }
    }

    pub fn with_signature(mut self, signature: &str) -> Self {
        self.signature = Some(signature.to_string());
        self
    }

    pub fn with_details(mut self, details: String) -> Self {
        self.details = Some(details);
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "In {} while {}", self.component, self.operation)?;
        if let Some(signature) = &self.signature {
            write!(f, " for transaction {}", signature)?;
        }
        if let Some(details) = &self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

/// Extension trait for logging structural failures with their context
/// before handing them to the caller.
pub trait ErrorExt<T> {
    fn log_context(self, context: &ErrorContext) -> DebuggerResult<T>;
}

impl<T> ErrorExt<T> for DebuggerResult<T> {
    fn log_context(self, context: &ErrorContext) -> DebuggerResult<T> {
        self.map_err(|e| {
            log::warn!("{}: {}", context, e);
            e
        })
    }
}
